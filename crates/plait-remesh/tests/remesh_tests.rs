//! Integration tests for plait-remesh.

use approx::assert_relative_eq;
use plait_contact::Plane;
use plait_material::{FabricProperties, Material};
use plait_math::{DMat2, DVec2, DVec3, DVec4};
use plait_mesh::generators::quad_grid;
use plait_mesh::topology::mark_nodes_to_preserve;
use plait_remesh::sizing::{edge_metric, face_sizing, vert_sizing};
use plait_remesh::{back_up_residuals, dynamic_remesh, restore_residuals, static_remesh};
use plait_solver::{Cloth, RemeshConfig};
use plait_types::{EdgeId, FaceId, NodeId};

fn cloth(cols: usize, rows: usize, size: f64) -> Cloth {
    let mesh = quad_grid(cols, rows, size, size).unwrap();
    let material = Material::new(FabricProperties::uniform(
        "test",
        0.1,
        DVec4::new(50.0, 10.0, 50.0, 10.0),
        1e-6,
    ));
    let mut cloth = Cloth::new(mesh, vec![material]).unwrap();
    cloth.compute_masses();
    cloth
}

fn assert_positive_faces(cloth: &Cloth) {
    for face in &cloth.mesh.faces {
        assert!(face.a > 0.0, "face {} has area {}", face.index, face.a);
    }
}

// ─── Sizing Tests ─────────────────────────────────────────────

#[test]
fn flat_cloth_at_rest_gets_coarsest_sizing() {
    let cloth = cloth(4, 4, 1.0);
    let config = RemeshConfig::default();
    let m = face_sizing(&cloth.mesh, FaceId(0), &config, &[]);
    let floor = 1.0 / (config.size_max * config.size_max);
    assert_relative_eq!(m.x_axis.x, floor, epsilon = 1e-9);
    assert_relative_eq!(m.y_axis.y, floor, epsilon = 1e-9);
    assert_relative_eq!(m.x_axis.y, 0.0, epsilon = 1e-9);
}

#[test]
fn velocity_gradient_refines_along_its_direction() {
    let mut cloth = cloth(4, 4, 1.0);
    for node in &mut cloth.mesh.nodes {
        node.v.z = 10.0 * node.x.x;
    }
    let config = RemeshConfig::default();
    let m = face_sizing(&cloth.mesh, FaceId(0), &config, &[]);
    // |∂v/∂u|² / refine_velocity² = 100 / 0.25
    assert_relative_eq!(m.x_axis.x, 400.0, epsilon = 1e-6);
    assert_relative_eq!(m.y_axis.y, 1.0 / (config.size_max * config.size_max), epsilon = 1e-6);
}

#[test]
fn nearby_obstacle_refines() {
    let mut cloth = cloth(4, 4, 1.0);
    for node in &mut cloth.mesh.nodes {
        node.x.z = 0.02 + (node.x.x + 0.5);
    }
    plait_mesh::normals::compute_ws_data(&mut cloth.mesh);
    let config = RemeshConfig::default();
    let planes: Vec<Option<Plane>> = vec![
        Some(Plane {
            point: DVec3::ZERO,
            normal: DVec3::Z,
        });
        cloth.mesh.node_count()
    ];
    let far = face_sizing(&cloth.mesh, FaceId(0), &config, &[]);
    let near = face_sizing(&cloth.mesh, FaceId(0), &config, &planes);
    assert!(near.x_axis.x > far.x_axis.x);
}

#[test]
fn sizing_respects_minimum_size() {
    let mut cloth = cloth(4, 4, 1.0);
    for node in &mut cloth.mesh.nodes {
        node.v.z = 1e4 * node.x.x;
    }
    let config = RemeshConfig::default();
    let m = face_sizing(&cloth.mesh, FaceId(0), &config, &[]);
    assert_relative_eq!(m.x_axis.x, 1.0 / (config.size_min * config.size_min), epsilon = 1e-6);
}

#[test]
fn edge_metric_scales_with_length() {
    let cloth = cloth(2, 2, 1.0);
    let config = RemeshConfig::default();
    let sizing = vert_sizing(&cloth.mesh, &config, &[]);
    let e = cloth.mesh.find_edge(NodeId(0), NodeId(1)).unwrap();
    // Edge of 0.5 m under a 0.1 m target.
    assert_relative_eq!(edge_metric(&cloth.mesh, &sizing, e), 5.0, epsilon = 1e-9);
}

// ─── Dynamic Remesh Tests ─────────────────────────────────────

#[test]
fn coarse_cloth_is_refined() {
    let mut cloth = cloth(2, 2, 1.0);
    cloth.remeshing.size_max = 0.3;
    let faces_before = cloth.mesh.face_count();
    let outcome = dynamic_remesh(&mut cloth, &[]).unwrap();
    assert!(outcome.splits > 0);
    assert!(cloth.mesh.face_count() > faces_before);
    assert_eq!(outcome.nodes_after, cloth.mesh.node_count());
    cloth.mesh.validate().unwrap();
    assert_positive_faces(&cloth);
    let config = cloth.remeshing;
    let sizing = vert_sizing(&cloth.mesh, &config, &[]);
    for e in 0..cloth.mesh.edge_count() {
        assert!(edge_metric(&cloth.mesh, &sizing, EdgeId(e as u32)) <= 1.0 + 1e-9);
    }
}

#[test]
fn refinement_respects_edge_budget() {
    let mut cloth = cloth(2, 2, 1.0);
    cloth.remeshing.max_edges = 40;
    let outcome = dynamic_remesh(&mut cloth, &[]).unwrap();
    assert!(outcome.splits > 0);
    assert!(cloth.mesh.edge_count() <= 40, "{} edges", cloth.mesh.edge_count());
}

#[test]
fn mass_is_conserved_by_refinement() {
    let mut cloth = cloth(2, 2, 1.0);
    cloth.remeshing.size_max = 0.3;
    let before = cloth.mesh.total_mass();
    dynamic_remesh(&mut cloth, &[]).unwrap();
    assert_relative_eq!(cloth.mesh.total_mass(), before, epsilon = 1e-12);
}

#[test]
fn fine_cloth_is_coarsened() {
    let mut cloth = cloth(10, 10, 0.1);
    let nodes_before = cloth.mesh.node_count();
    let outcome = dynamic_remesh(&mut cloth, &[]).unwrap();
    assert!(outcome.collapses > 0);
    assert!(cloth.mesh.node_count() < nodes_before);
    cloth.mesh.validate().unwrap();
    assert_positive_faces(&cloth);
    let removed = outcome.node_map.iter().filter(|n| n.is_none()).count();
    assert_eq!(nodes_before - removed, cloth.mesh.node_count());
}

#[test]
fn preserved_nodes_survive_unmoved() {
    let mut cloth = cloth(10, 10, 0.1);
    mark_nodes_to_preserve(&mut cloth.mesh);
    cloth.mesh.nodes[60].preserve = true;
    let before = cloth.mesh.clone();
    let outcome = dynamic_remesh(&mut cloth, &[]).unwrap();
    assert!(outcome.collapses > 0);
    for (old, node) in before.nodes.iter().enumerate() {
        if !node.preserve {
            continue;
        }
        let new = outcome.node_map[old].expect("preserved node removed");
        assert_eq!(cloth.mesh.node(new).x, node.x);
        assert!(cloth.mesh.node(new).preserve);
    }
}

#[test]
fn preserved_nodes_survive_refinement() {
    let mut cloth = cloth(2, 2, 1.0);
    mark_nodes_to_preserve(&mut cloth.mesh);
    cloth.remeshing.size_max = 0.3;
    let before = cloth.mesh.clone();
    let outcome = dynamic_remesh(&mut cloth, &[]).unwrap();
    for (old, node) in before.nodes.iter().enumerate() {
        let new = outcome.node_map[old].unwrap();
        assert_eq!(cloth.mesh.node(new).x, node.x);
    }
}

#[test]
fn split_nodes_interpolate_state() {
    let mut cloth = cloth(1, 1, 1.0);
    cloth.remeshing.max_edges = 10;
    for node in &mut cloth.mesh.nodes {
        node.v = DVec3::new(0.0, 0.0, node.x.x);
    }
    let outcome = dynamic_remesh(&mut cloth, &[]).unwrap();
    assert_eq!(outcome.splits, 1);
    let new = cloth.mesh.nodes.last().unwrap();
    assert_relative_eq!(new.v.z, new.x.x, epsilon = 1e-12);
}

// ─── Static Remesh Tests ──────────────────────────────────────

#[test]
fn static_remesh_is_identity() {
    let mut cloth = cloth(4, 4, 1.0);
    let faces = cloth.mesh.face_count();
    let outcome = static_remesh(&mut cloth);
    assert_eq!(outcome.operations(), 0);
    assert_eq!(cloth.mesh.face_count(), faces);
    for (i, id) in outcome.node_map.iter().enumerate() {
        assert_eq!(*id, Some(NodeId(i as u32)));
    }
}

// ─── Residual Tests ───────────────────────────────────────────

#[test]
fn residuals_follow_material_position() {
    let mut cloth = cloth(4, 4, 1.0);
    let left = DMat2::from_diagonal(DVec2::new(1.0, 0.0));
    let right = DMat2::from_diagonal(DVec2::new(0.0, 1.0));
    for f in 0..cloth.mesh.face_count() {
        let c = cloth.mesh.material_centroid(FaceId(f as u32));
        let face = &mut cloth.mesh.faces[f];
        face.s_plastic = if c.x < 0.5 { left } else { right };
        face.damage = c.x;
    }
    let old = cloth.mesh.clone();
    let residuals = back_up_residuals(&old);
    cloth.remeshing.size_max = 0.2;
    dynamic_remesh(&mut cloth, &[]).unwrap();
    for face in &mut cloth.mesh.faces {
        face.s_plastic = DMat2::ZERO;
    }
    restore_residuals(&mut cloth.mesh, &old, &residuals);
    for f in 0..cloth.mesh.face_count() {
        let c = cloth.mesh.material_centroid(FaceId(f as u32));
        let face = cloth.mesh.face(FaceId(f as u32));
        if c.x < 0.45 {
            assert_eq!(face.s_plastic, left);
        } else if c.x > 0.55 {
            assert_eq!(face.s_plastic, right);
        }
    }
}

#[test]
fn residual_outside_old_chart_uses_nearest() {
    let old = cloth(2, 2, 1.0).mesh;
    let mut residuals = back_up_residuals(&old);
    for r in &mut residuals {
        r.damage = r.centroid.x;
    }
    let mut shifted = cloth(1, 1, 1.0).mesh;
    for vert in &mut shifted.verts {
        vert.u.x += 5.0;
    }
    shifted.compute_ms_data();
    restore_residuals(&mut shifted, &old, &residuals);
    let far_right = residuals.iter().map(|r| r.damage).fold(0.0, f64::max);
    for face in &shifted.faces {
        assert_relative_eq!(face.damage, far_right);
    }
}
