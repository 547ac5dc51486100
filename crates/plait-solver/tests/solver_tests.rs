//! Integration tests for plait-solver.

use approx::assert_relative_eq;
use plait_material::{FabricProperties, Material};
use plait_math::decomposition::{deformation_gradient, svd_3x2};
use plait_math::motion::{Motion, Transform};
use plait_math::{DVec2, DVec3, DVec4};
use plait_mesh::generators::quad_grid;
use plait_mesh::topology::interior_edges;
use plait_mesh::{FaceSpec, Mesh, Node, Space, Vert};
use plait_solver::assembly::{add_internal_forces, internal_energy};
use plait_solver::bending::{BendingStrategy, DihedralBending};
use plait_solver::constraint::ContactThickness;
use plait_solver::external::{add_external_forces, wind_force};
use plait_solver::implicit::{implicit_update, snap_pins, ImplicitUpdate};
use plait_solver::plasticity::{plastic_update, reset_plasticity};
use plait_solver::pop_filter::apply_pop_filter;
use plait_solver::strain_limit::{max_violation, pinned_nodes, strain_limit, StrainBounds};
use plait_solver::stretching::{stretching_energy, stretching_force};
use plait_solver::{
    BendingModel, Cloth, Constraint, ConstraintSet, EqCon, ExternalForces, Handle, HandleWindow,
    IneqCon, MeshSet, QuadraticBending, SolverConfig, Wind,
};
use plait_types::{FaceId, NodeId, NodeRef};

fn test_material() -> Material {
    Material::new(FabricProperties::uniform(
        "test",
        0.1,
        DVec4::new(50.0, 10.0, 50.0, 10.0),
        1e-6,
    ))
}

fn grid_cloth(cols: usize, rows: usize) -> Cloth {
    let mesh = quad_grid(cols, rows, 1.0, 1.0).unwrap();
    let mut cloth = Cloth::new(mesh, vec![test_material()]).unwrap();
    cloth.compute_masses();
    cloth
}

fn triangle_cloth() -> Cloth {
    let nodes = vec![
        Node::at(DVec3::new(0.0, 0.0, 0.0)),
        Node::at(DVec3::new(1.0, 0.0, 0.0)),
        Node::at(DVec3::new(0.0, 1.0, 0.0)),
    ];
    let verts = vec![
        Vert::new(DVec2::new(0.0, 0.0), NodeId(0)),
        Vert::new(DVec2::new(1.0, 0.0), NodeId(1)),
        Vert::new(DVec2::new(0.0, 1.0), NodeId(2)),
    ];
    let mut mesh = Mesh::from_parts(nodes, verts, vec![FaceSpec::new([0, 1, 2])]).unwrap();
    mesh.compute_ms_data();
    let mut cloth = Cloth::new(mesh, vec![test_material()]).unwrap();
    cloth.compute_masses();
    cloth
}

fn step(cloth: Cloth, ext: &ExternalForces, cons: &ConstraintSet, dt: f64) -> Cloth {
    let mut cloths = vec![cloth];
    let update = ImplicitUpdate {
        cloth: 0,
        external: ext,
        constraints: cons,
        dt,
        update_positions: true,
    };
    implicit_update(&mut cloths, &[], &update, &SolverConfig::debug()).unwrap();
    cloths.pop().unwrap()
}

// ─── Config Tests ─────────────────────────────────────────────

#[test]
fn config_defaults_match_constants() {
    let config = SolverConfig::default();
    assert_eq!(config.handle_stiffness, 1e3);
    assert_eq!(config.collision_stiffness, 1e9);
    assert_relative_eq!(config.proximity_distance(), 2e-3);
}

#[test]
fn config_presets_differ() {
    assert!(SolverConfig::debug().strain_limit_iterations < SolverConfig::default().strain_limit_iterations);
    assert!(SolverConfig::high_quality().strain_limit_tolerance < SolverConfig::default().strain_limit_tolerance);
    assert!(!SolverConfig::debug().parallel_assembly);
}

#[test]
fn config_toml_roundtrip() {
    let config = SolverConfig::high_quality();
    let text = toml::to_string(&config).unwrap();
    let back: SolverConfig = toml::from_str(&text).unwrap();
    assert_eq!(back, config);
}

#[test]
fn config_missing_fields_use_defaults() {
    let config: SolverConfig = toml::from_str("handle_stiffness = 500.0").unwrap();
    assert_eq!(config.handle_stiffness, 500.0);
    assert_eq!(config.repulsion_thickness, SolverConfig::default().repulsion_thickness);
}

// ─── Constraint Tests ─────────────────────────────────────────

#[test]
fn pin_value_and_energy() {
    let cloth = grid_cloth(1, 1);
    let meshes_v = vec![&cloth.mesh];
    let meshes = MeshSet::new(&meshes_v, &[]);
    let x = cloth.mesh.nodes[0].x;
    let pin = EqCon::new(NodeRef::cloth(0, 0), x - DVec3::new(0.1, 0.0, 0.0), DVec3::X, 100.0);
    let v = pin.value(&meshes);
    assert_relative_eq!(v, 0.1, epsilon = 1e-12);
    assert_relative_eq!(pin.energy(v), 0.5, epsilon = 1e-12);
    assert_relative_eq!(pin.energy_grad(v), 10.0, epsilon = 1e-12);
    assert_eq!(pin.energy_hess(v), 100.0);
    assert_eq!(pin.gradient(), vec![(NodeRef::cloth(0, 0), DVec3::X)]);
    let con = Constraint::Pin(pin);
    assert!(con.project(&meshes).is_empty());
    assert!(con.friction(0.01, &meshes).0.is_empty());
}

fn proximity(cloth_node: usize, obstacle: [usize; 3], n: DVec3, mu: f64) -> IneqCon {
    IneqCon {
        nodes: [
            NodeRef::cloth(0, cloth_node),
            NodeRef::obstacle(0, obstacle[0]),
            NodeRef::obstacle(0, obstacle[1]),
            NodeRef::obstacle(0, obstacle[2]),
        ],
        w: [1.0, -1.0 / 3.0, -1.0 / 3.0, -1.0 / 3.0],
        free: [true, false, false, false],
        n,
        mu,
        stiff: 1e3,
        thickness: ContactThickness {
            repulsion: 1e-3,
            projection: 1e-4,
        },
    }
}

#[test]
fn proximity_is_inactive_when_separated() {
    let cloth = grid_cloth(1, 1);
    let mut floor = quad_grid(1, 1, 1.0, 1.0).unwrap();
    for node in &mut floor.nodes {
        node.x.z -= 0.1;
    }
    let cv = vec![&cloth.mesh];
    let ov = vec![&floor];
    let meshes = MeshSet::new(&cv, &ov);
    let con = proximity(0, [0, 1, 2], DVec3::Z, 0.5);
    let value = con.value(&meshes);
    assert!(value > 0.0);
    assert_eq!(con.energy(value), 0.0);
    assert_eq!(con.energy_grad(value), 0.0);
    assert!(con.project(&meshes).is_empty());
    assert!(con.friction(0.01, &meshes).0.is_empty());
}

#[test]
fn proximity_projects_penetrating_node_out() {
    let mut cloth = grid_cloth(1, 1);
    let floor = quad_grid(1, 1, 1.0, 1.0).unwrap();
    cloth.mesh.nodes[0].x.z = -0.01;
    let cv = vec![&cloth.mesh];
    let ov = vec![&floor];
    let meshes = MeshSet::new(&cv, &ov);
    let con = proximity(0, [0, 1, 2], DVec3::Z, 0.0);
    let value = con.value(&meshes);
    assert!(con.energy(value) > 0.0);
    assert!(con.energy_grad(value) < 0.0);
    assert!(con.energy_hess(value) > 0.0);
    let dx = con.project(&meshes);
    assert_eq!(dx.len(), 1);
    assert_eq!(dx[0].0, NodeRef::cloth(0, 0));
    // Moved up to the projection thickness.
    assert_relative_eq!(cloth.mesh.nodes[0].x.z + dx[0].1.z, 1e-4, epsilon = 1e-12);
}

#[test]
fn friction_opposes_tangential_motion() {
    let mut cloth = grid_cloth(1, 1);
    let floor = quad_grid(1, 1, 1.0, 1.0).unwrap();
    cloth.mesh.nodes[0].x.z = -0.0005;
    cloth.mesh.nodes[0].v = DVec3::new(1.0, 0.0, 0.0);
    let cv = vec![&cloth.mesh];
    let ov = vec![&floor];
    let meshes = MeshSet::new(&cv, &ov);
    let con = proximity(0, [0, 1, 2], DVec3::Z, 0.5);
    let (force, jac) = con.friction(0.01, &meshes);
    assert_eq!(force.len(), 1);
    assert!(force[0].1.x < 0.0);
    assert_relative_eq!(force[0].1.z, 0.0, epsilon = 1e-12);
    assert_eq!(jac.len(), 1);
}

#[test]
fn snapping_pins_place_node_on_target() {
    let cloth = grid_cloth(1, 1);
    let cv = vec![&cloth.mesh];
    let meshes = MeshSet::new(&cv, &[]);
    let x = cloth.mesh.nodes[0].x;
    let target = x + DVec3::new(0.1, -0.2, 0.3);
    let pins: ConstraintSet = [DVec3::X, DVec3::Y, DVec3::Z]
        .into_iter()
        .map(|axis| Constraint::Pin(EqCon::new(NodeRef::cloth(0, 0), target, axis, 1.0).snapping(true)))
        .collect();
    let total: DVec3 = pins.iter().flat_map(|c| c.project(&meshes)).map(|(_, d)| d).sum();
    assert!((x + total).distance(target) < 1e-12);
}

#[test]
fn constraint_set_collects() {
    let mut set = ConstraintSet::new();
    assert!(set.is_empty());
    set.push(Constraint::Pin(EqCon::new(NodeRef::cloth(0, 0), DVec3::ZERO, DVec3::X, 1.0)));
    set.extend([Constraint::Proximity(proximity(0, [0, 1, 2], DVec3::Z, 0.0))]);
    assert_eq!(set.len(), 2);
    assert_eq!(set.proximity_count(), 1);
}

// ─── Handle Tests ─────────────────────────────────────────────

#[test]
fn handle_strength_window() {
    let window = HandleWindow {
        start: 1.0,
        end: 2.0,
        fade: 1.0,
    };
    assert_eq!(window.strength(0.5), 0.0);
    assert_eq!(window.strength(1.0), 1.0);
    assert_eq!(window.strength(2.0), 1.0);
    assert_relative_eq!(window.strength(2.5), 0.0625, epsilon = 1e-12);
    assert_eq!(window.strength(3.5), 0.0);
}

#[test]
fn fixed_handle_pins_three_axes() {
    let cloth = grid_cloth(2, 2);
    let cv = vec![&cloth.mesh];
    let meshes = MeshSet::new(&cv, &[]);
    let mut handle = Handle::fixed(vec![NodeRef::cloth(0, 0), NodeRef::cloth(0, 2)]);
    assert!(!handle.is_activated());
    let cons = handle.constraints(0.0, 1e3, &meshes);
    assert_eq!(cons.len(), 6);
    assert!(handle.is_activated());
    for con in &cons {
        assert_relative_eq!(con.value(&meshes), 0.0, epsilon = 1e-12);
    }
}

#[test]
fn handle_snaps_only_at_full_strength() {
    let cloth = grid_cloth(1, 1);
    let cv = vec![&cloth.mesh];
    let meshes = MeshSet::new(&cv, &[]);
    let window = HandleWindow {
        start: 0.0,
        end: 1.0,
        fade: 1.0,
    };
    let mut handle = Handle::fixed(vec![NodeRef::cloth(0, 0)]).with_window(window);
    let full = handle.constraints(0.5, 1e3, &meshes);
    assert!(full.iter().all(|c| matches!(c, Constraint::Pin(p) if p.snap)));
    let fading = handle.constraints(1.5, 1e3, &meshes);
    assert_eq!(fading.len(), 3);
    assert!(fading.iter().all(|c| matches!(c, Constraint::Pin(p) if !p.snap)));
}

#[test]
fn faded_handle_produces_nothing() {
    let cloth = grid_cloth(1, 1);
    let cv = vec![&cloth.mesh];
    let meshes = MeshSet::new(&cv, &[]);
    let mut handle = Handle::fixed(vec![NodeRef::cloth(0, 0)]).with_window(HandleWindow {
        start: 0.0,
        end: 1.0,
        fade: 0.0,
    });
    assert!(handle.constraints(2.0, 1e3, &meshes).is_empty());
    assert!(!handle.is_activated());
}

#[test]
fn scripted_handle_follows_motion() {
    let cloth = grid_cloth(1, 1);
    let cv = vec![&cloth.mesh];
    let meshes = MeshSet::new(&cv, &[]);
    let motion = Motion::new(&[
        (0.0, Transform::IDENTITY),
        (1.0, Transform::from_translation(DVec3::new(0.0, 0.0, 1.0))),
    ]);
    let mut handle = Handle::scripted(vec![NodeRef::cloth(0, 0)], motion);
    handle.constraints(0.0, 1e3, &meshes);
    let targets = handle.targets(1.0).unwrap();
    let x = cloth.mesh.nodes[0].x;
    assert_relative_eq!(targets[0].z, x.z + 1.0, epsilon = 1e-9);
}

#[test]
fn handle_remap_follows_new_indices() {
    let mut handle = Handle::fixed(vec![NodeRef::cloth(0, 3), NodeRef::cloth(1, 3)]);
    let map = vec![None, None, None, Some(NodeId(7))];
    handle.remap(0, &map);
    assert_eq!(handle.nodes[0], NodeRef::cloth(0, 7));
    assert_eq!(handle.nodes[1], NodeRef::cloth(1, 3));
}

// ─── Cloth Tests ──────────────────────────────────────────────

#[test]
fn masses_sum_to_area_times_density() {
    let cloth = grid_cloth(4, 3);
    assert_relative_eq!(cloth.mesh.total_mass(), 0.1, epsilon = 1e-12);
    let face_mass: f64 = cloth.mesh.faces.iter().map(|f| f.m).sum();
    assert_relative_eq!(face_mass, 0.1, epsilon = 1e-12);
}

#[test]
fn node_mass_is_third_of_incident_faces() {
    let cloth = grid_cloth(2, 2);
    for (n, node) in cloth.mesh.nodes.iter().enumerate() {
        let expected: f64 = cloth
            .mesh
            .faces
            .iter()
            .filter(|f| (0..3).any(|i| cloth.mesh.face_node(FaceId(f.index as u32), i) == NodeId(n as u32)))
            .map(|f| f.m / 3.0)
            .sum();
        assert_relative_eq!(node.m, expected, epsilon = 1e-15);
    }
}

#[test]
fn set_density_same_value_is_noop() {
    let mut cloth = grid_cloth(2, 2);
    let before = cloth.mesh.total_mass();
    assert!(!cloth.set_density(0, 0.1 + 1e-8).unwrap());
    assert_eq!(cloth.mesh.total_mass(), before);
    assert_eq!(cloth.materials[0].density(), 0.1);
}

#[test]
fn set_density_scales_mass() {
    let mut cloth = grid_cloth(2, 2);
    let before = cloth.mesh.total_mass();
    assert!(cloth.set_density(0, 0.3).unwrap());
    assert_relative_eq!(cloth.mesh.total_mass(), 3.0 * before, epsilon = 1e-12);
    assert!(cloth.set_density(5, 0.3).is_err());
}

#[test]
fn cloth_rejects_unknown_label() {
    let mut mesh = quad_grid(1, 1, 1.0, 1.0).unwrap();
    mesh.faces[1].label = 3;
    assert!(Cloth::new(mesh, vec![test_material()]).is_err());
    let mesh = quad_grid(1, 1, 1.0, 1.0).unwrap();
    assert!(Cloth::new(mesh, Vec::new()).is_err());
}

#[test]
fn bending_model_parses() {
    assert_eq!("quadratic".parse::<BendingModel>().unwrap(), BendingModel::Quadratic);
    assert_eq!(BendingModel::Dihedral.to_string(), "dihedral");
    assert!("springs".parse::<BendingModel>().is_err());
}

// ─── Element Force Tests ──────────────────────────────────────

#[test]
fn stretching_is_zero_at_rest() {
    let cloth = triangle_cloth();
    let (j, f) = stretching_force(&cloth, FaceId(0), Space::World);
    assert!(f.norm() < 1e-12);
    assert!(j.norm().is_finite());
    assert_eq!(stretching_energy(&cloth, FaceId(0), Space::World), 0.0);
}

#[test]
fn stretching_force_is_negative_energy_gradient() {
    let mut cloth = triangle_cloth();
    cloth.mesh.nodes[1].x = DVec3::new(1.2, 0.1, 0.05);
    cloth.mesh.nodes[2].x = DVec3::new(-0.05, 0.9, 0.1);
    let (_, force) = stretching_force(&cloth, FaceId(0), Space::World);
    let h = 1e-6;
    for node in 0..3 {
        for axis in 0..3 {
            let mut plus = cloth.clone();
            plus.mesh.nodes[node].x[axis] += h;
            let mut minus = cloth.clone();
            minus.mesh.nodes[node].x[axis] -= h;
            let de = (stretching_energy(&plus, FaceId(0), Space::World)
                - stretching_energy(&minus, FaceId(0), Space::World))
                / (2.0 * h);
            assert_relative_eq!(-de, force[3 * node + axis], epsilon = 1e-5, max_relative = 1e-4);
        }
    }
}

#[test]
fn stretching_jacobian_is_symmetric() {
    let mut cloth = triangle_cloth();
    cloth.mesh.nodes[1].x = DVec3::new(1.3, 0.0, 0.2);
    let (j, _) = stretching_force(&cloth, FaceId(0), Space::World);
    assert!((j - j.transpose()).norm() < 1e-9);
}

#[test]
fn dihedral_bending_is_zero_when_flat() {
    let cloth = grid_cloth(2, 2);
    for stencil in interior_edges(&cloth.mesh) {
        let (_, f) = DihedralBending.force(&cloth, &stencil, Space::World);
        assert!(f.norm() < 1e-12);
    }
}

#[test]
fn dihedral_force_reduces_energy() {
    let mut cloth = grid_cloth(1, 1);
    cloth.mesh.nodes[3].x.z = 0.2;
    plait_mesh::normals::compute_ws_data(&mut cloth.mesh);
    let stencil = interior_edges(&cloth.mesh)[0];
    let e0 = DihedralBending.energy(&cloth, &stencil, Space::World);
    assert!(e0 > 0.0);
    let (_, f) = DihedralBending.force(&cloth, &stencil, Space::World);
    let mut moved = cloth.clone();
    for (k, node) in stencil.nodes().iter().enumerate() {
        let d = DVec3::new(f[3 * k], f[3 * k + 1], f[3 * k + 2]);
        moved.mesh.nodes[node.index()].x += d * 1e-3 / f.norm();
    }
    assert!(DihedralBending.energy(&moved, &stencil, Space::World) < e0);
}

#[test]
fn quadratic_bending_is_zero_when_flat() {
    let mut cloth = grid_cloth(2, 2);
    cloth.bending.model = BendingModel::Quadratic;
    cloth.prepare_bending();
    let strategy = cloth.quadratic_bending();
    assert_eq!(strategy.name(), "quadratic");
    for stencil in interior_edges(&cloth.mesh) {
        let (j, f) = strategy.force(&cloth, &stencil, Space::World);
        assert!(f.norm() < 1e-9);
        assert!((j - j.transpose()).norm() < 1e-12);
    }
}

#[test]
fn quadratic_cache_tracks_topology() {
    let cloth = grid_cloth(2, 2);
    let mut cache = QuadraticBending::default();
    cache.prepare(&cloth.mesh);
    assert!(cache.is_current(&cloth.mesh));
    let rebuilt = quad_grid(2, 2, 1.0, 1.0).unwrap();
    assert!(!cache.is_current(&rebuilt));
}

#[test]
fn parallel_and_sequential_assembly_agree() {
    let mut cloth = grid_cloth(4, 4);
    for (i, node) in cloth.mesh.nodes.iter_mut().enumerate() {
        node.x.z = 0.01 * (i as f64).sin();
        node.v = DVec3::new(0.0, 0.0, 0.1 * (i as f64).cos());
    }
    plait_mesh::normals::compute_ws_data(&mut cloth.mesh);
    let n = cloth.mesh.node_count();
    let mut seq = plait_math::sparse::BlockSystem::new(n);
    let mut par = plait_math::sparse::BlockSystem::new(n);
    add_internal_forces(&cloth, &mut seq, 0.01, Space::World, false);
    add_internal_forces(&cloth, &mut par, 0.01, Space::World, true);
    assert_eq!(seq.rhs(), par.rhs());
    assert_eq!(seq.to_csr().values, par.to_csr().values);
}

// ─── External Force Tests ─────────────────────────────────────

#[test]
fn gravity_is_mass_weighted() {
    let cloth = grid_cloth(2, 2);
    let mut ext = ExternalForces::zeros(cloth.mesh.node_count());
    add_external_forces(&cloth.mesh, DVec3::new(0.0, 0.0, -9.8), &Wind::default(), &mut ext.fext);
    let total: DVec3 = ext.fext.iter().sum();
    assert_relative_eq!(total.z, -9.8 * cloth.mesh.total_mass(), epsilon = 1e-12);
}

#[test]
fn wind_pushes_along_normal() {
    let cloth = grid_cloth(1, 1);
    let wind = Wind {
        density: 1.0,
        velocity: DVec3::new(0.0, 0.0, 2.0),
        drag: 0.0,
    };
    let face = &cloth.mesh.faces[0];
    let f = wind_force(&cloth.mesh, face, &wind);
    assert_relative_eq!(f.z, face.a * 4.0, epsilon = 1e-12);
}

// ─── Integrator Tests ─────────────────────────────────────────

#[test]
fn rest_state_is_an_equilibrium() {
    let cloth = grid_cloth(3, 3);
    let before: Vec<DVec3> = cloth.mesh.nodes.iter().map(|n| n.x).collect();
    let ext = ExternalForces::zeros(cloth.mesh.node_count());
    let cloth = step(cloth, &ext, &ConstraintSet::new(), 0.005);
    for (node, x) in cloth.mesh.nodes.iter().zip(&before) {
        assert!((node.x - *x).length() < 1e-12);
        assert!(node.v.length() < 1e-12);
    }
}

#[test]
fn free_fall_gains_g_dt() {
    let cloth = grid_cloth(3, 3);
    let dt = 0.005;
    let mut ext = ExternalForces::zeros(cloth.mesh.node_count());
    add_external_forces(&cloth.mesh, DVec3::new(0.0, 0.0, -9.8), &Wind::default(), &mut ext.fext);
    let cloth = step(cloth, &ext, &ConstraintSet::new(), dt);
    for node in &cloth.mesh.nodes {
        assert_relative_eq!(node.v.z, -9.8 * dt, epsilon = 1e-9);
        assert_relative_eq!(node.acceleration.z, -9.8, epsilon = 1e-6);
    }
}

#[test]
fn pinned_node_holds_its_position() {
    let cloth = grid_cloth(3, 3);
    let dt = 0.005;
    let cv = vec![&cloth.mesh];
    let meshes = MeshSet::new(&cv, &[]);
    let mut handle = Handle::fixed(vec![NodeRef::cloth(0, 0)]);
    let cons: ConstraintSet = handle.constraints(0.0, 1e3, &meshes).into_iter().collect();
    let mut ext = ExternalForces::zeros(cloth.mesh.node_count());
    add_external_forces(&cloth.mesh, DVec3::new(0.0, 0.0, -9.8), &Wind::default(), &mut ext.fext);
    let x0 = cloth.mesh.nodes[0].x;
    let cloth = step(cloth, &ext, &cons, dt);
    assert!(cloth.mesh.nodes[0].x.distance(x0) < 1e-12);
    assert!(cloth.mesh.nodes[15].x.z < 0.0);
}

#[test]
fn snap_pins_reports_corrections() {
    let mut cloths = vec![grid_cloth(2, 2)];
    let target = cloths[0].mesh.nodes[4].x;
    let cons: ConstraintSet = [DVec3::X, DVec3::Y, DVec3::Z]
        .into_iter()
        .map(|axis| Constraint::Pin(EqCon::new(NodeRef::cloth(0, 4), target, axis, 1e3).snapping(true)))
        .collect();
    cloths[0].mesh.nodes[4].x += DVec3::new(0.0, 0.0, -0.02);
    let moved = snap_pins(&mut cloths, &[], 0, &cons);
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].0, 4);
    assert_relative_eq!(moved[0].1.z, 0.02, epsilon = 1e-15);
    assert!(cloths[0].mesh.nodes[4].x.distance(target) < 1e-15);
    // Penalty-only pins never move anything.
    let soft: ConstraintSet = [Constraint::Pin(EqCon::new(NodeRef::cloth(0, 0), DVec3::ONE, DVec3::X, 1e3))]
        .into_iter()
        .collect();
    assert!(snap_pins(&mut cloths, &[], 0, &soft).is_empty());
}

#[test]
fn internal_energy_grows_with_stretch() {
    let mut cloth = grid_cloth(2, 2);
    assert_eq!(internal_energy(&cloth, Space::World), 0.0);
    for node in &mut cloth.mesh.nodes {
        node.x.x *= 1.1;
    }
    plait_mesh::normals::compute_ws_data(&mut cloth.mesh);
    assert!(internal_energy(&cloth, Space::World) > 0.0);
}

// ─── Strain Limiting Tests ────────────────────────────────────

#[test]
fn strain_limit_clamps_stretched_triangle() {
    let mut cloth = triangle_cloth();
    cloth.mesh.nodes[1].x = DVec3::new(2.0, 0.0, 0.0);
    let report = strain_limit(&mut cloth, &[false; 3], StrainBounds::Material, &SolverConfig::default());
    assert!(report.iterations >= 1);
    let x: Vec<DVec3> = cloth.mesh.nodes.iter().map(|n| n.x).collect();
    let f = deformation_gradient(x[0], x[1], x[2], cloth.mesh.faces[0].inv_dm);
    let svd = svd_3x2(&f);
    assert!(svd.sigma.x <= 1.05 + 1e-9);
    assert!(svd.sigma.y >= 0.95 - 1e-9);
}

/// A 6 × 6 grid stretched to twice its width with some out-of-plane noise.
fn overstretched_grid() -> Cloth {
    let mut cloth = grid_cloth(6, 6);
    for (i, node) in cloth.mesh.nodes.iter_mut().enumerate() {
        node.x.x *= 2.0;
        node.x.z += 0.01 * ((i * 7 % 5) as f64 - 2.0);
    }
    cloth
}

#[test]
fn strain_limit_bounds_every_face_of_a_grid() {
    let mut cloth = overstretched_grid();
    let bounds = StrainBounds::Material;
    assert!(max_violation(&cloth, bounds) > 0.5);
    let config = SolverConfig::default();
    let pinned = vec![false; cloth.mesh.node_count()];
    let report = strain_limit(&mut cloth, &pinned, bounds, &config);
    assert!(report.converged, "{report:?}");
    assert!(report.iterations > 1);
    assert_eq!(report.max_violation, max_violation(&cloth, bounds));

    let tol = config.strain_limit_tolerance;
    for f in 0..cloth.mesh.face_count() {
        let face = FaceId(f as u32);
        let x = cloth.mesh.face_nodes(face).map(|n| cloth.mesh.node(n).x);
        let svd = svd_3x2(&deformation_gradient(x[0], x[1], x[2], cloth.mesh.face(face).inv_dm));
        let (hi, lo) = (svd.sigma.x.max(svd.sigma.y), svd.sigma.x.min(svd.sigma.y));
        assert!(hi <= 1.05 + tol, "face {f} stretched to {hi}");
        assert!(lo >= 0.95 - tol, "face {f} compressed to {lo}");
    }
}

#[test]
fn strain_limit_reports_exhausted_budget() {
    let mut cloth = overstretched_grid();
    let config = SolverConfig {
        strain_limit_iterations: 1,
        ..SolverConfig::default()
    };
    let pinned = vec![false; cloth.mesh.node_count()];
    let report = strain_limit(&mut cloth, &pinned, StrainBounds::Material, &config);
    assert_eq!(report.iterations, 1);
    assert!(!report.converged);
    assert!(report.max_violation > config.strain_limit_tolerance);
}

#[test]
fn strain_limit_skips_valid_cloth() {
    let mut cloth = grid_cloth(2, 2);
    let pinned = vec![false; cloth.mesh.node_count()];
    let report = strain_limit(&mut cloth, &pinned, StrainBounds::Material, &SolverConfig::default());
    assert_eq!(report.iterations, 0);
    assert!(report.converged);
}

#[test]
fn strain_limit_keeps_pinned_nodes() {
    let mut cloth = triangle_cloth();
    cloth.mesh.nodes[1].x = DVec3::new(2.0, 0.0, 0.0);
    let pinned = [true, false, false];
    strain_limit(&mut cloth, &pinned, StrainBounds::Uniform(1.0, 1.0), &SolverConfig::default());
    assert_eq!(cloth.mesh.nodes[0].x, DVec3::ZERO);
    assert_relative_eq!(cloth.mesh.nodes[1].x.length(), 1.0, epsilon = 1e-9);
}

#[test]
fn pinned_nodes_from_constraints() {
    let mut cons = ConstraintSet::new();
    cons.push(Constraint::Pin(EqCon::new(NodeRef::cloth(0, 2), DVec3::ZERO, DVec3::X, 1.0)));
    cons.push(Constraint::Pin(EqCon::new(NodeRef::cloth(1, 1), DVec3::ZERO, DVec3::X, 1.0)));
    assert_eq!(pinned_nodes(&cons, 0, 3), vec![false, false, true]);
}

// ─── Plasticity Tests ─────────────────────────────────────────

#[test]
fn flat_cloth_never_yields() {
    let mut cloth = grid_cloth(2, 2);
    cloth.materials[0].update(|p| p.yield_curv = 1.0);
    assert_eq!(plastic_update(&mut cloth), 0);
}

#[test]
fn sharp_fold_yields_and_damages() {
    let mut cloth = grid_cloth(1, 1);
    cloth.materials[0].update(|p| p.yield_curv = 0.1);
    cloth.mesh.nodes[3].x.z = 0.5;
    plait_mesh::normals::compute_ws_data(&mut cloth.mesh);
    assert!(plastic_update(&mut cloth) > 0);
    assert!(cloth.mesh.faces.iter().any(|f| f.damage > 0.0));
    let interior = interior_edges(&cloth.mesh)[0].edge;
    assert!(cloth.mesh.edge(interior).theta_ideal.abs() > 0.0);
}

#[test]
fn reset_plasticity_adopts_current_shape() {
    let mut cloth = grid_cloth(1, 1);
    cloth.mesh.nodes[3].x.z = 0.3;
    plait_mesh::normals::compute_ws_data(&mut cloth.mesh);
    reset_plasticity(&mut cloth);
    for node in &cloth.mesh.nodes {
        assert_eq!(node.y, node.x);
    }
    let interior = interior_edges(&cloth.mesh)[0].edge;
    let e = cloth.mesh.edge(interior);
    assert_eq!(e.theta_ideal, cloth.mesh.dihedral_angle(interior, Space::World));
    assert!(cloth.mesh.faces.iter().all(|f| f.damage == 0.0));
}

// ─── Pop Filter Tests ─────────────────────────────────────────

#[test]
fn pop_filter_leaves_rest_state() {
    let mut cloths = vec![grid_cloth(2, 2)];
    let moved = apply_pop_filter(&mut cloths, &[], 0, &ConstraintSet::new(), &SolverConfig::default()).unwrap();
    assert!(moved < 1e-12);
}

#[test]
fn pop_filter_relaxes_stretch() {
    let mut cloths = vec![grid_cloth(2, 2)];
    cloths[0].mesh.nodes[4].x.x += 0.05;
    let before = internal_energy(&cloths[0], Space::World);
    apply_pop_filter(&mut cloths, &[], 0, &ConstraintSet::new(), &SolverConfig::default()).unwrap();
    assert!(internal_energy(&cloths[0], Space::World) < before);
}
