//! Bending plasticity.
//!
//! Each face stores a plastic curvature `S_plastic` and a scalar damage.
//! When the elastic part of the current curvature exceeds the material's
//! yield curvature, the excess becomes plastic and the face accumulates
//! damage; edges then take their rest angle and damage from the adjacent
//! faces. The plastic embedding `y` is a node configuration whose
//! curvature matches the plastic state.

use plait_math::sparse::BlockSystem;
use plait_math::{norm_f2, DMat3, DVec3};
use plait_mesh::{Mesh, Space};
use plait_types::{EdgeId, FaceId, PlaitResult};
use tracing::debug;

use crate::assembly::add_internal_forces;
use crate::cloth::Cloth;
use crate::config::SolverConfig;
use crate::implicit::solve_blocks;

/// Rest angle and damage of `edge` implied by its faces' plastic state.
pub fn edge_plasticity(mesh: &Mesh, edge: EdgeId) -> (f64, f64) {
    let e = mesh.edge(edge);
    if e.l <= 0.0 {
        return (0.0, 0.0);
    }
    let mut bend = 0.0;
    let mut damage = 0.0;
    let mut area = 0.0;
    let mut sides = 0.0;
    for side in 0..2 {
        let (Some(f), Some([v0, v1])) = (e.adj_faces[side], mesh.edge_verts(edge, side)) else {
            continue;
        };
        let face = mesh.face(f);
        let e_mat = mesh.vert(v1).u - mesh.vert(v0).u;
        let t_mat = e_mat.normalize_or_zero().perp();
        bend += t_mat.dot(face.s_plastic * t_mat);
        damage += face.damage;
        area += face.a;
        sides += 1.0;
    }
    if sides == 0.0 {
        return (0.0, 0.0);
    }
    (-area * (bend / sides) / e.l, damage / sides)
}

/// Refresh every edge's `theta_ideal` and `damage` from its faces.
pub fn recompute_edge_plasticity(mesh: &mut Mesh) {
    for e in 0..mesh.edge_count() {
        let (theta, damage) = edge_plasticity(mesh, EdgeId(e as u32));
        mesh.edges[e].theta_ideal = theta;
        mesh.edges[e].damage = damage;
    }
}

/// Move curvature beyond the yield threshold into the plastic state.
/// Returns the number of faces that yielded.
pub fn plastic_update(cloth: &mut Cloth) -> usize {
    let mut yielded = 0;
    for f in 0..cloth.mesh.face_count() {
        let id = FaceId(f as u32);
        let s_yield = cloth.material(cloth.mesh.face(id).label).properties().yield_curv;
        let s_total = cloth.mesh.curvature(id, Space::World);
        let face = &mut cloth.mesh.faces[f];
        let s_elastic = s_total - face.s_plastic;
        let ds = norm_f2(s_elastic);
        if ds > s_yield {
            face.s_plastic += s_elastic * ((ds - s_yield) / ds);
            face.damage += ds / s_yield - 1.0;
            yielded += 1;
        }
    }
    recompute_edge_plasticity(&mut cloth.mesh);
    if yielded > 0 {
        debug!(yielded, "plastic update");
    }
    yielded
}

/// Make the current shape the plastic rest shape and clear all damage.
pub fn reset_plasticity(cloth: &mut Cloth) {
    let mesh = &mut cloth.mesh;
    for node in &mut mesh.nodes {
        node.y = node.x;
    }
    for f in 0..mesh.face_count() {
        let s = mesh.curvature(FaceId(f as u32), Space::World);
        mesh.faces[f].s_plastic = s;
        mesh.faces[f].damage = 0.0;
    }
    for e in 0..mesh.edge_count() {
        let theta = mesh.dihedral_angle(EdgeId(e as u32), Space::World);
        mesh.edges[e].theta_ideal = theta;
        mesh.edges[e].damage = 0.0;
    }
}

/// Relax the plastic embedding `y` toward a minimum of the internal
/// energy measured in plastic space, by regularized static Newton steps.
pub fn optimize_plastic_embedding(cloth: &mut Cloth, config: &SolverConfig) -> PlaitResult<()> {
    cloth.prepare_bending();
    let nn = cloth.mesh.node_count();
    if nn == 0 {
        return Ok(());
    }
    for _ in 0..config.plastic_embedding_iterations {
        let mut system = BlockSystem::new(nn);
        for (n, node) in cloth.mesh.nodes.iter().enumerate() {
            let reg = config.pop_filter_regularization * node.m;
            system.add_block(n, n, DMat3::from_diagonal(DVec3::splat(reg)));
        }
        add_internal_forces(cloth, &mut system, 0.0, Space::Plastic, config.parallel_assembly);
        let (dy, _) = solve_blocks(&system)?;
        for (node, d) in cloth.mesh.nodes.iter_mut().zip(dy) {
            node.y += d;
        }
    }
    Ok(())
}
