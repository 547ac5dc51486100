//! Collision response.
//!
//! Discrete node–face resolution. Each sweep finds, for every cloth node,
//! the nearest face it has crossed or come closer than the thickness to,
//! measured against the side the node was on at `x0`. The violation is
//! split between the free nodes by inverse mass, the corrections of one
//! sweep are averaged per node and applied together, and sweeps repeat
//! until nothing is in contact. Nodes held by pins never move.
//!
//! The pass ends by taking the result as the new previous positions
//! (`x0 = x`) of every cloth and obstacle mesh.

use hashbrown::HashMap;
use plait_math::DVec3;
use plait_mesh::normals::compute_ws_data;
use plait_mesh::Mesh;
use plait_solver::strain_limit::pinned_nodes;
use plait_solver::{ConstraintSet, MeshSet};
use plait_types::{MeshRef, NodeId, NodeRef};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::ContactConfig;
use crate::narrow::FaceContact;
use crate::proximity::{nearest_face, targets};

/// Result of collision response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionReport {
    /// Sweeps run.
    pub iterations: u32,
    /// Contacts corrected over all sweeps.
    pub resolved_count: usize,
    /// Largest violation found by the last sweep.
    pub max_residual_penetration: f64,
}

/// Per-node position corrections of one contact.
fn correction(
    owner: MeshRef,
    contact: &FaceContact,
    target: MeshRef,
    meshes: &MeshSet<'_>,
    pinned: &[Vec<bool>],
    depth: f64,
) -> Vec<(NodeRef, DVec3)> {
    let refs = [
        NodeRef::new(owner, contact.node),
        NodeRef::new(target, contact.face_nodes[0]),
        NodeRef::new(target, contact.face_nodes[1]),
        NodeRef::new(target, contact.face_nodes[2]),
    ];
    let w = [
        1.0,
        -contact.weights[0],
        -contact.weights[1],
        -contact.weights[2],
    ];
    let movable = |r: NodeRef| -> Option<f64> {
        let MeshRef::Cloth(c) = r.mesh else {
            return None;
        };
        if pinned[c as usize][r.node.index()] {
            return None;
        }
        let m = meshes.node(r).m;
        (m > 0.0).then_some(m)
    };
    let masses = refs.map(movable);
    let inv_mass: f64 = (0..4)
        .filter_map(|i| masses[i].map(|m| w[i] * w[i] / m))
        .sum();
    if inv_mass <= 0.0 {
        return Vec::new();
    }
    (0..4)
        .filter_map(|i| {
            let m = masses[i]?;
            Some((refs[i], (w[i] / m) / inv_mass * depth * contact.normal))
        })
        .collect()
}

/// Resolve penetrations of cloth nodes through obstacle faces (and
/// through cloth faces when self collision is enabled).
pub fn collision_response(
    cloths: &mut [&mut Mesh],
    obstacles: &mut [&mut Mesh],
    cons: &ConstraintSet,
    config: &ContactConfig,
) -> CollisionReport {
    let pinned: Vec<Vec<bool>> = cloths
        .iter()
        .enumerate()
        .map(|(c, mesh)| pinned_nodes(cons, c, mesh.node_count()))
        .collect();
    let mut report = CollisionReport::default();

    for iteration in 0..config.max_iterations {
        let corrections = {
            let cv: Vec<&Mesh> = cloths.iter().map(|m| &**m).collect();
            let ov: Vec<&Mesh> = obstacles.iter().map(|m| &**m).collect();
            let meshes = MeshSet::new(&cv, &ov);
            let faces = targets(&meshes, config.self_collision, true);

            let mut contacts = Vec::new();
            for (c, &mesh) in cv.iter().enumerate() {
                let owner = MeshRef::Cloth(c as u32);
                let found: Vec<(MeshRef, FaceContact, f64)> = (0..mesh.node_count())
                    .into_par_iter()
                    .filter_map(|n| {
                        let node = mesh.node(NodeId(n as u32));
                        let radius = config.thickness + (node.x - node.x0).length();
                        let (target, hit) = nearest_face(owner, mesh, NodeId(n as u32), &faces, radius)?;
                        let depth = hit.penetration_depth(config.thickness);
                        (depth > 0.0).then_some((target, hit, depth))
                    })
                    .collect();
                contacts.extend(found.into_iter().map(|(t, hit, d)| (owner, t, hit, d)));
            }

            report.iterations = iteration + 1;
            report.max_residual_penetration = contacts.iter().map(|c| c.3).fold(0.0, f64::max);
            report.resolved_count += contacts.len();

            let mut sum: HashMap<NodeRef, (DVec3, u32)> = HashMap::new();
            for (owner, target, hit, depth) in &contacts {
                for (r, dx) in correction(*owner, hit, *target, &meshes, &pinned, *depth) {
                    let entry = sum.entry(r).or_insert((DVec3::ZERO, 0));
                    entry.0 += dx;
                    entry.1 += 1;
                }
            }
            sum
        };
        if corrections.is_empty() {
            break;
        }
        for (r, (dx, count)) in corrections {
            if let MeshRef::Cloth(c) = r.mesh {
                cloths[c as usize].nodes[r.node.index()].x += dx / count as f64;
            }
        }
        if iteration + 1 == config.max_iterations {
            warn!(
                iterations = config.max_iterations,
                residual = report.max_residual_penetration,
                "collision response hit its sweep limit"
            );
        }
    }

    for mesh in cloths.iter_mut() {
        compute_ws_data(mesh);
        mesh.update_x0();
    }
    for mesh in obstacles.iter_mut() {
        mesh.update_x0();
    }
    debug!(
        iterations = report.iterations,
        resolved = report.resolved_count,
        "collision response"
    );
    report
}
