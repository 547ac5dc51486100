//! Proximity constraint synthesis.
//!
//! Near contacts become [`IneqCon`] penalties for the next implicit step
//! instead of being resolved geometrically. Every cloth node is paired
//! with the nearest face within the proximity distance (obstacle faces,
//! and cloth faces when self collision is on); every obstacle node is
//! paired with the nearest cloth face, so sharp obstacle features are
//! caught too.

use plait_mesh::Mesh;
use plait_solver::constraint::{Constraint, ConstraintSet, IneqCon};
use plait_solver::{MeshSet, SolverConfig};
use plait_types::{MeshRef, NodeId, NodeRef};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::broad::BroadPhase;
use crate::config::ContactConfig;
use crate::narrow::{point_face_contact, FaceContact};
use crate::spatial_hash::SpatialHash;

/// Coulomb coefficients for cloth–cloth and cloth–obstacle contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Friction {
    pub cloth: f64,
    pub obstacle: f64,
}

impl Default for Friction {
    fn default() -> Self {
        Self {
            cloth: 0.6,
            obstacle: 0.3,
        }
    }
}

/// A mesh with its face hash, addressed by [`MeshRef`].
pub(crate) struct Target<'a> {
    pub mesh_ref: MeshRef,
    pub mesh: &'a Mesh,
    pub hash: SpatialHash,
}

pub(crate) fn targets<'a>(meshes: &MeshSet<'a>, cloths: bool, obstacles: bool) -> Vec<Target<'a>> {
    let mut out = Vec::new();
    if cloths {
        for (i, &mesh) in meshes.cloths().iter().enumerate() {
            out.push(Target {
                mesh_ref: MeshRef::Cloth(i as u32),
                mesh,
                hash: SpatialHash::for_mesh(mesh),
            });
        }
    }
    if obstacles {
        for (i, &mesh) in meshes.obstacles().iter().enumerate() {
            out.push(Target {
                mesh_ref: MeshRef::Obstacle(i as u32),
                mesh,
                hash: SpatialHash::for_mesh(mesh),
            });
        }
    }
    out
}

/// Nearest face of any target to node `node` of mesh `owner`, skipping
/// faces incident to the node itself.
pub(crate) fn nearest_face(
    owner: MeshRef,
    mesh: &Mesh,
    node: NodeId,
    targets: &[Target<'_>],
    radius: f64,
) -> Option<(MeshRef, FaceContact)> {
    let n = mesh.node(node);
    let mut best: Option<(MeshRef, FaceContact)> = None;
    for target in targets {
        for f in target.hash.query(n.x, radius) {
            let face_nodes = target.mesh.face_nodes(f);
            if target.mesh_ref == owner && face_nodes.contains(&node) {
                continue;
            }
            let prev = face_nodes.map(|fnode| target.mesh.node(fnode).x0);
            let Some(contact) = point_face_contact(n.x, Some((n.x0, prev)), node, target.mesh, f, radius)
            else {
                continue;
            };
            let closer = best
                .as_ref()
                .map_or(true, |(_, b)| contact.distance.abs() < b.distance.abs());
            if closer {
                best = Some((target.mesh_ref, contact));
            }
        }
    }
    best
}

fn make_constraint(
    owner: MeshRef,
    mesh: &Mesh,
    target: MeshRef,
    target_mesh: &Mesh,
    contact: &FaceContact,
    friction: Friction,
    solver: &SolverConfig,
) -> Constraint {
    let node_free = owner.is_cloth();
    let face_free = target.is_cloth();
    let mut area = f64::INFINITY;
    if node_free {
        area = area.min(mesh.node(contact.node).a);
    }
    if face_free {
        area = area.min(target_mesh.face(contact.face).a);
    }
    if !area.is_finite() {
        area = 0.0;
    }
    let mu = if node_free && face_free {
        friction.cloth
    } else {
        friction.obstacle
    };
    let [f0, f1, f2] = contact.face_nodes;
    let [b0, b1, b2] = contact.weights;
    Constraint::Proximity(IneqCon {
        nodes: [
            NodeRef::new(owner, contact.node),
            NodeRef::new(target, f0),
            NodeRef::new(target, f1),
            NodeRef::new(target, f2),
        ],
        w: [1.0, -b0, -b1, -b2],
        free: [node_free, face_free, face_free, face_free],
        n: contact.normal,
        mu,
        stiff: solver.collision_stiffness * area,
        thickness: solver.contact_thickness(),
    })
}

/// Proximity constraints between all cloth and obstacle meshes.
pub fn proximity_constraints(
    meshes: &MeshSet<'_>,
    friction: Friction,
    solver: &SolverConfig,
    contact: &ContactConfig,
) -> ConstraintSet {
    let radius = solver.proximity_distance();
    let cloth_targets = targets(meshes, true, false);
    let node_targets = targets(meshes, contact.self_collision, true);

    let mut cons = ConstraintSet::new();
    for (c, &mesh) in meshes.cloths().iter().enumerate() {
        let owner = MeshRef::Cloth(c as u32);
        let found: Vec<Constraint> = (0..mesh.node_count())
            .into_par_iter()
            .filter_map(|n| {
                let (target, hit) = nearest_face(owner, mesh, NodeId(n as u32), &node_targets, radius)?;
                let target_mesh = meshes.mesh(target);
                Some(make_constraint(owner, mesh, target, target_mesh, &hit, friction, solver))
            })
            .collect();
        cons.extend(found);
    }
    for (o, &mesh) in meshes.obstacles().iter().enumerate() {
        let owner = MeshRef::Obstacle(o as u32);
        let found: Vec<Constraint> = (0..mesh.node_count())
            .into_par_iter()
            .filter_map(|n| {
                let (target, hit) = nearest_face(owner, mesh, NodeId(n as u32), &cloth_targets, radius)?;
                let target_mesh = meshes.mesh(target);
                Some(make_constraint(owner, mesh, target, target_mesh, &hit, friction, solver))
            })
            .collect();
        cons.extend(found);
    }
    debug!(count = cons.len(), radius, "proximity constraints");
    cons
}
