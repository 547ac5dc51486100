//! Separation after remeshing.
//!
//! Remeshing can place new cloth nodes on the wrong side of an obstacle
//! (a split midpoint cutting a corner, a collapse pulling a node across a
//! thin feature). Each node of the new mesh is located in the old mesh
//! through its material coordinates; the old surface point says which
//! side of every nearby obstacle face the node belongs on, and nodes that
//! ended on the other side, or within the thickness, are pushed back.

use plait_math::DVec3;
use plait_mesh::normals::compute_ws_data;
use plait_mesh::{Mesh, Space};
use plait_types::NodeId;
use tracing::debug;

use crate::broad::BroadPhase;
use crate::config::ContactConfig;
use crate::narrow::point_face_contact;
use crate::spatial_hash::SpatialHash;

/// Where a node of the new mesh sat on the old surface.
fn old_position(mesh: &Mesh, old: &Mesh, node: NodeId) -> Option<DVec3> {
    let vert = mesh.node(node).verts.first().copied()?;
    let u = mesh.vert(vert).u;
    let face = old.enclosing_face(u)?;
    let b = old.material_barycentric(face, u);
    Some(old.interpolate(face, b, Space::World))
}

/// Push nodes of each remeshed cloth back to the side of the obstacles
/// they occupied before remeshing. `old` holds the pre-remesh copy of
/// each cloth, in the same order. Returns the number of nodes moved.
pub fn separate(
    cloths: &mut [&mut Mesh],
    old: &[&Mesh],
    obstacles: &[&Mesh],
    config: &ContactConfig,
) -> usize {
    let hashes: Vec<SpatialHash> = obstacles.iter().map(|m| SpatialHash::for_mesh(m)).collect();
    let mut moved = 0;
    for (mesh, &old_mesh) in cloths.iter_mut().zip(old) {
        let mut changed = false;
        for n in 0..mesh.node_count() {
            let id = NodeId(n as u32);
            let Some(x_old) = old_position(mesh, old_mesh, id) else {
                continue;
            };
            let mut pushed = false;
            for _ in 0..config.max_iterations {
                let x = mesh.node(id).x;
                let radius = config.thickness + (x - x_old).length();
                let mut worst: Option<(f64, DVec3)> = None;
                for (obstacle, hash) in obstacles.iter().zip(&hashes) {
                    for f in hash.query(x, radius) {
                        let prev = obstacle.face_nodes(f).map(|fn_| obstacle.node(fn_).x);
                        let Some(contact) =
                            point_face_contact(x, Some((x_old, prev)), id, obstacle, f, radius)
                        else {
                            continue;
                        };
                        let depth = contact.penetration_depth(config.thickness);
                        if depth > 0.0 && worst.map_or(true, |(d, _)| depth > d) {
                            worst = Some((depth, contact.normal));
                        }
                    }
                }
                let Some((depth, normal)) = worst else {
                    break;
                };
                mesh.nodes[n].x += depth * normal;
                pushed = true;
            }
            if pushed {
                changed = true;
                moved += 1;
            }
        }
        if changed {
            compute_ws_data(mesh);
        }
    }
    debug!(moved, "separation");
    moved
}
