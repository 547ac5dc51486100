//! World-space refresh: face normals, node normals and dihedral angles.

use plait_types::{EdgeId, FaceId};

use crate::geometry::Space;
use crate::mesh::Mesh;

/// Recompute face normals, area-weighted node normals and the current
/// dihedral angle of every edge from world positions.
pub fn compute_ws_data(mesh: &mut Mesh) {
    for node in &mut mesh.nodes {
        node.n = plait_math::DVec3::ZERO;
    }

    for f in 0..mesh.faces.len() {
        let id = FaceId(f as u32);
        let cross = mesh.face_cross(id, Space::World);
        mesh.faces[f].n = plait_math::normalize_or_zero(cross);
        // Magnitude is twice the area: accumulate as the area weight.
        for node in mesh.face_nodes(id) {
            mesh.nodes[node.index()].n += cross;
        }
    }

    for node in &mut mesh.nodes {
        node.n = plait_math::normalize_or_zero(node.n);
    }

    for e in 0..mesh.edges.len() {
        mesh.edges[e].theta = mesh.dihedral_angle(EdgeId(e as u32), Space::World);
    }
}
