//! Mesh topology queries.
//!
//! Adjacency questions the solver, contact and remeshing passes ask of a
//! [`Mesh`]: interior edges with their wing nodes (bending stencils),
//! boundary and seam detection, node rings.

use hashbrown::HashSet;
use plait_types::{EdgeId, FaceId, NodeId};

use crate::mesh::Mesh;

/// An interior edge with its two adjacent faces.
///
/// The bending stencil is `[n0, n1, wing0, wing1]`; face 0 traverses
/// `n0 → n1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteriorEdge {
    pub edge: EdgeId,
    pub n0: NodeId,
    pub n1: NodeId,
    /// Node of face 0 not on the edge.
    pub wing0: NodeId,
    /// Node of face 1 not on the edge.
    pub wing1: NodeId,
    pub face0: FaceId,
    pub face1: FaceId,
}

impl InteriorEdge {
    /// The four stencil nodes in force order.
    #[inline]
    pub fn nodes(&self) -> [NodeId; 4] {
        [self.n0, self.n1, self.wing0, self.wing1]
    }
}

/// All edges with two adjacent faces, in edge order.
pub fn interior_edges(mesh: &Mesh) -> Vec<InteriorEdge> {
    (0..mesh.edges.len())
        .filter_map(|e| interior_edge(mesh, EdgeId(e as u32)))
        .collect()
}

/// The bending stencil of `edge`, or `None` on the boundary.
pub fn interior_edge(mesh: &Mesh, edge: EdgeId) -> Option<InteriorEdge> {
    let e = &mesh.edges[edge.index()];
    let (face0, face1) = (e.adj_faces[0]?, e.adj_faces[1]?);
    Some(InteriorEdge {
        edge,
        n0: e.n[0],
        n1: e.n[1],
        wing0: mesh.edge_opp_node(edge, 0)?,
        wing1: mesh.edge_opp_node(edge, 1)?,
        face0,
        face1,
    })
}

/// True when any edge at `node` is a boundary edge.
pub fn is_boundary_node(mesh: &Mesh, node: NodeId) -> bool {
    mesh.nodes[node.index()]
        .adj_edges
        .iter()
        .any(|e| mesh.edges[e.index()].is_boundary())
}

/// True when the node sits on the boundary or on a UV seam (several verts).
pub fn is_seam_or_boundary(mesh: &Mesh, node: NodeId) -> bool {
    mesh.nodes[node.index()].verts.len() > 1 || is_boundary_node(mesh, node)
}

/// True when the edge is a boundary or its two sides use different verts.
pub fn is_seam_or_boundary_edge(mesh: &Mesh, edge: EdgeId) -> bool {
    if mesh.edges[edge.index()].is_boundary() {
        return true;
    }
    mesh.edge_verts(edge, 0) != mesh.edge_verts(edge, 1)
}

/// Number of edges with a single adjacent face.
pub fn boundary_edge_count(mesh: &Mesh) -> usize {
    mesh.edges.iter().filter(|e| e.is_boundary()).count()
}

/// Returns true if the mesh is closed (no boundary edges).
pub fn is_closed(mesh: &Mesh) -> bool {
    boundary_edge_count(mesh) == 0
}

/// Nodes connected to `node` by an edge.
pub fn one_ring(mesh: &Mesh, node: NodeId) -> HashSet<NodeId> {
    mesh.nodes[node.index()]
        .adj_edges
        .iter()
        .map(|e| mesh.edges[e.index()].other(node))
        .collect()
}

/// Faces incident to `node` through any of its verts.
pub fn node_faces(mesh: &Mesh, node: NodeId) -> Vec<FaceId> {
    let mut faces: Vec<FaceId> = mesh.nodes[node.index()]
        .verts
        .iter()
        .flat_map(|v| mesh.verts[v.index()].adj_faces.iter().copied())
        .collect();
    faces.sort_unstable();
    faces.dedup();
    faces
}

/// Flag boundary, seam and labelled nodes (and the ends of labelled edges)
/// as `preserve`, so that remeshing keeps them in place.
pub fn mark_nodes_to_preserve(mesh: &mut Mesh) {
    for n in 0..mesh.nodes.len() {
        let id = NodeId(n as u32);
        if is_seam_or_boundary(mesh, id) || mesh.nodes[n].label != 0 {
            mesh.nodes[n].preserve = true;
        }
    }
    for e in 0..mesh.edges.len() {
        if mesh.edges[e].label != 0 {
            let [a, b] = mesh.edges[e].n;
            mesh.nodes[a.index()].preserve = true;
            mesh.nodes[b.index()].preserve = true;
        }
    }
}
