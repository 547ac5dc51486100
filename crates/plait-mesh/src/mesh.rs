//! Arena mesh: nodes, verts, edges and faces addressed by typed indices.
//!
//! A [`Node`] is a point in world space; a [`Vert`] is its image in one
//! material-space chart (several verts share a node along a seam). Faces
//! reference verts; edges reference nodes. The arenas are the only owners
//! and every entity's `index` equals its position in its arena.

use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use plait_math::{DMat2, DVec2, DVec3};
use plait_types::{EdgeId, FaceId, NodeId, PlaitError, PlaitResult, VertId};
use serde::{Deserialize, Serialize};

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

/// A simulated point mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub label: u32,
    /// World position.
    pub x: DVec3,
    /// Position at the start of the step.
    pub x0: DVec3,
    /// Plastic (rest) embedding.
    pub y: DVec3,
    pub v: DVec3,
    pub acceleration: DVec3,
    /// Area-weighted normal, refreshed by `compute_ws_data`.
    pub n: DVec3,
    pub m: f64,
    /// Material-space area share.
    pub a: f64,
    /// Must survive remeshing unmoved.
    pub preserve: bool,
    pub index: usize,
    pub verts: Vec<VertId>,
    pub adj_edges: Vec<EdgeId>,
}

impl Node {
    /// A node at rest at `x`.
    pub fn at(x: DVec3) -> Self {
        Self {
            label: 0,
            x,
            x0: x,
            y: x,
            v: DVec3::ZERO,
            acceleration: DVec3::ZERO,
            n: DVec3::ZERO,
            m: 0.0,
            a: 0.0,
            preserve: false,
            index: 0,
            verts: Vec::new(),
            adj_edges: Vec::new(),
        }
    }
}

/// A material-space embedding of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vert {
    pub u: DVec2,
    pub label: u32,
    pub node: NodeId,
    pub m: f64,
    pub a: f64,
    pub index: usize,
    pub adj_faces: Vec<FaceId>,
}

impl Vert {
    pub fn new(u: DVec2, node: NodeId) -> Self {
        Self {
            u,
            label: 0,
            node,
            m: 0.0,
            a: 0.0,
            index: 0,
            adj_faces: Vec::new(),
        }
    }
}

/// An edge between two nodes.
///
/// Side 0 is the face that traverses `n[0] → n[1]`; side 1 (if any) the
/// face on the other side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub n: [NodeId; 2],
    pub label: u32,
    pub adj_faces: [Option<FaceId>; 2],
    /// Rest length in material space.
    pub l: f64,
    /// Current dihedral angle.
    pub theta: f64,
    /// Rest dihedral angle, moved by plasticity.
    pub theta_ideal: f64,
    pub damage: f64,
    pub index: usize,
}

impl Edge {
    /// True when only one face is attached.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.adj_faces[0].is_none() || self.adj_faces[1].is_none()
    }

    /// The node across the edge from `node`.
    pub fn other(&self, node: NodeId) -> NodeId {
        if self.n[0] == node {
            self.n[1]
        } else {
            self.n[0]
        }
    }
}

/// A triangle of three verts.
///
/// Edge `i` of a face is opposite vert `i`, running `v[i+1] → v[i+2]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub v: [VertId; 3],
    pub label: u32,
    /// Material-space area.
    pub a: f64,
    pub m: f64,
    pub s_plastic: DMat2,
    pub damage: f64,
    /// Inverse of the material-space edge matrix `[u1-u0, u2-u0]`.
    pub inv_dm: DMat2,
    /// World-space unit normal, refreshed by `compute_ws_data`.
    pub n: DVec3,
    pub adj_edges: [EdgeId; 3],
    pub index: usize,
}

/// Connectivity and per-face state used to build a [`Mesh`].
#[derive(Debug, Clone, PartialEq)]
pub struct FaceSpec {
    pub verts: [usize; 3],
    pub label: u32,
    pub s_plastic: DMat2,
    pub damage: f64,
}

impl FaceSpec {
    pub fn new(verts: [usize; 3]) -> Self {
        Self {
            verts,
            label: 0,
            s_plastic: DMat2::ZERO,
            damage: 0.0,
        }
    }
}

/// A triangle mesh with separate world-space and material-space charts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub nodes: Vec<Node>,
    pub verts: Vec<Vert>,
    pub edges: Vec<Edge>,
    pub faces: Vec<Face>,
    /// Changes whenever topology is rebuilt; caches keyed on it go stale.
    #[serde(default)]
    pub revision: u64,
}

impl Mesh {
    /// Build a mesh from nodes, verts and faces, deriving edges and all
    /// adjacency. Adjacency fields of the inputs are overwritten.
    ///
    /// Errors on out-of-range references, repeated verts within a face and
    /// edges shared by more than two faces.
    pub fn from_parts(
        mut nodes: Vec<Node>,
        mut verts: Vec<Vert>,
        faces: Vec<FaceSpec>,
    ) -> PlaitResult<Self> {
        for (i, node) in nodes.iter_mut().enumerate() {
            node.index = i;
            node.verts.clear();
            node.adj_edges.clear();
        }
        for (i, vert) in verts.iter_mut().enumerate() {
            if vert.node.index() >= nodes.len() {
                return Err(PlaitError::InvalidMesh(format!(
                    "vert {i} references undefined node {}",
                    vert.node.index()
                )));
            }
            vert.index = i;
            vert.adj_faces.clear();
            nodes[vert.node.index()].verts.push(VertId(i as u32));
        }

        let mut edges: Vec<Edge> = Vec::new();
        let mut lookup: HashMap<(NodeId, NodeId), usize> = HashMap::new();
        let mut built: Vec<Face> = Vec::with_capacity(faces.len());

        for (f, spec) in faces.iter().enumerate() {
            let [a, b, c] = spec.verts;
            if a >= verts.len() || b >= verts.len() || c >= verts.len() {
                return Err(PlaitError::InvalidMesh(format!(
                    "face {f} references undefined vert in {:?}",
                    spec.verts
                )));
            }
            let ns = [verts[a].node, verts[b].node, verts[c].node];
            if ns[0] == ns[1] || ns[1] == ns[2] || ns[0] == ns[2] {
                return Err(PlaitError::InvalidMesh(format!(
                    "face {f} repeats a node: {ns:?}"
                )));
            }
            let fid = FaceId(f as u32);
            let mut adj_edges = [EdgeId(0); 3];
            for (i, slot) in adj_edges.iter_mut().enumerate() {
                let n0 = ns[(i + 1) % 3];
                let n1 = ns[(i + 2) % 3];
                let key = if n0 < n1 { (n0, n1) } else { (n1, n0) };
                let e = match lookup.get(&key) {
                    Some(&e) => {
                        let edge = &mut edges[e];
                        let side = if edge.n[0] == n0 && edge.adj_faces[0].is_none() {
                            0
                        } else if edge.adj_faces[1].is_none() {
                            1
                        } else {
                            return Err(PlaitError::InvalidMesh(format!(
                                "edge ({}, {}) has more than two faces",
                                n0.index(),
                                n1.index()
                            )));
                        };
                        edge.adj_faces[side] = Some(fid);
                        e
                    }
                    None => {
                        let e = edges.len();
                        edges.push(Edge {
                            n: [n0, n1],
                            label: 0,
                            adj_faces: [Some(fid), None],
                            l: 0.0,
                            theta: 0.0,
                            theta_ideal: 0.0,
                            damage: 0.0,
                            index: e,
                        });
                        lookup.insert(key, e);
                        nodes[n0.index()].adj_edges.push(EdgeId(e as u32));
                        nodes[n1.index()].adj_edges.push(EdgeId(e as u32));
                        e
                    }
                };
                *slot = EdgeId(e as u32);
            }
            for &v in &spec.verts {
                verts[v].adj_faces.push(fid);
            }
            built.push(Face {
                v: [VertId(a as u32), VertId(b as u32), VertId(c as u32)],
                label: spec.label,
                a: 0.0,
                m: 0.0,
                s_plastic: spec.s_plastic,
                damage: spec.damage,
                inv_dm: DMat2::ZERO,
                n: DVec3::ZERO,
                adj_edges,
                index: f,
            });
        }

        Ok(Self {
            nodes,
            verts,
            edges,
            faces: built,
            revision: NEXT_REVISION.fetch_add(1, Ordering::Relaxed),
        })
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn vert(&self, id: VertId) -> &Vert {
        &self.verts[id.index()]
    }

    #[inline]
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    #[inline]
    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id.index()]
    }

    /// The node behind vert `i` (0..3) of face `f`.
    #[inline]
    pub fn face_node(&self, f: FaceId, i: usize) -> NodeId {
        self.verts[self.faces[f.index()].v[i].index()].node
    }

    /// The three nodes of face `f`.
    #[inline]
    pub fn face_nodes(&self, f: FaceId) -> [NodeId; 3] {
        [self.face_node(f, 0), self.face_node(f, 1), self.face_node(f, 2)]
    }

    /// Material-space coordinates of the three verts of face `f`.
    #[inline]
    pub fn face_uvs(&self, f: FaceId) -> [DVec2; 3] {
        let face = &self.faces[f.index()];
        [
            self.verts[face.v[0].index()].u,
            self.verts[face.v[1].index()].u,
            self.verts[face.v[2].index()].u,
        ]
    }

    /// The edge joining `a` and `b`, if any.
    pub fn find_edge(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.nodes[a.index()]
            .adj_edges
            .iter()
            .copied()
            .find(|&e| self.edges[e.index()].other(a) == b)
    }

    /// The vert of `face` that sits on `node`.
    pub fn face_vert_on(&self, face: FaceId, node: NodeId) -> Option<VertId> {
        self.faces[face.index()]
            .v
            .iter()
            .copied()
            .find(|&v| self.verts[v.index()].node == node)
    }

    /// On side `side` of `edge`: the verts on the edge's two nodes.
    pub fn edge_verts(&self, edge: EdgeId, side: usize) -> Option<[VertId; 2]> {
        let e = &self.edges[edge.index()];
        let f = e.adj_faces[side]?;
        Some([self.face_vert_on(f, e.n[0])?, self.face_vert_on(f, e.n[1])?])
    }

    /// On side `side` of `edge`: the vert opposite the edge.
    pub fn edge_opp_vert(&self, edge: EdgeId, side: usize) -> Option<VertId> {
        let e = &self.edges[edge.index()];
        let f = e.adj_faces[side]?;
        self.faces[f.index()]
            .v
            .iter()
            .copied()
            .find(|&v| {
                let n = self.verts[v.index()].node;
                n != e.n[0] && n != e.n[1]
            })
    }

    /// On side `side` of `edge`: the node opposite the edge.
    pub fn edge_opp_node(&self, edge: EdgeId, side: usize) -> Option<NodeId> {
        self.edge_opp_vert(edge, side)
            .map(|v| self.verts[v.index()].node)
    }

    /// Sum of node masses.
    pub fn total_mass(&self) -> f64 {
        self.nodes.iter().map(|n| n.m).sum()
    }

    /// Copy `x` into `x0` for every node.
    pub fn update_x0(&mut self) {
        for node in &mut self.nodes {
            node.x0 = node.x;
        }
    }

    /// Checks that every entity's `index` matches its arena position and
    /// that every cross-reference is in range.
    pub fn validate(&self) -> PlaitResult<()> {
        let err = |msg: String| Err(PlaitError::InvalidMesh(msg));
        for (i, n) in self.nodes.iter().enumerate() {
            if n.index != i {
                return err(format!("node {i} carries index {}", n.index));
            }
            if n.verts.iter().any(|v| v.index() >= self.verts.len()) {
                return err(format!("node {i} references an undefined vert"));
            }
        }
        for (i, v) in self.verts.iter().enumerate() {
            if v.index != i {
                return err(format!("vert {i} carries index {}", v.index));
            }
            if v.node.index() >= self.nodes.len() {
                return err(format!("vert {i} references undefined node"));
            }
        }
        for (i, e) in self.edges.iter().enumerate() {
            if e.index != i {
                return err(format!("edge {i} carries index {}", e.index));
            }
            if e.n.iter().any(|n| n.index() >= self.nodes.len()) {
                return err(format!("edge {i} references undefined node"));
            }
            if e.adj_faces.iter().flatten().any(|f| f.index() >= self.faces.len()) {
                return err(format!("edge {i} references undefined face"));
            }
        }
        for (i, f) in self.faces.iter().enumerate() {
            if f.index != i {
                return err(format!("face {i} carries index {}", f.index));
            }
            if f.v.iter().any(|v| v.index() >= self.verts.len()) {
                return err(format!("face {i} references undefined vert"));
            }
            if f.adj_edges.iter().any(|e| e.index() >= self.edges.len()) {
                return err(format!("face {i} references undefined edge"));
            }
        }
        Ok(())
    }
}
