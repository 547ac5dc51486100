//! Editable mesh used between rebuilds.
//!
//! Local operations append or retire entries in flat lists; `compact`
//! drops the retired ones and renumbers, after which `to_mesh` rebuilds
//! the arena with all adjacency. Between a `to_mesh` and the next edit
//! the list indices equal the rebuilt mesh's ids.

use hashbrown::HashMap;
use plait_math::DMat2;
use plait_mesh::normals::compute_ws_data;
use plait_mesh::{FaceSpec, Mesh, Node, Vert};
use plait_types::{NodeId, PlaitResult};

/// Sorted node pair keying an edge label.
pub(crate) fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

pub(crate) struct WorkMesh {
    pub nodes: Vec<Node>,
    pub verts: Vec<Vert>,
    pub faces: Vec<FaceSpec>,
    /// Sizing tensor per vert, carried through edits.
    pub sizing: Vec<DMat2>,
    /// Index in the input mesh, or `None` for nodes created by a split.
    pub origin: Vec<Option<usize>>,
    pub node_alive: Vec<bool>,
    pub vert_alive: Vec<bool>,
    pub face_alive: Vec<bool>,
    /// Nonzero edge labels.
    pub edge_labels: HashMap<(usize, usize), u32>,
}

impl WorkMesh {
    pub fn from_mesh(mesh: &Mesh, sizing: Vec<DMat2>) -> Self {
        let faces: Vec<FaceSpec> = mesh
            .faces
            .iter()
            .map(|f| FaceSpec {
                verts: f.v.map(|v| v.index()),
                label: f.label,
                s_plastic: f.s_plastic,
                damage: f.damage,
            })
            .collect();
        let edge_labels = mesh
            .edges
            .iter()
            .filter(|e| e.label != 0)
            .map(|e| (edge_key(e.n[0].index(), e.n[1].index()), e.label))
            .collect();
        Self {
            nodes: mesh.nodes.clone(),
            verts: mesh.verts.clone(),
            node_alive: vec![true; mesh.nodes.len()],
            vert_alive: vec![true; mesh.verts.len()],
            face_alive: vec![true; faces.len()],
            origin: (0..mesh.nodes.len()).map(Some).collect(),
            faces,
            sizing,
            edge_labels,
        }
    }

    pub fn push_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.node_alive.push(true);
        self.origin.push(None);
        self.nodes.len() - 1
    }

    pub fn push_vert(&mut self, vert: Vert, sizing: DMat2) -> usize {
        self.verts.push(vert);
        self.vert_alive.push(true);
        self.sizing.push(sizing);
        self.verts.len() - 1
    }

    pub fn push_face(&mut self, face: FaceSpec) -> usize {
        self.faces.push(face);
        self.face_alive.push(true);
        self.faces.len() - 1
    }

    /// Drop retired entries and renumber every reference.
    pub fn compact(&mut self) {
        let mut node_map = vec![usize::MAX; self.nodes.len()];
        let mut next = 0;
        for (i, alive) in self.node_alive.iter().enumerate() {
            if *alive {
                node_map[i] = next;
                next += 1;
            }
        }
        let mut vert_map = vec![usize::MAX; self.verts.len()];
        next = 0;
        for (i, alive) in self.vert_alive.iter().enumerate() {
            if *alive {
                vert_map[i] = next;
                next += 1;
            }
        }

        let nodes = std::mem::take(&mut self.nodes);
        let origin = std::mem::take(&mut self.origin);
        for ((node, origin), alive) in nodes.into_iter().zip(origin).zip(&self.node_alive) {
            if *alive {
                self.nodes.push(node);
                self.origin.push(origin);
            }
        }
        let verts = std::mem::take(&mut self.verts);
        let sizing = std::mem::take(&mut self.sizing);
        for ((mut vert, s), alive) in verts.into_iter().zip(sizing).zip(&self.vert_alive) {
            if *alive {
                vert.node = NodeId(node_map[vert.node.index()] as u32);
                self.verts.push(vert);
                self.sizing.push(s);
            }
        }
        let faces = std::mem::take(&mut self.faces);
        for (mut face, alive) in faces.into_iter().zip(&self.face_alive) {
            if *alive {
                face.verts = face.verts.map(|v| vert_map[v]);
                self.faces.push(face);
            }
        }
        self.edge_labels = std::mem::take(&mut self.edge_labels)
            .into_iter()
            .filter_map(|((a, b), label)| {
                let (a, b) = (node_map[a], node_map[b]);
                (a != usize::MAX && b != usize::MAX).then(|| (edge_key(a, b), label))
            })
            .collect();
        self.node_alive = vec![true; self.nodes.len()];
        self.vert_alive = vec![true; self.verts.len()];
        self.face_alive = vec![true; self.faces.len()];
    }

    /// Rebuild a mesh from the (compacted) lists with material and world
    /// data refreshed.
    pub fn to_mesh(&self) -> PlaitResult<Mesh> {
        let mut mesh = Mesh::from_parts(self.nodes.clone(), self.verts.clone(), self.faces.clone())?;
        for edge in &mut mesh.edges {
            if let Some(&label) = self
                .edge_labels
                .get(&edge_key(edge.n[0].index(), edge.n[1].index()))
            {
                edge.label = label;
            }
        }
        mesh.compute_ms_data();
        compute_ws_data(&mut mesh);
        Ok(mesh)
    }
}
