//! Derived geometric quantities.
//!
//! Material-space data (face areas, inverse edge matrices, rest lengths,
//! area shares) changes only with topology or UVs; world-space data
//! (normals, dihedral angles) is refreshed after every position update.

use plait_math::{cross2, outer2, DMat2, DVec2, DVec3};
use plait_types::constants::DEGENERATE_AREA_THRESHOLD;
use plait_types::{EdgeId, FaceId, NodeId};

use crate::mesh::Mesh;

/// Which node coordinates to measure geometry in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    /// Current world positions `x`.
    World,
    /// Plastic embedding `y`.
    Plastic,
}

impl Mesh {
    /// Node position in the given space.
    #[inline]
    pub fn pos(&self, node: NodeId, space: Space) -> DVec3 {
        let n = &self.nodes[node.index()];
        match space {
            Space::World => n.x,
            Space::Plastic => n.y,
        }
    }

    /// Unnormalized face normal `(x1-x0) × (x2-x0)` in the given space.
    #[inline]
    pub fn face_cross(&self, f: FaceId, space: Space) -> DVec3 {
        let [a, b, c] = self.face_nodes(f);
        let x0 = self.pos(a, space);
        (self.pos(b, space) - x0).cross(self.pos(c, space) - x0)
    }

    /// Unit face normal in the given space, zero for degenerate faces.
    #[inline]
    pub fn face_normal(&self, f: FaceId, space: Space) -> DVec3 {
        plait_math::normalize_or_zero(self.face_cross(f, space))
    }

    /// Dihedral angle across `edge`, signed by the edge direction.
    /// Boundary edges and degenerate neighbourhoods give zero.
    pub fn dihedral_angle(&self, edge: EdgeId, space: Space) -> f64 {
        let e = &self.edges[edge.index()];
        let (Some(f0), Some(f1)) = (e.adj_faces[0], e.adj_faces[1]) else {
            return 0.0;
        };
        let dir = self.pos(e.n[0], space) - self.pos(e.n[1], space);
        let dir = plait_math::normalize_or_zero(dir);
        let n0 = self.face_normal(f0, space);
        let n1 = self.face_normal(f1, space);
        if dir == DVec3::ZERO || n0 == DVec3::ZERO || n1 == DVec3::ZERO {
            return 0.0;
        }
        let cosine = n0.dot(n1);
        let sine = dir.dot(n0.cross(n1));
        sine.atan2(cosine)
    }

    /// Discrete curvature (second fundamental form) of face `f` in
    /// material coordinates, from the dihedral angles of its edges.
    pub fn curvature(&self, f: FaceId, space: Space) -> DMat2 {
        let face = &self.faces[f.index()];
        if face.a.abs() < DEGENERATE_AREA_THRESHOLD {
            return DMat2::ZERO;
        }
        let u = self.face_uvs(f);
        let mut s = DMat2::ZERO;
        for (i, &edge) in face.adj_edges.iter().enumerate() {
            let e_mat = u[(i + 2) % 3] - u[(i + 1) % 3];
            let len = e_mat.length();
            if len == 0.0 {
                continue;
            }
            let t_mat = (e_mat / len).perp();
            let theta = self.dihedral_angle(edge, space);
            s -= outer2(t_mat, t_mat) * (0.5 * theta * len);
        }
        s * (1.0 / face.a)
    }

    /// Recompute all material-space data: face areas and inverse edge
    /// matrices, rest edge lengths, and node/vert area shares.
    pub fn compute_ms_data(&mut self) {
        for f in 0..self.faces.len() {
            let [u0, u1, u2] = self.face_uvs(FaceId(f as u32));
            let dm = DMat2::from_cols(u1 - u0, u2 - u0);
            let a = 0.5 * dm.determinant();
            let face = &mut self.faces[f];
            face.a = a;
            face.inv_dm = if a.abs() > DEGENERATE_AREA_THRESHOLD {
                dm.inverse()
            } else {
                DMat2::ZERO
            };
        }

        for e in 0..self.edges.len() {
            let id = EdgeId(e as u32);
            let mut total = 0.0;
            let mut sides = 0;
            for side in 0..2 {
                if let Some([v0, v1]) = self.edge_verts(id, side) {
                    total += (self.verts[v1.index()].u - self.verts[v0.index()].u).length();
                    sides += 1;
                }
            }
            self.edges[e].l = if sides > 0 { total / sides as f64 } else { 0.0 };
        }

        for v in &mut self.verts {
            v.a = 0.0;
        }
        for n in &mut self.nodes {
            n.a = 0.0;
        }
        for f in 0..self.faces.len() {
            let share = self.faces[f].a / 3.0;
            for i in 0..3 {
                let v = self.faces[f].v[i].index();
                self.verts[v].a += share;
                let n = self.verts[v].node.index();
                self.nodes[n].a += share;
            }
        }
    }

    /// Barycentric coordinates of material point `u` in face `f`.
    pub fn material_barycentric(&self, f: FaceId, u: DVec2) -> DVec3 {
        let [u0, u1, u2] = self.face_uvs(f);
        let d = cross2(u1 - u0, u2 - u0);
        if d.abs() < DEGENERATE_AREA_THRESHOLD {
            return DVec3::new(1.0, 0.0, 0.0);
        }
        let b1 = cross2(u - u0, u2 - u0) / d;
        let b2 = cross2(u1 - u0, u - u0) / d;
        DVec3::new(1.0 - b1 - b2, b1, b2)
    }

    /// Material-space centroid of face `f`.
    pub fn material_centroid(&self, f: FaceId) -> DVec2 {
        let [u0, u1, u2] = self.face_uvs(f);
        (u0 + u1 + u2) / 3.0
    }

    /// The face whose material-space triangle best contains `u`: the one
    /// maximizing its smallest barycentric coordinate.
    pub fn enclosing_face(&self, u: DVec2) -> Option<FaceId> {
        (0..self.faces.len())
            .map(|f| {
                let id = FaceId(f as u32);
                (id, self.material_barycentric(id, u).min_element())
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Point of face `f` with barycentric weights `b`, in the given space.
    pub fn interpolate(&self, f: FaceId, b: DVec3, space: Space) -> DVec3 {
        let [n0, n1, n2] = self.face_nodes(f);
        b.x * self.pos(n0, space) + b.y * self.pos(n1, space) + b.z * self.pos(n2, space)
    }
}
