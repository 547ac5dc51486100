//! Quadratic (discrete-shell) bending.
//!
//! ## Energy
//!
//! For an interior edge with stencil `[x0, x1, x2, x3]` the energy is
//!
//! ```text
//! E = bs/2 · xᵀ H x,     H = 6/(a0 + a1) · KᵀK,     K = [c0 I, c1 I, c2 I, c3 I]
//! ```
//!
//! with cotangent weights of the four angles at the edge endpoints:
//!
//! ```text
//! c0 = cot(-e0, e3) + cot(-e0, e4)      e0 = x1 − x0   e3 = x2 − x1
//! c1 = cot(e0, e1) + cot(e0, e2)        e1 = x2 − x0   e4 = x3 − x1
//! c2 = −cot(e0, e1) − cot(-e0, e3)      e2 = x3 − x0
//! c3 = −cot(e0, e2) − cot(-e0, e4)
//! ```
//!
//! `H` depends only on the geometry at the time it is first built, so it
//! is cached per edge and rebuilt when the mesh revision changes.

use plait_math::element::{kron_outer_i3, stack, Mat12, Vec12};
use plait_math::DVec3;
use plait_mesh::{InteriorEdge, Mesh, Space};
use plait_types::constants::EPSILON;

use crate::bending::BendingStrategy;
use crate::cloth::Cloth;

/// Cotangent of the angle between `v0` and `v1`, with the sine clamped
/// away from zero.
pub fn cot(v0: DVec3, v1: DVec3) -> f64 {
    let denom = v0.cross(v1).length().max(EPSILON);
    v0.dot(v1) / denom
}

/// The rest Hessian `6/(a0 + a1) · KᵀK` of one edge, at unit stiffness.
pub fn edge_hessian(mesh: &Mesh, stencil: &InteriorEdge, space: Space) -> Mat12 {
    let [x0, x1, x2, x3] = stencil.nodes().map(|n| mesh.pos(n, space));
    let e0 = x1 - x0;
    let e1 = x2 - x0;
    let e2 = x3 - x0;
    let e3 = x2 - x1;
    let e4 = x3 - x1;
    let c01 = cot(e0, e1);
    let c02 = cot(e0, e2);
    let c03 = cot(-e0, e3);
    let c04 = cot(-e0, e4);
    let coef = [c03 + c04, c01 + c02, -c01 - c03, -c02 - c04];

    let area = mesh.face(stencil.face0).a + mesh.face(stencil.face1).a;
    if area <= 0.0 {
        return Mat12::zeros();
    }
    kron_outer_i3::<12>(&coef, &coef) * (6.0 / area)
}

/// Quadratic bending with a per-edge Hessian cache.
#[derive(Debug, Clone, Default)]
pub struct QuadraticBending {
    revision: Option<u64>,
    hessians: Vec<Option<Mat12>>,
}

impl QuadraticBending {
    /// Rebuild the cache if the mesh topology changed since the last call.
    pub fn prepare(&mut self, mesh: &Mesh) {
        if self.revision == Some(mesh.revision) && self.hessians.len() == mesh.edge_count() {
            return;
        }
        self.hessians = (0..mesh.edge_count())
            .map(|e| {
                plait_mesh::topology::interior_edge(mesh, plait_types::EdgeId(e as u32))
                    .map(|s| edge_hessian(mesh, &s, Space::World))
            })
            .collect();
        self.revision = Some(mesh.revision);
        tracing::debug!(edges = self.hessians.len(), "quadratic bending cache rebuilt");
    }

    /// Whether the cache was built for `mesh`'s current topology.
    pub fn is_current(&self, mesh: &Mesh) -> bool {
        self.revision == Some(mesh.revision)
    }

    fn hessian(&self, cloth: &Cloth, stencil: &InteriorEdge) -> Mat12 {
        let cached = if self.is_current(&cloth.mesh) {
            self.hessians.get(stencil.edge.index()).copied().flatten()
        } else {
            None
        };
        let h = cached.unwrap_or_else(|| edge_hessian(&cloth.mesh, stencil, Space::World));
        let bs = cloth
            .bending_stiffness(stencil.edge, 0)
            .min(cloth.bending_stiffness(stencil.edge, 1));
        h * bs
    }
}

impl BendingStrategy for QuadraticBending {
    fn force(&self, cloth: &Cloth, stencil: &InteriorEdge, space: Space) -> (Mat12, Vec12) {
        let h = self.hessian(cloth, stencil);
        let x: Vec12 = stack(&stencil.nodes().map(|n| cloth.mesh.pos(n, space)));
        let f = h * x;
        (-h, -f)
    }

    fn energy(&self, cloth: &Cloth, stencil: &InteriorEdge, space: Space) -> f64 {
        let h = self.hessian(cloth, stencil);
        let x: Vec12 = stack(&stencil.nodes().map(|n| cloth.mesh.pos(n, space)));
        0.5 * x.dot(&(h * x))
    }

    fn name(&self) -> &str {
        "quadratic"
    }
}
