//! Bending forces on interior edges.
//!
//! Two energies are available and selected per cloth through
//! [`BendingModel`](crate::cloth::BendingModel):
//!
//! - [`DihedralBending`]: penalizes `θ − θ_ideal` with the measured or
//!   modulus-based stiffness of the edge.
//! - [`QuadraticBending`](crate::discrete_shells::QuadraticBending) -
//!   cotangent-weighted quadratic energy with a per-edge cached Hessian.
//!
//! ## Geometry
//!
//! ```text
//!          x2 (wing 0)
//!         /  \
//!        / f0 \
//!      x0 ──── x1
//!        \ f1 /
//!         \  /
//!          x3 (wing 1)
//! ```
//!
//! Element vectors are ordered `[x0, x1, x2, x3]`.

use plait_math::element::{stack, Mat12, Vec12};
use plait_math::DVec3;
use plait_mesh::{InteriorEdge, Space};
use plait_types::constants::EPSILON;

use crate::cloth::{BendingModel, Cloth};

/// One bending energy, evaluated per interior edge.
pub trait BendingStrategy: Send + Sync {
    /// Force Jacobian and force on the four stencil nodes.
    fn force(&self, cloth: &Cloth, stencil: &InteriorEdge, space: Space) -> (Mat12, Vec12);

    /// Energy of the edge.
    fn energy(&self, cloth: &Cloth, stencil: &InteriorEdge, space: Space) -> f64;

    /// Returns the strategy's name.
    fn name(&self) -> &str;
}

/// The strategy currently selected on `cloth`.
///
/// Call [`Cloth::prepare_bending`] first so the quadratic cache is fresh.
pub fn active_strategy(cloth: &Cloth) -> &dyn BendingStrategy {
    match cloth.bending.model {
        BendingModel::Dihedral => &DihedralBending,
        BendingModel::Quadratic => cloth.quadratic_bending(),
    }
}

/// Distance from `x` to the line through `a` and `b`, at least
/// `1e-3 |b − a|`.
pub fn distance_to_line(x: DVec3, a: DVec3, b: DVec3) -> f64 {
    let e = b - a;
    let ee = e.dot(e);
    if ee < EPSILON * EPSILON {
        return (x - a).length();
    }
    let xp = e * (e.dot(x - a) / ee);
    ((x - a) - xp).length().max(1e-3 * ee.sqrt())
}

/// Weights of the projection of `x` onto segment `a b`.
pub fn barycentric_weights(x: DVec3, a: DVec3, b: DVec3) -> (f64, f64) {
    let e = b - a;
    let ee = e.dot(e);
    if ee < EPSILON * EPSILON {
        return (0.5, 0.5);
    }
    let t = e.dot(x - a) / ee;
    (1.0 - t, t)
}

/// Damping coefficient of an edge: the mean of its two faces.
pub fn edge_damping(cloth: &Cloth, stencil: &InteriorEdge) -> f64 {
    let mesh = &cloth.mesh;
    (cloth.material(mesh.face(stencil.face0).label).damping()
        + cloth.material(mesh.face(stencil.face1).label).damping())
        / 2.0
}

/// Stiffness, weakening and shape factor shared by the dihedral energy
/// and force.
fn dihedral_coefficients(cloth: &Cloth, stencil: &InteriorEdge) -> (f64, f64) {
    let mesh = &cloth.mesh;
    let edge = mesh.edge(stencil.edge);
    let (f0, f1) = (mesh.face(stencil.face0), mesh.face(stencil.face1));
    let ke = cloth
        .bending_stiffness(stencil.edge, 0)
        .min(cloth.bending_stiffness(stencil.edge, 1));
    let weakening = cloth
        .material(f0.label)
        .weakening()
        .max(cloth.material(f1.label).weakening());
    let ke = ke / (1.0 + weakening * edge.damage);
    let area = f0.a + f1.a;
    let shape = if area > 0.0 {
        edge.l * edge.l / (2.0 * area)
    } else {
        0.0
    };
    (ke, shape)
}

/// Dihedral-angle bending.
///
/// The force scales the edge stiffness by [`Self::STIFFNESS_SCALE`];
/// [`BendingStrategy::energy`] does not.
#[derive(Debug, Clone, Copy, Default)]
pub struct DihedralBending;

impl DihedralBending {
    pub const STIFFNESS_SCALE: f64 = 4.0 * 6.0;

    /// `∂θ/∂x` for the four stencil nodes.
    pub fn angle_gradient(cloth: &Cloth, stencil: &InteriorEdge, space: Space) -> Vec12 {
        let mesh = &cloth.mesh;
        let [x0, x1, x2, x3] = stencil.nodes().map(|n| mesh.pos(n, space));
        let h0 = distance_to_line(x2, x0, x1);
        let h1 = distance_to_line(x3, x0, x1);
        let n0 = mesh.face_normal(stencil.face0, space);
        let n1 = mesh.face_normal(stencil.face1, space);
        let w0 = barycentric_weights(x2, x0, x1);
        let w1 = barycentric_weights(x3, x0, x1);
        stack(&[
            -(n0 * (w0.0 / h0) + n1 * (w1.0 / h1)),
            -(n0 * (w0.1 / h0) + n1 * (w1.1 / h1)),
            n0 / h0,
            n1 / h1,
        ])
    }
}

impl BendingStrategy for DihedralBending {
    fn force(&self, cloth: &Cloth, stencil: &InteriorEdge, space: Space) -> (Mat12, Vec12) {
        let mesh = &cloth.mesh;
        let theta = mesh.dihedral_angle(stencil.edge, space);
        let dtheta = Self::angle_gradient(cloth, stencil, space);
        let (ke, shape) = dihedral_coefficients(cloth, stencil);
        let ke = ke * Self::STIFFNESS_SCALE;
        let theta_ideal = mesh.edge(stencil.edge).theta_ideal;
        (
            dtheta * dtheta.transpose() * (-ke * shape / 2.0),
            dtheta * (-ke * shape * (theta - theta_ideal) / 2.0),
        )
    }

    fn energy(&self, cloth: &Cloth, stencil: &InteriorEdge, space: Space) -> f64 {
        let theta = cloth.mesh.dihedral_angle(stencil.edge, space);
        let (ke, shape) = dihedral_coefficients(cloth, stencil);
        let d = theta - cloth.mesh.edge(stencil.edge).theta_ideal;
        ke * shape * d * d / 4.0
    }

    fn name(&self) -> &str {
        "dihedral"
    }
}
