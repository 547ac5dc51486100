//! Matrix decompositions for constitutive models.
//!
//! Provides the symmetric 2×2 eigen-decomposition used to tabulate
//! stretching stiffness, and a 3×2 SVD used by strain limiting.

use glam::{DMat2, DVec2, DVec3};
use plait_types::constants::{DEGENERATE_AREA_THRESHOLD, EPSILON};

use crate::mat3x2::Mat3x2;

/// Eigen-decomposition of a symmetric 2×2 matrix.
#[derive(Debug, Clone, Copy)]
pub struct SymmetricEigen2 {
    /// Eigenvalues in descending order.
    pub values: DVec2,
    /// Unit eigenvectors as columns, matching `values`.
    pub vectors: DMat2,
}

/// Decompose a symmetric 2×2 matrix. Only the lower-left entry is read
/// for the off-diagonal.
pub fn eigen_symmetric_2x2(m: DMat2) -> SymmetricEigen2 {
    let a = m.x_axis.x;
    let b = m.x_axis.y;
    let d = m.y_axis.y;

    // λ = (a+d)/2 ± sqrt(((a-d)/2)² + b²)
    let half_trace = 0.5 * (a + d);
    let half_diff = 0.5 * (a - d);
    let disc = (half_diff * half_diff + b * b).sqrt();
    let values = DVec2::new(half_trace + disc, half_trace - disc);

    let v0 = if b.abs() > EPSILON {
        DVec2::new(values.x - d, b).normalize()
    } else if a >= d {
        DVec2::X
    } else {
        DVec2::Y
    };
    let v1 = DVec2::new(-v0.y, v0.x);

    SymmetricEigen2 {
        values,
        vectors: DMat2::from_cols(v0, v1),
    }
}

/// Thin SVD of a 3×2 matrix: `F = U · diag(σ) · Vᵀ`.
#[derive(Debug, Clone, Copy)]
pub struct Svd3x2 {
    /// Left singular vectors (orthonormal columns).
    pub u: Mat3x2,
    /// Singular values in descending order.
    pub sigma: DVec2,
    /// Right singular vectors as columns.
    pub v: DMat2,
}

impl Svd3x2 {
    /// Rebuild `U · diag(s) · Vᵀ` with replacement singular values.
    pub fn recompose(&self, s: DVec2) -> Mat3x2 {
        let us = Mat3x2::from_cols(self.u.col0 * s.x, self.u.col1 * s.y);
        us.mul_mat2(self.v.transpose())
    }
}

/// Compute the SVD of a 3×2 deformation gradient through `FᵀF`.
///
/// Degenerate columns are completed to an orthonormal frame so that
/// clamping a zero singular value still produces a valid triangle.
pub fn svd_3x2(f: &Mat3x2) -> Svd3x2 {
    let eig = eigen_symmetric_2x2(f.ftf());
    let sigma = DVec2::new(eig.values.x.max(0.0).sqrt(), eig.values.y.max(0.0).sqrt());
    let v = eig.vectors;

    let eps = DEGENERATE_AREA_THRESHOLD;
    let u0 = if sigma.x > eps {
        f.mul_vec2(v.x_axis) / sigma.x
    } else {
        DVec3::X
    };
    let u1 = if sigma.y > eps {
        f.mul_vec2(v.y_axis) / sigma.y
    } else {
        // Any unit vector orthogonal to u0.
        let helper = if u0.x.abs() < 0.9 { DVec3::X } else { DVec3::Y };
        let n = u0.cross(helper).normalize();
        n.cross(u0)
    };

    Svd3x2 {
        u: Mat3x2::from_cols(u0, u1),
        sigma,
        v,
    }
}

/// Compute the deformation gradient `F = [x1-x0, x2-x0] · Dm⁻¹`.
pub fn deformation_gradient(x0: DVec3, x1: DVec3, x2: DVec3, inv_dm: DMat2) -> Mat3x2 {
    Mat3x2::from_cols(x1 - x0, x2 - x0).mul_mat2(inv_dm)
}
