//! # plait-math
//!
//! Linear algebra primitives for the plait cloth simulator.
//!
//! Provides:
//! - Re-exports of `glam` double-precision types (`DVec3`, `DMat2`, etc.)
//! - 3×2 matrix type for deformation gradients
//! - Symmetric 2×2 eigen-decomposition and 3×2 SVD
//! - Fixed-size element vectors/matrices (9 and 12 dofs) on `nalgebra`
//! - Sparse matrix assembly (CSR) and the `faer` Cholesky solver
//! - Keyframe splines and rigid motions for scripted objects

pub mod decomposition;
pub mod element;
pub mod faer_solver;
pub mod mat3x2;
pub mod motion;
pub mod sparse;
pub mod spline;

// Re-export glam types as the canonical math types for plait.
pub use glam::{DMat2, DMat3, DQuat, DVec2, DVec3, DVec4};

/// `a × b` as a glam 2-vector cross product (scalar z component).
#[inline]
pub fn cross2(a: DVec2, b: DVec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Outer product `a bᵀ`.
#[inline]
pub fn outer(a: DVec3, b: DVec3) -> DMat3 {
    DMat3::from_cols(a * b.x, a * b.y, a * b.z)
}

/// Outer product of 2-vectors `a bᵀ`.
#[inline]
pub fn outer2(a: DVec2, b: DVec2) -> DMat2 {
    DMat2::from_cols(a * b.x, a * b.y)
}

/// Frobenius norm of a 2×2 matrix.
#[inline]
pub fn norm_f2(m: DMat2) -> f64 {
    (m.x_axis.length_squared() + m.y_axis.length_squared()).sqrt()
}

/// Normalizes `v`, returning zero for vectors shorter than `eps`.
#[inline]
pub fn normalize_or_zero(v: DVec3) -> DVec3 {
    let len = v.length();
    if len > plait_types::constants::EPSILON {
        v / len
    } else {
        DVec3::ZERO
    }
}
