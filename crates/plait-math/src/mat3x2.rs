//! 3×2 matrix type for deformation gradients of shell elements.
//!
//! Cloth triangles are 2D manifolds embedded in 3D space. The deformation
//! gradient F is a 3×2 matrix mapping the material (UV) configuration to
//! world space.

use glam::{DMat2, DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// A 3×2 column-major matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mat3x2 {
    /// First column.
    pub col0: DVec3,
    /// Second column.
    pub col1: DVec3,
}

impl Mat3x2 {
    /// Creates a new 3×2 matrix from two column vectors.
    #[inline]
    pub fn from_cols(col0: DVec3, col1: DVec3) -> Self {
        Self { col0, col1 }
    }

    /// The zero matrix.
    pub const ZERO: Self = Self {
        col0: DVec3::ZERO,
        col1: DVec3::ZERO,
    };

    /// First two columns of the 3×3 identity.
    pub const IDENTITY: Self = Self {
        col0: DVec3::X,
        col1: DVec3::Y,
    };

    /// Right Cauchy–Green tensor `C = FᵀF`.
    #[inline]
    pub fn ftf(&self) -> DMat2 {
        let a = self.col0.dot(self.col0);
        let b = self.col0.dot(self.col1);
        let d = self.col1.dot(self.col1);
        DMat2::from_cols(DVec2::new(a, b), DVec2::new(b, d))
    }

    /// Frobenius norm squared: `trace(FᵀF)`.
    #[inline]
    pub fn frobenius_norm_sq(&self) -> f64 {
        self.col0.length_squared() + self.col1.length_squared()
    }

    /// `self · m` for a 2×2 matrix `m`.
    #[inline]
    pub fn mul_mat2(&self, m: DMat2) -> Self {
        Self {
            col0: self.col0 * m.x_axis.x + self.col1 * m.x_axis.y,
            col1: self.col0 * m.y_axis.x + self.col1 * m.y_axis.y,
        }
    }

    /// `self · v` for a 2-vector `v`.
    #[inline]
    pub fn mul_vec2(&self, v: DVec2) -> DVec3 {
        self.col0 * v.x + self.col1 * v.y
    }

    /// `selfᵀ · v` for a 3-vector `v`.
    #[inline]
    pub fn transpose_mul_vec3(&self, v: DVec3) -> DVec2 {
        DVec2::new(self.col0.dot(v), self.col1.dot(v))
    }
}

impl std::ops::Add for Mat3x2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            col0: self.col0 + rhs.col0,
            col1: self.col1 + rhs.col1,
        }
    }
}

impl std::ops::Sub for Mat3x2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            col0: self.col0 - rhs.col0,
            col1: self.col1 - rhs.col1,
        }
    }
}

impl std::ops::Mul<f64> for Mat3x2 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self {
            col0: self.col0 * rhs,
            col1: self.col1 * rhs,
        }
    }
}
