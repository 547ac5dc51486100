//! Fixed-size element vectors and matrices.
//!
//! Face forces act on three nodes (9 dofs) and bending forces on the four
//! nodes around an edge (12 dofs). These are `nalgebra` static matrices;
//! the helpers here move 3-blocks between them and `glam` vectors.

use glam::{DMat3, DVec3};
use nalgebra::{SMatrix, SVector};

pub type Vec9 = SVector<f64, 9>;
pub type Mat9 = SMatrix<f64, 9, 9>;
pub type Vec12 = SVector<f64, 12>;
pub type Mat12 = SMatrix<f64, 12, 12>;

/// Stack node vectors into one element vector.
pub fn stack<const N: usize>(xs: &[DVec3]) -> SVector<f64, N> {
    let mut out = SVector::<f64, N>::zeros();
    for (i, x) in xs.iter().enumerate().take(N / 3) {
        out[3 * i] = x.x;
        out[3 * i + 1] = x.y;
        out[3 * i + 2] = x.z;
    }
    out
}

/// The `i`-th 3-block of an element vector.
#[inline]
pub fn block_vec<const N: usize>(v: &SVector<f64, N>, i: usize) -> DVec3 {
    DVec3::new(v[3 * i], v[3 * i + 1], v[3 * i + 2])
}

/// The `(i, j)` 3×3 block of an element matrix.
pub fn block_mat<const N: usize>(m: &SMatrix<f64, N, N>, i: usize, j: usize) -> DMat3 {
    let mut cols = [DVec3::ZERO; 3];
    for (c, col) in cols.iter_mut().enumerate() {
        *col = DVec3::new(
            m[(3 * i, 3 * j + c)],
            m[(3 * i + 1, 3 * j + c)],
            m[(3 * i + 2, 3 * j + c)],
        );
    }
    DMat3::from_cols(cols[0], cols[1], cols[2])
}

/// Kronecker product `a ⊗ I₃` of a row of weights, as an `N`-vector
/// times `x`: the element vector `[a₀x, a₁x, …]`.
pub fn kron_row_i3<const N: usize>(a: &[f64], x: DVec3) -> SVector<f64, N> {
    let mut out = SVector::<f64, N>::zeros();
    for (i, &w) in a.iter().enumerate().take(N / 3) {
        out[3 * i] = w * x.x;
        out[3 * i + 1] = w * x.y;
        out[3 * i + 2] = w * x.z;
    }
    out
}

/// Kronecker product `(a bᵀ) ⊗ I₃`.
pub fn kron_outer_i3<const N: usize>(a: &[f64], b: &[f64]) -> SMatrix<f64, N, N> {
    let mut out = SMatrix::<f64, N, N>::zeros();
    let n = N / 3;
    for i in 0..n.min(a.len()) {
        for j in 0..n.min(b.len()) {
            let w = a[i] * b[j];
            for k in 0..3 {
                out[(3 * i + k, 3 * j + k)] = w;
            }
        }
    }
    out
}
