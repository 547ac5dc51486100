//! Sparse matrix representation and solver interface.
//!
//! Provides a CSR (Compressed Sparse Row) matrix, a 3×3-block triplet
//! builder for node-indexed systems, and a trait for sparse Cholesky
//! solvers.

use glam::{DMat3, DVec3};
use plait_types::PlaitResult;
use serde::{Deserialize, Serialize};

/// Compressed Sparse Row (CSR) matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrMatrix {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Row pointer array (length = rows + 1).
    /// `row_ptr[i]..row_ptr[i+1]` are the indices into `col_idx` and `values`
    /// for non-zeros in row `i`.
    pub row_ptr: Vec<usize>,
    /// Column indices of non-zero entries, sorted within each row.
    pub col_idx: Vec<usize>,
    /// Non-zero values.
    pub values: Vec<f64>,
}

impl CsrMatrix {
    /// Creates an empty CSR matrix with the given dimensions.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_ptr: vec![0; rows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Returns the number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Creates a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries are summed in the order they appear in
    /// `triplets`, so the result is reproducible for a fixed input order.
    pub fn from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, f64)]) -> Self {
        // Bucket by row, preserving input order.
        let mut row_counts = vec![0usize; rows];
        for &(r, _, _) in triplets {
            row_counts[r] += 1;
        }
        let mut starts = vec![0usize; rows + 1];
        for i in 0..rows {
            starts[i + 1] = starts[i] + row_counts[i];
        }
        let mut cursor = starts[..rows].to_vec();
        let mut bucket: Vec<(usize, f64)> = vec![(0, 0.0); triplets.len()];
        for &(r, c, v) in triplets {
            bucket[cursor[r]] = (c, v);
            cursor[r] += 1;
        }

        let mut row_ptr = Vec::with_capacity(rows + 1);
        let mut col_idx = Vec::with_capacity(triplets.len());
        let mut values = Vec::with_capacity(triplets.len());
        row_ptr.push(0);
        for i in 0..rows {
            let row = &mut bucket[starts[i]..starts[i + 1]];
            // Stable: equal columns keep their input order.
            row.sort_by_key(|&(c, _)| c);
            let mut k = 0;
            while k < row.len() {
                let col = row[k].0;
                let mut sum = 0.0;
                while k < row.len() && row[k].0 == col {
                    sum += row[k].1;
                    k += 1;
                }
                col_idx.push(col);
                values.push(sum);
            }
            row_ptr.push(col_idx.len());
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Returns the entry at `(row, col)`, zero if not stored.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        match self.col_idx[range.clone()].binary_search(&col) {
            Ok(k) => self.values[range.start + k],
            Err(_) => 0.0,
        }
    }

    /// Matrix–vector product `A x`.
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        (0..self.rows)
            .map(|r| {
                (self.row_ptr[r]..self.row_ptr[r + 1])
                    .map(|k| self.values[k] * x[self.col_idx[k]])
                    .sum()
            })
            .collect()
    }
}

/// Accumulates a node-indexed block system `A` (3n×3n) and `b` (3n).
///
/// Blocks added to the same `(i, j)` are summed, never overwritten.
#[derive(Debug, Clone)]
pub struct BlockSystem {
    nodes: usize,
    triplets: Vec<(usize, usize, f64)>,
    rhs: Vec<DVec3>,
}

impl BlockSystem {
    /// An empty system over `nodes` nodes.
    pub fn new(nodes: usize) -> Self {
        Self {
            nodes,
            triplets: Vec::with_capacity(nodes * 9 * 7),
            rhs: vec![DVec3::ZERO; nodes],
        }
    }

    /// Number of nodes (the system is `3 * nodes` wide).
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// `A(i, j) += m`.
    pub fn add_block(&mut self, i: usize, j: usize, m: DMat3) {
        let cols = [m.x_axis, m.y_axis, m.z_axis];
        for (c, col) in cols.iter().enumerate() {
            let col = col.to_array();
            for (r, &v) in col.iter().enumerate() {
                if v != 0.0 {
                    self.triplets.push((3 * i + r, 3 * j + c, v));
                }
            }
        }
    }

    /// `b(i) += f`.
    pub fn add_rhs(&mut self, i: usize, f: DVec3) {
        self.rhs[i] += f;
    }

    /// Right-hand side blocks.
    pub fn rhs(&self) -> &[DVec3] {
        &self.rhs
    }

    /// Flattened right-hand side `[b0.x, b0.y, b0.z, b1.x, …]`.
    pub fn rhs_flat(&self) -> Vec<f64> {
        self.rhs.iter().flat_map(|b| b.to_array()).collect()
    }

    /// Compress the accumulated blocks into a CSR matrix.
    pub fn to_csr(&self) -> CsrMatrix {
        let n = 3 * self.nodes;
        CsrMatrix::from_triplets(n, n, &self.triplets)
    }
}

/// Trait for sparse symmetric positive-definite solvers.
pub trait SparseSolver {
    /// Factorize the matrix.
    fn factorize(&mut self, matrix: &CsrMatrix) -> PlaitResult<()>;

    /// Solve `Ax = b` using the pre-computed factorization.
    /// Returns x in the provided output buffer.
    fn solve(&self, rhs: &[f64], solution: &mut [f64]) -> PlaitResult<()>;

    /// Returns true if the solver holds a valid factorization.
    fn is_factorized(&self) -> bool;
}
