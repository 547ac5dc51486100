//! Sparse Cholesky solver backed by `faer`.
//!
//! Implements [`SparseSolver`] with faer's supernodal LLᵀ factorization.
//! The implicit integrator refactorizes every step since stiffness and
//! contact terms change the matrix values; a factorization failure means
//! the system is not positive definite and is reported as
//! [`PlaitError::SingularSystem`].

use faer::Side;
use faer::linalg::solvers::Solve;
use faer::sparse::SparseColMat;
use faer::sparse::Triplet;
use faer::sparse::linalg::solvers::{Llt, SymbolicLlt};
use plait_types::{PlaitError, PlaitResult};

use crate::sparse::{CsrMatrix, SparseSolver};

/// Sparse Cholesky (LLᵀ) solver using `faer`.
pub struct FaerSolver {
    factorization: Option<Llt<usize, f64>>,
    dimension: usize,
}

impl FaerSolver {
    /// Creates a new solver (unfactorized).
    pub fn new() -> Self {
        Self {
            factorization: None,
            dimension: 0,
        }
    }

    fn singular(&self, reason: String) -> PlaitError {
        PlaitError::SingularSystem {
            dimension: self.dimension,
            reason,
        }
    }

    fn csr_to_csc(matrix: &CsrMatrix) -> Result<SparseColMat<usize, f64>, String> {
        let mut triplets: Vec<Triplet<usize, usize, f64>> = Vec::with_capacity(matrix.nnz());
        for row in 0..matrix.rows {
            for idx in matrix.row_ptr[row]..matrix.row_ptr[row + 1] {
                let col = matrix.col_idx[idx];
                triplets.push(Triplet {
                    row,
                    col,
                    val: matrix.values[idx],
                });
            }
        }

        SparseColMat::try_new_from_triplets(matrix.rows, matrix.cols, &triplets)
            .map_err(|e| format!("failed to construct CSC matrix: {e:?}"))
    }

    /// Factorize and solve in one call.
    pub fn solve_once(matrix: &CsrMatrix, rhs: &[f64]) -> PlaitResult<Vec<f64>> {
        let mut solver = Self::new();
        solver.factorize(matrix)?;
        let mut x = vec![0.0; rhs.len()];
        solver.solve(rhs, &mut x)?;
        Ok(x)
    }
}

impl Default for FaerSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseSolver for FaerSolver {
    fn factorize(&mut self, matrix: &CsrMatrix) -> PlaitResult<()> {
        self.dimension = matrix.rows;
        self.factorization = None;
        if matrix.rows != matrix.cols {
            return Err(self.singular(format!(
                "matrix must be square, got {}×{}",
                matrix.rows, matrix.cols
            )));
        }
        if matrix.rows == 0 {
            return Err(self.singular("empty matrix".into()));
        }

        let csc = Self::csr_to_csc(matrix).map_err(|e| self.singular(e))?;

        let symbolic = SymbolicLlt::try_new(csc.symbolic().as_ref(), Side::Upper)
            .map_err(|e| self.singular(format!("symbolic analysis failed: {e:?}")))?;

        let llt = Llt::try_new_with_symbolic(symbolic, csc.as_ref(), Side::Upper)
            .map_err(|e| self.singular(format!("Cholesky factorization failed: {e:?}")))?;

        self.factorization = Some(llt);
        Ok(())
    }

    fn solve(&self, rhs: &[f64], solution: &mut [f64]) -> PlaitResult<()> {
        let llt = self
            .factorization
            .as_ref()
            .ok_or_else(|| self.singular("solver not factorized".into()))?;

        if rhs.len() != self.dimension || solution.len() != self.dimension {
            return Err(self.singular(format!(
                "rhs length {} / solution length {} != dimension {}",
                rhs.len(),
                solution.len(),
                self.dimension
            )));
        }

        let b: faer::Mat<f64> = faer::Mat::from_fn(self.dimension, 1, |i, _| rhs[i]);
        let x = llt.solve(&b);

        for (i, out) in solution.iter_mut().enumerate() {
            *out = x[(i, 0)];
        }
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(self.singular("non-finite solution".into()));
        }
        Ok(())
    }

    fn is_factorized(&self) -> bool {
        self.factorization.is_some()
    }
}
