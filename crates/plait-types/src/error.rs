//! Error types for plait.
//!
//! All crates return `PlaitResult<T>` from fallible operations.

use thiserror::Error;

/// Unified error type for plait.
#[derive(Debug, Error)]
pub enum PlaitError {
    /// Mesh data is malformed or inconsistent.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Material parameter is missing or out of range.
    #[error("Invalid material parameter: {0}")]
    InvalidMaterial(String),

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Interchange text could not be parsed.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Iterative pass failed to converge.
    #[error("Solver did not converge after {iterations} iterations (residual: {residual:.2e})")]
    SolverDivergence { iterations: u32, residual: f64 },

    /// The assembled linear system could not be factorized.
    #[error("Singular system ({dimension}×{dimension}): {reason}")]
    SingularSystem { dimension: usize, reason: String },

    /// A simulation invariant was violated (e.g. a handle node not preserved).
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Convenience alias for `Result<T, PlaitError>`.
pub type PlaitResult<T> = Result<T, PlaitError>;
