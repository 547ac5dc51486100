//! # plait-remesh
//!
//! Adaptive remeshing of cloth meshes.
//!
//! ## Key Types
//!
//! - [`sizing`]: Per-face metric tensors from curvature, velocity,
//!   compression and obstacle proximity; metric edge lengths
//! - [`dynamic_remesh`]: Split, flip and collapse until edges fit the
//!   sizing field, keeping `preserve` nodes in place
//! - [`static_remesh`]: Topology-preserving refresh with a 1:1 node map
//! - [`Residual`]: Plastic state carried from the old mesh to the new

mod ops;
pub mod remesh;
pub mod residual;
pub mod sizing;
mod work;

pub use remesh::{dynamic_remesh, static_remesh, RemeshOutcome};
pub use residual::{back_up_residuals, restore_residuals, Residual};
