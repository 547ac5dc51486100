//! # plait-types
//!
//! Shared identifiers, error types, and physical constants
//! for the plait adaptive cloth simulator.
//!
//! This crate has zero domain logic: it defines the vocabulary
//! that all other plait crates share.

pub mod constants;
pub mod error;
pub mod ids;

pub use error::{PlaitError, PlaitResult};
pub use ids::{EdgeId, FaceId, MeshRef, NodeId, NodeRef, VertId};
