//! # plait-debug
//!
//! Inspection hooks and state snapshots for debugging simulation issues.
//! Snapshots serialize cloth state to binary for replay and diffing.

pub mod hooks;
pub mod snapshot;

pub use hooks::{InspectionHook, TelemetryHook};
pub use snapshot::StateSnapshot;
