//! # plait-telemetry
//!
//! Event bus for simulation telemetry. The stepper emits structured events
//! (step timing, per-pass completion, constraint counts, linear solves,
//! remesh statistics) that pluggable sinks consume.

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::EventBus;
pub use events::{EventKind, Phase, SimulationEvent};
pub use sinks::{EventSink, TracingSink, VecSink};
