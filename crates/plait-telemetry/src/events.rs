//! Simulation event types.
//!
//! Structured events emitted by the stepper at fixed points of each step.
//! Events are lightweight value types that carry just enough data to be
//! useful for monitoring and debugging.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A simulation event emitted by the stepper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    /// Step number (1-based once the first step has begun).
    pub step: u32,
    /// Event payload.
    pub kind: EventKind,
}

impl SimulationEvent {
    /// Creates a new event for the given step.
    pub fn new(step: u32, kind: EventKind) -> Self {
        Self { step, kind }
    }
}

/// Passes of one simulation step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Obstacles,
    Constraints,
    Physics,
    Plasticity,
    StrainLimiting,
    Collision,
    Remeshing,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Obstacles => "obstacles",
            Phase::Constraints => "constraints",
            Phase::Physics => "physics",
            Phase::Plasticity => "plasticity",
            Phase::StrainLimiting => "strain_limiting",
            Phase::Collision => "collision",
            Phase::Remeshing => "remeshing",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Step started.
    StepBegin {
        /// Simulation time after the clock advanced (seconds).
        time: f64,
        /// Step size (seconds).
        dt: f64,
    },

    /// Step completed.
    StepEnd {
        /// Wall-clock time for the entire step (seconds).
        wall_time: f64,
    },

    /// One pass of the step finished.
    PhaseComplete {
        phase: Phase,
        /// Wall-clock time of the pass (seconds).
        wall_time: f64,
    },

    /// Constraint set of the step assembled.
    ConstraintsGathered {
        /// Pin constraints from handles.
        handles: usize,
        /// Proximity contacts.
        proximity: usize,
    },

    /// One implicit solve finished.
    LinearSolve {
        cloth: usize,
        /// Degrees of freedom.
        dofs: usize,
        /// Stored matrix entries.
        nnz: usize,
    },

    /// A cloth was remeshed.
    Remeshed {
        cloth: usize,
        splits: usize,
        flips: usize,
        collapses: usize,
        nodes_before: usize,
        nodes_after: usize,
    },

    /// Convergence check of a settling run.
    Convergence {
        /// Checks performed so far.
        iterations: u32,
        /// Largest node displacement since the previous sample (mm).
        diff_mm: f64,
        converged: bool,
    },

    /// Custom event for extensibility.
    Custom {
        /// Arbitrary label.
        label: String,
        /// JSON-encoded payload.
        payload: String,
    },
}
