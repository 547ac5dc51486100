//! Inspection hooks for live debugging.
//!
//! Hooks are handed to the stepper and called at fixed points of each step
//! to capture metrics or state without modifying the passes themselves.

use plait_telemetry::events::{EventKind, Phase, SimulationEvent};

/// Trait for simulation inspection hooks.
///
/// # Lifecycle
///
/// ```text
/// for each step:
///   hook.on_step_begin(...)
///   for each enabled pass:
///     hook.on_phase(...)
///   hook.on_step_end(...)
/// hook.on_simulation_end()
/// ```
pub trait InspectionHook: Send {
    /// Called after the clock advanced, before any pass runs.
    fn on_step_begin(&mut self, step: u32, time: f64, dt: f64) {
        let _ = (step, time, dt);
    }

    /// Called after each pass that ran.
    fn on_phase(&mut self, step: u32, phase: Phase, wall_time: f64) {
        let _ = (step, phase, wall_time);
    }

    /// Called at the end of each step.
    fn on_step_end(&mut self, step: u32, wall_time: f64) {
        let _ = (step, wall_time);
    }

    /// Called when the host finishes the run.
    fn on_simulation_end(&mut self) {}

    /// Returns the hook's name for logging.
    fn name(&self) -> &str;
}

/// Hook that records lifecycle calls as telemetry events for later
/// dispatch through an event bus.
#[derive(Debug, Default)]
pub struct TelemetryHook {
    events: Vec<SimulationEvent>,
}

impl TelemetryHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains collected events for dispatch.
    pub fn drain_events(&mut self) -> Vec<SimulationEvent> {
        std::mem::take(&mut self.events)
    }
}

impl InspectionHook for TelemetryHook {
    fn on_step_begin(&mut self, step: u32, time: f64, dt: f64) {
        self.events
            .push(SimulationEvent::new(step, EventKind::StepBegin { time, dt }));
    }

    fn on_phase(&mut self, step: u32, phase: Phase, wall_time: f64) {
        self.events.push(SimulationEvent::new(
            step,
            EventKind::PhaseComplete { phase, wall_time },
        ));
    }

    fn on_step_end(&mut self, step: u32, wall_time: f64) {
        self.events
            .push(SimulationEvent::new(step, EventKind::StepEnd { wall_time }));
    }

    fn name(&self) -> &str {
        "telemetry_hook"
    }
}
