//! Settling detection.
//!
//! Samples the cloth positions every `check_gap` seconds of simulated time
//! and reports convergence once the largest node displacement between two
//! samples drops below a threshold.

use plait_math::DVec3;
use plait_types::{PlaitError, PlaitResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Outcome of one convergence check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub converged: bool,
    /// Largest node displacement since the previous sample (millimeters).
    pub diff_mm: f64,
    /// Checks performed since sampling started.
    pub iterations: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceChecker {
    /// Simulated seconds between checks.
    pub check_gap: f64,
    pub threshold_mm: f64,
    /// Never converged before this many checks.
    pub min_iterations: u32,
    /// Always converged at this many checks.
    pub max_iterations: u32,
    iterations: u32,
    last_sample: Option<f64>,
    previous: Vec<DVec3>,
}

impl ConvergenceChecker {
    pub fn new(
        check_gap: f64,
        threshold_mm: f64,
        min_iterations: u32,
        max_iterations: u32,
    ) -> PlaitResult<Self> {
        if min_iterations >= max_iterations {
            return Err(PlaitError::InvalidConfig(format!(
                "convergence needs min iterations ({min_iterations}) below max ({max_iterations})"
            )));
        }
        if !(check_gap >= 0.0) || !(threshold_mm >= 0.0) {
            return Err(PlaitError::InvalidConfig(
                "convergence gap and threshold must be non-negative".into(),
            ));
        }
        Ok(Self {
            check_gap,
            threshold_mm,
            min_iterations,
            max_iterations,
            iterations: 0,
            last_sample: None,
            previous: Vec::new(),
        })
    }

    /// Take `positions` as the reference and restart the count.
    pub fn start_sampling(&mut self, time: f64, positions: &[DVec3]) {
        self.iterations = 0;
        self.last_sample = Some(time);
        self.previous = positions.to_vec();
    }

    pub fn is_sampling(&self) -> bool {
        self.last_sample.is_some()
    }

    /// Whether more than `check_gap` has passed since the last sample.
    pub fn need_to_check(&self, time: f64) -> bool {
        self.last_sample.is_some_and(|last| time - last > self.check_gap)
    }

    /// Compare `positions` with the previous sample and take them as the
    /// new reference. A changed node count counts as unconverged.
    pub fn check(&mut self, time: f64, positions: &[DVec3]) -> PlaitResult<ConvergenceReport> {
        if self.last_sample.is_none() {
            return Err(PlaitError::InvariantViolation(
                "convergence checked before sampling started".into(),
            ));
        }
        self.iterations += 1;
        let diff_mm = if positions.len() == self.previous.len() {
            positions
                .iter()
                .zip(&self.previous)
                .map(|(a, b)| a.distance(*b) * 1e3)
                .fold(0.0, f64::max)
        } else {
            f64::INFINITY
        };

        let converged = if self.iterations < self.min_iterations {
            false
        } else if self.iterations >= self.max_iterations {
            warn!(
                max_iterations = self.max_iterations,
                diff_mm,
                threshold_mm = self.threshold_mm,
                "convergence iteration cap reached"
            );
            true
        } else {
            diff_mm < self.threshold_mm
        };

        self.last_sample = Some(time);
        self.previous = positions.to_vec();
        Ok(ConvergenceReport {
            converged,
            diff_mm,
            iterations: self.iterations,
        })
    }
}

