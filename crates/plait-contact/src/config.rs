//! Contact configuration.

use plait_types::constants::{DEFAULT_PROJECTION_THICKNESS, DEFAULT_REPULSION_THICKNESS};
use serde::{Deserialize, Serialize};

/// Tuning for collision response, separation and obstacle planes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactConfig {
    /// Clearance collision response restores between a node and a face.
    pub thickness: f64,
    /// Sweeps of collision response before giving up on residual contacts.
    pub max_iterations: u32,
    /// Resolve cloth against itself and other cloths, not only obstacles.
    pub self_collision: bool,
    /// Search radius for nearest obstacle planes.
    pub plane_radius: f64,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            thickness: DEFAULT_PROJECTION_THICKNESS,
            max_iterations: 30,
            self_collision: true,
            plane_radius: 10.0 * DEFAULT_REPULSION_THICKNESS,
        }
    }
}

impl ContactConfig {
    /// Few sweeps, obstacles only.
    pub fn debug() -> Self {
        Self {
            max_iterations: 5,
            self_collision: false,
            ..Default::default()
        }
    }

    pub fn high_quality() -> Self {
        Self {
            max_iterations: 100,
            ..Default::default()
        }
    }
}
