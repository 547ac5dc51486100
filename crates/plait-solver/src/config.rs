//! Solver configuration.
//!
//! Penalty stiffnesses, contact thicknesses and the iteration budgets of
//! the position-correction passes. One instance is shared by every pass
//! of a step.

use plait_types::constants::{
    DEFAULT_COLLISION_STIFFNESS, DEFAULT_HANDLE_STIFFNESS, DEFAULT_PROJECTION_THICKNESS,
    DEFAULT_REPULSION_THICKNESS,
};
use serde::{Deserialize, Serialize};

use crate::constraint::ContactThickness;

/// Configuration for the implicit integrator and its companion passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Pin stiffness per unit handle strength.
    pub handle_stiffness: f64,

    /// Proximity penalty stiffness, scaled by the smaller incident area.
    pub collision_stiffness: f64,

    /// Separation below which proximity constraints repel (meters).
    pub repulsion_thickness: f64,

    /// Separation restored by post-solve projection (meters).
    pub projection_thickness: f64,

    /// Most Gauss–Seidel sweeps of the strain limiter.
    pub strain_limit_iterations: u32,

    /// Largest principal-stretch violation the strain limiter accepts.
    pub strain_limit_tolerance: f64,

    /// Mass regularization of the static pop-filter solve.
    pub pop_filter_regularization: f64,

    /// Newton iterations when relaxing the plastic embedding.
    pub plastic_embedding_iterations: u32,

    /// Evaluate element forces with rayon.
    pub parallel_assembly: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            handle_stiffness: DEFAULT_HANDLE_STIFFNESS,
            collision_stiffness: DEFAULT_COLLISION_STIFFNESS,
            repulsion_thickness: DEFAULT_REPULSION_THICKNESS,
            projection_thickness: DEFAULT_PROJECTION_THICKNESS,
            strain_limit_iterations: 200,
            strain_limit_tolerance: 1e-4,
            pop_filter_regularization: 1e3,
            plastic_embedding_iterations: 2,
            parallel_assembly: true,
        }
    }
}

impl SolverConfig {
    /// Creates a config for debugging (fewer sweeps, sequential assembly).
    pub fn debug() -> Self {
        Self {
            strain_limit_iterations: 20,
            plastic_embedding_iterations: 1,
            parallel_assembly: false,
            ..Default::default()
        }
    }

    /// Creates a high-quality config (more sweeps, tighter tolerance).
    pub fn high_quality() -> Self {
        Self {
            strain_limit_iterations: 1000,
            strain_limit_tolerance: 1e-6,
            plastic_embedding_iterations: 5,
            ..Default::default()
        }
    }

    /// Minimum proximity distance handed to the narrow phase.
    #[inline]
    pub fn proximity_distance(&self) -> f64 {
        2.0 * self.repulsion_thickness
    }

    /// Thicknesses carried by proximity constraints.
    #[inline]
    pub fn contact_thickness(&self) -> ContactThickness {
        ContactThickness {
            repulsion: self.repulsion_thickness,
            projection: self.projection_thickness,
        }
    }
}
