//! # plait-sim
//!
//! The simulation aggregate and its stepper. A [`Simulation`] owns the
//! cloths, obstacles, handles and morphs of a scene and advances them one
//! fixed step at a time:
//!
//! ```text
//! obstacles → constraints → physics → plasticity → strain limiting
//!           → collision → (every frame) remeshing
//! ```
//!
//! Each pass can be switched off through [`Modules`].

pub mod control;
pub mod convergence;
pub mod obstacle;
pub mod simulation;
pub mod stepper;

pub use convergence::{ConvergenceChecker, ConvergenceReport};
pub use obstacle::Obstacle;
pub use plait_io::Modules;
pub use simulation::{InitialRelaxation, Simulation};
pub use stepper::StepReport;
