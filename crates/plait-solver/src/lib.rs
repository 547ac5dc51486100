//! # plait-solver
//!
//! Cloth dynamics: element forces, constraints and the implicit
//! integrator, plus the position-correction passes that run after it.
//!
//! ## Key Types
//!
//! - [`Cloth`]: A mesh, its per-label materials and bending/remeshing settings
//! - [`Constraint`] / [`ConstraintSet`]: Pins and proximity contacts of one step
//! - [`Handle`]: Pins (fixed or scripted) that produce constraints over time
//! - [`BendingStrategy`]: Dihedral or quadratic bending energy
//! - [`SolverConfig`]: Penalty stiffnesses, thicknesses and pass budgets
//! - [`implicit::implicit_update`]: One backward-Euler step of one cloth

pub mod assembly;
pub mod bending;
pub mod cloth;
pub mod config;
pub mod constraint;
pub mod discrete_shells;
pub mod external;
pub mod handle;
pub mod implicit;
pub mod meshes;
pub mod morph;
pub mod plasticity;
pub mod pop_filter;
pub mod strain_limit;
pub mod stretching;

pub use bending::{BendingStrategy, DihedralBending};
pub use cloth::{BendingModel, BendingSettings, Cloth, RemeshConfig};
pub use config::SolverConfig;
pub use constraint::{Constraint, ConstraintSet, EqCon, IneqCon};
pub use discrete_shells::QuadraticBending;
pub use external::{ExternalForces, Wind};
pub use handle::{Handle, HandleKind, HandleWindow};
pub use meshes::MeshSet;
pub use morph::Morph;
