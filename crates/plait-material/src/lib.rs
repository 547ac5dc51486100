//! # plait-material
//!
//! Cloth material model and material database.
//!
//! ## Design
//!
//! Each cloth face carries a material label; a [`Material`] holds the
//! measured tables for that label. Stretching stiffness is tabulated over
//! the Green strain and interpolated trilinearly; bending stiffness is
//! evaluated per edge in one of several [`BendingMode`]s.
//!
//! The [`MaterialDatabase`] stores named fabric presets.

pub mod bending;
pub mod database;
pub mod properties;
pub mod stretching;

pub use bending::{BendingData, BendingMode, BendingModuli};
pub use database::MaterialDatabase;
pub use properties::{FabricProperties, Material};
pub use stretching::{StretchingData, StretchingSamples};
