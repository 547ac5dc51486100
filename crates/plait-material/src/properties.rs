//! Physical fabric properties and the per-label material.

use plait_math::{DMat2, DVec4};
use serde::{Deserialize, Serialize};

use crate::bending::BendingData;
use crate::stretching::{StretchingData, StretchingSamples};

/// Physical properties of a fabric, as measured or authored.
///
/// | Field | Unit |
/// |---|---|
/// | `density` | kg/m² |
/// | `stretching` | N/m, per strain level and direction |
/// | `bending` | N·m, per bias and curvature |
/// | `damping` | s (stiffness-proportional) |
/// | `yield_curv` | 1/m |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FabricProperties {
    /// Human-readable name (e.g., "cotton_twill").
    pub name: String,

    /// Areal density. Face mass is `area × density`.
    pub density: f64,

    pub stretching: StretchingData,

    pub bending: BendingData,

    /// Rayleigh damping coefficient applied to elastic forces.
    pub damping: f64,

    /// Lower bound on principal stretch for strain limiting.
    pub strain_min: f64,

    /// Upper bound on principal stretch for strain limiting.
    pub strain_max: f64,

    /// Curvature beyond which bending deformation becomes plastic.
    pub yield_curv: f64,

    /// How strongly accumulated damage softens stiffness.
    pub weakening: f64,
}

impl FabricProperties {
    /// Properties with direction- and strain-independent tables.
    ///
    /// `stretch` is `(k00, k01, k11, kshear)`; `bending` is a single
    /// stiffness for every bias and curvature.
    pub fn uniform(name: &str, density: f64, stretch: DVec4, bending: f64) -> Self {
        Self {
            name: name.into(),
            density,
            stretching: StretchingData::uniform(stretch),
            bending: BendingData::uniform(bending),
            damping: 0.0,
            strain_min: 0.95,
            strain_max: 1.05,
            yield_curv: f64::INFINITY,
            weakening: 0.0,
        }
    }

    /// Returns true if warp and weft stretching differ by more than 5%.
    pub fn is_anisotropic(&self) -> bool {
        let k = self.stretching.d[0][0];
        if k.z.abs() < 1e-8 {
            return false;
        }
        (k.x / k.z - 1.0).abs() > 0.05
    }
}

/// A material ready for simulation: properties plus resampled tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FabricProperties", into = "FabricProperties")]
pub struct Material {
    properties: FabricProperties,
    samples: StretchingSamples,
}

impl Material {
    pub fn new(properties: FabricProperties) -> Self {
        let samples = StretchingSamples::evaluate(&properties.stretching);
        Self {
            properties,
            samples,
        }
    }

    #[inline]
    pub fn properties(&self) -> &FabricProperties {
        &self.properties
    }

    #[inline]
    pub fn density(&self) -> f64 {
        self.properties.density
    }

    /// Replace the areal density. Masses must be recomputed by the owner.
    pub fn set_density(&mut self, density: f64) {
        self.properties.density = density;
    }

    #[inline]
    pub fn damping(&self) -> f64 {
        self.properties.damping
    }

    #[inline]
    pub fn weakening(&self) -> f64 {
        self.properties.weakening
    }

    #[inline]
    pub fn bending(&self) -> &BendingData {
        &self.properties.bending
    }

    /// `(k00, k01, k11, kshear)` at Green strain `g`, before weakening.
    #[inline]
    pub fn stretching_stiffness(&self, g: DMat2) -> DVec4 {
        self.samples.stiffness(g)
    }

    /// Mutable access for authoring; stretching tables are resampled.
    pub fn update(&mut self, f: impl FnOnce(&mut FabricProperties)) {
        f(&mut self.properties);
        self.samples = StretchingSamples::evaluate(&self.properties.stretching);
    }
}

impl From<FabricProperties> for Material {
    fn from(properties: FabricProperties) -> Self {
        Self::new(properties)
    }
}

impl From<Material> for FabricProperties {
    fn from(material: Material) -> Self {
        material.properties
    }
}
