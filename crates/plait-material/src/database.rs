//! Built-in fabric presets.
//!
//! Scenes may name a preset instead of spelling out every table. The
//! figures are areal densities in kg/m² and stretching moduli in N/m.

use hashbrown::HashMap;
use plait_math::DVec4;
use plait_types::{PlaitError, PlaitResult};

use crate::properties::FabricProperties;

/// Fabric properties keyed by preset name.
#[derive(Debug, Clone)]
pub struct MaterialDatabase {
    presets: HashMap<String, FabricProperties>,
}

impl MaterialDatabase {
    /// The built-in presets.
    pub fn with_defaults() -> Self {
        let mut db = Self::empty();
        for props in [cotton_twill(), silk_charmeuse(), denim_14oz(), jersey_knit(), chiffon()] {
            db.register(props);
        }
        db
    }

    pub fn empty() -> Self {
        Self {
            presets: HashMap::new(),
        }
    }

    /// Add `props` under its own name, replacing any preset of that name.
    pub fn register(&mut self, props: FabricProperties) {
        self.presets.insert(props.name.clone(), props);
    }

    pub fn get(&self, name: &str) -> Option<&FabricProperties> {
        self.presets.get(name)
    }

    /// Like [`get`](Self::get), but an unknown name is an error.
    pub fn require(&self, name: &str) -> PlaitResult<FabricProperties> {
        self.get(name).cloned().ok_or_else(|| {
            PlaitError::InvalidMaterial(format!(
                "unknown preset '{name}' (known: {})",
                self.names().join(", ")
            ))
        })
    }

    /// Preset names in lexical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.presets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

impl Default for MaterialDatabase {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ─── Presets ──────────────────────────────────────────────────

/// Medium-weight twill; holds creases once yielded.
fn cotton_twill() -> FabricProperties {
    FabricProperties {
        damping: 1e-3,
        yield_curv: 40.0,
        weakening: 0.5,
        ..FabricProperties::uniform("cotton_twill", 0.200, DVec4::new(4500.0, 600.0, 4200.0, 450.0), 5e-6)
    }
}

fn silk_charmeuse() -> FabricProperties {
    FabricProperties {
        damping: 5e-4,
        ..FabricProperties::uniform("silk_charmeuse", 0.080, DVec4::new(2800.0, 400.0, 2600.0, 200.0), 8e-7)
    }
}

/// Heavy denim: stiff bending, tight strain limit, early yield.
fn denim_14oz() -> FabricProperties {
    FabricProperties {
        damping: 2e-3,
        strain_max: 1.02,
        yield_curv: 25.0,
        weakening: 1.0,
        ..FabricProperties::uniform("denim_14oz", 0.400, DVec4::new(9800.0, 1200.0, 9200.0, 900.0), 2e-5)
    }
}

/// Knit with wide strain limits in both directions.
fn jersey_knit() -> FabricProperties {
    FabricProperties {
        damping: 1e-3,
        strain_min: 0.9,
        strain_max: 1.2,
        ..FabricProperties::uniform("jersey_knit", 0.180, DVec4::new(1000.0, 300.0, 1200.0, 150.0), 2e-6)
    }
}

fn chiffon() -> FabricProperties {
    FabricProperties {
        damping: 2e-4,
        ..FabricProperties::uniform("chiffon", 0.050, DVec4::new(2400.0, 300.0, 2200.0, 120.0), 4e-7)
    }
}
