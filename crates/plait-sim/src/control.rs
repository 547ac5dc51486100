//! Runtime control surface for a host UI.
//!
//! Accessors for the bending selection and moduli, material densities, and
//! cloth export. None of them touch geometry; a density change only
//! redistributes masses.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use plait_debug::StateSnapshot;
use plait_io::{obj_string, write_obj};
use plait_material::BendingMode;
use plait_math::DVec3;
use plait_solver::{BendingModel, Cloth};
use plait_types::{PlaitError, PlaitResult};
use tracing::info;

use crate::simulation::Simulation;

impl Simulation {
    pub fn cloth(&self, c: usize) -> PlaitResult<&Cloth> {
        let count = self.cloths.len();
        self.cloths
            .get(c)
            .ok_or_else(|| PlaitError::InvalidConfig(format!("cloth {c} out of range ({count})")))
    }

    pub fn cloth_mut(&mut self, c: usize) -> PlaitResult<&mut Cloth> {
        let count = self.cloths.len();
        self.cloths
            .get_mut(c)
            .ok_or_else(|| PlaitError::InvalidConfig(format!("cloth {c} out of range ({count})")))
    }

    // ─── Bending ──────────────────────────────────────────────

    pub fn bending_mode(&self, c: usize) -> PlaitResult<BendingMode> {
        Ok(self.cloth(c)?.bending.mode)
    }

    pub fn set_bending_mode(&mut self, c: usize, mode: BendingMode) -> PlaitResult<()> {
        self.cloth_mut(c)?.bending.mode = mode;
        info!(cloth = c, %mode, "bending mode set");
        Ok(())
    }

    /// Bending mode as one of `dde`, `linear_iso`, `linear_aniso`, `nonlinear`.
    pub fn bending_mode_name(&self, c: usize) -> PlaitResult<&'static str> {
        Ok(self.bending_mode(c)?.as_str())
    }

    pub fn set_bending_mode_by_name(&mut self, c: usize, name: &str) -> PlaitResult<()> {
        let mode: BendingMode = name.parse()?;
        self.set_bending_mode(c, mode)
    }

    pub fn bending_model(&self, c: usize) -> PlaitResult<BendingModel> {
        Ok(self.cloth(c)?.bending.model)
    }

    /// Switch between dihedral and quadratic bending. The quadratic cache
    /// is rebuilt before the next solve.
    pub fn set_bending_model(&mut self, c: usize, model: BendingModel) -> PlaitResult<()> {
        let cloth = self.cloth_mut(c)?;
        cloth.bending.model = model;
        cloth.prepare_bending();
        info!(cloth = c, %model, "bending model set");
        Ok(())
    }

    /// Warp, diagonal and weft moduli of the linear modes.
    pub fn linear_bending_modulus(&self, c: usize) -> PlaitResult<DVec3> {
        Ok(self.cloth(c)?.bending.moduli.linear)
    }

    pub fn set_linear_bending_modulus(&mut self, c: usize, modulus: DVec3) -> PlaitResult<()> {
        self.cloth_mut(c)?.bending.moduli.linear = modulus;
        Ok(())
    }

    pub fn nonlinear_bending_modulus(&self, c: usize) -> PlaitResult<[f64; 6]> {
        Ok(self.cloth(c)?.bending.moduli.nonlinear)
    }

    pub fn set_nonlinear_bending_modulus(&mut self, c: usize, modulus: [f64; 6]) -> PlaitResult<()> {
        self.cloth_mut(c)?.bending.moduli.nonlinear = modulus;
        Ok(())
    }

    // ─── Density ──────────────────────────────────────────────

    pub fn density(&self, c: usize, material: usize) -> PlaitResult<f64> {
        let cloth = self.cloth(c)?;
        cloth
            .materials
            .get(material)
            .map(|m| m.density())
            .ok_or_else(|| PlaitError::InvalidMaterial(format!("material {material} out of range")))
    }

    /// Change a material's density and recompute masses right away.
    /// Returns `false` when the value is unchanged (within 1e-6).
    pub fn set_density(&mut self, c: usize, material: usize, density: f64) -> PlaitResult<bool> {
        if !(density > 0.0) {
            return Err(PlaitError::InvalidMaterial(format!(
                "density must be positive, got {density}"
            )));
        }
        self.cloth_mut(c)?.set_density(material, density)
    }

    // ─── Export ───────────────────────────────────────────────

    /// Write cloth `c` in interchange form.
    pub fn dump_cloth<W: Write>(&self, c: usize, out: &mut W) -> PlaitResult<()> {
        write_obj(&self.cloth(c)?.mesh, out)
    }

    pub fn dump_cloth_string(&self, c: usize) -> PlaitResult<String> {
        obj_string(&self.cloth(c)?.mesh)
    }

    /// Write cloth `c` to `path`, replacing any existing file.
    pub fn save_cloth(&self, c: usize, path: impl AsRef<Path>) -> PlaitResult<()> {
        let mut out = BufWriter::new(File::create(path.as_ref())?);
        self.dump_cloth(c, &mut out)?;
        out.flush()?;
        info!(cloth = c, path = %path.as_ref().display(), "cloth saved");
        Ok(())
    }

    /// Node positions and velocities of cloth `c` at the current step.
    pub fn snapshot(&self, c: usize) -> PlaitResult<StateSnapshot> {
        Ok(StateSnapshot::capture(self.step, self.time, &self.cloth(c)?.mesh))
    }
}
