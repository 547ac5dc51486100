//! A simulated cloth: one mesh, its materials and per-cloth settings.

use std::fmt;
use std::str::FromStr;

use plait_material::bending::bending_stiffness;
use plait_material::{BendingMode, BendingModuli, Material};
use plait_mesh::Mesh;
use plait_types::{EdgeId, PlaitError, PlaitResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::discrete_shells::QuadraticBending;

/// Which bending energy drives interior edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BendingModel {
    /// Dihedral-angle springs scaled by `l²/(2A)`.
    #[default]
    Dihedral,
    /// Cotangent-weighted quadratic energy with a cached Hessian.
    Quadratic,
}

impl BendingModel {
    pub fn as_str(self) -> &'static str {
        match self {
            BendingModel::Dihedral => "dihedral",
            BendingModel::Quadratic => "quadratic",
        }
    }
}

impl fmt::Display for BendingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BendingModel {
    type Err = PlaitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dihedral" => Ok(BendingModel::Dihedral),
            "quadratic" => Ok(BendingModel::Quadratic),
            other => Err(PlaitError::InvalidConfig(format!(
                "unrecognized bending model '{other}'"
            ))),
        }
    }
}

/// Runtime-selectable bending behaviour of one cloth.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BendingSettings {
    pub model: BendingModel,
    pub mode: BendingMode,
    pub moduli: BendingModuli,
    /// Rotation of the material frame for the measured (`dde`) table.
    pub initial_angle: f64,
}

/// Adaptive remeshing parameters of one cloth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemeshConfig {
    /// Target dihedral angle per edge (radians).
    pub refine_angle: f64,
    /// Target compression per edge before buckling is resolved.
    pub refine_compression: f64,
    /// Target relative velocity change per edge.
    pub refine_velocity: f64,
    /// Smallest allowed edge length (meters).
    pub size_min: f64,
    /// Largest allowed edge length (meters).
    pub size_max: f64,
    /// Smallest allowed triangle aspect ratio.
    pub aspect_min: f64,
    /// Refinement stops once the mesh has this many edges.
    pub max_edges: usize,
}

impl Default for RemeshConfig {
    fn default() -> Self {
        Self {
            refine_angle: 0.3,
            refine_compression: 0.005,
            refine_velocity: 0.5,
            size_min: 10e-3,
            size_max: 100e-3,
            aspect_min: 0.2,
            max_edges: 200_000,
        }
    }
}

/// A cloth mesh with one material per face label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cloth {
    pub mesh: Mesh,
    pub materials: Vec<Material>,
    #[serde(default)]
    pub bending: BendingSettings,
    #[serde(default)]
    pub remeshing: RemeshConfig,
    #[serde(skip)]
    quadratic: QuadraticBending,
}

impl Cloth {
    /// Errors when there is no material or a face label has none.
    pub fn new(mesh: Mesh, materials: Vec<Material>) -> PlaitResult<Self> {
        let cloth = Self {
            mesh,
            materials,
            bending: BendingSettings::default(),
            remeshing: RemeshConfig::default(),
            quadratic: QuadraticBending::default(),
        };
        cloth.validate()?;
        Ok(cloth)
    }

    /// Every face label must name a material.
    pub fn validate(&self) -> PlaitResult<()> {
        if self.materials.is_empty() {
            return Err(PlaitError::InvalidMaterial("cloth has no materials".into()));
        }
        if let Some(face) = self
            .mesh
            .faces
            .iter()
            .find(|f| f.label as usize >= self.materials.len())
        {
            return Err(PlaitError::InvalidMaterial(format!(
                "face {} has label {} but only {} materials exist",
                face.index,
                face.label,
                self.materials.len()
            )));
        }
        Ok(())
    }

    /// The material of a face label.
    #[inline]
    pub fn material(&self, label: u32) -> &Material {
        &self.materials[label as usize]
    }

    /// Face mass `a · density`, shared one third to each vert and node.
    pub fn compute_masses(&mut self) {
        for v in &mut self.mesh.verts {
            v.m = 0.0;
        }
        for n in &mut self.mesh.nodes {
            n.m = 0.0;
        }
        for f in 0..self.mesh.faces.len() {
            let label = self.mesh.faces[f].label as usize;
            let m = self.mesh.faces[f].a * self.materials[label].density();
            self.mesh.faces[f].m = m;
            for i in 0..3 {
                let v = self.mesh.faces[f].v[i].index();
                self.mesh.verts[v].m += m / 3.0;
                let n = self.mesh.verts[v].node.index();
                self.mesh.nodes[n].m += m / 3.0;
            }
        }
    }

    /// Change the density of material `index` and redistribute masses.
    /// Returns `false` (and touches nothing) when the change is below 1e-6.
    pub fn set_density(&mut self, index: usize, density: f64) -> PlaitResult<bool> {
        let count = self.materials.len();
        let material = self.materials.get_mut(index).ok_or_else(|| {
            PlaitError::InvalidMaterial(format!("material {index} out of range ({count})"))
        })?;
        if (material.density() - density).abs() < 1e-6 {
            return Ok(false);
        }
        debug!(index, old = material.density(), new = density, "density changed");
        material.set_density(density);
        self.compute_masses();
        Ok(true)
    }

    /// Bending stiffness of `edge` as seen from face `side`.
    pub fn bending_stiffness(&self, edge: EdgeId, side: usize) -> f64 {
        let Some(face) = self.mesh.edge(edge).adj_faces[side] else {
            return 0.0;
        };
        let material = self.material(self.mesh.face(face).label);
        bending_stiffness(
            &self.mesh,
            edge,
            side,
            material.bending(),
            self.bending.mode,
            &self.bending.moduli,
            self.bending.initial_angle,
        )
    }

    /// Bring the quadratic bending cache up to date with the topology.
    pub fn prepare_bending(&mut self) {
        if self.bending.model == BendingModel::Quadratic {
            self.quadratic.prepare(&self.mesh);
        }
    }

    #[inline]
    pub fn quadratic_bending(&self) -> &QuadraticBending {
        &self.quadratic
    }
}
