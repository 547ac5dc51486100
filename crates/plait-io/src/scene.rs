//! Typed scene description.
//!
//! A [`SceneDescription`] is everything a simulation needs at load time:
//! cloths with their materials, obstacles with their motions, handles,
//! timing, environment and the per-pass configurations. It derives serde
//! traits so hosts can feed it from JSON, TOML or any other format.

use std::path::PathBuf;

use plait_contact::{ContactConfig, Friction};
use plait_material::{FabricProperties, MaterialDatabase};
use plait_math::motion::{Motion, Transform};
use plait_math::DVec3;
use plait_mesh::generators::quad_grid;
use plait_mesh::normals::compute_ws_data;
use plait_mesh::topology::mark_nodes_to_preserve;
use plait_mesh::Mesh;
use plait_solver::{BendingSettings, HandleWindow, RemeshConfig, SolverConfig, Wind};
use plait_types::constants::{DEFAULT_FRAME_STEPS, DEFAULT_STEP_TIME, GRAVITY};
use plait_types::{PlaitError, PlaitResult};
use serde::{Deserialize, Serialize};

use crate::obj::{load_obj, parse_obj};

/// Passes of the simulation step that can be switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modules {
    pub proximity: bool,
    pub physics: bool,
    pub strain_limiting: bool,
    pub collision: bool,
    pub remeshing: bool,
    pub separation: bool,
    pub pop_filter: bool,
    pub plasticity: bool,
}

impl Default for Modules {
    fn default() -> Self {
        Self::all()
    }
}

impl Modules {
    pub fn all() -> Self {
        Self {
            proximity: true,
            physics: true,
            strain_limiting: true,
            collision: true,
            remeshing: true,
            separation: true,
            pop_filter: true,
            plasticity: true,
        }
    }

    pub fn none() -> Self {
        Self {
            proximity: false,
            physics: false,
            strain_limiting: false,
            collision: false,
            remeshing: false,
            separation: false,
            pop_filter: false,
            plasticity: false,
        }
    }

    /// Physics only: no contact, remeshing or plasticity.
    pub fn physics_only() -> Self {
        Self {
            physics: true,
            ..Self::none()
        }
    }

    fn flag(&mut self, name: &str) -> PlaitResult<&mut bool> {
        Ok(match name {
            "proximity" => &mut self.proximity,
            "physics" => &mut self.physics,
            "strainlimiting" | "strain_limiting" => &mut self.strain_limiting,
            "collision" => &mut self.collision,
            "remeshing" => &mut self.remeshing,
            "separation" => &mut self.separation,
            "popfilter" | "pop_filter" => &mut self.pop_filter,
            "plasticity" => &mut self.plasticity,
            other => {
                return Err(PlaitError::InvalidConfig(format!("unknown module '{other}'")));
            }
        })
    }

    /// Switch off a module by name.
    pub fn disable(&mut self, name: &str) -> PlaitResult<()> {
        *self.flag(name)? = false;
        Ok(())
    }

    pub fn enable(&mut self, name: &str) -> PlaitResult<()> {
        *self.flag(name)? = true;
        Ok(())
    }
}

/// Where a mesh comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeshSource {
    /// An interchange file on disk.
    File { path: PathBuf },
    /// Interchange text held in the scene.
    Text { obj: String },
    /// A flat rectangle of `cols × rows` quads, two triangles each.
    Grid {
        cols: usize,
        rows: usize,
        width: f64,
        height: f64,
    },
}

impl MeshSource {
    /// Load the mesh with all derived data and `preserve` flags set.
    pub fn load(&self) -> PlaitResult<Mesh> {
        match self {
            MeshSource::File { path } => load_obj(path),
            MeshSource::Text { obj } => parse_obj(obj),
            MeshSource::Grid {
                cols,
                rows,
                width,
                height,
            } => {
                let mut mesh = quad_grid(*cols, *rows, *width, *height)?;
                mark_nodes_to_preserve(&mut mesh);
                Ok(mesh)
            }
        }
    }
}

/// A time-stamped pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f64,
    pub transform: Transform,
}

/// Motion through `keyframes`, or `None` when there are none.
pub fn motion_from_keyframes(keyframes: &[Keyframe]) -> Option<Motion> {
    if keyframes.is_empty() {
        return None;
    }
    let keys: Vec<(f64, Transform)> = keyframes.iter().map(|k| (k.time, k.transform)).collect();
    Some(Motion::new(&keys))
}

/// Apply a rigid transform to the world-space state of a freshly loaded
/// mesh.
pub fn place_mesh(mesh: &mut Mesh, transform: &Transform) {
    if *transform == Transform::IDENTITY {
        return;
    }
    for node in &mut mesh.nodes {
        node.x = transform.apply(node.x);
        node.x0 = node.x;
        node.y = transform.apply(node.y);
        node.v = transform.apply_direction(node.v);
    }
    compute_ws_data(mesh);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClothDescription {
    pub mesh: MeshSource,
    #[serde(default)]
    pub transform: Transform,
    /// One material per face label.
    #[serde(default)]
    pub materials: Vec<FabricProperties>,
    /// Built-in presets, labelled after `materials`.
    #[serde(default)]
    pub presets: Vec<String>,
    #[serde(default)]
    pub bending: BendingSettings,
    #[serde(default)]
    pub remeshing: RemeshConfig,
}

impl ClothDescription {
    /// Explicit materials followed by the named presets.
    pub fn fabrics(&self) -> PlaitResult<Vec<FabricProperties>> {
        let mut fabrics = self.materials.clone();
        if !self.presets.is_empty() {
            let db = MaterialDatabase::with_defaults();
            for name in &self.presets {
                fabrics.push(db.require(name)?);
            }
        }
        Ok(fabrics)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleDescription {
    pub mesh: MeshSource,
    #[serde(default)]
    pub transform: Transform,
    /// Rigid motion applied on top of `transform`; empty means static.
    #[serde(default)]
    pub motion: Vec<Keyframe>,
    /// Obstacle exists from this time.
    #[serde(default)]
    pub start_time: f64,
    /// Obstacle stops colliding after this time.
    #[serde(default)]
    pub end_time: Option<f64>,
}

/// Nodes a handle grabs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeSelection {
    /// Explicit 0-based node indices.
    Nodes(Vec<usize>),
    /// Every node carrying this label.
    Label(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandleDescription {
    pub cloth: usize,
    pub select: NodeSelection,
    /// Scripted motion; empty holds the nodes in place.
    #[serde(default)]
    pub motion: Vec<Keyframe>,
    #[serde(default)]
    pub start_time: f64,
    /// Handle lets go after this time; `None` holds forever.
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub fade_time: f64,
}

impl HandleDescription {
    pub fn window(&self) -> HandleWindow {
        HandleWindow {
            start: self.start_time,
            end: self.end_time.unwrap_or(f64::INFINITY),
            fade: self.fade_time,
        }
    }
}

/// Everything needed to build a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    /// Simulated seconds per step.
    pub step_time: f64,
    /// Steps per output frame (and between remeshes).
    pub frame_steps: u32,
    pub end_time: Option<f64>,
    pub end_frame: Option<u32>,
    pub gravity: DVec3,
    pub wind: Wind,
    pub friction: Friction,
    pub modules: Modules,
    /// Remesh once with static topology, then keep the mesh fixed.
    pub fixed_high_res_mesh: bool,
    /// Take the initial curvature as the plastic rest state.
    pub preserve_creases: bool,
    pub solver: SolverConfig,
    pub contact: ContactConfig,
    pub cloths: Vec<ClothDescription>,
    pub obstacles: Vec<ObstacleDescription>,
    pub handles: Vec<HandleDescription>,
}

impl Default for SceneDescription {
    fn default() -> Self {
        Self {
            step_time: DEFAULT_STEP_TIME,
            frame_steps: DEFAULT_FRAME_STEPS,
            end_time: None,
            end_frame: None,
            gravity: DVec3::new(0.0, 0.0, -GRAVITY),
            wind: Wind::default(),
            friction: Friction::default(),
            modules: Modules::default(),
            fixed_high_res_mesh: false,
            preserve_creases: false,
            solver: SolverConfig::default(),
            contact: ContactConfig::default(),
            cloths: Vec::new(),
            obstacles: Vec::new(),
            handles: Vec::new(),
        }
    }
}

impl SceneDescription {
    /// Seconds per output frame.
    pub fn frame_time(&self) -> f64 {
        self.step_time * self.frame_steps as f64
    }
}
