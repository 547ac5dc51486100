//! The simulation aggregate.
//!
//! [`Simulation`] owns every cloth, obstacle, handle and morph of a scene
//! together with the clock, the module switches and the per-pass
//! configurations. It is built from a [`SceneDescription`], then
//! [`prepare`](Simulation::prepare)d and relaxed before stepping.

use std::time::Instant;

use plait_contact::{ContactConfig, Friction};
use plait_debug::InspectionHook;
use plait_io::scene::{motion_from_keyframes, place_mesh};
use plait_io::{validate_scene, HandleDescription, Modules, NodeSelection, SceneDescription};
use plait_material::Material;
use plait_math::DVec3;
use plait_solver::{Cloth, Handle, Morph, SolverConfig, Wind};
use plait_telemetry::{EventBus, EventKind, Phase, SimulationEvent};
use plait_types::{MeshRef, NodeRef, PlaitError, PlaitResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::obstacle::Obstacle;

/// How [`Simulation::relax_initial_state`] settles the loaded cloth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialRelaxation {
    /// Equilibrate, remesh, equilibrate.
    #[default]
    Equilibrate,
    /// Remesh and zero the strain, twice.
    StrainZeroing,
}

pub struct Simulation {
    // Clock.
    pub time: f64,
    pub step: u32,
    pub frame: u32,

    // Timing.
    pub step_time: f64,
    pub frame_steps: u32,
    pub end_time: Option<f64>,
    pub end_frame: Option<u32>,

    // Environment.
    pub gravity: DVec3,
    pub wind: Wind,
    pub friction: Friction,

    pub modules: Modules,
    pub fixed_high_res_mesh: bool,
    pub preserve_creases: bool,
    pub relaxation: InitialRelaxation,
    pub solver: SolverConfig,
    pub contact: ContactConfig,

    pub cloths: Vec<Cloth>,
    pub obstacles: Vec<Obstacle>,
    pub handles: Vec<Handle>,
    pub morphs: Vec<Morph>,

    bus: Option<EventBus>,
    hook: Option<Box<dyn InspectionHook>>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("time", &self.time)
            .field("step", &self.step)
            .field("frame", &self.frame)
            .field("cloths", &self.cloths.len())
            .field("obstacles", &self.obstacles.len())
            .field("handles", &self.handles.len())
            .field("modules", &self.modules)
            .finish_non_exhaustive()
    }
}

fn resolve_handle(h: usize, desc: &HandleDescription, cloth: &Cloth) -> PlaitResult<Handle> {
    let mesh = &cloth.mesh;
    let nodes: Vec<usize> = match &desc.select {
        NodeSelection::Nodes(nodes) => {
            if let Some(&bad) = nodes.iter().find(|&&n| n >= mesh.node_count()) {
                return Err(PlaitError::InvalidConfig(format!(
                    "Handle {h} selects node {bad} but cloth {} has {} nodes",
                    desc.cloth,
                    mesh.node_count()
                )));
            }
            nodes.clone()
        }
        NodeSelection::Label(label) => mesh
            .nodes
            .iter()
            .filter(|n| n.label == *label)
            .map(|n| n.index)
            .collect(),
    };
    if nodes.is_empty() {
        return Err(PlaitError::InvalidConfig(format!("Handle {h} selects no nodes")));
    }
    let refs = nodes.into_iter().map(|n| NodeRef::cloth(desc.cloth, n)).collect();
    let handle = match motion_from_keyframes(&desc.motion) {
        Some(motion) => Handle::scripted(refs, motion),
        None => Handle::fixed(refs),
    };
    Ok(handle.with_window(desc.window()))
}

impl Simulation {
    /// An empty simulation with default timing and environment.
    pub fn new() -> Self {
        Self::with_settings(&SceneDescription::default())
    }

    fn with_settings(scene: &SceneDescription) -> Self {
        Self {
            time: 0.0,
            step: 0,
            frame: 0,
            step_time: scene.step_time,
            frame_steps: scene.frame_steps,
            end_time: scene.end_time,
            end_frame: scene.end_frame,
            gravity: scene.gravity,
            wind: scene.wind,
            friction: scene.friction,
            modules: scene.modules,
            fixed_high_res_mesh: scene.fixed_high_res_mesh,
            preserve_creases: scene.preserve_creases,
            relaxation: InitialRelaxation::default(),
            solver: scene.solver.clone(),
            contact: scene.contact,
            cloths: Vec::new(),
            obstacles: Vec::new(),
            handles: Vec::new(),
            morphs: Vec::new(),
            bus: None,
            hook: None,
        }
    }

    /// Validate `scene`, load its meshes and build a prepared simulation.
    pub fn from_scene(scene: &SceneDescription) -> PlaitResult<Self> {
        validate_scene(scene)?;
        let mut sim = Self::with_settings(scene);

        for desc in &scene.cloths {
            let mut mesh = desc.mesh.load()?;
            place_mesh(&mut mesh, &desc.transform);
            let materials = desc.fabrics()?.into_iter().map(Material::new).collect();
            let mut cloth = Cloth::new(mesh, materials)?;
            cloth.bending = desc.bending;
            cloth.remeshing = desc.remeshing;
            sim.cloths.push(cloth);
        }
        for desc in &scene.obstacles {
            let mut mesh = desc.mesh.load()?;
            place_mesh(&mut mesh, &desc.transform);
            let obstacle = Obstacle::new(mesh, motion_from_keyframes(&desc.motion))
                .with_window(desc.start_time, desc.end_time.unwrap_or(f64::INFINITY));
            sim.obstacles.push(obstacle);
        }
        for (h, desc) in scene.handles.iter().enumerate() {
            sim.handles.push(resolve_handle(h, desc, &sim.cloths[desc.cloth])?);
        }

        sim.prepare();
        info!(
            cloths = sim.cloths.len(),
            obstacles = sim.obstacles.len(),
            handles = sim.handles.len(),
            "simulation loaded"
        );
        Ok(sim)
    }

    /// Compute cloth masses and take the current positions of every cloth
    /// and obstacle as their previous positions.
    pub fn prepare(&mut self) {
        for cloth in &mut self.cloths {
            cloth.compute_masses();
            cloth.mesh.update_x0();
        }
        let time = self.time;
        for obstacle in &mut self.obstacles {
            obstacle.pose_at(time);
            obstacle.mesh.update_x0();
        }
    }

    /// Every node a handle holds must survive remeshing.
    pub fn validate_handles(&self) -> PlaitResult<()> {
        for (h, handle) in self.handles.iter().enumerate() {
            for node in &handle.nodes {
                let MeshRef::Cloth(c) = node.mesh else {
                    continue;
                };
                let preserved = self
                    .cloths
                    .get(c as usize)
                    .and_then(|cloth| cloth.mesh.nodes.get(node.node.index()))
                    .map(|n| n.preserve);
                match preserved {
                    Some(true) => {}
                    Some(false) => {
                        return Err(PlaitError::InvariantViolation(format!(
                            "Constrained node {} of cloth {c} (handle {h}) will not be preserved by remeshing",
                            node.node.index()
                        )));
                    }
                    None => {
                        return Err(PlaitError::InvariantViolation(format!(
                            "Handle {h} refers to missing node {} of cloth {c}",
                            node.node.index()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Seconds per output frame.
    pub fn frame_time(&self) -> f64 {
        self.step_time * self.frame_steps as f64
    }

    /// Whether the configured end time or end frame has been reached.
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some_and(|t| self.time >= t)
            || self.end_frame.is_some_and(|f| self.frame >= f)
    }

    /// Positions of all cloth nodes, cloth after cloth.
    pub fn cloth_positions(&self) -> Vec<DVec3> {
        self.cloths
            .iter()
            .flat_map(|c| c.mesh.nodes.iter().map(|n| n.x))
            .collect()
    }

    /// Kinetic energy `Σ m v²/2` of all cloth nodes.
    pub fn kinetic_energy(&self) -> f64 {
        self.cloths
            .iter()
            .flat_map(|c| &c.mesh.nodes)
            .map(|n| 0.5 * n.m * n.v.length_squared())
            .sum()
    }

    pub fn add_morph(&mut self, morph: Morph) -> PlaitResult<()> {
        if morph.cloth >= self.cloths.len() {
            return Err(PlaitError::InvalidConfig(format!(
                "morph drives cloth {} but there are {}",
                morph.cloth,
                self.cloths.len()
            )));
        }
        self.morphs.push(morph);
        Ok(())
    }

    // ─── Telemetry ────────────────────────────────────────────

    /// Route step events through `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn set_event_bus(&mut self, bus: Option<EventBus>) {
        self.bus = bus;
    }

    pub fn event_bus_mut(&mut self) -> Option<&mut EventBus> {
        self.bus.as_mut()
    }

    pub fn set_hook(&mut self, hook: Option<Box<dyn InspectionHook>>) {
        self.hook = hook;
    }

    /// Tell the hook and the bus sinks the run is over.
    pub fn finish(&mut self) {
        if let Some(hook) = &mut self.hook {
            hook.on_simulation_end();
        }
        if let Some(bus) = &mut self.bus {
            bus.finish();
        }
    }

    pub(crate) fn emit(&self, kind: EventKind) {
        if let Some(bus) = &self.bus {
            bus.emit(SimulationEvent::new(self.step, kind));
        }
    }

    pub(crate) fn flush_events(&mut self) {
        if let Some(bus) = &mut self.bus {
            bus.flush();
        }
    }

    pub(crate) fn begin_step(&mut self) {
        let (step, time, dt) = (self.step, self.time, self.step_time);
        if let Some(hook) = &mut self.hook {
            hook.on_step_begin(step, time, dt);
        }
        self.emit(EventKind::StepBegin { time, dt });
    }

    pub(crate) fn end_step(&mut self, started: Instant) {
        let wall_time = started.elapsed().as_secs_f64();
        let step = self.step;
        if let Some(hook) = &mut self.hook {
            hook.on_step_end(step, wall_time);
        }
        self.emit(EventKind::StepEnd { wall_time });
        self.flush_events();
    }

    /// Run one pass and report its timing.
    pub(crate) fn timed<R>(
        &mut self,
        phase: Phase,
        pass: impl FnOnce(&mut Self) -> PlaitResult<R>,
    ) -> PlaitResult<R> {
        let started = Instant::now();
        let result = pass(self)?;
        let wall_time = started.elapsed().as_secs_f64();
        let step = self.step;
        if let Some(hook) = &mut self.hook {
            hook.on_phase(step, phase, wall_time);
        }
        self.emit(EventKind::PhaseComplete { phase, wall_time });
        debug!(step, %phase, wall_time, "pass complete");
        Ok(result)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}
