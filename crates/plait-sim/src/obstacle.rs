//! Rigid, possibly scripted obstacles.
//!
//! An obstacle keeps its base pose and drives its mesh from a [`Motion`].
//! Each step the scripted pose is blended with the previous one so that
//! sudden keyframe changes do not inject velocity spikes into contacts.

use plait_math::motion::{Motion, Transform};
use plait_math::DVec3;
use plait_mesh::normals::compute_ws_data;
use plait_mesh::Mesh;
use plait_types::constants::OBSTACLE_DECAY_TIME;
use serde::{Deserialize, Serialize};

/// A collision mesh moved by an optional rigid motion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    /// Current state: positions, previous positions and velocities.
    pub mesh: Mesh,
    /// Node positions before any motion is applied.
    base: Vec<DVec3>,
    pub motion: Option<Motion>,
    /// Obstacle takes part in contacts from this time...
    pub start_time: f64,
    /// ...until this time.
    pub end_time: f64,
    activated: bool,
}

/// Exponential smoothing weight of one step of length `dt`.
pub fn blend_factor(dt: f64) -> f64 {
    let blend = dt / OBSTACLE_DECAY_TIME;
    blend / (1.0 + blend)
}

impl Obstacle {
    /// An obstacle whose current pose is `mesh` with `motion` on top.
    pub fn new(mesh: Mesh, motion: Option<Motion>) -> Self {
        let base = mesh.nodes.iter().map(|n| n.x).collect();
        Self {
            mesh,
            base,
            motion,
            start_time: 0.0,
            end_time: f64::INFINITY,
            activated: false,
        }
    }

    /// A mesh that never moves.
    pub fn fixed(mesh: Mesh) -> Self {
        Self::new(mesh, None)
    }

    pub fn with_window(mut self, start: f64, end: f64) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    #[inline]
    pub fn is_active(&self, time: f64) -> bool {
        time >= self.start_time && time <= self.end_time
    }

    fn pose(&self, time: f64) -> Transform {
        self.motion.as_ref().map_or(Transform::IDENTITY, |m| m.at(time))
    }

    /// Move the mesh to its scripted pose at `time`. The first call also
    /// takes that pose as the previous positions.
    pub fn pose_at(&mut self, time: f64) {
        if self.motion.is_some() {
            let pose = self.pose(time);
            for (node, &x) in self.mesh.nodes.iter_mut().zip(&self.base) {
                node.x = pose.apply(x);
            }
            compute_ws_data(&mut self.mesh);
        }
        if !self.activated {
            self.mesh.update_x0();
            self.activated = true;
        }
    }

    /// Pull the freshly posed mesh back toward the previous pose carried
    /// along the motion of the last step: `x = x0' + blend (x − x0')`.
    pub fn blend_with_previous(&mut self, time: f64, dt: f64, blend: f64) {
        let carry = self
            .motion
            .as_ref()
            .map_or(Transform::IDENTITY, |m| m.delta(time - dt, time));
        for node in &mut self.mesh.nodes {
            let x0 = carry.apply(node.x0);
            node.x = x0 + blend * (node.x - x0);
        }
        compute_ws_data(&mut self.mesh);
    }

    /// One step of obstacle motion. Without `update_positions` the nodes
    /// are put back at `x0` and only keep the implied velocity.
    pub fn advance(&mut self, time: f64, dt: f64, update_positions: bool) {
        self.pose_at(time);
        self.blend_with_previous(time, dt, blend_factor(dt));
        if !update_positions {
            for node in &mut self.mesh.nodes {
                node.v = (node.x - node.x0) / dt;
                node.x = node.x0;
            }
            compute_ws_data(&mut self.mesh);
        }
    }
}

/// Meshes of the obstacles active at `time`, in scene order.
pub fn active_meshes(obstacles: &[Obstacle], time: f64) -> Vec<&Mesh> {
    obstacles
        .iter()
        .filter(|o| o.is_active(time))
        .map(|o| &o.mesh)
        .collect()
}

/// Mutable form of [`active_meshes`].
pub fn active_meshes_mut(obstacles: &mut [Obstacle], time: f64) -> Vec<&mut Mesh> {
    obstacles
        .iter_mut()
        .filter(|o| o.is_active(time))
        .map(|o| &mut o.mesh)
        .collect()
}

