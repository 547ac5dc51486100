//! Handles: scene objects that pin or drive cloth nodes.
//!
//! A handle is active on `[start, end]`, then fades out over `fade`
//! seconds. While active it contributes three axis-aligned pins per node
//! with stiffness `strength(t) · handle_stiffness`; at full strength the
//! pins also snap their node onto the target. A scripted handle moves
//! its target rigidly with a [`Motion`], starting from wherever the node
//! was when the handle first activated.

use plait_math::motion::Motion;
use plait_math::DVec3;
use plait_types::{MeshRef, NodeId, NodeRef};
use serde::{Deserialize, Serialize};

use crate::constraint::{Constraint, EqCon};
use crate::meshes::MeshSet;

/// Activation window shared by all handle kinds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandleWindow {
    pub start: f64,
    pub end: f64,
    pub fade: f64,
}

impl Default for HandleWindow {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: f64::INFINITY,
            fade: 0.0,
        }
    }
}

impl HandleWindow {
    /// 1 inside the window, `(1 − (t − end)/fade)⁴` while fading, else 0.
    pub fn strength(&self, t: f64) -> f64 {
        if t < self.start || t > self.end + self.fade {
            return 0.0;
        }
        if t <= self.end {
            return 1.0;
        }
        let s = 1.0 - (t - self.end) / self.fade;
        let s2 = s * s;
        s2 * s2
    }
}

/// How a handle places its nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HandleKind {
    /// Hold nodes where they were at activation.
    Fixed,
    /// Carry the activation positions along a rigid motion.
    Scripted(Motion),
}

/// Pins a set of cloth nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    pub nodes: Vec<NodeRef>,
    pub kind: HandleKind,
    pub window: HandleWindow,
    /// Rest positions, filled on first activation (in the motion's frame
    /// for scripted handles).
    #[serde(default)]
    anchors: Option<Vec<DVec3>>,
}

impl Handle {
    pub fn fixed(nodes: Vec<NodeRef>) -> Self {
        Self {
            nodes,
            kind: HandleKind::Fixed,
            window: HandleWindow::default(),
            anchors: None,
        }
    }

    pub fn scripted(nodes: Vec<NodeRef>, motion: Motion) -> Self {
        Self {
            nodes,
            kind: HandleKind::Scripted(motion),
            window: HandleWindow::default(),
            anchors: None,
        }
    }

    pub fn with_window(mut self, window: HandleWindow) -> Self {
        self.window = window;
        self
    }

    #[inline]
    pub fn strength(&self, t: f64) -> f64 {
        self.window.strength(t)
    }

    #[inline]
    pub fn is_activated(&self) -> bool {
        self.anchors.is_some()
    }

    /// Target position of each node at time `t`, if activated.
    pub fn targets(&self, t: f64) -> Option<Vec<DVec3>> {
        let anchors = self.anchors.as_ref()?;
        Some(match &self.kind {
            HandleKind::Fixed => anchors.clone(),
            HandleKind::Scripted(motion) => {
                let pose = motion.at(t);
                anchors.iter().map(|&a| pose.apply(a)).collect()
            }
        })
    }

    /// Pins active at time `t`. The first call with nonzero strength
    /// records the anchors from the current node positions.
    pub fn constraints(
        &mut self,
        t: f64,
        stiffness: f64,
        meshes: &MeshSet<'_>,
    ) -> Vec<Constraint> {
        let s = self.strength(t);
        if s == 0.0 {
            return Vec::new();
        }
        if self.anchors.is_none() {
            let inverse = match &self.kind {
                HandleKind::Fixed => None,
                HandleKind::Scripted(motion) => Some(motion.at(t).inverse()),
            };
            self.anchors = Some(
                self.nodes
                    .iter()
                    .map(|&n| {
                        let x = meshes.node(n).x;
                        inverse.map_or(x, |inv| inv.apply(x))
                    })
                    .collect(),
            );
        }
        let Some(targets) = self.targets(t) else {
            return Vec::new();
        };
        let snap = s >= 1.0;
        let mut out = Vec::with_capacity(3 * self.nodes.len());
        for (&node, &x) in self.nodes.iter().zip(&targets) {
            for axis in [DVec3::X, DVec3::Y, DVec3::Z] {
                out.push(Constraint::Pin(
                    EqCon::new(node, x, axis, s * stiffness).snapping(snap),
                ));
            }
        }
        out
    }

    /// Re-address nodes of `cloth` after its topology was rebuilt.
    /// `map[old]` is the new index of an old node, if it survived.
    pub fn remap(&mut self, cloth: usize, map: &[Option<NodeId>]) {
        for node in &mut self.nodes {
            if node.mesh == MeshRef::Cloth(cloth as u32) {
                if let Some(Some(new)) = map.get(node.node.index()) {
                    node.node = *new;
                }
            }
        }
    }
}
