//! Morph targets: time-varying poses that pull cloth verts toward a
//! weighted blend of target meshes.

use plait_math::spline::Spline;
use plait_math::{DMat3, DVec2, DVec3};
use plait_mesh::{Mesh, Space};
use serde::{Deserialize, Serialize};

use crate::cloth::Cloth;

/// A blend of target meshes that shares the cloth's material space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Morph {
    /// Index of the driven cloth.
    pub cloth: usize,
    pub targets: Vec<Mesh>,
    /// One weight curve per target.
    pub weights: Vec<Spline<f64>>,
    /// Natural log of the per-area attraction stiffness.
    pub log_stiffness: Spline<f64>,
}

impl Morph {
    /// Weight of each target at time `t`.
    pub fn weights_at(&self, t: f64) -> Vec<f64> {
        self.weights
            .iter()
            .map(|w| w.pos(t).unwrap_or(0.0))
            .collect()
    }

    /// Blended target position of material point `u` at time `t`.
    pub fn pos(&self, t: f64, u: DVec2) -> DVec3 {
        let weights = self.weights_at(t);
        let mut x = DVec3::ZERO;
        for (target, &w) in self.targets.iter().zip(&weights) {
            if w == 0.0 {
                continue;
            }
            let Some(face) = target.enclosing_face(u) else {
                continue;
            };
            let b = target.material_barycentric(face, u);
            x += w * target.interpolate(face, b, Space::World);
        }
        x
    }

    /// Per-area stiffness at time `t`.
    pub fn stiffness(&self, t: f64) -> f64 {
        self.log_stiffness.pos(t).unwrap_or(f64::NEG_INFINITY).exp()
    }

    /// Add spring-damper forces toward the blended pose.
    pub fn add_forces(&self, cloth: &Cloth, t: f64, dt: f64, fext: &mut [DVec3], jext: &mut [DMat3]) {
        let mesh = &cloth.mesh;
        let stiffness = self.stiffness(t);
        for vert in &mesh.verts {
            let x = self.pos(t, vert.u);
            let node = mesh.node(vert.node);
            let s = stiffness * vert.a;
            if s == 0.0 {
                continue;
            }
            let k = DMat3::from_diagonal(DVec3::splat(s));
            // Subcritical damping.
            let c = (s * vert.m).sqrt();
            let d = k * (c / s);
            let n = vert.node.index();
            fext[n] -= k * (node.x - x);
            fext[n] -= d * node.v;
            jext[n] -= k + d * (1.0 / dt);
        }
    }
}
