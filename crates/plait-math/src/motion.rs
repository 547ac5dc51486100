//! Rigid motions for scripted obstacles and handles.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::spline::Spline;

/// A similarity transform `x ↦ t + s · R x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: DVec3,
    pub rotation: DQuat,
    pub scale: f64,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
        scale: 1.0,
    };

    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Apply to a point.
    #[inline]
    pub fn apply(&self, x: DVec3) -> DVec3 {
        self.translation + self.rotation * x * self.scale
    }

    /// Apply to a direction (no translation, no scale).
    #[inline]
    pub fn apply_direction(&self, v: DVec3) -> DVec3 {
        self.rotation * v
    }

    /// Inverse transform. A zero scale maps everything to the origin.
    pub fn inverse(&self) -> Self {
        let inv_rot = self.rotation.inverse();
        let inv_scale = if self.scale != 0.0 { 1.0 / self.scale } else { 0.0 };
        Self {
            translation: -(inv_rot * self.translation) * inv_scale,
            rotation: inv_rot,
            scale: inv_scale,
        }
    }

    /// `self ∘ other`: apply `other` first.
    pub fn compose(&self, other: &Transform) -> Self {
        Self {
            translation: self.apply(other.translation),
            rotation: self.rotation * other.rotation,
            scale: self.scale * other.scale,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Keyframed rigid motion.
///
/// Translation follows a Hermite spline, rotation is slerped between
/// neighbouring keyframes, scale is interpolated linearly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    translation: Spline<DVec3>,
    scale: Spline<f64>,
    keys: Vec<(f64, DQuat)>,
}

impl Motion {
    /// Build from `(time, transform)` keyframes.
    pub fn new(keyframes: &[(f64, Transform)]) -> Self {
        let mut keys: Vec<(f64, Transform)> = keyframes.to_vec();
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        let translation = Spline::from_points(
            &keys.iter().map(|(t, x)| (*t, x.translation)).collect::<Vec<_>>(),
        );
        let scale = Spline::from_points(&keys.iter().map(|(t, x)| (*t, x.scale)).collect::<Vec<_>>());
        Self {
            translation,
            scale,
            keys: keys.iter().map(|(t, x)| (*t, x.rotation)).collect(),
        }
    }

    fn rotation_at(&self, t: f64) -> DQuat {
        let i = self.keys.partition_point(|(kt, _)| *kt <= t);
        match i {
            0 => self.keys.first().map_or(DQuat::IDENTITY, |k| k.1),
            i if i >= self.keys.len() => self.keys.last().map_or(DQuat::IDENTITY, |k| k.1),
            i => {
                let (t0, q0) = self.keys[i - 1];
                let (t1, q1) = self.keys[i];
                q0.slerp(q1, (t - t0) / (t1 - t0))
            }
        }
    }

    /// Pose at time `t`.
    pub fn at(&self, t: f64) -> Transform {
        Transform {
            translation: self.translation.pos(t).unwrap_or(DVec3::ZERO),
            rotation: self.rotation_at(t),
            scale: self.scale.pos(t).unwrap_or(1.0),
        }
    }

    /// The relative motion that carries the pose at `t0` to the pose at `t1`.
    pub fn delta(&self, t0: f64, t1: f64) -> Transform {
        self.at(t1).compose(&self.at(t0).inverse())
    }
}
