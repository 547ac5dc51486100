//! Keyframed cubic Hermite curves.
//!
//! Used for scripted quantities: obstacle translation, handle motion,
//! morph weights and stiffness, wind. Knot velocities are fitted by
//! finite differences when the curve is built.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A single knot of a [`Spline`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Knot<T> {
    pub t: f64,
    pub x: T,
    pub v: T,
}

/// Piecewise cubic Hermite curve over sorted knots.
///
/// Before the first knot and after the last one the curve is constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spline<T> {
    pub knots: Vec<Knot<T>>,
}

impl<T> Spline<T>
where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f64, Output = T>,
{
    /// Build from `(time, value)` pairs, sorted by time, fitting knot
    /// velocities with central differences (one-sided at the ends).
    pub fn from_points(points: &[(f64, T)]) -> Self {
        let mut sorted = points.to_vec();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        let n = sorted.len();
        let knots = (0..n)
            .map(|i| {
                let (t, x) = sorted[i];
                let v = if n < 2 {
                    x * 0.0
                } else {
                    let lo = i.saturating_sub(1);
                    let hi = (i + 1).min(n - 1);
                    let dt = sorted[hi].0 - sorted[lo].0;
                    if dt > 0.0 {
                        (sorted[hi].1 - sorted[lo].1) * (1.0 / dt)
                    } else {
                        x * 0.0
                    }
                };
                Knot { t, x, v }
            })
            .collect();
        Self { knots }
    }

    /// A curve that is `x` at all times.
    pub fn constant(x: T) -> Self {
        Self::from_points(&[(0.0, x)])
    }

    /// Returns `true` when the curve has no knots.
    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    /// Index of the segment `[knots[i], knots[i+1]]` containing `t`.
    fn segment(&self, t: f64) -> Option<usize> {
        let i = self.knots.partition_point(|k| k.t <= t);
        if i == 0 || i >= self.knots.len() {
            None
        } else {
            Some(i - 1)
        }
    }

    /// Value at time `t`. Returns `None` for an empty curve.
    pub fn pos(&self, t: f64) -> Option<T> {
        let first = self.knots.first()?;
        let last = self.knots.last()?;
        if t <= first.t {
            return Some(first.x);
        }
        if t >= last.t {
            return Some(last.x);
        }
        let i = self.segment(t)?;
        let (k0, k1) = (&self.knots[i], &self.knots[i + 1]);
        let h = k1.t - k0.t;
        let s = (t - k0.t) / h;
        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;
        Some(k0.x * h00 + k0.v * (h10 * h) + k1.x * h01 + k1.v * (h11 * h))
    }

    /// Time derivative at `t`. Zero outside the knot range.
    pub fn vel(&self, t: f64) -> Option<T> {
        let first = self.knots.first()?;
        let i = match self.segment(t) {
            Some(i) => i,
            None => return Some(first.x * 0.0),
        };
        let (k0, k1) = (&self.knots[i], &self.knots[i + 1]);
        let h = k1.t - k0.t;
        let s = (t - k0.t) / h;
        let s2 = s * s;
        let d00 = (6.0 * s2 - 6.0 * s) / h;
        let d10 = 3.0 * s2 - 4.0 * s + 1.0;
        let d01 = (-6.0 * s2 + 6.0 * s) / h;
        let d11 = 3.0 * s2 - 2.0 * s;
        Some(k0.x * d00 + k0.v * d10 + k1.x * d01 + k1.v * d11)
    }
}
