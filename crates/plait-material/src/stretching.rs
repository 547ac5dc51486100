//! Tabulated nonlinear stretching stiffness.
//!
//! Measured data gives four stiffness coefficients `(k00, k01, k11, kshear)`
//! at two strain levels and five directions between warp and weft. The
//! table is resampled once per material onto a regular 30³ grid over the
//! Green strain `(G00, G11, |G01|)`, which is then interpolated per face.

use plait_math::decomposition::eigen_symmetric_2x2;
use plait_math::{DMat2, DVec2, DVec4};
use serde::{Deserialize, Serialize};

/// Grid resolution along each strain axis.
pub const SAMPLES: usize = 30;

/// Measured stretching coefficients: `d[strain][direction]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StretchingData {
    pub d: [[DVec4; 5]; 2],
}

impl StretchingData {
    /// The same coefficients at every strain level and direction.
    pub fn uniform(k: DVec4) -> Self {
        Self { d: [[k; 5]; 2] }
    }
}

/// Stiffness resampled on the regular strain grid.
#[derive(Debug, Clone, PartialEq)]
pub struct StretchingSamples {
    s: Vec<DVec4>,
}

#[inline]
fn grid_index(i: usize, j: usize, k: usize) -> usize {
    (i * SAMPLES + j) * SAMPLES + k
}

impl StretchingSamples {
    /// Evaluate `data` at every grid point.
    pub fn evaluate(data: &StretchingData) -> Self {
        let n = SAMPLES as f64;
        let mut s = vec![DVec4::ZERO; SAMPLES * SAMPLES * SAMPLES];
        for i in 0..SAMPLES {
            for j in 0..SAMPLES {
                for k in 0..SAMPLES {
                    let g00 = -0.25 + i as f64 / n;
                    let g11 = -0.25 + j as f64 / n;
                    let g01 = k as f64 / n;
                    let g = DMat2::from_cols(DVec2::new(g00, g01), DVec2::new(g01, g11));
                    s[grid_index(i, j, k)] = evaluate_sample(g, data);
                }
            }
        }
        Self { s }
    }

    /// Trilinear lookup of the stiffness at Green strain `g`.
    pub fn stiffness(&self, g: DMat2) -> DVec4 {
        let n = SAMPLES as f64;
        let hi = n - 1.0 - 1e-5;
        let a = ((g.x_axis.x + 0.25) * n).clamp(0.0, hi);
        let b = ((g.y_axis.y + 0.25) * n).clamp(0.0, hi);
        let c = (g.y_axis.x.abs() * n).clamp(0.0, hi);
        let ai = (a.floor() as usize).min(SAMPLES - 2);
        let bi = (b.floor() as usize).min(SAMPLES - 2);
        let ci = (c.floor() as usize).min(SAMPLES - 2);
        let (a, b, c) = (a - ai as f64, b - bi as f64, c - ci as f64);

        let mut out = DVec4::ZERO;
        for (di, wa) in [(0, 1.0 - a), (1, a)] {
            for (dj, wb) in [(0, 1.0 - b), (1, b)] {
                for (dk, wc) in [(0, 1.0 - c), (1, c)] {
                    out += self.s[grid_index(ai + di, bi + dj, ci + dk)] * (wa * wb * wc);
                }
            }
        }
        out
    }
}

/// Interpolate the measured table at one strain: by principal direction
/// (warp to weft in five steps) and by first principal stretch.
fn evaluate_sample(g: DMat2, data: &StretchingData) -> DVec4 {
    let c = g * 2.0 + DMat2::IDENTITY;
    let eig = eigen_symmetric_2x2(c);
    let w0 = eig.values.x.max(0.0).sqrt();
    let v = eig.vectors.x_axis;

    let angle = ((v.y.atan2(v.x) / std::f64::consts::PI).abs() * 8.0).clamp(0.0, 4.0 - 1e-6);
    let angle_id = angle as usize;
    let angle_w = angle - angle_id as f64;

    let strain = ((w0 - 1.0) * 6.0).clamp(0.0, 1.0 - 1e-6);
    // Only the first strain interval is measured.
    let strain_id = 0;
    let strain_w = strain - strain_id as f64;

    let d = &data.d;
    let k = d[strain_id][angle_id] * ((1.0 - strain_w) * (1.0 - angle_w))
        + d[strain_id + 1][angle_id] * (strain_w * (1.0 - angle_w))
        + d[strain_id][angle_id + 1] * ((1.0 - strain_w) * angle_w)
        + d[strain_id + 1][angle_id + 1] * (strain_w * angle_w);
    k.max(DVec4::ZERO) * 2.0
}
