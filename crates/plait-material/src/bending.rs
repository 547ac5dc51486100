//! Bending stiffness per edge.
//!
//! Four modes are supported, selected at runtime on each cloth:
//!
//! | Mode | Source of stiffness |
//! |---|---|
//! | `dde` | measured table over curvature and bias direction |
//! | `linear_iso` | one modulus (warp) for every edge |
//! | `linear_aniso` | warp / diagonal / weft moduli, interpolated by edge direction |
//! | `nonlinear` | reserved; contributes no stiffness |
//!
//! Linear moduli are given in units of 1e-9 N·m.

use std::fmt;
use std::str::FromStr;

use plait_math::{DVec2, DVec3};
use plait_mesh::Mesh;
use plait_types::{EdgeId, PlaitError};
use serde::{Deserialize, Serialize};

/// Measured bending stiffness: `d[direction][curvature]`. Directions are
/// 0° (row 0), 45° (row 1) and 90° (row 2) from the warp; curvature columns
/// are 5 m⁻¹ apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BendingData {
    pub d: [[f64; 5]; 3],
}

impl BendingData {
    pub fn uniform(k: f64) -> Self {
        Self { d: [[k; 5]; 3] }
    }
}

/// How edge bending stiffness is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BendingMode {
    Dde,
    LinearIso,
    #[default]
    LinearAniso,
    Nonlinear,
}

impl BendingMode {
    pub const ALL: [BendingMode; 4] = [
        BendingMode::Dde,
        BendingMode::LinearIso,
        BendingMode::LinearAniso,
        BendingMode::Nonlinear,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BendingMode::Dde => "dde",
            BendingMode::LinearIso => "linear_iso",
            BendingMode::LinearAniso => "linear_aniso",
            BendingMode::Nonlinear => "nonlinear",
        }
    }
}

impl fmt::Display for BendingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BendingMode {
    type Err = PlaitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| PlaitError::InvalidConfig(format!("unrecognized bending mode '{s}'")))
    }
}

/// Moduli used by the linear and nonlinear modes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BendingModuli {
    /// `(warp, weft, diagonal)` in 1e-9 N·m.
    pub linear: DVec3,
    pub nonlinear: [f64; 6],
}

impl Default for BendingModuli {
    fn default() -> Self {
        Self {
            linear: DVec3::splat(2200.0),
            nonlinear: [0.0; 6],
        }
    }
}

/// Stiffness of `edge` as seen from face `side`.
///
/// `initial_angle` rotates the material frame for the `dde` bias lookup.
pub fn bending_stiffness(
    mesh: &Mesh,
    edge: EdgeId,
    side: usize,
    data: &BendingData,
    mode: BendingMode,
    moduli: &BendingModuli,
    initial_angle: f64,
) -> f64 {
    match mode {
        BendingMode::Dde => dde(mesh, edge, side, data, initial_angle),
        BendingMode::LinearIso => moduli.linear.x * 1e-9,
        BendingMode::LinearAniso => linear_aniso(mesh, edge, side, moduli) * 1e-9,
        BendingMode::Nonlinear => 0.0,
    }
}

fn edge_direction(mesh: &Mesh, edge: EdgeId, side: usize) -> DVec2 {
    match mesh.edge_verts(edge, side) {
        Some([v0, v1]) => mesh.vert(v1).u - mesh.vert(v0).u,
        None => DVec2::X,
    }
}

fn dde(mesh: &Mesh, edge: EdgeId, side: usize, data: &BendingData, initial_angle: f64) -> f64 {
    let e = mesh.edge(edge);
    let area: f64 = e.adj_faces.iter().flatten().map(|&f| mesh.face(f).a).sum();
    if area <= 0.0 {
        return 0.0;
    }
    let curv = e.theta * e.l / area;
    // Samples are spaced 0.05 cm⁻¹ = 5 m⁻¹ apart.
    let mut value = (curv / 2.0 * 0.2).min(4.0);
    let value_i = (value.max(0.0) as usize).min(3);
    value -= value_i as f64;

    let du = edge_direction(mesh, edge, side);
    let mut bias = ((du.y.atan2(du.x) + initial_angle) * 4.0 / std::f64::consts::PI).abs();
    if bias > 4.0 {
        bias = 8.0 - bias;
    }
    if bias > 2.0 {
        bias = 4.0 - bias;
    }
    let bias_id = (bias.max(0.0) as usize).min(1);
    bias -= bias_id as f64;

    let d = &data.d;
    let ke = d[bias_id][value_i] * (1.0 - bias) * (1.0 - value)
        + d[bias_id + 1][value_i] * bias * (1.0 - value)
        + d[bias_id][value_i + 1] * (1.0 - bias) * value
        + d[bias_id + 1][value_i + 1] * bias * value;
    ke.max(0.0)
}

fn linear_aniso(mesh: &Mesh, edge: EdgeId, side: usize, moduli: &BendingModuli) -> f64 {
    // Direction of the edge normal in material space, folded into [0, π/2].
    let n = edge_direction(mesh, edge, side).perp();
    let n = if n.length_squared() > 0.0 { n.normalize().abs() } else { DVec2::X };
    let theta = (n.y / n.x.max(1e-8)).atan();

    let quarter = std::f64::consts::FRAC_PI_4;
    let [warp, weft, diag] = moduli.linear.to_array();
    if theta < quarter {
        let w1 = theta / quarter;
        (1.0 - w1) * warp + w1 * diag
    } else {
        let w1 = (theta - quarter) / quarter;
        (1.0 - w1) * diag + w1 * weft
    }
}
