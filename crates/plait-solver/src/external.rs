//! Gravity and wind.

use plait_math::{DMat3, DVec3};
use plait_mesh::Face;
use plait_mesh::Mesh;
use serde::{Deserialize, Serialize};

/// A uniform wind field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wind {
    /// Air density (normal pressure coefficient).
    pub density: f64,
    pub velocity: DVec3,
    /// Tangential drag coefficient.
    pub drag: f64,
}

impl Default for Wind {
    fn default() -> Self {
        Self {
            density: 1.0,
            velocity: DVec3::ZERO,
            drag: 0.0,
        }
    }
}

/// Per-node external forces and their position Jacobians.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalForces {
    pub fext: Vec<DVec3>,
    pub jext: Vec<DMat3>,
}

impl ExternalForces {
    /// Zeroed buffers for `nodes` nodes.
    pub fn zeros(nodes: usize) -> Self {
        Self {
            fext: vec![DVec3::ZERO; nodes],
            jext: vec![DMat3::ZERO; nodes],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fext.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fext.is_empty()
    }
}

/// Aerodynamic force on one face: quadratic normal pressure plus linear
/// tangential drag, relative to the mean node velocity.
pub fn wind_force(mesh: &Mesh, face: &Face, wind: &Wind) -> DVec3 {
    let vface = face
        .v
        .iter()
        .map(|&v| mesh.node(mesh.vert(v).node).v)
        .sum::<DVec3>()
        / 3.0;
    let vrel = wind.velocity - vface;
    let vn = face.n.dot(vrel);
    let vt = vrel - vn * face.n;
    wind.density * face.a * vn.abs() * vn * face.n + wind.drag * face.a * vt
}

/// Add `m g` per node and each face's wind force, one third per node.
/// Neither term contributes to the Jacobian.
pub fn add_external_forces(mesh: &Mesh, gravity: DVec3, wind: &Wind, fext: &mut [DVec3]) {
    for (f, node) in fext.iter_mut().zip(&mesh.nodes) {
        *f += node.m * gravity;
    }
    for face in &mesh.faces {
        let fw = wind_force(mesh, face, wind) / 3.0;
        for &v in &face.v {
            fext[mesh.vert(v).node.index()] += fw;
        }
    }
}
