//! Strain limiting.
//!
//! Gauss–Seidel sweeps over faces: each face's deformation gradient is
//! decomposed `F = U Σ Vᵀ`, the principal stretches are clamped into the
//! material's `[strain_min, strain_max]`, and the face is rebuilt as
//! `F' = U Σ' Vᵀ` about an anchor. The anchor is the mass-weighted
//! centroid, or the pinned nodes when the face has any; pinned nodes never
//! move.
//!
//! Clamping one face perturbs its neighbours, so sweeps alternate direction
//! and repeat until the largest violation left in the mesh, measured after
//! the sweep, is within `strain_limit_tolerance`. A call that runs out of
//! iterations first reports `converged: false` and logs a warning.

use plait_math::decomposition::{deformation_gradient, svd_3x2};
use plait_math::{DVec2, DVec3};
use plait_types::{FaceId, MeshRef};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cloth::Cloth;
use crate::config::SolverConfig;
use crate::constraint::{Constraint, ConstraintSet};

/// Stretch bounds to enforce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StrainBounds {
    /// Each face uses its material's limits.
    Material,
    /// Every face uses these `(min, max)` limits.
    Uniform(f64, f64),
}

/// Outcome of one strain-limiting call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StrainLimitReport {
    pub iterations: u32,
    /// Largest distance of a principal stretch from its bounds once the
    /// last sweep finished.
    pub max_violation: f64,
    /// `max_violation` is within the configured tolerance.
    pub converged: bool,
}

/// Nodes of cloth `cloth` held by pin constraints.
pub fn pinned_nodes(cons: &ConstraintSet, cloth: usize, nodes: usize) -> Vec<bool> {
    let mut pinned = vec![false; nodes];
    for con in cons {
        if let Constraint::Pin(pin) = con {
            if pin.node.mesh == MeshRef::Cloth(cloth as u32) && pin.node.node.index() < nodes {
                pinned[pin.node.node.index()] = true;
            }
        }
    }
    pinned
}

fn face_bounds(cloth: &Cloth, f: FaceId, bounds: StrainBounds) -> (f64, f64) {
    match bounds {
        StrainBounds::Material => {
            let p = cloth.material(cloth.mesh.face(f).label).properties();
            (p.strain_min, p.strain_max)
        }
        StrainBounds::Uniform(lo, hi) => (lo, hi),
    }
}

fn violation(sigma: DVec2, lo: f64, hi: f64) -> f64 {
    let v = |s: f64| (lo - s).max(s - hi).max(0.0);
    v(sigma.x).max(v(sigma.y))
}

/// How far face `f`'s principal stretches lie outside its bounds.
pub fn face_violation(cloth: &Cloth, f: FaceId, bounds: StrainBounds) -> f64 {
    let mesh = &cloth.mesh;
    let face = mesh.face(f);
    if face.a <= 0.0 {
        return 0.0;
    }
    let x = mesh.face_nodes(f).map(|n| mesh.node(n).x);
    let svd = svd_3x2(&deformation_gradient(x[0], x[1], x[2], face.inv_dm));
    let (lo, hi) = face_bounds(cloth, f, bounds);
    violation(svd.sigma, lo, hi)
}

/// Largest [`face_violation`] over the mesh.
pub fn max_violation(cloth: &Cloth, bounds: StrainBounds) -> f64 {
    (0..cloth.mesh.face_count())
        .map(|f| face_violation(cloth, FaceId(f as u32), bounds))
        .fold(0.0, f64::max)
}

/// Clamp one face.
fn limit_face(cloth: &mut Cloth, f: FaceId, pinned: &[bool], bounds: StrainBounds) {
    let mesh = &cloth.mesh;
    let face = mesh.face(f);
    if face.a <= 0.0 {
        return;
    }
    let nodes = mesh.face_nodes(f);
    let u = mesh.face_uvs(f);
    let x = nodes.map(|n| mesh.node(n).x);
    let fgrad = deformation_gradient(x[0], x[1], x[2], face.inv_dm);
    let svd = svd_3x2(&fgrad);
    let (lo, hi) = face_bounds(cloth, f, bounds);
    if violation(svd.sigma, lo, hi) == 0.0 {
        return;
    }
    let clamped = DVec2::new(svd.sigma.x.clamp(lo, hi), svd.sigma.y.clamp(lo, hi));
    let target = svd.recompose(clamped);

    let held: Vec<usize> = (0..3).filter(|&i| pinned[nodes[i].index()]).collect();
    if held.len() == 3 {
        return;
    }
    let (x_anchor, u_anchor) = if held.is_empty() {
        let m: Vec<f64> = nodes
            .iter()
            .map(|&n| mesh.node(n).m)
            .map(|m| if m > 0.0 { m } else { 1.0 })
            .collect();
        let total: f64 = m.iter().sum();
        let xc: DVec3 = (0..3).map(|i| x[i] * m[i]).sum::<DVec3>() / total;
        let uc: DVec2 = (0..3).map(|i| u[i] * m[i]).sum::<DVec2>() / total;
        (xc, uc)
    } else {
        let k = held.len() as f64;
        (
            held.iter().map(|&i| x[i]).sum::<DVec3>() / k,
            held.iter().map(|&i| u[i]).sum::<DVec2>() / k,
        )
    };

    for i in 0..3 {
        if pinned[nodes[i].index()] {
            continue;
        }
        cloth.mesh.nodes[nodes[i].index()].x = x_anchor + target.mul_vec2(u[i] - u_anchor);
    }
}

/// Clamp principal stretches of every face of `cloth`.
pub fn strain_limit(
    cloth: &mut Cloth,
    pinned: &[bool],
    bounds: StrainBounds,
    config: &SolverConfig,
) -> StrainLimitReport {
    let faces = cloth.mesh.face_count();
    let mut report = StrainLimitReport {
        max_violation: max_violation(cloth, bounds),
        ..Default::default()
    };
    while report.max_violation > config.strain_limit_tolerance
        && report.iterations < config.strain_limit_iterations
    {
        let forward = report.iterations % 2 == 0;
        for k in 0..faces {
            let f = if forward { k } else { faces - 1 - k };
            limit_face(cloth, FaceId(f as u32), pinned, bounds);
        }
        report.iterations += 1;
        report.max_violation = max_violation(cloth, bounds);
    }
    report.converged = report.max_violation <= config.strain_limit_tolerance;
    if report.converged {
        debug!(
            iterations = report.iterations,
            max_violation = report.max_violation,
            "strain limiting"
        );
    } else {
        warn!(
            iterations = report.iterations,
            max_violation = report.max_violation,
            tolerance = config.strain_limit_tolerance,
            "strain limiting did not converge"
        );
    }
    report
}
