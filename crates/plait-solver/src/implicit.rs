//! Backward-Euler velocity update.
//!
//! Linearizing `M Δv = dt F(x + dt (v + Δv))` about the current state
//! gives
//!
//! ```text
//! (M − dt² J) Δv = dt (F + dt J v)
//! ```
//!
//! where `F`, `J` sum elastic, external, constraint and friction terms.
//! After the solve the velocities (and optionally positions) are updated,
//! constraint projections are applied, and world-space data is refreshed.
//! Without the position update, callers integrate `x` themselves and
//! follow with [`snap_pins`].

use hashbrown::HashMap;
use plait_math::faer_solver::FaerSolver;
use plait_math::sparse::BlockSystem;
use plait_math::{DMat3, DVec3};
use plait_mesh::normals::compute_ws_data;
use plait_mesh::{Mesh, Space};
use plait_types::{MeshRef, PlaitResult};
use rayon::prelude::*;
use tracing::debug;

use crate::assembly::{add_constraint_forces, add_friction_forces, add_internal_forces};
use crate::cloth::Cloth;
use crate::config::SolverConfig;
use crate::constraint::ConstraintSet;
use crate::external::ExternalForces;
use crate::meshes::MeshSet;

/// Inputs of one implicit update of one cloth.
#[derive(Debug, Clone, Copy)]
pub struct ImplicitUpdate<'a> {
    /// Index of the cloth being integrated.
    pub cloth: usize,
    pub external: &'a ExternalForces,
    pub constraints: &'a ConstraintSet,
    pub dt: f64,
    /// Also integrate `x += v dt`.
    pub update_positions: bool,
}

/// Size of the solved system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SolveStats {
    /// Degrees of freedom (three per node).
    pub dofs: usize,
    /// Stored matrix entries.
    pub nnz: usize,
}

/// Solve the assembled block system, returning one vector per node.
pub fn solve_blocks(system: &BlockSystem) -> PlaitResult<(Vec<DVec3>, SolveStats)> {
    let csr = system.to_csr();
    let stats = SolveStats {
        dofs: csr.rows,
        nnz: csr.nnz(),
    };
    let x = FaerSolver::solve_once(&csr, &system.rhs_flat())?;
    let blocks = x
        .chunks_exact(3)
        .map(|c| DVec3::new(c[0], c[1], c[2]))
        .collect();
    Ok((blocks, stats))
}

/// Read-only view of all cloth meshes plus the obstacles.
pub(crate) fn with_meshes<R>(
    cloths: &[Cloth],
    obstacles: &[&Mesh],
    f: impl FnOnce(&MeshSet<'_>) -> R,
) -> R {
    let meshes: Vec<&Mesh> = cloths.iter().map(|c| &c.mesh).collect();
    f(&MeshSet::new(&meshes, obstacles))
}

/// One backward-Euler step of cloth `step.cloth`.
///
/// Fails with [`PlaitError::SingularSystem`](plait_types::PlaitError)
/// when the system cannot be factorized; no state is modified then.
pub fn implicit_update(
    cloths: &mut [Cloth],
    obstacles: &[&Mesh],
    step: &ImplicitUpdate<'_>,
    config: &SolverConfig,
) -> PlaitResult<SolveStats> {
    let c = step.cloth;
    let dt = step.dt;
    cloths[c].prepare_bending();
    let nn = cloths[c].mesh.node_count();
    if nn == 0 {
        return Ok(SolveStats::default());
    }

    let (dv, stats) = with_meshes(cloths, obstacles, |meshes| {
        let cloth = &cloths[c];
        let mut system = BlockSystem::new(nn);
        for (n, node) in cloth.mesh.nodes.iter().enumerate() {
            let m = DMat3::from_diagonal(DVec3::splat(node.m));
            system.add_block(n, n, m - step.external.jext[n] * (dt * dt));
            system.add_rhs(n, step.external.fext[n] * dt);
        }
        add_internal_forces(cloth, &mut system, dt, Space::World, config.parallel_assembly);
        add_constraint_forces(c, meshes, step.constraints, &mut system, dt);
        add_friction_forces(c, meshes, step.constraints, &mut system, dt);
        solve_blocks(&system)
    })?;
    debug!(cloth = c, dofs = stats.dofs, nnz = stats.nnz, "implicit solve");

    let update_positions = step.update_positions;
    cloths[c]
        .mesh
        .nodes
        .par_iter_mut()
        .zip(dv.par_iter())
        .for_each(|(node, &dvn)| {
            node.v += dvn;
            if update_positions {
                node.x += node.v * dt;
            }
            node.acceleration = dvn / dt;
        });

    project_outside(cloths, obstacles, c, step.constraints);
    compute_ws_data(&mut cloths[c].mesh);
    Ok(stats)
}

/// Apply constraint projections to cloth `c`. When several proximity
/// constraints move the same node, their deltas are averaged weighted by
/// `|dx|²`; snapping pins are applied last and win over contacts.
pub fn project_outside(cloths: &mut [Cloth], obstacles: &[&Mesh], c: usize, cons: &ConstraintSet) {
    let nn = cloths[c].mesh.node_count();
    let mut w = vec![0.0; nn];
    let mut dx = vec![DVec3::ZERO; nn];
    with_meshes(cloths, obstacles, |meshes| {
        for con in cons.iter().filter(|con| con.is_proximity()) {
            for (node, d) in con.project(meshes) {
                if node.mesh != MeshRef::Cloth(c as u32) || node.node.index() >= nn {
                    continue;
                }
                let wn = d.length_squared();
                w[node.node.index()] += wn;
                dx[node.node.index()] += wn * d;
            }
        }
    });
    for (n, node) in cloths[c].mesh.nodes.iter_mut().enumerate() {
        if w[n] != 0.0 {
            node.x += dx[n] / w[n];
        }
    }
    snap_pins(cloths, obstacles, c, cons);
}

/// Move the nodes of cloth `c` held by snapping pins onto their targets.
/// The corrections of one node's pins are summed, so three axis pins place
/// it exactly. Returns the applied correction of each moved node.
pub fn snap_pins(
    cloths: &mut [Cloth],
    obstacles: &[&Mesh],
    c: usize,
    cons: &ConstraintSet,
) -> Vec<(usize, DVec3)> {
    let nn = cloths[c].mesh.node_count();
    let mut sums: HashMap<usize, DVec3> = HashMap::new();
    with_meshes(cloths, obstacles, |meshes| {
        for con in cons.iter().filter(|con| con.is_pin()) {
            for (node, d) in con.project(meshes) {
                if node.mesh != MeshRef::Cloth(c as u32) || node.node.index() >= nn {
                    continue;
                }
                *sums.entry(node.node.index()).or_insert(DVec3::ZERO) += d;
            }
        }
    });
    if sums.is_empty() {
        return Vec::new();
    }
    let mut moved: Vec<(usize, DVec3)> = sums.into_iter().collect();
    moved.sort_unstable_by_key(|&(n, _)| n);
    for &(n, d) in &moved {
        cloths[c].mesh.nodes[n].x += d;
    }
    compute_ws_data(&mut cloths[c].mesh);
    debug!(cloth = c, nodes = moved.len(), "pins snapped");
    moved
}
