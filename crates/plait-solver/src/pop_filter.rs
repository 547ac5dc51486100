//! Pop filter: one regularized static solve that settles sudden elastic
//! forces, such as those introduced by remeshing, without a dynamic step.
//!
//! ```text
//! (−J + reg M) Δx = F
//! ```
//!
//! with `F`, `J` the internal and constraint terms at the current state.
//! Nodes under snapping pins are put back on their targets afterwards.

use plait_math::sparse::BlockSystem;
use plait_math::{DMat3, DVec3};
use plait_mesh::normals::compute_ws_data;
use plait_mesh::{Mesh, Space};
use plait_types::PlaitResult;
use tracing::debug;

use crate::assembly::{add_constraint_forces, add_internal_forces};
use crate::cloth::Cloth;
use crate::config::SolverConfig;
use crate::constraint::ConstraintSet;
use crate::implicit::{snap_pins, solve_blocks, with_meshes};

/// Filter cloth `c` in place. Returns the largest node displacement.
pub fn apply_pop_filter(
    cloths: &mut [Cloth],
    obstacles: &[&Mesh],
    c: usize,
    cons: &ConstraintSet,
    config: &SolverConfig,
) -> PlaitResult<f64> {
    cloths[c].prepare_bending();
    let nn = cloths[c].mesh.node_count();
    if nn == 0 {
        return Ok(0.0);
    }
    let (dx, _) = with_meshes(cloths, obstacles, |meshes| {
        let cloth = &cloths[c];
        let mut system = BlockSystem::new(nn);
        for (n, node) in cloth.mesh.nodes.iter().enumerate() {
            let reg = config.pop_filter_regularization * node.m;
            system.add_block(n, n, DMat3::from_diagonal(DVec3::splat(reg)));
        }
        add_internal_forces(cloth, &mut system, 0.0, Space::World, config.parallel_assembly);
        add_constraint_forces(c, meshes, cons, &mut system, 0.0);
        solve_blocks(&system)
    })?;

    let mut largest: f64 = 0.0;
    for (node, d) in cloths[c].mesh.nodes.iter_mut().zip(dx) {
        node.x += d;
        largest = largest.max(d.length());
    }
    compute_ws_data(&mut cloths[c].mesh);
    snap_pins(cloths, obstacles, c, cons);
    debug!(cloth = c, largest, "pop filter");
    Ok(largest)
}
