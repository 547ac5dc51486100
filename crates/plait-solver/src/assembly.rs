//! Assembly of the implicit system `A Δv = b`.
//!
//! Element forces are evaluated independently (optionally on the rayon
//! pool), each producing its own list of 3×3 blocks and right-hand-side
//! vectors. The lists are then merged into the [`BlockSystem`] in element
//! order, so the summation order, and the rounding, is the same on every
//! run regardless of thread count.
//!
//! Damped elastic terms:
//!
//! ```text
//! A += −dt (dt + damping) J
//! b +=  dt (F + (dt + damping) J v)
//! ```
//!
//! With `dt = 0` the static variant `A += −J`, `b += F` is assembled.

use nalgebra::{SMatrix, SVector};
use plait_math::element::{block_mat, block_vec, stack, Vec12, Vec9};
use plait_math::sparse::BlockSystem;
use plait_math::{outer, DMat3, DVec3};
use plait_mesh::topology::interior_edges;
use plait_mesh::{InteriorEdge, Space};
use plait_types::{FaceId, MeshRef, NodeRef};
use rayon::prelude::*;

use crate::bending::{active_strategy, edge_damping};
use crate::cloth::Cloth;
use crate::constraint::ConstraintSet;
use crate::meshes::MeshSet;
use crate::stretching::{stretching_energy, stretching_force};

/// Blocks and right-hand-side terms of one element.
#[derive(Debug, Clone, Default)]
struct Contribution {
    blocks: Vec<(usize, usize, DMat3)>,
    rhs: Vec<(usize, DVec3)>,
}

impl Contribution {
    fn merge_into(self, system: &mut BlockSystem) {
        for (i, j, m) in self.blocks {
            system.add_block(i, j, m);
        }
        for (i, f) in self.rhs {
            system.add_rhs(i, f);
        }
    }
}

fn scatter<const N: usize>(
    ix: &[usize],
    j: &SMatrix<f64, N, N>,
    a_scale: f64,
    b: &SVector<f64, N>,
) -> Contribution {
    let n = ix.len();
    let mut c = Contribution {
        blocks: Vec::with_capacity(n * n),
        rhs: Vec::with_capacity(n),
    };
    for (a, &ia) in ix.iter().enumerate() {
        for (bb, &ib) in ix.iter().enumerate() {
            c.blocks.push((ia, ib, block_mat(j, a, bb) * a_scale));
        }
        c.rhs.push((ia, block_vec(b, a)));
    }
    c
}

fn face_contribution(cloth: &Cloth, f: usize, dt: f64, space: Space) -> Contribution {
    let mesh = &cloth.mesh;
    let id = FaceId(f as u32);
    let nodes = mesh.face_nodes(id);
    let ix = nodes.map(|n| n.index());
    let (j, force) = stretching_force(cloth, id, space);
    if dt == 0.0 {
        return scatter(&ix, &j, -1.0, &force);
    }
    let damping = cloth.material(mesh.face(id).label).damping();
    let v: Vec9 = stack(&nodes.map(|n| mesh.node(n).v));
    let b = (force + j * v * (dt + damping)) * dt;
    scatter(&ix, &j, -dt * (dt + damping), &b)
}

fn edge_contribution(cloth: &Cloth, stencil: &InteriorEdge, dt: f64, space: Space) -> Contribution {
    let mesh = &cloth.mesh;
    let nodes = stencil.nodes();
    let ix = nodes.map(|n| n.index());
    let (j, force) = active_strategy(cloth).force(cloth, stencil, space);
    if dt == 0.0 {
        return scatter(&ix, &j, -1.0, &force);
    }
    let damping = edge_damping(cloth, stencil);
    let v: Vec12 = stack(&nodes.map(|n| mesh.node(n).v));
    let b = (force + j * v * (dt + damping)) * dt;
    scatter(&ix, &j, -dt * (dt + damping), &b)
}

/// Add stretching and bending terms of every face and interior edge.
///
/// The quadratic bending cache must be current
/// ([`Cloth::prepare_bending`]).
pub fn add_internal_forces(
    cloth: &Cloth,
    system: &mut BlockSystem,
    dt: f64,
    space: Space,
    parallel: bool,
) {
    let faces = cloth.mesh.face_count();
    let edges = interior_edges(&cloth.mesh);

    let (face_terms, edge_terms): (Vec<Contribution>, Vec<Contribution>) = if parallel {
        (
            (0..faces)
                .into_par_iter()
                .map(|f| face_contribution(cloth, f, dt, space))
                .collect(),
            edges
                .par_iter()
                .map(|s| edge_contribution(cloth, s, dt, space))
                .collect(),
        )
    } else {
        (
            (0..faces)
                .map(|f| face_contribution(cloth, f, dt, space))
                .collect(),
            edges
                .iter()
                .map(|s| edge_contribution(cloth, s, dt, space))
                .collect(),
        )
    };

    for c in face_terms.into_iter().chain(edge_terms) {
        c.merge_into(system);
    }
}

/// Total stretching plus bending energy.
pub fn internal_energy(cloth: &Cloth, space: Space) -> f64 {
    let stretch: f64 = (0..cloth.mesh.face_count())
        .map(|f| stretching_energy(cloth, FaceId(f as u32), space))
        .sum();
    let strategy = active_strategy(cloth);
    let bend: f64 = interior_edges(&cloth.mesh)
        .iter()
        .map(|s| strategy.energy(cloth, s, space))
        .sum();
    stretch + bend
}

/// Node index of `r` if it belongs to cloth `cloth` of `meshes`.
fn local_index(r: NodeRef, cloth: usize, meshes: &MeshSet<'_>) -> Option<usize> {
    (r.mesh == MeshRef::Cloth(cloth as u32) && r.node.index() < meshes.mesh(r.mesh).node_count())
        .then_some(r.node.index())
}

/// Add penalty terms of every constraint touching cloth `cloth`.
///
/// Nodes of other meshes are read (for `v · ∇c`) but never written.
pub fn add_constraint_forces(
    cloth: usize,
    meshes: &MeshSet<'_>,
    cons: &ConstraintSet,
    system: &mut BlockSystem,
    dt: f64,
) {
    for con in cons {
        let value = con.value(meshes);
        let g = con.energy_grad(value);
        let h = con.energy_hess(value);
        let grad = con.gradient();
        let v_dot_grad: f64 = grad.iter().map(|(n, gv)| gv.dot(meshes.node(*n).v)).sum();
        for &(ni, gi) in &grad {
            let Some(i) = local_index(ni, cloth, meshes) else {
                continue;
            };
            for &(nj, gj) in &grad {
                let Some(j) = local_index(nj, cloth, meshes) else {
                    continue;
                };
                let scale = if dt == 0.0 { h } else { dt * dt * h };
                system.add_block(i, j, outer(gi, gj) * scale);
            }
            let b = if dt == 0.0 {
                -g * gi
            } else {
                -dt * (g + dt * h * v_dot_grad) * gi
            };
            system.add_rhs(i, b);
        }
    }
}

/// Add friction forces and Jacobians of every constraint touching cloth
/// `cloth`.
pub fn add_friction_forces(
    cloth: usize,
    meshes: &MeshSet<'_>,
    cons: &ConstraintSet,
    system: &mut BlockSystem,
    dt: f64,
) {
    for con in cons {
        let (force, jac) = con.friction(dt, meshes);
        for (n, f) in force {
            if let Some(i) = local_index(n, cloth, meshes) {
                system.add_rhs(i, f * dt);
            }
        }
        for ((ni, nj), m) in jac {
            if let (Some(i), Some(j)) = (local_index(ni, cloth, meshes), local_index(nj, cloth, meshes)) {
                system.add_block(i, j, m * -dt);
            }
        }
    }
}
