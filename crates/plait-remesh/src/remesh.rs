//! Remeshing drivers.
//!
//! [`dynamic_remesh`] refines with splits until no edge is too long (or the
//! edge budget is spent), then coarsens with collapses, flipping toward a
//! Delaunay triangulation after each round. [`static_remesh`] keeps the
//! topology and only refreshes derived data.

use plait_contact::Plane;
use plait_mesh::Mesh;
use plait_solver::plasticity::recompute_edge_plasticity;
use plait_solver::Cloth;
use plait_types::{NodeId, PlaitResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ops::{collapse_pass, flip_pass, split_pass};
use crate::sizing::vert_sizing;
use crate::work::WorkMesh;

/// Refinement and coarsening rounds before giving up on a fixed point.
const MAX_ROUNDS: u32 = 64;
/// Flip sweeps after each round.
const MAX_FLIP_SWEEPS: u32 = 8;

/// What one remesh did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemeshOutcome {
    /// Old node index → new node id; `None` for nodes removed by a collapse.
    pub node_map: Vec<Option<NodeId>>,
    pub splits: usize,
    pub flips: usize,
    pub collapses: usize,
    pub nodes_before: usize,
    pub nodes_after: usize,
}

impl RemeshOutcome {
    fn identity(count: usize) -> Self {
        Self {
            node_map: (0..count).map(|n| Some(NodeId(n as u32))).collect(),
            nodes_before: count,
            nodes_after: count,
            ..Default::default()
        }
    }

    /// Total number of local operations.
    pub fn operations(&self) -> usize {
        self.splits + self.flips + self.collapses
    }
}

fn rebuild(work: &mut WorkMesh) -> PlaitResult<Mesh> {
    work.compact();
    work.to_mesh()
}

fn flip_until_stable(work: &mut WorkMesh, mesh: &mut Mesh) -> PlaitResult<usize> {
    let mut flips = 0;
    for _ in 0..MAX_FLIP_SWEEPS {
        let n = flip_pass(work, mesh);
        if n == 0 {
            break;
        }
        flips += n;
        *mesh = rebuild(work)?;
    }
    Ok(flips)
}

/// Adapt the cloth mesh to its sizing field.
///
/// `planes` holds the nearest obstacle plane per node of the current mesh
/// (empty to ignore obstacles). Nodes flagged `preserve` keep their
/// position and survive. Face plastic state is inherited by split children;
/// edge rest angles are recomputed from it afterwards.
pub fn dynamic_remesh(cloth: &mut Cloth, planes: &[Option<Plane>]) -> PlaitResult<RemeshOutcome> {
    let config = cloth.remeshing;
    let before = cloth.mesh.node_count();
    let sizing = vert_sizing(&cloth.mesh, &config, planes);
    let mut work = WorkMesh::from_mesh(&cloth.mesh, sizing);
    let mut mesh = rebuild(&mut work)?;
    let mut outcome = RemeshOutcome {
        nodes_before: before,
        ..Default::default()
    };

    for round in 0..MAX_ROUNDS {
        let splits = split_pass(&mut work, &mesh, &config);
        if splits == 0 {
            break;
        }
        outcome.splits += splits;
        mesh = rebuild(&mut work)?;
        outcome.flips += flip_until_stable(&mut work, &mut mesh)?;
        debug!(round, splits, edges = mesh.edge_count(), "refine");
    }

    for round in 0..MAX_ROUNDS {
        let collapses = collapse_pass(&mut work, &mesh);
        if collapses == 0 {
            break;
        }
        outcome.collapses += collapses;
        mesh = rebuild(&mut work)?;
        outcome.flips += flip_until_stable(&mut work, &mut mesh)?;
        debug!(round, collapses, nodes = mesh.node_count(), "coarsen");
    }

    outcome.node_map = vec![None; before];
    for (new, origin) in work.origin.iter().enumerate() {
        if let Some(old) = origin {
            outcome.node_map[*old] = Some(NodeId(new as u32));
        }
    }
    outcome.nodes_after = mesh.node_count();

    recompute_edge_plasticity(&mut mesh);
    cloth.mesh = mesh;
    cloth.compute_masses();
    cloth.prepare_bending();
    debug!(
        splits = outcome.splits,
        flips = outcome.flips,
        collapses = outcome.collapses,
        nodes_before = outcome.nodes_before,
        nodes_after = outcome.nodes_after,
        "dynamic remesh"
    );
    Ok(outcome)
}

/// Keep the topology; refresh material data, masses and normals.
pub fn static_remesh(cloth: &mut Cloth) -> RemeshOutcome {
    cloth.mesh.compute_ms_data();
    plait_mesh::normals::compute_ws_data(&mut cloth.mesh);
    cloth.compute_masses();
    cloth.prepare_bending();
    RemeshOutcome::identity(cloth.mesh.node_count())
}
