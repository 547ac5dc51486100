//! State snapshot serialization for replay and debugging.
//!
//! A snapshot captures the dynamic state of one cloth (node positions and
//! velocities) at a point in time. Topology is not included; a snapshot
//! only applies to a mesh with the same node count.

use plait_math::DVec3;
use plait_mesh::normals::compute_ws_data;
use plait_mesh::Mesh;
use plait_types::{PlaitError, PlaitResult};
use serde::{Deserialize, Serialize};

/// Cloth node state at one step.
///
/// Serialized with `bincode` for compact binary output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Step index when this snapshot was taken.
    pub step: u32,
    /// Simulation time in seconds.
    pub time: f64,
    /// Node positions, interleaved `[x0, y0, z0, x1, y1, z1, ...]`.
    pub positions: Vec<f64>,
    /// Node velocities, interleaved like `positions`.
    pub velocities: Vec<f64>,
    pub node_count: usize,
}

impl StateSnapshot {
    /// Capture the nodes of `mesh`.
    pub fn capture(step: u32, time: f64, mesh: &Mesh) -> Self {
        let n = mesh.node_count();
        let mut positions = Vec::with_capacity(n * 3);
        let mut velocities = Vec::with_capacity(n * 3);
        for node in &mesh.nodes {
            positions.extend_from_slice(&node.x.to_array());
            velocities.extend_from_slice(&node.v.to_array());
        }
        Self {
            step,
            time,
            positions,
            velocities,
            node_count: n,
        }
    }

    /// Position of node `i`.
    pub fn position(&self, i: usize) -> DVec3 {
        DVec3::from_slice(&self.positions[3 * i..3 * i + 3])
    }

    pub fn velocity(&self, i: usize) -> DVec3 {
        DVec3::from_slice(&self.velocities[3 * i..3 * i + 3])
    }

    /// Write the captured state back into `mesh`.
    pub fn restore(&self, mesh: &mut Mesh) -> PlaitResult<()> {
        if mesh.node_count() != self.node_count {
            return Err(PlaitError::InvalidMesh(format!(
                "snapshot has {} nodes, mesh has {}",
                self.node_count,
                mesh.node_count()
            )));
        }
        for (i, node) in mesh.nodes.iter_mut().enumerate() {
            node.x = self.position(i);
            node.v = self.velocity(i);
        }
        compute_ws_data(mesh);
        Ok(())
    }

    /// Largest node displacement between two snapshots of the same mesh.
    pub fn max_displacement(&self, other: &StateSnapshot) -> PlaitResult<f64> {
        if self.node_count != other.node_count {
            return Err(PlaitError::InvalidMesh(format!(
                "snapshots have {} and {} nodes",
                self.node_count, other.node_count
            )));
        }
        Ok((0..self.node_count)
            .map(|i| self.position(i).distance(other.position(i)))
            .fold(0.0, f64::max))
    }

    /// Serializes to compact binary format.
    pub fn to_bytes(&self) -> PlaitResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| PlaitError::Serialization(e.to_string()))
    }

    /// Deserializes from binary format.
    pub fn from_bytes(data: &[u8]) -> PlaitResult<Self> {
        let snapshot: Self = bincode::deserialize(data)
            .map_err(|e| PlaitError::Serialization(format!("snapshot: {e}")))?;
        if snapshot.positions.len() != 3 * snapshot.node_count
            || snapshot.velocities.len() != 3 * snapshot.node_count
        {
            return Err(PlaitError::Serialization(
                "snapshot buffers do not match its node count".into(),
            ));
        }
        Ok(snapshot)
    }
}
