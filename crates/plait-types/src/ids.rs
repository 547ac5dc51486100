//! Strongly-typed identifiers for mesh entities.
//!
//! Newtype wrappers prevent accidental mixing of node indices
//! with vert, edge or face indices. All ids are positions in the
//! owning mesh's arenas and are invalidated by any topology change.

use serde::{Deserialize, Serialize};

/// Index into a mesh's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Index into a mesh's vert (material-space) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertId(pub u32);

/// Index into a mesh's edge arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

/// Index into a mesh's face arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FaceId(pub u32);

impl NodeId {
    /// Returns the raw index as `usize` for array indexing.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl VertId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EdgeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FaceId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for NodeId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<u32> for VertId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<u32> for EdgeId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<u32> for FaceId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<usize> for NodeId {
    fn from(val: usize) -> Self {
        Self(val as u32)
    }
}

impl From<usize> for FaceId {
    fn from(val: usize) -> Self {
        Self(val as u32)
    }
}

/// Which mesh of a simulation a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MeshRef {
    /// The i-th cloth.
    Cloth(u32),
    /// The i-th obstacle.
    Obstacle(u32),
}

impl MeshRef {
    /// True for cloth meshes.
    #[inline]
    pub fn is_cloth(self) -> bool {
        matches!(self, MeshRef::Cloth(_))
    }
}

/// A node addressed across all meshes of a simulation.
///
/// Constraints refer to nodes this way so that a proximity constraint
/// can span a cloth node and three obstacle nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef {
    pub mesh: MeshRef,
    pub node: NodeId,
}

impl NodeRef {
    pub fn new(mesh: MeshRef, node: NodeId) -> Self {
        Self { mesh, node }
    }

    /// Shorthand for a node of the i-th cloth.
    pub fn cloth(cloth: usize, node: usize) -> Self {
        Self {
            mesh: MeshRef::Cloth(cloth as u32),
            node: NodeId(node as u32),
        }
    }

    /// Shorthand for a node of the i-th obstacle.
    pub fn obstacle(obstacle: usize, node: usize) -> Self {
        Self {
            mesh: MeshRef::Obstacle(obstacle as u32),
            node: NodeId(node as u32),
        }
    }
}
