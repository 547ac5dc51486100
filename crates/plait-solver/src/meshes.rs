//! Read-only view over every mesh taking part in a step.

use plait_mesh::{Mesh, Node};
use plait_types::{MeshRef, NodeRef};

/// Cloth and obstacle meshes addressed by [`MeshRef`].
///
/// Constraints name nodes across meshes; this view resolves those names
/// without holding a borrow on any owner beyond the current pass.
#[derive(Debug, Clone, Copy)]
pub struct MeshSet<'a> {
    cloths: &'a [&'a Mesh],
    obstacles: &'a [&'a Mesh],
}

impl<'a> MeshSet<'a> {
    pub fn new(cloths: &'a [&'a Mesh], obstacles: &'a [&'a Mesh]) -> Self {
        Self { cloths, obstacles }
    }

    #[inline]
    pub fn cloths(&self) -> &'a [&'a Mesh] {
        self.cloths
    }

    #[inline]
    pub fn obstacles(&self) -> &'a [&'a Mesh] {
        self.obstacles
    }

    #[inline]
    pub fn mesh(&self, r: MeshRef) -> &'a Mesh {
        match r {
            MeshRef::Cloth(i) => self.cloths[i as usize],
            MeshRef::Obstacle(i) => self.obstacles[i as usize],
        }
    }

    #[inline]
    pub fn node(&self, r: NodeRef) -> &'a Node {
        self.mesh(r.mesh).node(r.node)
    }
}
