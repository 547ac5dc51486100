//! # plait-mesh
//!
//! Arena triangle mesh for cloth and obstacles.
//!
//! ## Key Types
//!
//! - [`Mesh`]: Owns nodes (world space), verts (material space), edges
//!   and faces. Cross-references are typed indices into the arenas.
//! - [`topology`]: Adjacency queries (interior edges, boundaries, rings).
//! - [`geometry`]: Material-space and world-space derived data, dihedral
//!   angles and the discrete curvature tensor.
//! - Procedural generators for test meshes (quad grids, UV spheres).

pub mod generators;
pub mod geometry;
pub mod mesh;
pub mod normals;
pub mod topology;

pub use geometry::Space;
pub use mesh::{Edge, Face, FaceSpec, Mesh, Node, Vert};
pub use topology::InteriorEdge;
