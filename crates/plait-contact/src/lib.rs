//! # plait-contact
//!
//! Collision detection and contact response between cloth and obstacles.
//!
//! The contact pipeline is split into three phases:
//! 1. **Broad phase**: Spatial hash over face bounding boxes
//! 2. **Narrow phase**: Exact point–triangle closest points
//! 3. **Contact response**: Either penalty constraints for the next
//!    implicit step ([`proximity_constraints`]) or direct position
//!    correction ([`collision_response`], [`separate`])
//!
//! Obstacle planes near each cloth node feed the remesher's sizing.

pub mod broad;
pub mod config;
pub mod narrow;
pub mod planes;
pub mod proximity;
pub mod response;
pub mod separation;
pub mod spatial_hash;

pub use broad::{Aabb, BroadPhase, BruteForce};
pub use config::ContactConfig;
pub use narrow::{closest_point_on_triangle, FaceContact};
pub use planes::{nearest_obstacle_planes, Plane};
pub use proximity::{proximity_constraints, Friction};
pub use response::{collision_response, CollisionReport};
pub use separation::separate;
pub use spatial_hash::SpatialHash;
