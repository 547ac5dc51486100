//! Nearest obstacle planes.
//!
//! For every cloth node, the closest obstacle point within a search
//! radius together with that face's normal. The remesher refines cloth
//! approaching an obstacle using these planes.

use plait_math::DVec3;
use plait_mesh::Mesh;
use plait_types::NodeId;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::broad::BroadPhase;
use crate::narrow::closest_point_on_triangle;
use crate::spatial_hash::SpatialHash;

/// A point with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub point: DVec3,
    pub normal: DVec3,
}

impl Plane {
    /// Signed distance of `x` along the normal.
    #[inline]
    pub fn distance(&self, x: DVec3) -> f64 {
        self.normal.dot(x - self.point)
    }
}

/// One entry per node of `mesh`; `None` when no obstacle face lies
/// within `radius`. Normals face the node.
pub fn nearest_obstacle_planes(mesh: &Mesh, obstacles: &[&Mesh], radius: f64) -> Vec<Option<Plane>> {
    let hashes: Vec<SpatialHash> = obstacles.iter().map(|m| SpatialHash::for_mesh(m)).collect();
    (0..mesh.node_count())
        .into_par_iter()
        .map(|n| {
            let x = mesh.node(NodeId(n as u32)).x;
            let mut best: Option<(f64, Plane)> = None;
            for (obstacle, hash) in obstacles.iter().zip(&hashes) {
                for f in hash.query(x, radius) {
                    let [a, b, c] = obstacle.face_nodes(f).map(|id| obstacle.node(id).x);
                    let closest = closest_point_on_triangle(x, a, b, c);
                    let d = (x - closest.point).length();
                    if d > radius || best.as_ref().is_some_and(|(bd, _)| d >= *bd) {
                        continue;
                    }
                    let mut normal = plait_math::normalize_or_zero((b - a).cross(c - a));
                    if normal.dot(x - closest.point) < 0.0 {
                        normal = -normal;
                    }
                    best = Some((
                        d,
                        Plane {
                            point: closest.point,
                            normal,
                        },
                    ));
                }
            }
            best.map(|(_, plane)| plane)
        })
        .collect()
}
