//! Broad phase collision detection trait.
//!
//! Culls mesh faces whose bounding boxes cannot come within the query
//! distance of a point. The narrow phase then measures the survivors.

use plait_math::DVec3;
use plait_mesh::Mesh;
use plait_types::FaceId;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// Box around a set of points.
    pub fn around(points: &[DVec3]) -> Self {
        let mut min = DVec3::splat(f64::INFINITY);
        let mut max = DVec3::splat(f64::NEG_INFINITY);
        for &p in points {
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    /// Box of a world-space face.
    pub fn of_face(mesh: &Mesh, f: FaceId) -> Self {
        Self::around(&mesh.face_nodes(f).map(|n| mesh.node(n).x))
    }

    /// The box grown by `margin` on every side.
    pub fn inflate(&self, margin: f64) -> Self {
        Self {
            min: self.min - DVec3::splat(margin),
            max: self.max + DVec3::splat(margin),
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    pub fn contains(&self, p: DVec3) -> bool {
        self.min.cmple(p).all() && p.cmple(self.max).all()
    }
}

/// Trait for broad phase collision detection over the faces of one mesh.
///
/// # Implementations
/// - [`crate::SpatialHash`]: Uniform grid over face boxes
/// - [`BruteForce`]: Tests every face
pub trait BroadPhase: Send + Sync {
    /// Rebuild from the current world positions of `mesh`.
    fn build(&mut self, mesh: &Mesh);

    /// Faces whose box lies within `radius` of `p`, in ascending order.
    fn query(&self, p: DVec3, radius: f64) -> Vec<FaceId>;

    /// Returns the broad phase strategy name.
    fn name(&self) -> &str;
}

/// Reports every face whose box passes; used for small meshes and as a
/// reference in tests.
#[derive(Debug, Clone, Default)]
pub struct BruteForce {
    boxes: Vec<Aabb>,
}

impl BroadPhase for BruteForce {
    fn build(&mut self, mesh: &Mesh) {
        self.boxes = (0..mesh.face_count())
            .map(|f| Aabb::of_face(mesh, FaceId(f as u32)))
            .collect();
    }

    fn query(&self, p: DVec3, radius: f64) -> Vec<FaceId> {
        let probe = Aabb { min: p, max: p }.inflate(radius);
        self.boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.overlaps(&probe))
            .map(|(f, _)| FaceId(f as u32))
            .collect()
    }

    fn name(&self) -> &str {
        "brute_force"
    }
}
