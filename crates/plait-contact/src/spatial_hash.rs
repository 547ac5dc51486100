//! Spatial hash broad phase for uniform-grid collision detection.
//!
//! Partitions space into a uniform grid and bins every face into each
//! cell its bounding box touches. A query visits the cells overlapped by
//! the probe box and reports the faces found there, deduplicated.

use hashbrown::{HashMap, HashSet};
use plait_math::DVec3;
use plait_mesh::Mesh;
use plait_types::FaceId;

use crate::broad::{Aabb, BroadPhase};

type CellKey = (i32, i32, i32);

/// Spatial hash broad phase using a uniform grid.
///
/// Cell size should be close to the mean edge length; much smaller cells
/// make large faces occupy many buckets.
#[derive(Debug, Clone)]
pub struct SpatialHash {
    /// Inverse cell size (cached for performance).
    inv_cell_size: f64,
    /// Hash map from cell key to the faces overlapping that cell.
    grid: HashMap<CellKey, Vec<FaceId>>,
    boxes: Vec<Aabb>,
}

impl SpatialHash {
    /// Create a new spatial hash with the given cell size.
    pub fn new(cell_size: f64) -> Self {
        let cell_size = cell_size.max(1e-6);
        Self {
            inv_cell_size: 1.0 / cell_size,
            grid: HashMap::new(),
            boxes: Vec::new(),
        }
    }

    /// A hash sized to the mean world edge length of `mesh`, already built.
    pub fn for_mesh(mesh: &Mesh) -> Self {
        let total: f64 = mesh
            .edges
            .iter()
            .map(|e| (mesh.node(e.n[0]).x - mesh.node(e.n[1]).x).length())
            .sum();
        let mean = if mesh.edge_count() > 0 {
            total / mesh.edge_count() as f64
        } else {
            1.0
        };
        let mut hash = Self::new(mean);
        hash.build(mesh);
        hash
    }

    fn cell_key(&self, p: DVec3) -> CellKey {
        let c = (p * self.inv_cell_size).floor();
        (c.x as i32, c.y as i32, c.z as i32)
    }

    fn cells(&self, b: &Aabb) -> impl Iterator<Item = CellKey> {
        let lo = self.cell_key(b.min);
        let hi = self.cell_key(b.max);
        (lo.0..=hi.0).flat_map(move |x| {
            (lo.1..=hi.1).flat_map(move |y| (lo.2..=hi.2).map(move |z| (x, y, z)))
        })
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }
}

impl BroadPhase for SpatialHash {
    fn build(&mut self, mesh: &Mesh) {
        self.grid.clear();
        self.boxes = (0..mesh.face_count())
            .map(|f| Aabb::of_face(mesh, FaceId(f as u32)))
            .collect();
        for (f, b) in self.boxes.iter().enumerate() {
            if !b.min.is_finite() || !b.max.is_finite() {
                continue;
            }
            let keys: Vec<CellKey> = self.cells(b).collect();
            for key in keys {
                self.grid.entry(key).or_default().push(FaceId(f as u32));
            }
        }
    }

    fn query(&self, p: DVec3, radius: f64) -> Vec<FaceId> {
        let probe = Aabb { min: p, max: p }.inflate(radius);
        if !probe.min.is_finite() || !probe.max.is_finite() {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for key in self.cells(&probe) {
            let Some(faces) = self.grid.get(&key) else {
                continue;
            };
            for &f in faces {
                if seen.insert(f) && self.boxes[f.index()].overlaps(&probe) {
                    found.push(f);
                }
            }
        }
        found.sort_unstable();
        found
    }

    fn name(&self) -> &str {
        "spatial_hash"
    }
}
