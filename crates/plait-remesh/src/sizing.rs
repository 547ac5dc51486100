//! Sizing field.
//!
//! Each face gets a symmetric 2×2 metric tensor `M` in material space such
//! that an edge `du` is "long enough" when `duᵀ M du ≈ 1`. The tensor sums
//! the refinement demands of plastic and world curvature, normal variation,
//! velocity gradient, compression and nearby obstacle planes, then has its
//! eigenvalues clamped to the size and aspect limits. Vert sizing is the
//! area-weighted mean of the incident faces.

use plait_contact::Plane;
use plait_math::decomposition::{deformation_gradient, eigen_symmetric_2x2};
use plait_math::{outer2, DMat2, DVec2};
use plait_mesh::{Mesh, Space};
use plait_solver::RemeshConfig;
use plait_types::constants::{DEGENERATE_AREA_THRESHOLD, EPSILON};
use plait_types::{EdgeId, FaceId, VertId};
use rayon::prelude::*;

/// Rebuild a symmetric matrix with its eigenvalues passed through `f`.
fn map_eigenvalues(m: DMat2, f: impl Fn(f64) -> f64) -> DMat2 {
    let eig = eigen_symmetric_2x2(m);
    let q = eig.vectors;
    let d = DMat2::from_diagonal(DVec2::new(f(eig.values.x), f(eig.values.y)));
    q * d * q.transpose()
}

/// `[[d, -b], [-c, a]]` for `[[a, b], [c, d]]`.
fn perp(m: DMat2) -> DMat2 {
    DMat2::from_cols(
        DVec2::new(m.y_axis.y, -m.x_axis.y),
        DVec2::new(-m.y_axis.x, m.x_axis.x),
    )
}

/// Refinement demanded by compressive strain `e` given the squared
/// normal variation `s2`: the wavelength at which buckles of amplitude
/// `c` would form.
fn compression_metric(e: DMat2, s2: DMat2, c: f64) -> DMat2 {
    let d = e.transpose() * e - perp(s2) * (4.0 * c * c);
    let root = map_eigenvalues(d, |l| l.max(0.0).sqrt());
    map_eigenvalues(root - e, |l| l.max(0.0)) * (1.0 / (2.0 * c * c))
}

/// Refinement toward obstacle planes seen by the face's nodes.
fn obstacle_metric(mesh: &Mesh, f: FaceId, planes: &[Option<Plane>]) -> DMat2 {
    let nodes = mesh.face_nodes(f);
    let inv_dm = mesh.face(f).inv_dm;
    let mut o = DMat2::ZERO;
    for &node in &nodes {
        let Some(plane) = planes.get(node.index()).copied().flatten() else {
            continue;
        };
        let h = nodes.map(|n| plane.distance(mesh.node(n).x));
        let h_self = plane.distance(mesh.node(node).x);
        if h_self.abs() < EPSILON {
            continue;
        }
        let dh = inv_dm.transpose() * DVec2::new(h[1] - h[0], h[2] - h[0]);
        o += outer2(dh, dh) * (1.0 / (h_self * h_self));
    }
    o * (1.0 / 3.0)
}

/// Metric tensor of one face.
pub fn face_sizing(
    mesh: &Mesh,
    f: FaceId,
    config: &RemeshConfig,
    planes: &[Option<Plane>],
) -> DMat2 {
    let face = mesh.face(f);
    let floor = 1.0 / (config.size_max * config.size_max);
    if face.a.abs() < DEGENERATE_AREA_THRESHOLD {
        return DMat2::from_diagonal(DVec2::splat(floor));
    }
    let [n0, n1, n2] = mesh.face_nodes(f).map(|n| mesh.node(n));
    let inv_dm = face.inv_dm;
    let angle2 = config.refine_angle * config.refine_angle;

    let sp = mesh.curvature(f, Space::Plastic);
    let sw1 = mesh.curvature(f, Space::World);
    let sw2 = deformation_gradient(n0.n, n1.n, n2.n, inv_dm).ftf();
    let curvature = (sp.transpose() * sp + sw1.transpose() * sw1 + sw2) * (1.0 / angle2);

    let vel = deformation_gradient(n0.v, n1.v, n2.v, inv_dm).ftf()
        * (1.0 / (config.refine_velocity * config.refine_velocity));

    let strain = (deformation_gradient(n0.x, n1.x, n2.x, inv_dm).ftf() - DMat2::IDENTITY) * 0.5;
    let comp = compression_metric(strain, sw2, config.refine_compression);

    let m = curvature + vel + comp + obstacle_metric(mesh, f, planes);

    let ceiling = 1.0 / (config.size_min * config.size_min);
    let eig = eigen_symmetric_2x2(m);
    let l0 = eig.values.x.clamp(floor, ceiling);
    let l1 = eig.values.y.clamp(floor, ceiling);
    let lmin = l0.max(l1) * config.aspect_min * config.aspect_min;
    let q = eig.vectors;
    q * DMat2::from_diagonal(DVec2::new(l0.max(lmin), l1.max(lmin))) * q.transpose()
}

/// Per-vert sizing: area-weighted mean of the incident face tensors.
pub fn vert_sizing(mesh: &Mesh, config: &RemeshConfig, planes: &[Option<Plane>]) -> Vec<DMat2> {
    let faces: Vec<DMat2> = (0..mesh.face_count())
        .into_par_iter()
        .map(|f| face_sizing(mesh, FaceId(f as u32), config, planes))
        .collect();
    let floor = DMat2::from_diagonal(DVec2::splat(1.0 / (config.size_max * config.size_max)));
    mesh.verts
        .iter()
        .map(|vert| {
            let mut sum = DMat2::ZERO;
            let mut area = 0.0;
            for f in &vert.adj_faces {
                let a = mesh.face(*f).a.abs();
                sum += faces[f.index()] * a;
                area += a;
            }
            if area > 0.0 {
                sum * (1.0 / area)
            } else {
                floor
            }
        })
        .collect()
}

/// Metric length of the segment between two verts.
pub fn vert_metric(mesh: &Mesh, sizing: &[DMat2], v0: VertId, v1: VertId) -> f64 {
    let du = mesh.vert(v0).u - mesh.vert(v1).u;
    let s0 = du.dot(sizing[v0.index()] * du);
    let s1 = du.dot(sizing[v1.index()] * du);
    (0.5 * (s0 + s1)).max(0.0).sqrt()
}

/// Metric length of an edge: the larger of its two sides' measures.
/// Values above one call for a split.
pub fn edge_metric(mesh: &Mesh, sizing: &[DMat2], edge: EdgeId) -> f64 {
    (0..2)
        .filter_map(|side| mesh.edge_verts(edge, side))
        .map(|[v0, v1]| vert_metric(mesh, sizing, v0, v1))
        .fold(0.0, f64::max)
}
