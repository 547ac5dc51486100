//! Point–triangle narrow phase.
//!
//! For a query point and a triangle, finds the closest point on the
//! triangle with its barycentric weights and the signed distance along
//! the triangle normal. Contacts carry everything proximity constraints
//! and position corrections need.

use plait_math::DVec3;
use plait_mesh::Mesh;
use plait_types::{FaceId, NodeId};
use serde::{Deserialize, Serialize};

/// Closest point on a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    pub point: DVec3,
    /// Barycentric weights of `point`; non-negative, summing to one.
    pub weights: [f64; 3],
}

/// Closest point to `p` on triangle `(a, b, c)`, by Voronoi region.
pub fn closest_point_on_triangle(p: DVec3, a: DVec3, b: DVec3, c: DVec3) -> ClosestPoint {
    let at = |w: [f64; 3]| ClosestPoint {
        point: a * w[0] + b * w[1] + c * w[2],
        weights: w,
    };
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return at([1.0, 0.0, 0.0]);
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return at([0.0, 1.0, 0.0]);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let t = d1 / (d1 - d3);
        return at([1.0 - t, t, 0.0]);
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return at([0.0, 0.0, 1.0]);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let t = d2 / (d2 - d6);
        return at([1.0 - t, 0.0, t]);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let t = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return at([0.0, 1.0 - t, t]);
    }

    let denom = va + vb + vc;
    if denom.abs() < plait_types::constants::EPSILON {
        return at([1.0, 0.0, 0.0]);
    }
    let v = vb / denom;
    let w = vc / denom;
    at([1.0 - v - w, v, w])
}

/// A node near a face, possibly of another mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceContact {
    pub node: NodeId,
    pub face: FaceId,
    /// Nodes of `face`, in face order.
    pub face_nodes: [NodeId; 3],
    /// Barycentric weights of the closest point.
    pub weights: [f64; 3],
    /// Unit normal pointing from the face toward the node's side.
    pub normal: DVec3,
    /// Distance along `normal`; negative once the node crossed the face.
    pub distance: f64,
}

impl FaceContact {
    /// Returns the penetration depth below `thickness` (zero if clear).
    pub fn penetration_depth(&self, thickness: f64) -> f64 {
        (thickness - self.distance).max(0.0)
    }
}

/// Measure `x` against face `f` of `mesh`.
///
/// `side` is the point the node is known to be on the correct side of
/// (usually its previous position measured against the face's previous
/// positions); the normal is flipped to point toward it. Returns `None`
/// for degenerate faces or when the closest point is farther than `radius`.
pub fn point_face_contact(
    x: DVec3,
    side: Option<(DVec3, [DVec3; 3])>,
    node: NodeId,
    mesh: &Mesh,
    f: FaceId,
    radius: f64,
) -> Option<FaceContact> {
    let face_nodes = mesh.face_nodes(f);
    let [a, b, c] = face_nodes.map(|n| mesh.node(n).x);
    let n = plait_math::normalize_or_zero((b - a).cross(c - a));
    if n == DVec3::ZERO {
        return None;
    }
    let closest = closest_point_on_triangle(x, a, b, c);
    if (x - closest.point).length() > radius {
        return None;
    }
    let mut normal = n;
    let reference = match side {
        Some((x_prev, [pa, pb, pc])) => {
            let prev = closest.weights[0] * pa + closest.weights[1] * pb + closest.weights[2] * pc;
            let prev_n = (pb - pa).cross(pc - pa);
            let prev_n = if prev_n.dot(n) < 0.0 { -prev_n } else { prev_n };
            prev_n.normalize_or_zero().dot(x_prev - prev)
        }
        None => n.dot(x - closest.point),
    };
    if reference < 0.0 {
        normal = -normal;
    }
    Some(FaceContact {
        node,
        face: f,
        face_nodes,
        weights: closest.weights,
        normal,
        distance: normal.dot(x - closest.point),
    })
}
