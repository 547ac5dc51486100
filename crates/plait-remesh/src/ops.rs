//! Local remeshing operations: edge split, edge flip and edge collapse.
//!
//! Each pass reads the current rebuilt [`Mesh`], picks operations whose
//! faces do not overlap, and applies them to the [`WorkMesh`]. Indices in
//! `mesh` and `work` agree at the start of a pass.

use plait_math::{cross2, DMat2, DVec2};
use plait_mesh::topology::{is_seam_or_boundary, is_seam_or_boundary_edge, node_faces, one_ring};
use plait_mesh::{FaceSpec, Mesh, Node, Vert};
use plait_solver::RemeshConfig;
use plait_types::constants::{DEFAULT_EDGE_FLIP_THRESHOLD, DEGENERATE_AREA_THRESHOLD};
use plait_types::{EdgeId, FaceId, NodeId, VertId};

use crate::sizing::{edge_metric, vert_metric};
use crate::work::{edge_key, WorkMesh};

/// New edges of a collapse must stay this far below the split threshold.
const COLLAPSE_METRIC_LIMIT: f64 = 0.8;

/// Rotate `face` so that `a → b` is its first edge. Returns the opposite
/// vert, or `None` when the face does not traverse `a → b`.
fn opposite_in_order(face: &FaceSpec, a: usize, b: usize) -> Option<usize> {
    (0..3)
        .find(|&i| face.verts[i] == a && face.verts[(i + 1) % 3] == b)
        .map(|i| face.verts[(i + 2) % 3])
}

/// The face's verts ordered `[p, q, r]` with `{p, q} = {a, b}` in the
/// face's winding.
fn wound(face: &FaceSpec, a: usize, b: usize) -> Option<[usize; 3]> {
    if let Some(r) = opposite_in_order(face, a, b) {
        return Some([a, b, r]);
    }
    opposite_in_order(face, b, a).map(|r| [b, a, r])
}

fn faces_free(touched: &[bool], faces: &[FaceId]) -> bool {
    faces.iter().all(|f| !touched[f.index()])
}

fn edge_faces(mesh: &Mesh, edge: EdgeId) -> Vec<FaceId> {
    mesh.edge(edge).adj_faces.iter().flatten().copied().collect()
}

// ─── Split ───────────────────────────────────────────────────

/// Split every edge whose metric length exceeds one, longest first,
/// while the mesh stays under the edge budget. Returns the split count.
pub(crate) fn split_pass(work: &mut WorkMesh, mesh: &Mesh, config: &RemeshConfig) -> usize {
    let mut bad: Vec<(EdgeId, f64)> = (0..mesh.edge_count())
        .map(|e| EdgeId(e as u32))
        .map(|e| (e, edge_metric(mesh, &work.sizing, e)))
        .filter(|&(_, m)| m > 1.0)
        .collect();
    bad.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut touched = vec![false; mesh.face_count()];
    let mut edges = mesh.edge_count();
    let mut count = 0;
    for (edge, _) in bad {
        if edges + 3 > config.max_edges {
            break;
        }
        let faces = edge_faces(mesh, edge);
        if !faces_free(&touched, &faces) {
            continue;
        }
        for f in &faces {
            touched[f.index()] = true;
        }
        split_edge(work, mesh, edge);
        edges += 1 + faces.len();
        count += 1;
    }
    count
}

fn mid_sizing(sizing: &[DMat2], a: VertId, b: VertId) -> DMat2 {
    (sizing[a.index()] + sizing[b.index()]) * 0.5
}

fn split_edge(work: &mut WorkMesh, mesh: &Mesh, edge: EdgeId) {
    let e = mesh.edge(edge);
    let [n0, n1] = e.n;
    let (a, b) = (mesh.node(n0), mesh.node(n1));
    let mut node = Node::at(0.5 * (a.x + b.x));
    node.x0 = 0.5 * (a.x0 + b.x0);
    node.y = 0.5 * (a.y + b.y);
    node.v = 0.5 * (a.v + b.v);
    node.acceleration = 0.5 * (a.acceleration + b.acceleration);
    node.label = a.label & b.label;
    let mid = work.push_node(node);

    if let Some(label) = work.edge_labels.remove(&edge_key(n0.index(), n1.index())) {
        work.edge_labels.insert(edge_key(n0.index(), mid), label);
        work.edge_labels.insert(edge_key(mid, n1.index()), label);
    }

    let mut made: Option<([VertId; 2], usize)> = None;
    for side in 0..2 {
        let (Some(f), Some(pair)) = (e.adj_faces[side], mesh.edge_verts(edge, side)) else {
            continue;
        };
        let m = match made {
            Some((prev, m)) if prev == pair => m,
            _ => {
                let [v0, v1] = pair.map(|v| mesh.vert(v));
                let mut vert = Vert::new(0.5 * (v0.u + v1.u), NodeId(mid as u32));
                vert.label = v0.label & v1.label;
                let sizing = mid_sizing(&work.sizing, pair[0], pair[1]);
                let m = work.push_vert(vert, sizing);
                made = Some((pair, m));
                m
            }
        };
        let face = work.faces[f.index()].clone();
        let Some([p, q, r]) = wound(&face, pair[0].index(), pair[1].index()) else {
            continue;
        };
        work.faces[f.index()].verts = [p, m, r];
        work.push_face(FaceSpec {
            verts: [m, q, r],
            ..face
        });
    }
}

// ─── Flip ────────────────────────────────────────────────────

/// Flip edges that violate the anisotropic Delaunay criterion in material
/// space. Returns the flip count.
pub(crate) fn flip_pass(work: &mut WorkMesh, mesh: &Mesh) -> usize {
    let mut touched = vec![false; mesh.face_count()];
    let mut count = 0;
    for e in 0..mesh.edge_count() {
        let edge = EdgeId(e as u32);
        let Some(flip) = flip_candidate(work, mesh, edge) else {
            continue;
        };
        if touched[flip.faces[0].index()] || touched[flip.faces[1].index()] {
            continue;
        }
        touched[flip.faces[0].index()] = true;
        touched[flip.faces[1].index()] = true;
        let [p, q, r0, r1] = flip.quad;
        work.faces[flip.faces[0].index()].verts = [p, r1, r0];
        work.faces[flip.faces[1].index()].verts = [r1, q, r0];
        count += 1;
    }
    count
}

struct Flip {
    faces: [FaceId; 2],
    /// Edge verts `p → q` (face 0 winding), then the opposite verts of
    /// face 0 and face 1.
    quad: [usize; 4],
}

fn flip_candidate(work: &WorkMesh, mesh: &Mesh, edge: EdgeId) -> Option<Flip> {
    let e = mesh.edge(edge);
    let (f0, f1) = (e.adj_faces[0]?, e.adj_faces[1]?);
    if e.label != 0 || is_seam_or_boundary_edge(mesh, edge) {
        return None;
    }
    if work.faces[f0.index()].label != work.faces[f1.index()].label {
        return None;
    }
    let [v0, v1] = mesh.edge_verts(edge, 0)?;
    let [p, q, r0] = wound(&work.faces[f0.index()], v0.index(), v1.index())?;
    let r1 = opposite_in_order(&work.faces[f1.index()], q, p)?;
    let (w0, w1) = (work.verts[r0].node, work.verts[r1].node);
    if mesh.find_edge(w0, w1).is_some() {
        return None;
    }

    let u = |v: usize| work.verts[v].u;
    let (x, z, w, y) = (u(p), u(q), u(r0), u(r1));
    let m = (work.sizing[p] + work.sizing[q] + work.sizing[r0] + work.sizing[r1]) * 0.25;
    let area0 = cross2(z - y, x - y);
    let area1 = cross2(x - w, z - w);
    let inner = |a: DVec2, b: DVec2| a.dot(m * b);
    let delaunay = area0 * inner(x - w, z - w) + inner(z - y, x - y) * area1;
    if delaunay >= -DEFAULT_EDGE_FLIP_THRESHOLD * (area0 + area1) {
        return None;
    }
    // The flipped pair must stay positively wound.
    if cross2(y - x, w - x) <= DEGENERATE_AREA_THRESHOLD
        || cross2(z - y, w - y) <= DEGENERATE_AREA_THRESHOLD
    {
        return None;
    }
    Some(Flip {
        faces: [f0, f1],
        quad: [p, q, r0, r1],
    })
}

// ─── Collapse ────────────────────────────────────────────────

/// Collapse edges whose removal leaves every new edge short, never
/// touching a `preserve` node. Returns the collapse count.
pub(crate) fn collapse_pass(work: &mut WorkMesh, mesh: &Mesh) -> usize {
    let mut short: Vec<(EdgeId, f64)> = (0..mesh.edge_count())
        .map(|e| EdgeId(e as u32))
        .map(|e| (e, edge_metric(mesh, &work.sizing, e)))
        .filter(|&(_, m)| m < COLLAPSE_METRIC_LIMIT)
        .collect();
    short.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut touched = vec![false; mesh.face_count()];
    let mut count = 0;
    for (edge, _) in short {
        let [n0, n1] = mesh.edge(edge).n;
        for (remove, keep) in [(n0, n1), (n1, n0)] {
            let Some(plan) = collapse_plan(work, mesh, edge, remove, keep) else {
                continue;
            };
            let region: Vec<FaceId> = plan
                .ring
                .iter()
                .copied()
                .chain(node_faces(mesh, keep))
                .collect();
            if !faces_free(&touched, &region) {
                continue;
            }
            for f in &region {
                touched[f.index()] = true;
            }
            apply_collapse(work, mesh, &plan);
            count += 1;
            break;
        }
    }
    count
}

struct Collapse {
    remove: NodeId,
    /// Survives at its own position.
    keep: NodeId,
    remove_vert: VertId,
    keep_vert: VertId,
    /// Every face incident to the removed node.
    ring: Vec<FaceId>,
}

fn collapse_plan(
    work: &WorkMesh,
    mesh: &Mesh,
    edge: EdgeId,
    remove: NodeId,
    keep: NodeId,
) -> Option<Collapse> {
    let gone = mesh.node(remove);
    if gone.preserve {
        return None;
    }
    // Seams would need a vert choice per chart.
    let (&[remove_vert], &[keep_vert]) = (gone.verts.as_slice(), mesh.node(keep).verts.as_slice())
    else {
        return None;
    };
    if is_seam_or_boundary(mesh, remove) {
        if !is_seam_or_boundary_edge(mesh, edge) || !on_straight_boundary(mesh, remove) {
            return None;
        }
    }
    let edge_faces = edge_faces(mesh, edge);
    let ring_remove = one_ring(mesh, remove);
    let ring_keep = one_ring(mesh, keep);
    if ring_remove.intersection(&ring_keep).count() != edge_faces.len() {
        return None;
    }

    let ring = node_faces(mesh, remove);
    for &f in &ring {
        if edge_faces.contains(&f) {
            continue;
        }
        let verts = work.faces[f.index()].verts;
        let moved = verts.map(|v| if v == remove_vert.index() { keep_vert.index() } else { v });
        let [a, b, c] = moved.map(|v| work.verts[v].u);
        if cross2(b - a, c - a) <= DEGENERATE_AREA_THRESHOLD {
            return None;
        }
        let old_normal = mesh.face_normal(f, plait_mesh::Space::World);
        let [xa, xb, xc] = moved.map(|v| mesh.node(work.verts[v].node).x);
        if (xb - xa).cross(xc - xa).dot(old_normal) <= 0.0 {
            return None;
        }
        for v in moved {
            if v != keep_vert.index()
                && vert_metric(mesh, &work.sizing, keep_vert, VertId(v as u32)) > COLLAPSE_METRIC_LIMIT
            {
                return None;
            }
        }
    }
    Some(Collapse {
        remove,
        keep,
        remove_vert,
        keep_vert,
        ring,
    })
}

/// True when the boundary through `node` is straight in material space,
/// so removing the node keeps the outline.
fn on_straight_boundary(mesh: &Mesh, node: NodeId) -> bool {
    let ends: Vec<NodeId> = mesh
        .node(node)
        .adj_edges
        .iter()
        .map(|&e| mesh.edge(e))
        .filter(|e| e.is_boundary())
        .map(|e| e.other(node))
        .collect();
    let [a, b] = ends.as_slice() else {
        return false;
    };
    let u = |n: NodeId| mesh.vert(mesh.node(n).verts[0]).u;
    let (ua, ub, un) = (u(*a), u(*b), u(node));
    let span = (ub - ua).length_squared();
    cross2(ub - ua, un - ua).abs() <= 1e-9 * span
}

fn apply_collapse(work: &mut WorkMesh, mesh: &Mesh, plan: &Collapse) {
    for &f in &plan.ring {
        let face = &mut work.faces[f.index()];
        if face.verts.contains(&plan.keep_vert.index()) {
            work.face_alive[f.index()] = false;
            continue;
        }
        for v in &mut face.verts {
            if *v == plan.remove_vert.index() {
                *v = plan.keep_vert.index();
            }
        }
    }
    work.node_alive[plan.remove.index()] = false;
    work.vert_alive[plan.remove_vert.index()] = false;

    // Labels of edges folded onto the kept node carry over.
    let r = plan.remove.index();
    let k = plan.keep.index();
    for neighbor in one_ring(mesh, plan.remove) {
        if let Some(label) = work.edge_labels.remove(&edge_key(r, neighbor.index())) {
            if neighbor != plan.keep {
                work.edge_labels.entry(edge_key(k, neighbor.index())).or_insert(label);
            }
        }
    }
}
