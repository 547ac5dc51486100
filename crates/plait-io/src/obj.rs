//! OBJ-derived mesh interchange format.
//!
//! Plain OBJ records plus extensions for simulation state:
//!
//! | record | meaning |
//! |--------|---------|
//! | `vt u v` / `vl l` | material-space vert, vert label |
//! | `v x y z` | node world position |
//! | `ny x y z` / `nv x y z` / `nl l` | plastic position, velocity, label of the last node |
//! | `e n0 n1` | edge (1-based nodes) carrying the following records |
//! | `ea θ` / `ed d` / `el l` | rest angle, damage, label of the last edge |
//! | `f n/v n/v n/v` | face by 1-based node/vert pairs; polygons are fanned |
//! | `tl l` / `ts s00 s01 s10 s11` / `td d` | label, plastic curvature, damage of the last face |
//!
//! Writers emit extension records only for non-default values. Floats are
//! written in their shortest round-trip form, so a saved mesh reloads
//! with bit-identical fields.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use plait_math::{DMat2, DVec2, DVec3};
use plait_mesh::normals::compute_ws_data;
use plait_mesh::topology::mark_nodes_to_preserve;
use plait_mesh::{FaceSpec, Mesh, Node, Vert};
use plait_types::{NodeId, PlaitError, PlaitResult};
use tracing::{debug, warn};

fn parse_error(line: usize, message: impl Into<String>) -> PlaitError {
    PlaitError::Parse {
        line,
        message: message.into(),
    }
}

fn numbers<const N: usize>(tokens: &[&str], line: usize) -> PlaitResult<[f64; N]> {
    if tokens.len() < N {
        return Err(parse_error(line, format!("expected {N} values, found {}", tokens.len())));
    }
    let mut out = [0.0; N];
    for (slot, token) in out.iter_mut().zip(tokens) {
        *slot = token
            .parse()
            .map_err(|_| parse_error(line, format!("'{token}' is not a number")))?;
    }
    Ok(out)
}

fn label(tokens: &[&str], line: usize) -> PlaitResult<u32> {
    let token = tokens
        .first()
        .ok_or_else(|| parse_error(line, "missing label"))?;
    token
        .parse()
        .map_err(|_| parse_error(line, format!("'{token}' is not a label")))
}

/// 1-based index into a list of `len` entries.
fn index(token: &str, len: usize, what: &str, line: usize) -> PlaitResult<usize> {
    let i: usize = token
        .parse()
        .map_err(|_| parse_error(line, format!("'{token}' is not a {what} index")))?;
    if i == 0 || i > len {
        return Err(parse_error(line, format!("undefined {what} {i} (have {len})")));
    }
    Ok(i - 1)
}

fn angle(x0: DVec3, x1: DVec3, x2: DVec3) -> f64 {
    let e1 = (x1 - x0).normalize_or_zero();
    let e2 = (x2 - x0).normalize_or_zero();
    e1.dot(e2).clamp(-1.0, 1.0).acos()
}

/// Fan a polygon from the corner that maximizes the smallest angle.
fn triangulate(corners: &[usize], x: impl Fn(usize) -> DVec3) -> Vec<[usize; 3]> {
    let n = corners.len();
    let mut best = (0, f64::NEG_INFINITY);
    for root in 0..n {
        let mut min_angle = f64::INFINITY;
        for j in 2..n {
            let (a, b, c) = (
                x(corners[root]),
                x(corners[(root + j - 1) % n]),
                x(corners[(root + j) % n]),
            );
            min_angle = min_angle.min(angle(a, b, c)).min(angle(b, c, a)).min(angle(c, a, b));
        }
        if min_angle > best.1 {
            best = (root, min_angle);
        }
    }
    let root = best.0;
    (2..n)
        .map(|j| [root, (root + j - 1) % n, (root + j) % n])
        .collect()
}

#[derive(Default)]
struct PendingEdge {
    nodes: (usize, usize),
    line: usize,
    theta_ideal: f64,
    damage: f64,
    label: u32,
}

struct PendingVert {
    u: DVec2,
    label: u32,
    node: Option<usize>,
}

enum Last {
    Nothing,
    Vert,
    Node,
    Edge,
    Face(usize),
}

/// Parse a mesh from interchange text.
pub fn read_obj<R: BufRead>(reader: R) -> PlaitResult<Mesh> {
    let mut nodes: Vec<Node> = Vec::new();
    let mut verts: Vec<PendingVert> = Vec::new();
    let mut faces: Vec<FaceSpec> = Vec::new();
    let mut edges: Vec<PendingEdge> = Vec::new();
    let mut first_vert: Vec<Option<usize>> = Vec::new();
    let mut last = Last::Nothing;

    for (i, text) in reader.lines().enumerate() {
        let text = text?;
        let line = i + 1;
        let content = text.split('#').next().unwrap_or_default();
        let tokens: Vec<&str> = content.split_whitespace().collect();
        let Some((&keyword, args)) = tokens.split_first() else {
            continue;
        };
        let orphan = || parse_error(line, format!("'{keyword}' has no preceding owner"));
        match keyword {
            "vt" => {
                let [u, v] = numbers::<2>(args, line)?;
                verts.push(PendingVert {
                    u: DVec2::new(u, v),
                    label: 0,
                    node: None,
                });
                last = Last::Vert;
            }
            "vl" => {
                let Last::Vert = last else { return Err(orphan()) };
                let vert = verts.last_mut().ok_or_else(orphan)?;
                vert.label = label(args, line)?;
            }
            "v" => {
                let [x, y, z] = numbers::<3>(args, line)?;
                nodes.push(Node::at(DVec3::new(x, y, z)));
                first_vert.push(None);
                last = Last::Node;
            }
            "ny" | "nv" | "nl" => {
                let Last::Node = last else { return Err(orphan()) };
                let node = nodes.last_mut().ok_or_else(orphan)?;
                match keyword {
                    "ny" => node.y = DVec3::from_array(numbers::<3>(args, line)?),
                    "nv" => node.v = DVec3::from_array(numbers::<3>(args, line)?),
                    _ => node.label = label(args, line)?,
                }
            }
            "e" => {
                let [a, b] = [0, 1].map(|k| args.get(k).copied().unwrap_or(""));
                edges.push(PendingEdge {
                    nodes: (
                        index(a, nodes.len(), "node", line)?,
                        index(b, nodes.len(), "node", line)?,
                    ),
                    line,
                    ..Default::default()
                });
                last = Last::Edge;
            }
            "ea" | "ed" | "el" => {
                let Last::Edge = last else { return Err(orphan()) };
                let edge = edges.last_mut().ok_or_else(orphan)?;
                match keyword {
                    "ea" => edge.theta_ideal = numbers::<1>(args, line)?[0],
                    "ed" => edge.damage = numbers::<1>(args, line)?[0],
                    _ => edge.label = label(args, line)?,
                }
            }
            "f" => {
                if args.len() < 3 {
                    return Err(parse_error(line, "a face needs at least three corners"));
                }
                let mut corners = Vec::with_capacity(args.len());
                for corner in args {
                    let mut parts = corner.split('/');
                    let n = index(parts.next().unwrap_or(""), nodes.len(), "node", line)?;
                    let v = match parts.next().filter(|p| !p.is_empty()) {
                        Some(token) => index(token, verts.len(), "vert", line)?,
                        None => match first_vert[n] {
                            Some(v) => v,
                            None => {
                                let x = nodes[n].x;
                                verts.push(PendingVert {
                                    u: DVec2::new(x.x, x.y),
                                    label: nodes[n].label,
                                    node: None,
                                });
                                verts.len() - 1
                            }
                        },
                    };
                    match verts[v].node {
                        Some(other) if other != n => {
                            return Err(parse_error(
                                line,
                                format!("vert {} is already attached to node {}", v + 1, other + 1),
                            ));
                        }
                        _ => verts[v].node = Some(n),
                    }
                    first_vert[n].get_or_insert(v);
                    corners.push(v);
                }
                let start = faces.len();
                let triangles = if corners.len() == 3 {
                    vec![[0, 1, 2]]
                } else {
                    triangulate(&corners, |v| verts[v].node.map_or(DVec3::ZERO, |n| nodes[n].x))
                };
                for [a, b, c] in triangles {
                    faces.push(FaceSpec::new([corners[a], corners[b], corners[c]]));
                }
                last = Last::Face(start);
            }
            "tl" | "fl" | "ts" | "fs" | "td" | "fd" => {
                let Last::Face(start) = last else { return Err(orphan()) };
                let value = match keyword {
                    "tl" | "fl" => FaceRecord::Label(label(args, line)?),
                    "ts" | "fs" => {
                        let [s00, s01, s10, s11] = numbers::<4>(args, line)?;
                        FaceRecord::Plastic(DMat2::from_cols(
                            DVec2::new(s00, s10),
                            DVec2::new(s01, s11),
                        ))
                    }
                    _ => FaceRecord::Damage(numbers::<1>(args, line)?[0]),
                };
                for face in &mut faces[start..] {
                    match value {
                        FaceRecord::Label(l) => face.label = l,
                        FaceRecord::Plastic(s) => face.s_plastic = s,
                        FaceRecord::Damage(d) => face.damage = d,
                    }
                }
            }
            "vn" | "o" | "g" | "s" | "usemtl" | "mtllib" => {}
            other => {
                debug!(line, keyword = other, "skipping unknown record");
            }
        }
    }

    // Verts no face uses have no node; drop them and renumber.
    let mut remap = vec![usize::MAX; verts.len()];
    let mut kept = Vec::with_capacity(verts.len());
    for (i, pending) in verts.iter().enumerate() {
        if let Some(node) = pending.node {
            remap[i] = kept.len();
            let mut vert = Vert::new(pending.u, NodeId(node as u32));
            vert.label = pending.label;
            kept.push(vert);
        }
    }
    if kept.len() < verts.len() {
        warn!(dropped = verts.len() - kept.len(), "verts not used by any face");
    }
    for face in &mut faces {
        face.verts = face.verts.map(|v| remap[v]);
    }

    let mut mesh = Mesh::from_parts(nodes, kept, faces)?;
    for pending in &edges {
        let (a, b) = pending.nodes;
        let edge = mesh
            .find_edge(NodeId(a as u32), NodeId(b as u32))
            .ok_or_else(|| {
                parse_error(
                    pending.line,
                    format!("edge ({}, {}) is not an edge of any face", a + 1, b + 1),
                )
            })?;
        let edge = &mut mesh.edges[edge.index()];
        edge.theta_ideal = pending.theta_ideal;
        edge.damage = pending.damage;
        edge.label = pending.label;
    }
    mark_nodes_to_preserve(&mut mesh);
    mesh.compute_ms_data();
    compute_ws_data(&mut mesh);
    debug!(
        nodes = mesh.node_count(),
        verts = mesh.verts.len(),
        faces = mesh.face_count(),
        "mesh loaded"
    );
    Ok(mesh)
}

#[derive(Clone, Copy)]
enum FaceRecord {
    Label(u32),
    Plastic(DMat2),
    Damage(f64),
}

/// Parse a mesh from an in-memory string.
pub fn parse_obj(text: &str) -> PlaitResult<Mesh> {
    read_obj(text.as_bytes())
}

/// Load a mesh file.
pub fn load_obj(path: impl AsRef<Path>) -> PlaitResult<Mesh> {
    let file = File::open(path.as_ref())?;
    read_obj(BufReader::new(file))
}

/// Write `mesh` in interchange form.
pub fn write_obj<W: Write>(mesh: &Mesh, out: &mut W) -> PlaitResult<()> {
    for vert in &mesh.verts {
        writeln!(out, "vt {:?} {:?}", vert.u.x, vert.u.y)?;
        if vert.label != 0 {
            writeln!(out, "vl {}", vert.label)?;
        }
    }
    for node in &mesh.nodes {
        let [x, y, z] = node.x.to_array();
        writeln!(out, "v {x:?} {y:?} {z:?}")?;
        if node.y != node.x {
            let [x, y, z] = node.y.to_array();
            writeln!(out, "ny {x:?} {y:?} {z:?}")?;
        }
        if node.v != DVec3::ZERO {
            let [x, y, z] = node.v.to_array();
            writeln!(out, "nv {x:?} {y:?} {z:?}")?;
        }
        if node.label != 0 {
            writeln!(out, "nl {}", node.label)?;
        }
    }
    for edge in &mesh.edges {
        if edge.theta_ideal == 0.0 && edge.damage == 0.0 && edge.label == 0 {
            continue;
        }
        writeln!(out, "e {} {}", edge.n[0].index() + 1, edge.n[1].index() + 1)?;
        if edge.theta_ideal != 0.0 {
            writeln!(out, "ea {:?}", edge.theta_ideal)?;
        }
        if edge.damage != 0.0 {
            writeln!(out, "ed {:?}", edge.damage)?;
        }
        if edge.label != 0 {
            writeln!(out, "el {}", edge.label)?;
        }
    }
    for face in &mesh.faces {
        write!(out, "f")?;
        for v in face.v {
            let node = mesh.vert(v).node;
            write!(out, " {}/{}", node.index() + 1, v.index() + 1)?;
        }
        writeln!(out)?;
        if face.label != 0 {
            writeln!(out, "tl {}", face.label)?;
        }
        if face.s_plastic != DMat2::ZERO {
            let s = face.s_plastic;
            writeln!(
                out,
                "ts {:?} {:?} {:?} {:?}",
                s.x_axis.x, s.y_axis.x, s.x_axis.y, s.y_axis.y
            )?;
        }
        if face.damage != 0.0 {
            writeln!(out, "td {:?}", face.damage)?;
        }
    }
    Ok(())
}

/// Interchange text of `mesh`.
pub fn obj_string(mesh: &Mesh) -> PlaitResult<String> {
    let mut buf = Vec::new();
    write_obj(mesh, &mut buf)?;
    String::from_utf8(buf).map_err(|e| PlaitError::Serialization(e.to_string()))
}

/// Save `mesh` to a file, replacing it.
pub fn save_obj(mesh: &Mesh, path: impl AsRef<Path>) -> PlaitResult<()> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    write_obj(mesh, &mut out)?;
    out.flush()?;
    Ok(())
}
