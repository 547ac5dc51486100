//! Procedural mesh generators for scenes and testing.
//!
//! These generators produce deterministic, resolution-configurable meshes
//! with consistent winding, material-space charts in meters, and all
//! derived data computed.

use plait_math::{DVec2, DVec3};
use plait_types::{NodeId, PlaitResult};

use crate::mesh::{FaceSpec, Mesh, Node, Vert};
use crate::normals::compute_ws_data;

/// Generates a flat rectangular quad grid in the XY plane.
///
/// The grid spans `[-width/2, width/2]` in X and `[-height/2, height/2]` in Y,
/// centered at the origin at Z=0, facing +Z. Material coordinates equal the
/// rest positions shifted so that the lower-left corner is at `(0, 0)`.
///
/// # Arguments
/// - `cols`: Number of quads along X (node count = cols + 1).
/// - `rows`: Number of quads along Y (node count = rows + 1).
/// - `width`: Total width in meters.
/// - `height`: Total height in meters.
///
/// # Example
/// ```
/// use plait_mesh::generators::quad_grid;
/// let mesh = quad_grid(2, 2, 1.0, 1.0).unwrap();
/// assert_eq!(mesh.node_count(), 9);  // 3×3 nodes
/// assert_eq!(mesh.face_count(), 8);  // 2×2 quads × 2 tris each
/// ```
pub fn quad_grid(cols: usize, rows: usize, width: f64, height: f64) -> PlaitResult<Mesh> {
    let nx = cols + 1;
    let ny = rows + 1;
    let mut nodes = Vec::with_capacity(nx * ny);
    let mut verts = Vec::with_capacity(nx * ny);

    for j in 0..ny {
        for i in 0..nx {
            let u = DVec2::new(
                i as f64 / cols as f64 * width,
                j as f64 / rows as f64 * height,
            );
            let x = DVec3::new(u.x - width / 2.0, u.y - height / 2.0, 0.0);
            verts.push(Vert::new(u, NodeId(nodes.len() as u32)));
            nodes.push(Node::at(x));
        }
    }

    let mut faces = Vec::with_capacity(cols * rows * 2);
    for j in 0..rows {
        for i in 0..cols {
            let a = j * nx + i;
            let b = a + 1;
            let c = a + nx + 1;
            let d = a + nx;
            faces.push(FaceSpec::new([a, b, c]));
            faces.push(FaceSpec::new([a, c, d]));
        }
    }

    finish(nodes, verts, faces)
}

/// Generates a UV sphere centered at the origin with outward normals.
///
/// Poles are single nodes and the longitude seam shares nodes between two
/// verts, so the result is a closed surface.
///
/// # Arguments
/// - `radius`: Sphere radius in meters.
/// - `stacks`: Number of latitude divisions (at least 2).
/// - `slices`: Number of longitude divisions (at least 3).
pub fn uv_sphere(radius: f64, stacks: usize, slices: usize) -> PlaitResult<Mesh> {
    let stacks = stacks.max(2);
    let slices = slices.max(3);
    let node_of = |i: usize, j: usize| -> usize {
        if i == 0 {
            0
        } else if i == stacks {
            1 + (stacks - 1) * slices
        } else {
            1 + (i - 1) * slices + (j % slices)
        }
    };

    let mut nodes = Vec::with_capacity(2 + (stacks - 1) * slices);
    nodes.push(Node::at(DVec3::new(0.0, radius, 0.0)));
    for i in 1..stacks {
        let phi = std::f64::consts::PI * i as f64 / stacks as f64;
        for j in 0..slices {
            let theta = 2.0 * std::f64::consts::PI * j as f64 / slices as f64;
            let dir = DVec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            nodes.push(Node::at(dir * radius));
        }
    }
    nodes.push(Node::at(DVec3::new(0.0, -radius, 0.0)));

    let mut verts = Vec::with_capacity((stacks + 1) * (slices + 1));
    for i in 0..=stacks {
        for j in 0..=slices {
            let u = DVec2::new(
                2.0 * std::f64::consts::PI * radius * j as f64 / slices as f64,
                std::f64::consts::PI * radius * i as f64 / stacks as f64,
            );
            verts.push(Vert::new(u, NodeId(node_of(i, j) as u32)));
        }
    }

    let vert_of = |i: usize, j: usize| i * (slices + 1) + j;
    let mut faces = Vec::with_capacity(stacks * slices * 2);
    for i in 0..stacks {
        for j in 0..slices {
            let a = vert_of(i, j);
            let b = vert_of(i + 1, j);
            let c = vert_of(i, j + 1);
            let d = vert_of(i + 1, j + 1);
            // Skip the degenerate triangle at each pole.
            if i != 0 {
                faces.push(FaceSpec::new([a, c, b]));
            }
            if i != stacks - 1 {
                faces.push(FaceSpec::new([c, d, b]));
            }
        }
    }

    finish(nodes, verts, faces)
}

fn finish(nodes: Vec<Node>, verts: Vec<Vert>, faces: Vec<FaceSpec>) -> PlaitResult<Mesh> {
    let mut mesh = Mesh::from_parts(nodes, verts, faces)?;
    mesh.compute_ms_data();
    compute_ws_data(&mut mesh);
    Ok(mesh)
}
