//! Plastic residual transplant.
//!
//! Before remeshing, each face's plastic curvature and damage are backed up
//! at its material-space centroid. Afterwards every new face takes the
//! residual of the old face enclosing its own centroid, falling back to the
//! nearest backed-up centroid when the point lies outside the old chart.

use plait_math::{DMat2, DVec2};
use plait_mesh::Mesh;
use plait_solver::plasticity::recompute_edge_plasticity;
use plait_types::FaceId;
use serde::{Deserialize, Serialize};

/// Barycentric slack for accepting an enclosing face.
const INSIDE_TOLERANCE: f64 = -1e-6;

/// Plastic state of one old face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Residual {
    pub centroid: DVec2,
    pub s_plastic: DMat2,
    pub damage: f64,
}

pub fn back_up_residuals(mesh: &Mesh) -> Vec<Residual> {
    (0..mesh.face_count())
        .map(|f| {
            let id = FaceId(f as u32);
            let face = mesh.face(id);
            Residual {
                centroid: mesh.material_centroid(id),
                s_plastic: face.s_plastic,
                damage: face.damage,
            }
        })
        .collect()
}

fn nearest(residuals: &[Residual], u: DVec2) -> Option<&Residual> {
    residuals
        .iter()
        .min_by(|a, b| (a.centroid - u).length_squared().total_cmp(&(b.centroid - u).length_squared()))
}

/// Write the backed-up residuals of `old` onto the faces of `mesh` and
/// refresh edge rest angles. `residuals` must come from
/// [`back_up_residuals`] on `old`.
pub fn restore_residuals(mesh: &mut Mesh, old: &Mesh, residuals: &[Residual]) {
    for f in 0..mesh.face_count() {
        let u = mesh.material_centroid(FaceId(f as u32));
        let located = old
            .enclosing_face(u)
            .filter(|&of| old.material_barycentric(of, u).min_element() >= INSIDE_TOLERANCE)
            .and_then(|of| residuals.get(of.index()));
        let Some(residual) = located.or_else(|| nearest(residuals, u)) else {
            continue;
        };
        mesh.faces[f].s_plastic = residual.s_plastic;
        mesh.faces[f].damage = residual.damage;
    }
    recompute_edge_plasticity(mesh);
}
