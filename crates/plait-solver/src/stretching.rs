//! In-plane stretching of one face.
//!
//! ## Energy
//!
//! With Green strain `G = (FᵀF − I)/2` and tabulated stiffness
//! `k = (k₀, k₁, k₂, k₃)`:
//!
//! ```text
//! E = a/2 · (k₀ G₀₀² + k₂ G₁₁² + 2 k₁ G₀₀ G₁₁ + k₃ G₀₁²)
//! ```
//!
//! `k` is divided by `1 + weakening · damage`. The Hessian keeps the
//! Gauss–Newton part plus the clamped `max(Gᵢᵢ, 0)` curvature terms; the
//! `G₀₁ (DuᵀDv + DvᵀDu)/2` term is dropped since it can be indefinite.

use plait_math::decomposition::deformation_gradient;
use plait_math::element::{kron_outer_i3, kron_row_i3, Mat9, Vec9};
use plait_math::{DMat2, DVec3};
use plait_mesh::{Mesh, Space};
use plait_types::FaceId;

use crate::cloth::Cloth;

/// Rows `du`, `dv` of `D = invDmᵀ [[-1, 1, 0], [-1, 0, 1]]`: the
/// derivatives of `x_u`, `x_v` with respect to the three node positions.
pub fn shape_derivatives(inv_dm: DMat2) -> ([f64; 3], [f64; 3]) {
    let c0 = inv_dm.x_axis;
    let c1 = inv_dm.y_axis;
    (
        [-(c0.x + c0.y), c0.x, c0.y],
        [-(c1.x + c1.y), c1.x, c1.y],
    )
}

fn face_positions(mesh: &Mesh, f: FaceId, space: Space) -> [DVec3; 3] {
    let [a, b, c] = mesh.face_nodes(f);
    [mesh.pos(a, space), mesh.pos(b, space), mesh.pos(c, space)]
}

/// Green strain of face `f` in the given space.
pub fn green_strain(mesh: &Mesh, f: FaceId, space: Space) -> DMat2 {
    let [x0, x1, x2] = face_positions(mesh, f, space);
    let fgrad = deformation_gradient(x0, x1, x2, mesh.face(f).inv_dm);
    (fgrad.ftf() - DMat2::IDENTITY) * 0.5
}

fn weakened_stiffness(cloth: &Cloth, f: FaceId, g: DMat2) -> plait_math::DVec4 {
    let face = cloth.mesh.face(f);
    let material = cloth.material(face.label);
    material.stretching_stiffness(g) * (1.0 / (1.0 + material.weakening() * face.damage))
}

/// Stretching energy of face `f`.
pub fn stretching_energy(cloth: &Cloth, f: FaceId, space: Space) -> f64 {
    let g = green_strain(&cloth.mesh, f, space);
    let k = weakened_stiffness(cloth, f, g);
    let (g00, g01, g11) = (g.x_axis.x, g.y_axis.x, g.y_axis.y);
    cloth.mesh.face(f).a * (k.x * g00 * g00 + k.z * g11 * g11 + 2.0 * k.y * g00 * g11 + k.w * g01 * g01)
        / 2.0
}

/// Force Jacobian and force on the three nodes of face `f`.
pub fn stretching_force(cloth: &Cloth, f: FaceId, space: Space) -> (Mat9, Vec9) {
    let mesh = &cloth.mesh;
    let face = mesh.face(f);
    let [x0, x1, x2] = face_positions(mesh, f, space);
    let fgrad = deformation_gradient(x0, x1, x2, face.inv_dm);
    let g = (fgrad.ftf() - DMat2::IDENTITY) * 0.5;
    let k = weakened_stiffness(cloth, f, g);
    let (g00, g01, g11) = (g.x_axis.x, g.y_axis.x, g.y_axis.y);

    let (du, dv) = shape_derivatives(face.inv_dm);
    let (xu, xv) = (fgrad.col0, fgrad.col1);
    let fuu: Vec9 = kron_row_i3(&du, xu);
    let fvv: Vec9 = kron_row_i3(&dv, xv);
    let fuv: Vec9 = (kron_row_i3::<9>(&du, xv) + kron_row_i3::<9>(&dv, xu)) * 0.5;
    let dudu: Mat9 = kron_outer_i3(&du, &du);
    let dvdv: Mat9 = kron_outer_i3(&dv, &dv);

    let grad = fuu * (k.x * g00)
        + fvv * (k.z * g11)
        + (fvv * g00 + fuu * g11) * k.y
        + fuv * (2.0 * k.w * g01);
    let hess = (fuu * fuu.transpose() + dudu * g00.max(0.0)) * k.x
        + (fvv * fvv.transpose() + dvdv * g11.max(0.0)) * k.z
        + (fuu * fvv.transpose()
            + dvdv * g00.max(0.0)
            + fvv * fuu.transpose()
            + dudu * g11.max(0.0))
            * k.y
        + (fuv * fuv.transpose()) * (2.0 * k.w);

    (hess * -face.a, grad * -face.a)
}
