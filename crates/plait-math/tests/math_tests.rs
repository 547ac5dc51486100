//! Integration tests for plait-math.

use approx::assert_relative_eq;
use plait_math::decomposition::{deformation_gradient, eigen_symmetric_2x2, svd_3x2};
use plait_math::element::{block_mat, block_vec, kron_outer_i3, stack, Mat9, Vec9};
use plait_math::faer_solver::FaerSolver;
use plait_math::mat3x2::Mat3x2;
use plait_math::motion::{Motion, Transform};
use plait_math::sparse::{BlockSystem, CsrMatrix, SparseSolver};
use plait_math::spline::Spline;
use plait_math::{outer, DMat2, DMat3, DQuat, DVec2, DVec3};

// ─── Mat3x2 Tests ─────────────────────────────────────────────

#[test]
fn identity_ftf() {
    let c = Mat3x2::IDENTITY.ftf();
    assert_eq!(c, DMat2::IDENTITY);
}

#[test]
fn mul_mat2_identity() {
    let f = Mat3x2::from_cols(DVec3::new(1.0, 2.0, 3.0), DVec3::new(4.0, 5.0, 6.0));
    assert_eq!(f.mul_mat2(DMat2::IDENTITY), f);
}

#[test]
fn transpose_mul_matches_columns() {
    let f = Mat3x2::from_cols(DVec3::X, DVec3::new(0.0, 2.0, 0.0));
    let v = f.transpose_mul_vec3(DVec3::new(3.0, 4.0, 5.0));
    assert_eq!(v, DVec2::new(3.0, 8.0));
}

// ─── Decomposition Tests ──────────────────────────────────────

#[test]
fn eigen_diagonal_sorted_descending() {
    let m = DMat2::from_cols(DVec2::new(1.0, 0.0), DVec2::new(0.0, 3.0));
    let eig = eigen_symmetric_2x2(m);
    assert_relative_eq!(eig.values.x, 3.0);
    assert_relative_eq!(eig.values.y, 1.0);
    assert_relative_eq!(eig.vectors.x_axis.y.abs(), 1.0);
}

#[test]
fn eigen_reconstructs_matrix() {
    let m = DMat2::from_cols(DVec2::new(2.0, 0.5), DVec2::new(0.5, 1.0));
    let eig = eigen_symmetric_2x2(m);
    let q = eig.vectors;
    let d = DMat2::from_diagonal(eig.values);
    let r = q * d * q.transpose();
    for (a, b) in r.to_cols_array().iter().zip(m.to_cols_array().iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-12);
    }
}

#[test]
fn svd_of_stretch_recovers_singular_values() {
    let f = Mat3x2::from_cols(DVec3::new(2.0, 0.0, 0.0), DVec3::new(0.0, 0.5, 0.0));
    let svd = svd_3x2(&f);
    assert_relative_eq!(svd.sigma.x, 2.0, epsilon = 1e-12);
    assert_relative_eq!(svd.sigma.y, 0.5, epsilon = 1e-12);
    let back = svd.recompose(svd.sigma);
    assert_relative_eq!((back - f).frobenius_norm_sq(), 0.0, epsilon = 1e-20);
}

#[test]
fn svd_degenerate_does_not_produce_nan() {
    let svd = svd_3x2(&Mat3x2::ZERO);
    let f = svd.recompose(DVec2::ONE);
    assert!(f.col0.is_finite() && f.col1.is_finite());
    assert_relative_eq!(f.col0.length(), 1.0, epsilon = 1e-12);
}

#[test]
fn deformation_gradient_identity() {
    let f = deformation_gradient(DVec3::ZERO, DVec3::X, DVec3::Y, DMat2::IDENTITY);
    assert_eq!(f, Mat3x2::IDENTITY);
}

// ─── Element Matrix Tests ─────────────────────────────────────

#[test]
fn stack_and_block_round_trip() {
    let xs = [DVec3::new(1.0, 2.0, 3.0), DVec3::new(4.0, 5.0, 6.0), DVec3::Z];
    let v: Vec9 = stack(&xs);
    assert_eq!(block_vec(&v, 1), xs[1]);
}

#[test]
fn kron_outer_blocks_are_scaled_identity() {
    let m: Mat9 = kron_outer_i3(&[1.0, -1.0, 0.0], &[2.0, 0.0, 1.0]);
    assert_eq!(block_mat(&m, 0, 0), DMat3::from_diagonal(DVec3::splat(2.0)));
    assert_eq!(block_mat(&m, 1, 2), DMat3::from_diagonal(DVec3::splat(-1.0)));
    assert_eq!(block_mat(&m, 2, 0), DMat3::ZERO);
}

// ─── Sparse Matrix Tests ─────────────────────────────────────

#[test]
fn empty_csr() {
    let m = CsrMatrix::new(3, 3);
    assert_eq!(m.nnz(), 0);
    assert_eq!(m.row_ptr.len(), 4);
}

#[test]
fn csr_from_triplets_sorts_columns() {
    let triplets = vec![(0, 2, 3.0), (0, 0, 1.0), (0, 1, 2.0)];
    let m = CsrMatrix::from_triplets(1, 3, &triplets);
    assert_eq!(m.col_idx, vec![0, 1, 2]);
    assert_eq!(m.values, vec![1.0, 2.0, 3.0]);
}

#[test]
fn csr_from_triplets_sums_duplicates() {
    let triplets = vec![(1, 1, 1.0), (0, 0, 2.0), (1, 1, 2.5), (1, 0, -1.0), (0, 0, 0.5)];
    let m = CsrMatrix::from_triplets(2, 2, &triplets);
    assert_eq!(m.nnz(), 3);
    assert_eq!(m.get(0, 0), 2.5);
    assert_eq!(m.get(1, 1), 3.5);
    assert_eq!(m.get(1, 0), -1.0);
    assert_eq!(m.get(0, 1), 0.0);
}

#[test]
fn csr_mul_vec() {
    let m = CsrMatrix::from_triplets(2, 2, &[(0, 0, 2.0), (0, 1, 1.0), (1, 1, 3.0)]);
    assert_eq!(m.mul_vec(&[1.0, 2.0]), vec![4.0, 6.0]);
}

#[test]
fn block_system_accumulates_blocks() {
    let mut sys = BlockSystem::new(2);
    sys.add_block(0, 1, DMat3::IDENTITY);
    sys.add_block(0, 1, outer(DVec3::X, DVec3::X));
    sys.add_rhs(1, DVec3::Y);
    sys.add_rhs(1, DVec3::Y);
    let a = sys.to_csr();
    assert_eq!(a.rows, 6);
    assert_eq!(a.get(0, 3), 2.0);
    assert_eq!(a.get(1, 4), 1.0);
    assert_eq!(sys.rhs_flat()[4], 2.0);
}

// ─── FaerSolver Tests ────────────────────────────────────────

#[test]
fn faer_identity_solve() {
    let matrix = CsrMatrix::from_triplets(3, 3, &[(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)]);
    let mut solver = FaerSolver::new();
    assert!(!solver.is_factorized());
    solver.factorize(&matrix).unwrap();
    assert!(solver.is_factorized());

    let rhs = [3.0, 7.0, -2.0];
    let mut sol = [0.0; 3];
    solver.solve(&rhs, &mut sol).unwrap();
    for i in 0..3 {
        assert_relative_eq!(sol[i], rhs[i], epsilon = 1e-12);
    }
}

#[test]
fn faer_spd_matrix_solve() {
    let triplets = vec![
        (0, 0, 4.0),
        (0, 1, 1.0),
        (1, 0, 1.0),
        (1, 1, 3.0),
        (1, 2, 1.0),
        (2, 1, 1.0),
        (2, 2, 2.0),
    ];
    let matrix = CsrMatrix::from_triplets(3, 3, &triplets);
    let rhs = [1.0, 2.0, 3.0];
    let sol = FaerSolver::solve_once(&matrix, &rhs).unwrap();
    let ax = matrix.mul_vec(&sol);
    for i in 0..3 {
        assert_relative_eq!(ax[i], rhs[i], epsilon = 1e-10);
    }
}

#[test]
fn faer_large_laplacian() {
    let n = 100;
    let mut triplets = Vec::new();
    for i in 0..n {
        triplets.push((i, i, 2.1));
        if i > 0 {
            triplets.push((i, i - 1, -1.0));
        }
        if i < n - 1 {
            triplets.push((i, i + 1, -1.0));
        }
    }
    let matrix = CsrMatrix::from_triplets(n, n, &triplets);
    let rhs = vec![1.0; n];
    let sol = FaerSolver::solve_once(&matrix, &rhs).unwrap();
    let ax = matrix.mul_vec(&sol);
    let max_residual = ax.iter().zip(&rhs).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max);
    assert!(max_residual < 1e-9, "max residual = {max_residual}");
}

#[test]
fn faer_solve_before_factorize_fails() {
    let solver = FaerSolver::new();
    let mut sol = [0.0; 3];
    assert!(solver.solve(&[1.0; 3], &mut sol).is_err());
}

#[test]
fn faer_non_square_fails() {
    let matrix = CsrMatrix::from_triplets(2, 3, &[(0, 0, 1.0)]);
    let mut solver = FaerSolver::new();
    assert!(solver.factorize(&matrix).is_err());
}

#[test]
fn faer_indefinite_matrix_is_singular() {
    let matrix = CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 1, -1.0)]);
    let err = FaerSolver::solve_once(&matrix, &[1.0, 1.0]).unwrap_err();
    assert!(matches!(err, plait_types::PlaitError::SingularSystem { .. }));
}

// ─── Spline & Motion Tests ───────────────────────────────────

#[test]
fn spline_hits_knots_and_clamps() {
    let s = Spline::from_points(&[(0.0, 0.0), (1.0, 2.0), (2.0, 0.0)]);
    assert_relative_eq!(s.pos(0.0).unwrap(), 0.0);
    assert_relative_eq!(s.pos(1.0).unwrap(), 2.0);
    assert_relative_eq!(s.pos(-5.0).unwrap(), 0.0);
    assert_relative_eq!(s.pos(9.0).unwrap(), 0.0);
}

#[test]
fn linear_data_gives_linear_spline() {
    let s = Spline::from_points(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
    assert_relative_eq!(s.pos(0.5).unwrap(), 0.5, epsilon = 1e-12);
    assert_relative_eq!(s.vel(0.5).unwrap(), 1.0, epsilon = 1e-12);
}

#[test]
fn empty_spline_has_no_value() {
    let s: Spline<f64> = Spline { knots: Vec::new() };
    assert!(s.is_empty());
    assert!(s.pos(0.0).is_none());
}

#[test]
fn transform_inverse_round_trip() {
    let t = Transform {
        translation: DVec3::new(1.0, -2.0, 0.5),
        rotation: DQuat::from_rotation_z(0.7),
        scale: 2.0,
    };
    let x = DVec3::new(0.3, 0.4, 0.5);
    let back = t.inverse().apply(t.apply(x));
    assert_relative_eq!((back - x).length(), 0.0, epsilon = 1e-12);
}

#[test]
fn motion_delta_carries_previous_pose() {
    let m = Motion::new(&[
        (0.0, Transform::IDENTITY),
        (1.0, Transform::from_translation(DVec3::new(1.0, 0.0, 0.0))),
    ]);
    let x_prev = m.at(0.25).apply(DVec3::Y);
    let x_next = m.delta(0.25, 0.5).apply(x_prev);
    let expected = m.at(0.5).apply(DVec3::Y);
    assert_relative_eq!((x_next - expected).length(), 0.0, epsilon = 1e-12);
}
