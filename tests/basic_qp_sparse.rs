#![allow(non_snake_case)]

use proxip::algebra::*;
use proxip::solver::sparse::NaturalOrdering;
use proxip::solver::*;

#[allow(clippy::type_complexity)]
fn equality_qp_data() -> (
    CscMatrix<f64>,
    Vec<f64>,
    CscMatrix<f64>,
    Vec<f64>,
    CscMatrix<f64>,
    Vec<f64>,
) {
    // min ½‖x‖²  s.t.  x₁ + x₂ = 1
    let P = CscMatrix::identity(2);
    let c = vec![0., 0.];
    let A = CscMatrix::new(1, 2, vec![0, 1, 2], vec![0, 0], vec![1., 1.]);
    let b = vec![1.];
    let G = CscMatrix::zeros(0, 2);
    let h = vec![];
    (P, c, A, b, G, h)
}

#[test]
fn test_equality_qp() {
    let (P, c, A, b, G, h) = equality_qp_data();
    let mut solver = SparseSolver::<f64>::default();
    solver
        .setup(&P, &c, &A, &b, &G, &h, None, None, None)
        .unwrap();

    let status = solver.solve();
    assert_eq!(status, Status::Solved);

    let result = solver.result();
    assert!(result.x.norm_inf_diff(&[0.5, 0.5]) < 1e-6);
    assert!((result.y[0] + 0.5).abs() < 1e-6);
    assert!(result.info.iter <= 10);
}

#[test]
fn test_equality_qp_natural_ordering() {
    let (P, c, A, b, G, h) = equality_qp_data();
    let mut solver = SparseSolver::<f64, NaturalOrdering>::default();
    solver
        .setup(&P, &c, &A, &b, &G, &h, None, None, None)
        .unwrap();

    assert_eq!(solver.solve(), Status::Solved);
    assert!(solver.result().x.norm_inf_diff(&[0.5, 0.5]) < 1e-6);
}

#[test]
fn test_redundant_equality_qp() {
    let P = CscMatrix::identity(2);
    let c = vec![0., 0.];
    // A = [1 1; 1 1]
    let A = CscMatrix::new(2, 2, vec![0, 2, 4], vec![0, 1, 0, 1], vec![1.; 4]);
    let b = vec![1., 1.];
    let G = CscMatrix::zeros(0, 2);

    let mut solver = SparseSolver::<f64>::default();
    solver
        .setup(&P, &c, &A, &b, &G, &[], None, None, None)
        .unwrap();

    let status = solver.solve();
    assert_eq!(status, Status::Solved);
    assert!(solver.result().x.norm_inf_diff(&[0.5, 0.5]) < 1e-6);
}

#[test]
fn test_box_qp_univariate() {
    let P = CscMatrix::identity(1);
    let A = CscMatrix::zeros(0, 1);
    let G = CscMatrix::zeros(0, 1);

    let mut solver = SparseSolver::<f64>::default();
    solver
        .setup(
            &P,
            &[0.],
            &A,
            &[],
            &G,
            &[],
            Some(&[1.]),
            Some(&[2.]),
            None,
        )
        .unwrap();

    let status = solver.solve();
    assert_eq!(status, Status::Solved);

    let result = solver.result();
    assert!((result.x[0] - 1.0).abs() < 1e-6);
    assert!((result.z_lb[0] - 1.0).abs() < 1e-5);
    assert!(result.s_lb[0] >= 0.0 && result.s_lb[0] < 1e-5);
}

#[test]
fn test_mixed_constraints() {
    // min ½‖x‖² - x₁ - x₂  s.t.  x₁ + x₂ = 1,  x₁ - x₂ ≤ 0.2,  x ≥ 0
    let P = CscMatrix::identity(2);
    let c = vec![-1., -1.];
    let A = CscMatrix::new(1, 2, vec![0, 1, 2], vec![0, 0], vec![1., 1.]);
    let b = vec![1.];
    let G = CscMatrix::new(1, 2, vec![0, 1, 2], vec![0, 0], vec![1., -1.]);
    let h = vec![0.2];

    let mut solver = SparseSolver::<f64>::default();
    solver
        .setup(
            &P,
            &c,
            &A,
            &b,
            &G,
            &h,
            Some(&[0., 0.]),
            None,
            None,
        )
        .unwrap();

    let status = solver.solve();
    assert_eq!(status, Status::Solved);

    let result = solver.result();
    //symmetric optimum (0.5, 0.5) satisfies both inequalities strictly
    assert!(result.x.norm_inf_diff(&[0.5, 0.5]) < 1e-5);
    assert!(result.z[0].abs() < 1e-5);
    assert!((result.s[0] - 0.2).abs() < 1e-4);
}

#[test]
fn test_primal_infeasible_bounds() {
    let P = CscMatrix::identity(1);
    let A = CscMatrix::zeros(0, 1);
    let G = CscMatrix::zeros(0, 1);

    let mut solver = SparseSolver::<f64>::default();
    solver
        .setup(
            &P,
            &[0.],
            &A,
            &[],
            &G,
            &[],
            Some(&[1.]),
            Some(&[0.]),
            None,
        )
        .unwrap();

    let status = solver.solve();
    assert_eq!(status, Status::PrimalInfeasible);
    assert!(solver.result().info.iter <= 50);
}

#[test]
fn test_dual_infeasible_unbounded() {
    let P = CscMatrix::zeros(1, 1);
    let A = CscMatrix::zeros(0, 1);
    let G = CscMatrix::zeros(0, 1);

    let mut solver = SparseSolver::<f64>::default();
    solver
        .setup(&P, &[-1.], &A, &[], &G, &[], None, None, None)
        .unwrap();

    assert_eq!(solver.solve(), Status::DualInfeasible);
}

#[test]
fn test_badly_scaled_data() {
    // equilibration has to bridge six orders of magnitude between the
    // quadratic and the constraint rows
    let P = CscMatrix::new(2, 2, vec![0, 1, 2], vec![0, 1], vec![1e6, 1e-2]);
    let c = vec![1e3, -1e-3];
    let A = CscMatrix::new(1, 2, vec![0, 1, 2], vec![0, 0], vec![1e4, 1e-2]);
    let b = vec![1.];
    let G = CscMatrix::zeros(0, 2);

    let mut solver = SparseSolver::<f64>::default();
    solver
        .setup(&P, &c, &A, &b, &G, &[], None, None, None)
        .unwrap();

    let status = solver.solve();
    assert_eq!(status, Status::Solved);

    //optimality of the unscaled iterate: Px + c + Aᵀy ≈ 0 and Ax = b
    let result = solver.result();
    let (x, y) = (&result.x, &result.y);
    let r0 = 1e6 * x[0] + 1e3 + 1e4 * y[0];
    let r1 = 1e-2 * x[1] - 1e-3 + 1e-2 * y[0];
    let scale = 1e6 * x[0].abs() + 1e3 + 1e4 * y[0].abs();
    assert!(r0.abs() <= 1e-6 * scale.max(1.0));
    assert!(r1.abs() <= 1e-5);
    assert!((1e4 * x[0] + 1e-2 * x[1] - 1.0).abs() < 1e-6);
}
