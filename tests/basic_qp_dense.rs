#![allow(non_snake_case)]

use proxip::algebra::*;
use proxip::solver::*;

fn equality_qp_data() -> (Matrix<f64>, Vec<f64>, Matrix<f64>, Vec<f64>, Matrix<f64>, Vec<f64>) {
    // min ½‖x‖²  s.t.  x₁ + x₂ = 1
    let P = Matrix::identity(2);
    let c = vec![0., 0.];
    let A = Matrix::from(&[[1., 1.]]);
    let b = vec![1.];
    let G = Matrix::zeros(0, 2);
    let h = vec![];
    (P, c, A, b, G, h)
}

#[test]
fn test_equality_qp() {
    let (P, c, A, b, G, h) = equality_qp_data();
    let mut solver = DenseSolver::<f64>::default();
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
fn test_redundant_equality_qp() {
    // duplicated equality rows make A rank deficient; the proximal
    // regularization must still produce the minimum norm solution
    let P = Matrix::identity(2);
    let c = vec![0., 0.];
    let A = Matrix::from(&[
        [1., 1.], //
        [1., 1.],
    ]);
    let b = vec![1., 1.];
    let G = Matrix::zeros(0, 2);

    let mut solver = DenseSolver::<f64>::default();
    solver
        .setup(&P, &c, &A, &b, &G, &[], None, None, None)
        .unwrap();

    let status = solver.solve();
    assert_eq!(status, Status::Solved);
    assert!(solver.result().x.norm_inf_diff(&[0.5, 0.5]) < 1e-6);
}

#[test]
fn test_box_qp_univariate() {
    // min ½x²  s.t.  1 ≤ x ≤ 2, active at the lower bound
    let P = Matrix::identity(1);
    let A = Matrix::zeros(0, 1);
    let G = Matrix::zeros(0, 1);

    let mut solver = DenseSolver::<f64>::default();
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
    assert!(result.z_ub[0].abs() < 1e-5);
    assert!((result.s_ub[0] - 1.0).abs() < 1e-5);
}

#[test]
fn test_inequality_qp() {
    // min ½‖x‖² - x₁ - x₂  s.t.  x₁ + x₂ ≤ 1
    let P = Matrix::identity(2);
    let c = vec![-1., -1.];
    let A = Matrix::zeros(0, 2);
    let G = Matrix::from(&[[1., 1.]]);
    let h = vec![1.];

    let mut solver = DenseSolver::<f64>::default();
    solver
        .setup(&P, &c, &A, &[], &G, &h, None, None, None)
        .unwrap();

    let status = solver.solve();
    assert_eq!(status, Status::Solved);

    let result = solver.result();
    //unconstrained minimizer (1,1) is cut to the constraint boundary
    assert!(result.x.norm_inf_diff(&[0.5, 0.5]) < 1e-6);
    assert!((result.z[0] - 0.5).abs() < 1e-5);
    assert!(result.s[0].abs() < 1e-5);
}

#[test]
fn test_primal_infeasible_bounds() {
    // contradictory bounds on the same coordinate
    let P = Matrix::identity(1);
    let A = Matrix::zeros(0, 1);
    let G = Matrix::zeros(0, 1);

    let mut solver = DenseSolver::<f64>::default();
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
    // min -x with no constraints is unbounded below
    let P = Matrix::zeros(1, 1);
    let A = Matrix::zeros(0, 1);
    let G = Matrix::zeros(0, 1);

    let mut solver = DenseSolver::<f64>::default();
    solver
        .setup(&P, &[-1.], &A, &[], &G, &[], None, None, None)
        .unwrap();

    let status = solver.solve();
    assert_eq!(status, Status::DualInfeasible);
}

#[test]
fn test_box_dual_restoration() {
    // only x₁ is bounded; restored multipliers and slacks must carry
    // exact zeros and infinities at the unbounded coordinates
    let P = Matrix::identity(3);
    let c = vec![0., 0., 0.];
    let A = Matrix::zeros(0, 3);
    let G = Matrix::zeros(0, 3);
    let x_lb = [-f64::INFINITY, 1., -f64::INFINITY];

    let mut solver = DenseSolver::<f64>::default();
    solver
        .setup(&P, &c, &A, &[], &G, &[], Some(&x_lb), None, None)
        .unwrap();

    let status = solver.solve();
    assert_eq!(status, Status::Solved);

    let result = solver.result();
    assert!((result.x[1] - 1.0).abs() < 1e-6);
    assert_eq!(result.z_lb[0], 0.0);
    assert_eq!(result.z_lb[2], 0.0);
    assert!((result.z_lb[1] - 1.0).abs() < 1e-5);
    assert_eq!(result.s_lb[0], f64::INFINITY);
    assert_eq!(result.s_lb[2], f64::INFINITY);
    assert!(result.s_lb[1] < 1e-5);
    //upper bounds were all absent
    assert!(result.z_ub.iter().all(|&v| v == 0.0));
    assert!(result.s_ub.iter().all(|&v| v == f64::INFINITY));
}

#[test]
fn test_invalid_settings_rejected() {
    let (P, c, A, b, G, h) = equality_qp_data();
    let mut solver = DenseSolver::<f64>::default();
    solver
        .setup(&P, &c, &A, &b, &G, &h, None, None, None)
        .unwrap();

    solver.settings_mut().tau = 1.5;
    assert_eq!(solver.solve(), Status::InvalidSettings);
    assert_eq!(solver.result().info.status.code(), -9);

    solver.settings_mut().tau = 0.99;
    assert_eq!(solver.solve(), Status::Solved);
}

#[test]
fn test_solve_before_setup() {
    let mut solver = DenseSolver::<f64>::default();
    let status = solver.solve();
    assert_eq!(status, Status::Unsolved);
    assert_eq!(status.code(), -10);
}

#[test]
fn test_compute_timings() {
    let (P, c, A, b, G, h) = equality_qp_data();
    let settings = SettingsBuilder::<f64>::default()
        .compute_timings(true)
        .build()
        .unwrap();

    let mut solver = DenseSolver::<f64>::new(settings);
    solver
        .setup(&P, &c, &A, &b, &G, &h, None, None, None)
        .unwrap();
    solver.solve();

    let info = &solver.result().info;
    assert!(info.setup_time > 0.0);
    assert!(info.solve_time > 0.0);
    assert!(info.run_time >= info.setup_time + info.solve_time - 1e-12);
}
