#![allow(non_snake_case)]

use proxip::algebra::*;
use proxip::solver::*;

fn setup_sparse_solver() -> SparseSolver<f64> {
    // min ½‖x‖²  s.t.  x₁ + x₂ = 1, x₁ ≤ 10
    let P = CscMatrix::identity(2);
    let c = vec![0., 0.];
    let A = CscMatrix::new(1, 2, vec![0, 1, 2], vec![0, 0], vec![1., 1.]);
    let b = vec![1.];
    let G = CscMatrix::new(1, 2, vec![0, 1, 1], vec![0], vec![1.]);
    let h = vec![10.];

    let mut solver = SparseSolver::<f64>::default();
    solver
        .setup(&P, &c, &A, &b, &G, &h, None, None, None)
        .unwrap();
    solver
}

#[test]
fn test_update_rhs_vectors() {
    let mut solver = setup_sparse_solver();
    assert_eq!(solver.solve(), Status::Solved);
    assert!(solver.result().x.norm_inf_diff(&[0.5, 0.5]) < 1e-6);

    //move the equality target, reusing the preconditioner
    solver
        .update(None, None, None, Some(&[2.]), None, None, None, None, true)
        .unwrap();
    assert_eq!(solver.solve(), Status::Solved);
    assert!(solver.result().x.norm_inf_diff(&[1., 1.]) < 1e-6);

    //and again with a fresh equilibration
    solver
        .update(None, None, None, Some(&[-1.]), None, None, None, None, false)
        .unwrap();
    assert_eq!(solver.solve(), Status::Solved);
    assert!(solver.result().x.norm_inf_diff(&[-0.5, -0.5]) < 1e-6);
}

#[test]
fn test_update_matrix_values() {
    let mut solver = setup_sparse_solver();
    assert_eq!(solver.solve(), Status::Solved);

    //rescale P on its existing pattern: min ‖x‖² now weights x₁ more
    let P_new = CscMatrix::new(2, 2, vec![0, 1, 2], vec![0, 1], vec![3., 1.]);
    solver
        .update(
            Some(&P_new),
            None,
            None,
            None,
            None,
            None,
            None,
            None,
            true,
        )
        .unwrap();
    assert_eq!(solver.solve(), Status::Solved);
    //stationarity: 3x₁ = y, x₂ = y with x₁ + x₂ = 1
    assert!(solver.result().x.norm_inf_diff(&[0.25, 0.75]) < 1e-6);
}

#[test]
fn test_update_pattern_mismatch() {
    let mut solver = setup_sparse_solver();

    //A with a different structural pattern must be refused
    let A_bad = CscMatrix::new(1, 2, vec![0, 1, 1], vec![0], vec![1.]);
    let err = solver
        .update(
            None,
            None,
            Some(&A_bad),
            None,
            None,
            None,
            None,
            None,
            true,
        )
        .unwrap_err();
    assert!(matches!(err, SolverError::PatternMismatch));

    //the solver stays usable afterwards
    assert_eq!(solver.solve(), Status::Solved);
    assert!(solver.result().x.norm_inf_diff(&[0.5, 0.5]) < 1e-6);
}

#[test]
fn test_update_bounds() {
    let mut solver = setup_sparse_solver();
    assert_eq!(solver.solve(), Status::Solved);

    //clamp x₁ from below at its previous optimum plus a margin
    solver
        .update(
            None,
            None,
            None,
            None,
            None,
            None,
            Some(&[0.75, -f64::INFINITY]),
            None,
            true,
        )
        .unwrap();
    assert_eq!(solver.solve(), Status::Solved);
    let result = solver.result();
    assert!((result.x[0] - 0.75).abs() < 1e-5);
    assert!((result.x[1] - 0.25).abs() < 1e-5);
    assert!(result.z_lb[0] > 1e-6);
    assert_eq!(result.z_lb[1], 0.0);
}

#[test]
fn test_update_before_setup() {
    let mut solver = SparseSolver::<f64>::default();
    let err = solver
        .update(None, None, None, None, None, None, None, None, true)
        .unwrap_err();
    assert!(matches!(err, SolverError::NotSetUp));
}

#[test]
fn test_update_dense_matrices() {
    // the dense variant takes whole matrix replacements
    let P = Matrix::identity(2);
    let A = Matrix::from(&[[1., 1.]]);
    let G = Matrix::zeros(0, 2);

    let mut solver = DenseSolver::<f64>::default();
    solver
        .setup(&P, &[0., 0.], &A, &[1.], &G, &[], None, None, None)
        .unwrap();
    assert_eq!(solver.solve(), Status::Solved);

    let P_new = Matrix::from(&[
        [3., 0.], //
        [0., 1.],
    ]);
    solver
        .update(
            Some(&P_new),
            None,
            None,
            None,
            None,
            None,
            None,
            None,
            true,
        )
        .unwrap();
    assert_eq!(solver.solve(), Status::Solved);
    assert!(solver.result().x.norm_inf_diff(&[0.25, 0.75]) < 1e-6);
}
