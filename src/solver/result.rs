use crate::algebra::FloatT;
use crate::solver::Status;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scalar diagnostics accompanying a solve.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Info<T> {
    /// exit status
    pub status: Status,
    /// number of outer iterations performed
    pub iter: usize,
    /// primal proximal weight at exit
    pub rho: T,
    /// dual proximal weight at exit
    pub delta: T,
    /// complementarity measure ⟨s,z⟩ / (m + n_lb + n_ub)
    pub mu: T,
    /// last centering parameter
    pub sigma: T,
    /// last primal step size
    pub primal_step: T,
    /// last dual step size
    pub dual_step: T,
    /// unscaled primal infeasibility (∞-norm)
    pub primal_inf: T,
    /// unscaled dual infeasibility (∞-norm)
    pub dual_inf: T,
    /// current floor on ρ and δ
    pub reg_limit: T,
    /// consecutive factorization retries in the current iteration
    pub factor_retires: usize,
    /// iterations since the last primal proximal anchor update
    pub no_primal_update: usize,
    /// iterations since the last dual proximal anchor update
    pub no_dual_update: usize,
    /// seconds spent in setup (with `compute_timings`)
    pub setup_time: f64,
    /// seconds spent in the last update (with `compute_timings`)
    pub update_time: f64,
    /// seconds spent in the last solve (with `compute_timings`)
    pub solve_time: f64,
    /// accumulated setup + update + solve seconds
    pub run_time: f64,
}

/// Solver iterates and diagnostics.
///
/// During a solve the box-bound blocks (`z_lb`, `z_ub`, `s_lb`, `s_ub` and
/// the anchors `nu_lb`, `nu_ub`) hold the packed representation: the first
/// `n_lb` / `n_ub` entries belong to the finite bounds, in increasing order
/// of variable index.  On exit they are scattered back to ℝⁿ shape, with
/// inactive entries set to 0 for multipliers and +∞ for slacks.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverResult<T> {
    /// primal variables
    pub x: Vec<T>,
    /// equality multipliers
    pub y: Vec<T>,
    /// inequality multipliers
    pub z: Vec<T>,
    /// lower bound multipliers
    pub z_lb: Vec<T>,
    /// upper bound multipliers
    pub z_ub: Vec<T>,
    /// inequality slacks
    pub s: Vec<T>,
    /// lower bound slacks
    pub s_lb: Vec<T>,
    /// upper bound slacks
    pub s_ub: Vec<T>,

    /// primal proximal anchor
    pub zeta: Vec<T>,
    /// equality dual proximal anchor
    pub lambda: Vec<T>,
    /// inequality dual proximal anchor
    pub nu: Vec<T>,
    /// lower bound dual proximal anchor
    pub nu_lb: Vec<T>,
    /// upper bound dual proximal anchor
    pub nu_ub: Vec<T>,

    /// scalar diagnostics
    pub info: Info<T>,
}

impl<T> SolverResult<T>
where
    T: FloatT,
{
    pub(crate) fn new(n: usize, p: usize, m: usize) -> Self {
        Self {
            x: vec![T::zero(); n],
            y: vec![T::zero(); p],
            z: vec![T::zero(); m],
            z_lb: vec![T::zero(); n],
            z_ub: vec![T::zero(); n],
            s: vec![T::zero(); m],
            s_lb: vec![T::zero(); n],
            s_ub: vec![T::zero(); n],
            zeta: vec![T::zero(); n],
            lambda: vec![T::zero(); p],
            nu: vec![T::zero(); m],
            nu_lb: vec![T::zero(); n],
            nu_ub: vec![T::zero(); n],
            info: Info::default(),
        }
    }
}
