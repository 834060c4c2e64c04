#![allow(non_snake_case)]

use crate::algebra::*;
use crate::solver::data::ProblemData;
use crate::solver::preconditioner::RuizEquilibration;
use crate::solver::result::SolverResult;
use crate::solver::settings::Settings;
use crate::solver::dense::DenseKkt;
use crate::solver::sparse::{AmdOrdering, SparseKkt};
use crate::solver::status::Status;
use crate::solver::traits::{KktDataUpdates, KktSystem, MatrixKind, StepRhs};
use crate::timers::Timer;
use std::iter::zip;
use thiserror::Error;

/// Errors surfaced by `setup` and `update`.
///
/// Numerical difficulties during a solve are never reported this way; they
/// are absorbed by regularization or reported through [`Status`].
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("invalid problem dimensions: {0}")]
    InvalidDimensions(&'static str),
    #[error("sparsity pattern changed; pattern changes require a new setup")]
    PatternMismatch,
    #[error("solver is not set up")]
    NotSetUp,
}

/// Proximal interior point solver, generic in the matrix storage kind and
/// the KKT system implementation.
///
/// Use through the [`DenseSolver`] and [`SparseSolver`] aliases.  The
/// lifecycle is `new` → [`setup`](SolverBase::setup) →
/// ([`update`](SolverBase::update))* → [`solve`](SolverBase::solve), with
/// results available from [`result`](SolverBase::result) after each solve.
/// All working storage is allocated in `setup`; `solve` performs no heap
/// allocation.
pub struct SolverBase<T, M, K>
where
    T: FloatT,
    M: MatrixKind<F = T>,
    K: KktSystem<T, M>,
{
    settings: Settings<T>,
    data: Option<ProblemData<T, M>>,
    kkt: Option<K>,
    precond: RuizEquilibration<T>,
    result: SolverResult<T>,

    //regularized and non-regularized residual buffers, and the step
    rhs: StepRhs<T>,
    rhs_nr: StepRhs<T>,
    step: StepRhs<T>,

    //relative residual scales of the current iterate
    primal_rel_inf: T,
    dual_rel_inf: T,

    //true when the KKT factors match the setup-fresh unit scalings
    kkt_init_state: bool,

    timer: Timer,
}

/// Dense solver variant: reduced (n+p) KKT system with signed dense LDLᵀ.
pub type DenseSolver<T = f64> = SolverBase<T, Matrix<T>, DenseKkt<T>>;

/// Sparse solver variant: full KKT system under a fill-reducing ordering,
/// factored by sparse LDLᵀ with dynamic pivot regularization.
pub type SparseSolver<T = f64, O = AmdOrdering> = SolverBase<T, CscMatrix<T>, SparseKkt<T, O>>;

impl<T, M, K> Default for SolverBase<T, M, K>
where
    T: FloatT,
    M: MatrixKind<F = T>,
    K: KktSystem<T, M>,
{
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl<T, M, K> SolverBase<T, M, K>
where
    T: FloatT,
    M: MatrixKind<F = T>,
    K: KktSystem<T, M>,
{
    pub fn new(settings: Settings<T>) -> Self {
        Self {
            settings,
            data: None,
            kkt: None,
            precond: RuizEquilibration::new(0, 0, 0),
            result: SolverResult::new(0, 0, 0),
            rhs: StepRhs::new(0, 0, 0),
            rhs_nr: StepRhs::new(0, 0, 0),
            step: StepRhs::new(0, 0, 0),
            primal_rel_inf: T::zero(),
            dual_rel_inf: T::zero(),
            kkt_init_state: false,
            timer: Timer::new(),
        }
    }

    pub fn settings(&self) -> &Settings<T> {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings<T> {
        &mut self.settings
    }

    /// Read-only access to the iterates and diagnostics of the last solve.
    pub fn result(&self) -> &SolverResult<T> {
        &self.result
    }

    /// Load a problem
    ///
    ///```text
    /// minimize    ½ xᵀPx + cᵀx
    /// subject to  Ax = b
    ///             Gx ≤ h
    ///             x_lb ≤ x ≤ x_ub
    ///```
    ///
    /// allocating all working storage, equilibrating the data and building
    /// the KKT structure.  Bound entries of magnitude at or above the
    /// infinity threshold are treated as absent.
    #[allow(clippy::too_many_arguments)]
    pub fn setup(
        &mut self,
        P: &M,
        c: &[T],
        A: &M,
        b: &[T],
        G: &M,
        h: &[T],
        x_lb: Option<&[T]>,
        x_ub: Option<&[T]>,
        settings: Option<Settings<T>>,
    ) -> Result<(), SolverError> {
        if let Some(settings) = settings {
            self.settings = settings;
        }
        if self.settings.compute_timings {
            self.timer.start();
        }

        let mut data = ProblemData::new(P, c, A, b, G, h, x_lb, x_ub)?;
        let (n, p, m) = (data.n, data.p, data.m);

        self.result = SolverResult::new(n, p, m);
        self.rhs = StepRhs::new(n, p, m);
        self.rhs_nr = StepRhs::new(n, p, m);
        self.step = StepRhs::new(n, p, m);

        self.result.info.rho = self.settings.rho_init;
        self.result.info.delta = self.settings.delta_init;

        self.precond = RuizEquilibration::new(n, p, m);
        self.precond
            .scale_data(&mut data, false, self.settings.preconditioner_iter);

        self.kkt = Some(K::new(
            &data,
            self.result.info.rho,
            self.result.info.delta,
        ));
        self.data = Some(data);
        self.kkt_init_state = true;

        if self.settings.compute_timings {
            let setup_time = self.timer.stop();
            self.result.info.setup_time = setup_time;
            self.result.info.run_time += setup_time;
        }
        Ok(())
    }

    /// Replace parts of the problem data without changing dimensions or
    /// sparsity patterns.
    ///
    /// With `reuse_preconditioner` the stored Ruiz scalings are reapplied
    /// to the new data; otherwise the equilibration is recomputed.  On a
    /// dimension or pattern error the unaffected fields keep their previous
    /// values and the solver remains usable.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        P: Option<&M>,
        c: Option<&[T]>,
        A: Option<&M>,
        b: Option<&[T]>,
        G: Option<&M>,
        h: Option<&[T]>,
        x_lb: Option<&[T]>,
        x_ub: Option<&[T]>,
        reuse_preconditioner: bool,
    ) -> Result<(), SolverError> {
        let Some(data) = self.data.as_mut() else {
            return Err(SolverError::NotSetUp);
        };
        let kkt = self.kkt.as_mut().unwrap();

        if self.settings.compute_timings {
            self.timer.start();
        }

        //return the data to user units before splicing in new values
        self.precond.unscale_data(data);

        let mut options = KktDataUpdates::default();
        let mut outcome = Ok(());

        'apply: {
            if let Some(P) = P {
                if let Err(e) = data.set_P(P) {
                    outcome = Err(e);
                    break 'apply;
                }
                options.p = true;
            }
            if let Some(A) = A {
                if let Err(e) = data.set_A(A) {
                    outcome = Err(e);
                    break 'apply;
                }
                options.a = true;
            }
            if let Some(G) = G {
                if let Err(e) = data.set_G(G) {
                    outcome = Err(e);
                    break 'apply;
                }
                options.g = true;
            }
            if let Some(c) = c {
                if let Err(e) = data.set_c(c) {
                    outcome = Err(e);
                    break 'apply;
                }
            }
            if let Some(b) = b {
                if let Err(e) = data.set_b(b) {
                    outcome = Err(e);
                    break 'apply;
                }
            }
            if let Some(h) = h {
                if let Err(e) = data.set_h(h) {
                    outcome = Err(e);
                    break 'apply;
                }
            }
            if let Err(e) = data.set_bounds(x_lb, x_ub) {
                outcome = Err(e);
                break 'apply;
            }
        }

        //rescale whatever the data now holds, so the store stays
        //consistent even on a refused update
        self.precond
            .scale_data(data, reuse_preconditioner, self.settings.preconditioner_iter);

        //a recomputed equilibration changes the scaled values of every
        //block, not just the updated ones
        if !reuse_preconditioner {
            options = KktDataUpdates {
                p: true,
                a: true,
                g: true,
            };
        }
        kkt.update_data(data, options);
        self.kkt_init_state = true;

        if self.settings.compute_timings {
            let update_time = self.timer.stop();
            self.result.info.update_time = update_time;
            self.result.info.run_time += update_time;
        }
        outcome
    }

    /// Run the proximal interior point iteration.
    pub fn solve(&mut self) -> Status {
        if self.data.is_none() {
            eprintln!("proxip: solve called before setup");
            self.result.info.status = Status::Unsolved;
            return Status::Unsolved;
        }

        if self.settings.verbose {
            self.print_banner();
        }
        if self.settings.compute_timings {
            self.timer.start();
        }

        let status = self.solve_impl();

        self.unscale_results();
        self.restore_box_dual();

        if self.settings.compute_timings {
            let solve_time = self.timer.stop();
            self.result.info.solve_time = solve_time;
            self.result.info.run_time += solve_time;
        }

        if self.settings.verbose {
            self.print_footer(status);
        }

        status
    }

    fn solve_impl(&mut self) -> Status {
        let Self {
            settings,
            data: Some(data),
            kkt: Some(kkt),
            precond,
            result,
            rhs,
            rhs_nr,
            step,
            primal_rel_inf,
            dual_rel_inf,
            kkt_init_state,
            ..
        } = self
        else {
            return Status::Unsolved;
        };

        if settings.verify().is_err() {
            result.info.status = Status::InvalidSettings;
            return result.info.status;
        }

        let (n_lb, n_ub) = (data.n_lb, data.n_ub);
        let total_ineq = data.total_ineq();

        let info = &mut result.info;
        info.status = Status::Unsolved;
        info.iter = 0;
        info.reg_limit = settings.reg_lower_limit;
        info.factor_retires = 0;
        info.no_primal_update = 0;
        info.no_dual_update = 0;
        info.mu = T::zero();
        info.sigma = T::zero();
        info.primal_step = T::zero();
        info.dual_step = T::zero();

        result.s.set(T::one());
        result.s_lb[..n_lb].set(T::one());
        result.s_ub[..n_ub].set(T::one());
        result.z.set(T::one());
        result.z_lb[..n_lb].set(T::one());
        result.z_ub[..n_ub].set(T::one());

        if !*kkt_init_state {
            result.info.rho = settings.rho_init;
            result.info.delta = settings.delta_init;
            kkt.update_scalings(
                data,
                result.info.rho,
                result.info.delta,
                &result.s,
                &result.s_lb[..n_lb],
                &result.s_ub[..n_ub],
                &result.z,
                &result.z_lb[..n_lb],
                &result.z_ub[..n_ub],
            );
        }

        //initial factorization, inflating the regularization on failure
        while !kkt.factorize(data, result.info.reg_limit) {
            if result.info.factor_retires < settings.max_factor_retires {
                result.info.delta *= (100.0).lit();
                result.info.rho *= (100.0).lit();
                result.info.factor_retires += 1;
                let ten: T = (10.0).lit();
                result.info.reg_limit = T::min(
                    ten * result.info.reg_limit,
                    settings.eps_abs,
                );
                kkt.update_scalings(
                    data,
                    result.info.rho,
                    result.info.delta,
                    &result.s,
                    &result.s_lb[..n_lb],
                    &result.s_ub[..n_ub],
                    &result.z,
                    &result.z_lb[..n_lb],
                    &result.z_ub[..n_ub],
                );
            } else {
                result.info.status = Status::Numerics;
                return result.info.status;
            }
        }
        result.info.factor_retires = 0;

        //one-shot centered starting point with zero complementarity rhs
        rhs.x.scalarop_from(|v| -v, &data.c);
        rhs.y.copy_from(&data.b);
        rhs.z.copy_from(&data.h);
        rhs.z_lb[..n_lb].copy_from(&data.x_lb_n[..n_lb]);
        rhs.z_ub[..n_ub].copy_from(&data.x_ub[..n_ub]);
        rhs.s.set(T::zero());
        rhs.s_lb.set(T::zero());
        rhs.s_ub.set(T::zero());
        kkt.solve(data, rhs, step);

        result.x.copy_from(&step.x);
        result.y.copy_from(&step.y);
        result.z.copy_from(&step.z);
        result.z_lb[..n_lb].copy_from(&step.z_lb[..n_lb]);
        result.z_ub[..n_ub].copy_from(&step.z_ub[..n_ub]);
        result.s.copy_from(&step.s);
        result.s_lb[..n_lb].copy_from(&step.s_lb[..n_lb]);
        result.s_ub[..n_ub].copy_from(&step.s_ub[..n_ub]);

        if total_ineq > 0 {
            //shift the slack/multiplier blocks into the strict interior,
            //Mehrotra style
            let mut s_norm = result.s.norm_inf();
            s_norm = T::max(s_norm, result.s_lb[..n_lb].norm_inf());
            s_norm = T::max(s_norm, result.s_ub[..n_ub].norm_inf());
            if s_norm <= (1e-4).lit() {
                // 0.1 is arbitrary
                result.s.set((0.1).lit());
                result.s_lb[..n_lb].set((0.1).lit());
                result.s_ub[..n_ub].set((0.1).lit());
                result.z.set((0.1).lit());
                result.z_lb[..n_lb].set((0.1).lit());
                result.z_ub[..n_ub].set((0.1).lit());
            }

            let mut delta_s = T::zero();
            let mut delta_z = T::zero();
            let neg_3_half: T = (-1.5).lit();
            if data.m > 0 {
                delta_s = T::max(delta_s, neg_3_half * result.s.minimum());
                delta_z = T::max(delta_z, neg_3_half * result.z.minimum());
            }
            if n_lb > 0 {
                delta_s = T::max(delta_s, neg_3_half * result.s_lb[..n_lb].minimum());
                delta_z = T::max(delta_z, neg_3_half * result.z_lb[..n_lb].minimum());
            }
            if n_ub > 0 {
                delta_s = T::max(delta_s, neg_3_half * result.s_ub[..n_ub].minimum());
                delta_z = T::max(delta_z, neg_3_half * result.z_ub[..n_ub].minimum());
            }

            let mut tmp_prod = shifted_dot(&result.s, &result.z, delta_s, delta_z);
            tmp_prod += shifted_dot(
                &result.s_lb[..n_lb],
                &result.z_lb[..n_lb],
                delta_s,
                delta_z,
            );
            tmp_prod += shifted_dot(
                &result.s_ub[..n_ub],
                &result.z_ub[..n_ub],
                delta_s,
                delta_z,
            );

            let total: T = total_ineq.lit();
            let z_sum = result.z.sum() + result.z_lb[..n_lb].sum() + result.z_ub[..n_ub].sum();
            let s_sum = result.s.sum() + result.s_lb[..n_lb].sum() + result.s_ub[..n_ub].sum();
            let half: T = (0.5).lit();
            let delta_s_bar = delta_s + (half * tmp_prod) / (z_sum + total * delta_z);
            let delta_z_bar = delta_z + (half * tmp_prod) / (s_sum + total * delta_s);

            result.s.translate(delta_s_bar);
            result.s_lb[..n_lb].translate(delta_s_bar);
            result.s_ub[..n_ub].translate(delta_s_bar);
            result.z.translate(delta_z_bar);
            result.z_lb[..n_lb].translate(delta_z_bar);
            result.z_ub[..n_ub].translate(delta_z_bar);

            result.info.mu = compute_mu(result, n_lb, n_ub, total_ineq);
        }

        result.zeta.copy_from(&result.x);
        result.lambda.copy_from(&result.y);
        result.nu.copy_from(&result.z);
        result.nu_lb[..n_lb].copy_from(&result.z_lb[..n_lb]);
        result.nu_ub[..n_ub].copy_from(&result.z_ub[..n_ub]);

        while result.info.iter < settings.max_iter {
            if result.info.iter == 0 {
                update_nr_residuals(
                    data,
                    precond,
                    result,
                    rhs_nr,
                    &mut step.x,
                    primal_rel_inf,
                    dual_rel_inf,
                );
            }

            let mut primal_inf = precond.norm_primal_res_eq(&rhs_nr.y);
            primal_inf = T::max(primal_inf, precond.norm_primal_res_ineq(&rhs_nr.z));
            primal_inf = T::max(
                primal_inf,
                precond.norm_primal_res_lb(&rhs_nr.z_lb[..n_lb], &data.x_lb_idx),
            );
            primal_inf = T::max(
                primal_inf,
                precond.norm_primal_res_ub(&rhs_nr.z_ub[..n_ub], &data.x_ub_idx),
            );
            result.info.primal_inf = primal_inf;
            result.info.dual_inf = precond.norm_dual_res(&rhs_nr.x);

            if settings.verbose {
                let half: T = (0.5).lit();
                let xPx_half: T = half * data.P_utri.quad_form(&result.x, &result.x);
                let mut primal_cost = xPx_half + data.c.dot(&result.x);
                let mut dual_cost = -xPx_half - data.b.dot(&result.y) - data.h.dot(&result.z);
                dual_cost -= data.x_lb_n[..n_lb].dot(&result.z_lb[..n_lb]);
                dual_cost -= data.x_ub[..n_ub].dot(&result.z_ub[..n_ub]);
                primal_cost = precond.unscale_cost(primal_cost);
                dual_cost = precond.unscale_cost(dual_cost);

                println!(
                    "{:3}   {:+.5e}   {:+.5e}   {:.5e}   {:.5e}   {:.3e}   {:.3e}   {:.3e}   {:.3e}   {:.3e}",
                    result.info.iter,
                    primal_cost,
                    dual_cost,
                    result.info.primal_inf,
                    result.info.dual_inf,
                    result.info.rho,
                    result.info.delta,
                    result.info.mu,
                    result.info.primal_step,
                    result.info.dual_step
                );
            }

            if result.info.primal_inf
                < settings.eps_abs + settings.eps_rel * *primal_rel_inf
                && result.info.dual_inf < settings.eps_abs + settings.eps_rel * *dual_rel_inf
                && result.info.mu < settings.dual_tol
            {
                result.info.status = Status::Solved;
                return result.info.status;
            }

            //proximal-shifted residuals
            let rho = result.info.rho;
            let delta = result.info.delta;
            for (r, (&r_nr, (&x, &zeta))) in zip(
                &mut rhs.x,
                zip(&rhs_nr.x, zip(&result.x, &result.zeta)),
            ) {
                *r = r_nr - rho * (x - zeta);
            }
            for (r, (&r_nr, (&y, &lambda))) in zip(
                &mut rhs.y,
                zip(&rhs_nr.y, zip(&result.y, &result.lambda)),
            ) {
                *r = r_nr - delta * (lambda - y);
            }
            for (r, (&r_nr, (&z, &nu))) in
                zip(&mut rhs.z, zip(&rhs_nr.z, zip(&result.z, &result.nu)))
            {
                *r = r_nr - delta * (nu - z);
            }
            for k in 0..n_lb {
                rhs.z_lb[k] =
                    rhs_nr.z_lb[k] - delta * (result.nu_lb[k] - result.z_lb[k]);
            }
            for k in 0..n_ub {
                rhs.z_ub[k] =
                    rhs_nr.z_ub[k] - delta * (result.nu_ub[k] - result.z_ub[k]);
            }

            //infeasibility detection on the proximal gap and the shifted
            //residuals.  step buffers serve as scratch here
            for (w, (&lambda, &y)) in zip(&mut step.y, zip(&result.lambda, &result.y)) {
                *w = lambda - y;
            }
            for (w, (&nu, &z)) in zip(&mut step.z, zip(&result.nu, &result.z)) {
                *w = nu - z;
            }
            for k in 0..n_lb {
                step.z_lb[k] = result.nu_lb[k] - result.z_lb[k];
            }
            for k in 0..n_ub {
                step.z_ub[k] = result.nu_ub[k] - result.z_ub[k];
            }
            let mut dual_prox_inf_norm = precond.norm_dual_eq(&step.y);
            dual_prox_inf_norm = T::max(dual_prox_inf_norm, precond.norm_dual_ineq(&step.z));
            dual_prox_inf_norm = T::max(
                dual_prox_inf_norm,
                precond.norm_dual_lb(&step.z_lb[..n_lb], &data.x_lb_idx),
            );
            dual_prox_inf_norm = T::max(
                dual_prox_inf_norm,
                precond.norm_dual_ub(&step.z_ub[..n_ub], &data.x_ub_idx),
            );

            let mut dual_inf_norm = precond.norm_primal_res_eq(&rhs.y);
            dual_inf_norm = T::max(dual_inf_norm, precond.norm_primal_res_ineq(&rhs.z));
            dual_inf_norm = T::max(
                dual_inf_norm,
                precond.norm_primal_res_lb(&rhs.z_lb[..n_lb], &data.x_lb_idx),
            );
            dual_inf_norm = T::max(
                dual_inf_norm,
                precond.norm_primal_res_ub(&rhs.z_ub[..n_ub], &data.x_ub_idx),
            );

            if result.info.no_dual_update > 5
                && dual_prox_inf_norm > (1e10).lit()
                && dual_inf_norm < settings.eps_abs
            {
                result.info.status = Status::PrimalInfeasible;
                return result.info.status;
            }

            for (w, (&x, &zeta)) in zip(&mut step.x, zip(&result.x, &result.zeta)) {
                *w = x - zeta;
            }
            if result.info.no_primal_update > 5
                && precond.norm_primal(&step.x) > (1e10).lit()
                && precond.norm_dual_res(&rhs.x) < settings.eps_abs
            {
                result.info.status = Status::DualInfeasible;
                return result.info.status;
            }

            result.info.iter += 1;

            // avoid the possibility of converging to a local minimum by
            // decreasing the minimum regularization value once progress
            // stalls at the floor
            let escape_floor = settings.reg_escape_floor;
            if (result.info.no_primal_update > 5
                && result.info.rho == result.info.reg_limit
                && result.info.reg_limit != escape_floor)
                || (result.info.no_dual_update > 5
                    && result.info.delta == result.info.reg_limit
                    && result.info.reg_limit != escape_floor)
            {
                result.info.reg_limit = escape_floor;
                result.info.no_primal_update = 0;
                result.info.no_dual_update = 0;
            }

            kkt.update_scalings(
                data,
                result.info.rho,
                result.info.delta,
                &result.s,
                &result.s_lb[..n_lb],
                &result.s_ub[..n_ub],
                &result.z,
                &result.z_lb[..n_lb],
                &result.z_ub[..n_ub],
            );
            *kkt_init_state = false;

            if !kkt.factorize(data, result.info.reg_limit) {
                if result.info.factor_retires < settings.max_factor_retires {
                    result.info.delta *= (100.0).lit();
                    result.info.rho *= (100.0).lit();
                    result.info.iter -= 1;
                    result.info.factor_retires += 1;
                    let ten: T = (10.0).lit();
                    result.info.reg_limit = T::min(
                        ten * result.info.reg_limit,
                        settings.eps_abs,
                    );
                    continue;
                } else {
                    result.info.status = Status::Numerics;
                    return result.info.status;
                }
            }
            result.info.factor_retires = 0;

            if total_ineq > 0 {
                // ------------------ predictor step ------------------
                for (r, (&s, &z)) in zip(&mut rhs.s, zip(&result.s, &result.z)) {
                    *r = -s * z;
                }
                for k in 0..n_lb {
                    rhs.s_lb[k] = -result.s_lb[k] * result.z_lb[k];
                }
                for k in 0..n_ub {
                    rhs.s_ub[k] = -result.s_ub[k] * result.z_ub[k];
                }

                kkt.solve(data, rhs, step);

                //largest steps keeping the slack and multiplier blocks
                //in the non-negative orthant
                let mut alpha_s = step_to_boundary(&result.s, &step.s);
                let mut alpha_z = step_to_boundary(&result.z, &step.z);
                alpha_s = T::min(
                    alpha_s,
                    step_to_boundary(&result.s_lb[..n_lb], &step.s_lb[..n_lb]),
                );
                alpha_z = T::min(
                    alpha_z,
                    step_to_boundary(&result.z_lb[..n_lb], &step.z_lb[..n_lb]),
                );
                alpha_s = T::min(
                    alpha_s,
                    step_to_boundary(&result.s_ub[..n_ub], &step.s_ub[..n_ub]),
                );
                alpha_z = T::min(
                    alpha_z,
                    step_to_boundary(&result.z_ub[..n_ub], &step.z_ub[..n_ub]),
                );
                //avoid getting too close to the boundary
                alpha_s *= settings.tau;
                alpha_z *= settings.tau;

                let mut sigma = <[T]>::dot_shifted(
                    &result.s,
                    &step.s,
                    alpha_s,
                    &result.z,
                    &step.z,
                    alpha_z,
                );
                sigma += <[T]>::dot_shifted(
                    &result.s_lb[..n_lb],
                    &step.s_lb[..n_lb],
                    alpha_s,
                    &result.z_lb[..n_lb],
                    &step.z_lb[..n_lb],
                    alpha_z,
                );
                sigma += <[T]>::dot_shifted(
                    &result.s_ub[..n_ub],
                    &step.s_ub[..n_ub],
                    alpha_s,
                    &result.z_ub[..n_ub],
                    &step.z_ub[..n_ub],
                    alpha_z,
                );
                sigma /= result.info.mu * total_ineq.lit();
                sigma = sigma * sigma * sigma;
                result.info.sigma = sigma;

                // ------------------ corrector step ------------------
                let sigma_mu = sigma * result.info.mu;
                for (r, (&ds, &dz)) in zip(&mut rhs.s, zip(&step.s, &step.z)) {
                    *r += -ds * dz + sigma_mu;
                }
                for k in 0..n_lb {
                    rhs.s_lb[k] += -step.s_lb[k] * step.z_lb[k] + sigma_mu;
                }
                for k in 0..n_ub {
                    rhs.s_ub[k] += -step.s_ub[k] * step.z_ub[k] + sigma_mu;
                }

                kkt.solve(data, rhs, step);

                let mut alpha_s = step_to_boundary(&result.s, &step.s);
                let mut alpha_z = step_to_boundary(&result.z, &step.z);
                alpha_s = T::min(
                    alpha_s,
                    step_to_boundary(&result.s_lb[..n_lb], &step.s_lb[..n_lb]),
                );
                alpha_z = T::min(
                    alpha_z,
                    step_to_boundary(&result.z_lb[..n_lb], &step.z_lb[..n_lb]),
                );
                alpha_s = T::min(
                    alpha_s,
                    step_to_boundary(&result.s_ub[..n_ub], &step.s_ub[..n_ub]),
                );
                alpha_z = T::min(
                    alpha_z,
                    step_to_boundary(&result.z_ub[..n_ub], &step.z_ub[..n_ub]),
                );
                result.info.primal_step = alpha_s * settings.tau;
                result.info.dual_step = alpha_z * settings.tau;

                // ------------------ update ------------------
                let (alpha_s, alpha_z) = (result.info.primal_step, result.info.dual_step);
                result.x.axpby(alpha_s, &step.x, T::one());
                result.y.axpby(alpha_z, &step.y, T::one());
                result.z.axpby(alpha_z, &step.z, T::one());
                result.z_lb[..n_lb].axpby(alpha_z, &step.z_lb[..n_lb], T::one());
                result.z_ub[..n_ub].axpby(alpha_z, &step.z_ub[..n_ub], T::one());
                result.s.axpby(alpha_s, &step.s, T::one());
                result.s_lb[..n_lb].axpby(alpha_s, &step.s_lb[..n_lb], T::one());
                result.s_ub[..n_ub].axpby(alpha_s, &step.s_ub[..n_ub], T::one());

                let mu_prev = result.info.mu;
                result.info.mu = compute_mu(result, n_lb, n_ub, total_ineq);
                let mu_rate = T::abs(mu_prev - result.info.mu) / mu_prev;

                // ------------------ update regularization ------------------
                update_nr_residuals(
                    data,
                    precond,
                    result,
                    rhs_nr,
                    &mut step.x,
                    primal_rel_inf,
                    dual_rel_inf,
                );

                let one = T::one();
                let backoff: T = (0.666).lit();
                let p95: T = (0.95).lit();
                if precond.norm_dual_res(&rhs_nr.x)
                    < p95 * result.info.dual_inf
                {
                    result.zeta.copy_from(&result.x);
                    result.info.rho = T::max(
                        result.info.reg_limit,
                        (one - mu_rate) * result.info.rho,
                    );
                } else {
                    result.info.no_primal_update += 1;
                    result.info.rho = T::max(
                        result.info.reg_limit,
                        (one - backoff * mu_rate) * result.info.rho,
                    );
                }

                let mut dual_nr_inf_norm = precond.norm_primal_res_eq(&rhs_nr.y);
                dual_nr_inf_norm =
                    T::max(dual_nr_inf_norm, precond.norm_primal_res_ineq(&rhs_nr.z));
                dual_nr_inf_norm = T::max(
                    dual_nr_inf_norm,
                    precond.norm_primal_res_lb(&rhs_nr.z_lb[..n_lb], &data.x_lb_idx),
                );
                dual_nr_inf_norm = T::max(
                    dual_nr_inf_norm,
                    precond.norm_primal_res_ub(&rhs_nr.z_ub[..n_ub], &data.x_ub_idx),
                );
                let p95b: T = (0.95).lit();
                if dual_nr_inf_norm < p95b * result.info.primal_inf {
                    result.lambda.copy_from(&result.y);
                    result.nu.copy_from(&result.z);
                    result.nu_lb[..n_lb].copy_from(&result.z_lb[..n_lb]);
                    result.nu_ub[..n_ub].copy_from(&result.z_ub[..n_ub]);
                    result.info.delta = T::max(
                        result.info.reg_limit,
                        (one - mu_rate) * result.info.delta,
                    );
                } else {
                    result.info.no_dual_update += 1;
                    result.info.delta = T::max(
                        result.info.reg_limit,
                        (one - backoff * mu_rate) * result.info.delta,
                    );
                }
            } else {
                //without inequalities the step is unconstrained, so take
                //full steps and decay the regularization directly
                kkt.solve(data, rhs, step);

                result.info.primal_step = T::one();
                result.info.dual_step = T::one();
                result.x.axpby(result.info.primal_step, &step.x, T::one());
                result.y.axpby(result.info.dual_step, &step.y, T::one());

                update_nr_residuals(
                    data,
                    precond,
                    result,
                    rhs_nr,
                    &mut step.x,
                    primal_rel_inf,
                    dual_rel_inf,
                );

                let p95c: T = (0.95).lit();
                let p1: T = (0.1).lit();
                let p5: T = (0.5).lit();
                if precond.norm_dual_res(&rhs_nr.x)
                    < p95c * result.info.dual_inf
                {
                    result.zeta.copy_from(&result.x);
                    result.info.rho = T::max(
                        result.info.reg_limit,
                        p1 * result.info.rho,
                    );
                } else {
                    result.info.no_primal_update += 1;
                    result.info.rho = T::max(
                        result.info.reg_limit,
                        p5 * result.info.rho,
                    );
                }

                if precond.norm_primal_res_eq(&rhs_nr.y)
                    < p95c * result.info.primal_inf
                {
                    result.lambda.copy_from(&result.y);
                    result.info.delta = T::max(
                        result.info.reg_limit,
                        p1 * result.info.delta,
                    );
                } else {
                    result.info.no_dual_update += 1;
                    result.info.delta = T::max(
                        result.info.reg_limit,
                        p5 * result.info.delta,
                    );
                }
            }
        }

        result.info.status = Status::MaxIterReached;
        result.info.status
    }

    //return the iterates to the units of the user data
    fn unscale_results(&mut self) {
        let Some(data) = self.data.as_ref() else {
            return;
        };
        let precond = &self.precond;
        let result = &mut self.result;
        let (n_lb, n_ub) = (data.n_lb, data.n_ub);

        precond.unscale_primal(&mut result.x);
        precond.unscale_primal(&mut result.zeta);
        precond.unscale_dual_eq(&mut result.y);
        precond.unscale_dual_eq(&mut result.lambda);
        precond.unscale_dual_ineq(&mut result.z);
        precond.unscale_dual_ineq(&mut result.nu);
        precond.unscale_dual_lb(&mut result.z_lb[..n_lb], &data.x_lb_idx);
        precond.unscale_dual_lb(&mut result.nu_lb[..n_lb], &data.x_lb_idx);
        precond.unscale_dual_ub(&mut result.z_ub[..n_ub], &data.x_ub_idx);
        precond.unscale_dual_ub(&mut result.nu_ub[..n_ub], &data.x_ub_idx);
        precond.unscale_slack_ineq(&mut result.s);
        precond.unscale_slack_lb(&mut result.s_lb[..n_lb], &data.x_lb_idx);
        precond.unscale_slack_ub(&mut result.s_ub[..n_ub], &data.x_ub_idx);
    }

    //scatter the packed bound blocks back to ℝⁿ shape: inactive entries
    //carry zero multipliers and infinite slacks
    fn restore_box_dual(&mut self) {
        let Some(data) = self.data.as_ref() else {
            return;
        };
        let result = &mut self.result;
        let (n_lb, n_ub) = (data.n_lb, data.n_ub);

        result.z_lb[n_lb..].set(T::zero());
        result.z_ub[n_ub..].set(T::zero());
        result.s_lb[n_lb..].set(T::infinity());
        result.s_ub[n_ub..].set(T::infinity());
        result.nu_lb[n_lb..].set(T::zero());
        result.nu_ub[n_ub..].set(T::zero());
        for i in (0..n_lb).rev() {
            result.z_lb.swap(i, data.x_lb_idx[i]);
            result.s_lb.swap(i, data.x_lb_idx[i]);
            result.nu_lb.swap(i, data.x_lb_idx[i]);
        }
        for i in (0..n_ub).rev() {
            result.z_ub.swap(i, data.x_ub_idx[i]);
            result.s_ub.swap(i, data.x_ub_idx[i]);
            result.nu_ub.swap(i, data.x_ub_idx[i]);
        }
    }

    fn print_banner(&self) {
        let data = self.data.as_ref().unwrap();
        println!("----------------------------------------------------------");
        println!("                          proxip                          ");
        println!("       proximal interior point solver for convex QP       ");
        println!("----------------------------------------------------------");
        println!("variables n = {}", data.n);
        println!("equality constraints p = {}", data.p);
        println!("inequality constraints m = {}", data.m);
        println!("variable lower bounds n_lb = {}", data.n_lb);
        println!("variable upper bounds n_ub = {}", data.n_ub);
        println!();
        println!("iter  prim_cost      dual_cost      prim_inf      dual_inf      rho         delta       mu          prim_step   dual_step");
    }

    fn print_footer(&self, status: Status) {
        let info = &self.result.info;
        println!();
        println!("status:               {}", status);
        println!("number of iterations: {}", info.iter);
        if self.settings.compute_timings {
            println!("total run time:       {:.3e}s", info.run_time);
            println!("  setup time:         {:.3e}s", info.setup_time);
            println!("  update time:        {:.3e}s", info.update_time);
            println!("  solve time:         {:.3e}s", info.solve_time);
        }
    }
}

//(s + δs)·(z + δz) without intermediate allocation
fn shifted_dot<T: FloatT>(s: &[T], z: &[T], delta_s: T, delta_z: T) -> T {
    zip(s, z).fold(T::zero(), |acc, (&s, &z)| {
        acc + (s + delta_s) * (z + delta_z)
    })
}

//largest α in [0,1] with v + α·dv ≥ 0
fn step_to_boundary<T: FloatT>(v: &[T], dv: &[T]) -> T {
    zip(v, dv).fold(T::one(), |alpha, (&v, &dv)| {
        if dv < T::zero() {
            T::min(alpha, -v / dv)
        } else {
            alpha
        }
    })
}

fn compute_mu<T: FloatT>(
    result: &SolverResult<T>,
    n_lb: usize,
    n_ub: usize,
    total_ineq: usize,
) -> T {
    let mut dot = result.s.dot(&result.z);
    dot += result.s_lb[..n_lb].dot(&result.z_lb[..n_lb]);
    dot += result.s_ub[..n_ub].dot(&result.z_ub[..n_ub]);
    dot / total_ineq.lit()
}

//non-regularized residuals of the current iterate, together with the
//relative scales used by the termination test.  `scratch` must have
//length n and is clobbered.
fn update_nr_residuals<T, M>(
    data: &ProblemData<T, M>,
    precond: &RuizEquilibration<T>,
    result: &SolverResult<T>,
    rhs_nr: &mut StepRhs<T>,
    scratch: &mut Vec<T>,
    primal_rel_inf: &mut T,
    dual_rel_inf: &mut T,
) where
    T: FloatT,
    M: MatrixKind<F = T>,
{
    let (n_lb, n_ub) = (data.n_lb, data.n_ub);

    // rx = -P x - c - Aᵀy - Gᵀz + E_lbᵀ z_lb - E_ubᵀ z_ub
    data.P_utri
        .symv_triu(&mut rhs_nr.x, &result.x, -T::one(), T::zero());
    *dual_rel_inf = precond.norm_dual_res(&rhs_nr.x);
    rhs_nr.x.axpby(-T::one(), &data.c, T::one());

    data.AT.gemv(scratch, &result.y, T::one(), T::zero());
    *dual_rel_inf = T::max(*dual_rel_inf, precond.norm_dual_res(scratch));
    rhs_nr.x.axpby(-T::one(), scratch, T::one());

    data.GT.gemv(scratch, &result.z, T::one(), T::zero());
    *dual_rel_inf = T::max(*dual_rel_inf, precond.norm_dual_res(scratch));
    rhs_nr.x.axpby(-T::one(), scratch, T::one());

    scratch.set(T::zero());
    for k in 0..n_lb {
        scratch[data.x_lb_idx[k]] = -result.z_lb[k];
    }
    *dual_rel_inf = T::max(*dual_rel_inf, precond.norm_dual_res(scratch));
    rhs_nr.x.axpby(-T::one(), scratch, T::one());

    scratch.set(T::zero());
    for k in 0..n_ub {
        scratch[data.x_ub_idx[k]] = result.z_ub[k];
    }
    *dual_rel_inf = T::max(*dual_rel_inf, precond.norm_dual_res(scratch));
    rhs_nr.x.axpby(-T::one(), scratch, T::one());

    // ry = b - A x
    data.AT
        .gemv_t(&mut rhs_nr.y, &result.x, -T::one(), T::zero());
    *primal_rel_inf = precond.norm_primal_res_eq(&rhs_nr.y);
    rhs_nr.y.axpby(T::one(), &data.b, T::one());
    *primal_rel_inf = T::max(*primal_rel_inf, precond.norm_primal_res_eq(&data.b));

    // rz = h - G x - s
    data.GT
        .gemv_t(&mut rhs_nr.z, &result.x, -T::one(), T::zero());
    *primal_rel_inf = T::max(*primal_rel_inf, precond.norm_primal_res_ineq(&rhs_nr.z));
    for (r, (&h, &s)) in zip(&mut rhs_nr.z, zip(&data.h, &result.s)) {
        *r += h - s;
    }
    *primal_rel_inf = T::max(*primal_rel_inf, precond.norm_primal_res_ineq(&data.h));

    // bound residuals in packed form
    for k in 0..n_lb {
        rhs_nr.z_lb[k] = result.x[data.x_lb_idx[k]] + data.x_lb_n[k] - result.s_lb[k];
    }
    *primal_rel_inf = T::max(
        *primal_rel_inf,
        precond.norm_primal_res_lb(&rhs_nr.z_lb[..n_lb], &data.x_lb_idx),
    );
    *primal_rel_inf = T::max(
        *primal_rel_inf,
        precond.norm_primal_res_lb(&data.x_lb_n[..n_lb], &data.x_lb_idx),
    );
    for k in 0..n_ub {
        rhs_nr.z_ub[k] = -result.x[data.x_ub_idx[k]] + data.x_ub[k] - result.s_ub[k];
    }
    *primal_rel_inf = T::max(
        *primal_rel_inf,
        precond.norm_primal_res_ub(&rhs_nr.z_ub[..n_ub], &data.x_ub_idx),
    );
    *primal_rel_inf = T::max(
        *primal_rel_inf,
        precond.norm_primal_res_ub(&data.x_ub[..n_ub], &data.x_ub_idx),
    );
}
