#![allow(non_snake_case)]

use crate::algebra::*;
use crate::solver::data::ProblemData;
use crate::solver::traits::MatrixKind;

/// Ruiz equilibration of the problem data.
///
/// Iteratively rescales rows and columns of the stacked constraint system
/// so that their ∞-norms approach one, together with an overall cost
/// scaling.  The stored diagonals are
///
/// * `d` — variable (primal) scaling, length n
/// * `e` — equality row scaling, length p
/// * `f` — inequality row scaling, length m
/// * `c` — scalar objective scaling
///
/// with scaled data `P̄ = c·DPD`, `c̄ = c·Dc`, `Ā = EAD`, `b̄ = Eb`,
/// `Ḡ = FGD`, `h̄ = Fh` and bounds divided elementwise by the entries of D
/// on their index sets.  The scaled primal solves relate to the originals
/// by `x = D·x̄`, `y = E·ȳ/c`, `z = F·z̄/c`.
///
/// All unscale operations below work in place or reduce to a norm; nothing
/// here allocates after construction.
#[derive(Debug, Clone)]
pub struct RuizEquilibration<T> {
    pub d: Vec<T>,
    pub dinv: Vec<T>,
    pub e: Vec<T>,
    pub einv: Vec<T>,
    pub f: Vec<T>,
    pub finv: Vec<T>,
    pub c: T,

    //per-sweep scaling increments
    delta_d: Vec<T>,
    delta_e: Vec<T>,
    delta_f: Vec<T>,
}

impl<T> RuizEquilibration<T>
where
    T: FloatT,
{
    pub fn new(n: usize, p: usize, m: usize) -> Self {
        Self {
            d: vec![T::one(); n],
            dinv: vec![T::one(); n],
            e: vec![T::one(); p],
            einv: vec![T::one(); p],
            f: vec![T::one(); m],
            finv: vec![T::one(); m],
            c: T::one(),
            delta_d: vec![T::one(); n],
            delta_e: vec![T::one(); p],
            delta_f: vec![T::one(); m],
        }
    }

    /// Equilibrate freshly loaded (unscaled) problem data.
    ///
    /// With `reuse` set, the previously computed scalings are applied in a
    /// single pass instead of being recomputed; this keeps KKT values
    /// consistent across data updates.
    pub fn scale_data<M>(&mut self, data: &mut ProblemData<T, M>, reuse: bool, iters: usize)
    where
        M: MatrixKind<F = T>,
    {
        if reuse {
            //apply the stored diagonals in one pass
            let (d, e, f) = (&self.d, &self.e, &self.f);
            data.P_utri.lrscale(d, d);
            data.P_utri.scale(self.c);
            data.AT.lrscale(d, e);
            data.GT.lrscale(d, f);
            data.c.hadamard(d);
            data.c.scale(self.c);
            data.b.hadamard(e);
            data.h.hadamard(f);
            scale_bounds(data, &self.dinv);
            return;
        }

        self.d.set(T::one());
        self.e.set(T::one());
        self.f.set(T::one());
        self.c = T::one();

        for _ in 0..iters {
            // per-variable norms over the stacked [P; A; G] columns, and
            // per-row norms of A and G
            data.P_utri.col_norms_sym(&mut self.delta_d);
            data.AT.row_norms_no_reset(&mut self.delta_d);
            data.GT.row_norms_no_reset(&mut self.delta_d);
            data.AT.col_norms(&mut self.delta_e);
            data.GT.col_norms(&mut self.delta_f);

            //zero rows or columns should not get scaled
            self.delta_d
                .scalarop(|x| if x == T::zero() { T::one() } else { x });
            self.delta_e
                .scalarop(|x| if x == T::zero() { T::one() } else { x });
            self.delta_f
                .scalarop(|x| if x == T::zero() { T::one() } else { x });

            self.delta_d.rsqrt();
            self.delta_e.rsqrt();
            self.delta_f.rsqrt();

            //scale the problem data and update the equilibration diagonals
            let (dd, de, df) = (&self.delta_d, &self.delta_e, &self.delta_f);
            data.P_utri.lrscale(dd, dd);
            data.AT.lrscale(dd, de);
            data.GT.lrscale(dd, df);
            data.c.hadamard(dd);
            data.b.hadamard(de);
            data.h.hadamard(df);
            scale_bounds_step(data, dd);

            self.d.hadamard(dd);
            self.e.hadamard(de);
            self.f.hadamard(df);

            //objective scaling towards unit magnitude cost data
            let scale_cost = T::max(data.c.mean_abs(), data.P_utri.norm_max_abs());
            if scale_cost != T::zero() {
                let ctmp = T::recip(scale_cost);
                data.P_utri.scale(ctmp);
                data.c.scale(ctmp);
                self.c *= ctmp;
            }
        }

        self.dinv.scalarop_from(T::recip, &self.d);
        self.einv.scalarop_from(T::recip, &self.e);
        self.finv.scalarop_from(T::recip, &self.f);
    }

    /// Undo the data scaling, returning the store to user units.
    pub fn unscale_data<M>(&self, data: &mut ProblemData<T, M>)
    where
        M: MatrixKind<F = T>,
    {
        let cinv = T::recip(self.c);
        data.P_utri.lrscale(&self.dinv, &self.dinv);
        data.P_utri.scale(cinv);
        data.AT.lrscale(&self.dinv, &self.einv);
        data.GT.lrscale(&self.dinv, &self.finv);
        data.c.hadamard(&self.dinv);
        data.c.scale(cinv);
        data.b.hadamard(&self.einv);
        data.h.hadamard(&self.finv);
        scale_bounds(data, &self.d);
    }

    // ------------------------------------------
    // ∞-norms of unscaled quantities, computed from scaled storage
    // without allocating
    // ------------------------------------------

    pub fn norm_primal(&self, v: &[T]) -> T {
        v.norm_inf_scaled(&self.d)
    }

    pub fn norm_dual_res(&self, v: &[T]) -> T {
        v.norm_inf_scaled(&self.dinv) / self.c
    }

    pub fn norm_primal_res_eq(&self, v: &[T]) -> T {
        v.norm_inf_scaled(&self.einv)
    }

    pub fn norm_primal_res_ineq(&self, v: &[T]) -> T {
        v.norm_inf_scaled(&self.finv)
    }

    pub fn norm_primal_res_lb(&self, v: &[T], idx: &[usize]) -> T {
        self.norm_on_index_set(v, idx, &self.d, T::one())
    }

    pub fn norm_primal_res_ub(&self, v: &[T], idx: &[usize]) -> T {
        self.norm_on_index_set(v, idx, &self.d, T::one())
    }

    pub fn norm_dual_eq(&self, v: &[T]) -> T {
        v.norm_inf_scaled(&self.e) / self.c
    }

    pub fn norm_dual_ineq(&self, v: &[T]) -> T {
        v.norm_inf_scaled(&self.f) / self.c
    }

    pub fn norm_dual_lb(&self, v: &[T], idx: &[usize]) -> T {
        self.norm_on_index_set(v, idx, &self.dinv, T::recip(self.c))
    }

    pub fn norm_dual_ub(&self, v: &[T], idx: &[usize]) -> T {
        self.norm_on_index_set(v, idx, &self.dinv, T::recip(self.c))
    }

    fn norm_on_index_set(&self, v: &[T], idx: &[usize], diag: &[T], scale: T) -> T {
        std::iter::zip(v, idx).fold(T::zero(), |acc, (&v, &i)| {
            T::max(acc, T::abs(v * diag[i] * scale))
        })
    }

    /// Unscale an objective value.
    pub fn unscale_cost(&self, v: T) -> T {
        v / self.c
    }

    // ------------------------------------------
    // in-place vector scale / unscale pairs
    // ------------------------------------------

    pub fn unscale_primal(&self, v: &mut [T]) {
        v.hadamard(&self.d);
    }
    pub fn scale_primal(&self, v: &mut [T]) {
        v.hadamard(&self.dinv);
    }

    pub fn unscale_dual_eq(&self, v: &mut [T]) {
        v.hadamard(&self.e);
        v.scale(T::recip(self.c));
    }
    pub fn scale_dual_eq(&self, v: &mut [T]) {
        v.hadamard(&self.einv);
        v.scale(self.c);
    }

    pub fn unscale_dual_ineq(&self, v: &mut [T]) {
        v.hadamard(&self.f);
        v.scale(T::recip(self.c));
    }
    pub fn scale_dual_ineq(&self, v: &mut [T]) {
        v.hadamard(&self.finv);
        v.scale(self.c);
    }

    pub fn unscale_dual_lb(&self, v: &mut [T], idx: &[usize]) {
        let cinv = T::recip(self.c);
        for (v, &i) in std::iter::zip(v.iter_mut(), idx) {
            *v *= self.dinv[i] * cinv;
        }
    }
    pub fn scale_dual_lb(&self, v: &mut [T], idx: &[usize]) {
        for (v, &i) in std::iter::zip(v.iter_mut(), idx) {
            *v *= self.d[i] * self.c;
        }
    }

    pub fn unscale_dual_ub(&self, v: &mut [T], idx: &[usize]) {
        self.unscale_dual_lb(v, idx);
    }
    pub fn scale_dual_ub(&self, v: &mut [T], idx: &[usize]) {
        self.scale_dual_lb(v, idx);
    }

    pub fn unscale_slack_ineq(&self, v: &mut [T]) {
        v.hadamard(&self.finv);
    }
    pub fn scale_slack_ineq(&self, v: &mut [T]) {
        v.hadamard(&self.f);
    }

    pub fn unscale_slack_lb(&self, v: &mut [T], idx: &[usize]) {
        for (v, &i) in std::iter::zip(v.iter_mut(), idx) {
            *v *= self.d[i];
        }
    }
    pub fn scale_slack_lb(&self, v: &mut [T], idx: &[usize]) {
        for (v, &i) in std::iter::zip(v.iter_mut(), idx) {
            *v *= self.dinv[i];
        }
    }

    pub fn unscale_slack_ub(&self, v: &mut [T], idx: &[usize]) {
        self.unscale_slack_lb(v, idx);
    }
    pub fn scale_slack_ub(&self, v: &mut [T], idx: &[usize]) {
        self.scale_slack_lb(v, idx);
    }
}

//bounds live on the variable index sets, scaled by the inverse of the
//variable scaling
fn scale_bounds<T, M>(data: &mut ProblemData<T, M>, dinv: &[T])
where
    T: FloatT,
    M: MatrixKind<F = T>,
{
    for k in 0..data.n_lb {
        data.x_lb_n[k] *= dinv[data.x_lb_idx[k]];
    }
    for k in 0..data.n_ub {
        data.x_ub[k] *= dinv[data.x_ub_idx[k]];
    }
}

fn scale_bounds_step<T, M>(data: &mut ProblemData<T, M>, delta_d: &[T])
where
    T: FloatT,
    M: MatrixKind<F = T>,
{
    for k in 0..data.n_lb {
        data.x_lb_n[k] /= delta_d[data.x_lb_idx[k]];
    }
    for k in 0..data.n_ub {
        data.x_ub[k] /= delta_d[data.x_ub_idx[k]];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_data() -> ProblemData<f64, CscMatrix<f64>> {
        // badly scaled 2 variable problem
        let P = CscMatrix::new(2, 2, vec![0, 1, 2], vec![0, 1], vec![1e4, 1e-2]);
        let A = CscMatrix::new(1, 2, vec![0, 1, 2], vec![0, 0], vec![1e3, 1.]);
        let G = CscMatrix::new(1, 2, vec![0, 1, 2], vec![0, 0], vec![1., 1e-3]);
        ProblemData::new(
            &P,
            &[1e2, 1.],
            &A,
            &[1.],
            &G,
            &[1.],
            Some(&[-1., -1.]),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_ruiz_balances_norms() {
        let mut data = test_data();
        let mut equil = RuizEquilibration::new(2, 1, 1);
        equil.scale_data(&mut data, false, 10);

        let mut colnorms = vec![0.0; 2];
        data.P_utri.col_norms_sym(&mut colnorms);
        data.AT.row_norms_no_reset(&mut colnorms);
        data.GT.row_norms_no_reset(&mut colnorms);
        let ratio = colnorms[0] / colnorms[1];
        assert!(ratio < 10.0 && ratio > 0.1);
    }

    #[test]
    fn test_scale_unscale_data_roundtrip() {
        let mut data = test_data();
        let orig = data.clone();
        let mut equil = RuizEquilibration::new(2, 1, 1);
        equil.scale_data(&mut data, false, 10);
        equil.unscale_data(&mut data);

        assert!(data.P_utri.nzval.norm_inf_diff(&orig.P_utri.nzval) < 1e-12 * 1e4);
        assert!(data.AT.nzval.norm_inf_diff(&orig.AT.nzval) < 1e-10);
        assert!(data.c.norm_inf_diff(&orig.c) < 1e-10);
        assert!(data.x_lb_n[..2].norm_inf_diff(&orig.x_lb_n[..2]) < 1e-12);
    }

    #[test]
    fn test_vector_roundtrips() {
        //scale then unscale must reproduce the input to machine precision
        let mut data = test_data();
        let mut equil = RuizEquilibration::new(2, 1, 1);
        equil.scale_data(&mut data, false, 10);

        let v0 = vec![1.25, -3.5];
        let mut v = v0.clone();
        equil.scale_primal(&mut v);
        equil.unscale_primal(&mut v);
        assert!(v.norm_inf_diff(&v0) < 1e-15 * v0.norm_inf());

        let w0 = vec![0.75];
        let mut w = w0.clone();
        equil.scale_dual_eq(&mut w);
        equil.unscale_dual_eq(&mut w);
        assert!(w.norm_inf_diff(&w0) < 1e-15);

        let mut w = w0.clone();
        equil.scale_slack_ineq(&mut w);
        equil.unscale_slack_ineq(&mut w);
        assert!(w.norm_inf_diff(&w0) < 1e-15);

        let idx = [1usize];
        let mut w = w0.clone();
        equil.scale_dual_lb(&mut w, &idx);
        equil.unscale_dual_lb(&mut w, &idx);
        assert!(w.norm_inf_diff(&w0) < 1e-15);

        let mut w = w0.clone();
        equil.scale_slack_lb(&mut w, &idx);
        equil.unscale_slack_lb(&mut w, &idx);
        assert!(w.norm_inf_diff(&w0) < 1e-15);
    }
}
