#![allow(non_snake_case)]

use crate::algebra::*;
use crate::solver::data::ProblemData;
use crate::solver::traits::{KktDataUpdates, KktSystem, StepRhs};

/// Dense KKT system in Schur-reduced form.
///
/// The inequality and box-bound blocks are diagonal at every interior
/// point, so they are eliminated into the variable block, leaving the
/// (n+p) symmetric quasidefinite matrix
///
/// ```text
/// [ P + ρI + Gᵀ(Θ+δI)⁻¹G + Σ 1/(θ_b+δ)·e eᵀ      Aᵀ   ]
/// [ A                                            -δI  ]
/// ```
///
/// assembled in the lower triangle and factored by an unpivoted signed
/// LDLᵀ: the leading n pivots must come out positive and the trailing p
/// negative.  A pivot of the wrong sign fails the factorization, which the
/// driver answers by inflating ρ and δ.
pub struct DenseKkt<T> {
    n: usize,
    p: usize,
    m: usize,
    dim: usize,

    //assembled matrix and its factor, lower triangles
    kkt: Matrix<T>,
    fact: Matrix<T>,

    //current scalings
    rho: T,
    delta: T,
    s_work: Vec<T>,
    z_inv: Vec<T>,
    w_z: Vec<T>,
    s_lb_work: Vec<T>,
    z_lb_inv: Vec<T>,
    w_lb: Vec<T>,
    s_ub_work: Vec<T>,
    z_ub_inv: Vec<T>,
    w_ub: Vec<T>,
    n_lb: usize,
    n_ub: usize,

    //solve workspace
    work: Vec<T>,
    work_m: Vec<T>,
}

impl<T> DenseKkt<T>
where
    T: FloatT,
{
    fn unit_scalings(&mut self, data: &ProblemData<T, Matrix<T>>) {
        self.n_lb = data.n_lb;
        self.n_ub = data.n_ub;
        self.s_work.set(T::one());
        self.z_inv.set(T::one());
        self.s_lb_work.set(T::one());
        self.z_lb_inv.set(T::one());
        self.s_ub_work.set(T::one());
        self.z_ub_inv.set(T::one());
        let w = T::recip(T::one() + self.delta);
        self.w_z.set(w);
        self.w_lb.set(w);
        self.w_ub.set(w);
    }

    //assemble the reduced matrix from the problem data and the current
    //scaling state
    fn assemble(&mut self, data: &ProblemData<T, Matrix<T>>) {
        let (n, p, m) = (self.n, self.p, self.m);
        let kkt = &mut self.kkt;
        kkt.data.fill(T::zero());

        //P (stored triu) mirrored into the lower triangle, plus ρI
        for j in 0..n {
            for i in j..n {
                kkt[(i, j)] = data.P_utri[(j, i)];
            }
            kkt[(j, j)] += self.rho;
        }

        //Schur terms from the eliminated inequality block
        for k in 0..m {
            let wk = self.w_z[k];
            for j in 0..n {
                let gj = data.GT[(j, k)];
                if gj == T::zero() {
                    continue;
                }
                let wg = wk * gj;
                for i in j..n {
                    kkt[(i, j)] += wg * data.GT[(i, k)];
                }
            }
        }

        //Schur terms from the eliminated box-bound blocks
        for k in 0..self.n_lb {
            let i = data.x_lb_idx[k];
            kkt[(i, i)] += self.w_lb[k];
        }
        for k in 0..self.n_ub {
            let i = data.x_ub_idx[k];
            kkt[(i, i)] += self.w_ub[k];
        }

        //equality rows and the dual regularization block
        for j in 0..p {
            for i in 0..n {
                kkt[(n + j, i)] = data.AT[(i, j)];
            }
            kkt[(n + j, n + j)] = -self.delta;
        }
    }

    //unpivoted LDLᵀ with fixed pivot signs: + for the first n, - for the
    //trailing p.  Returns false on any wrong-signed or non-finite pivot.
    fn factor(&mut self) -> bool {
        let (n, dim) = (self.n, self.dim);
        self.fact.data.copy_from(&self.kkt.data);
        let F = &mut self.fact;

        for j in 0..dim {
            let d = F[(j, j)];
            let pos_pivot = j < n;

            if !d.is_finite() || (pos_pivot && d <= T::zero()) || (!pos_pivot && d >= T::zero()) {
                return false;
            }

            for i in (j + 1)..dim {
                F[(i, j)] /= d;
            }
            for c in (j + 1)..dim {
                let f = F[(c, j)] * d;
                if f == T::zero() {
                    continue;
                }
                for r in c..dim {
                    let update = F[(r, j)] * f;
                    F[(r, c)] -= update;
                }
            }
        }
        true
    }

    //solve the factored (n+p) system in place
    fn backsolve(&mut self) {
        let dim = self.dim;
        let F = &self.fact;
        let w = &mut self.work;

        for j in 0..dim {
            let wj = w[j];
            for i in (j + 1)..dim {
                w[i] -= F[(i, j)] * wj;
            }
        }
        for (j, wj) in w.iter_mut().enumerate() {
            *wj /= F[(j, j)];
        }
        for j in (0..dim).rev() {
            let mut acc = T::zero();
            for i in (j + 1)..dim {
                acc += F[(i, j)] * w[i];
            }
            w[j] -= acc;
        }
    }
}

impl<T> KktSystem<T, Matrix<T>> for DenseKkt<T>
where
    T: FloatT,
{
    fn new(data: &ProblemData<T, Matrix<T>>, rho: T, delta: T) -> Self {
        let (n, p, m) = (data.n, data.p, data.m);
        let dim = n + p;

        let mut kkt = Self {
            n,
            p,
            m,
            dim,
            kkt: Matrix::zeros(dim, dim),
            fact: Matrix::zeros(dim, dim),
            rho,
            delta,
            s_work: vec![T::one(); m],
            z_inv: vec![T::one(); m],
            w_z: vec![T::one(); m],
            s_lb_work: vec![T::one(); n],
            z_lb_inv: vec![T::one(); n],
            w_lb: vec![T::one(); n],
            s_ub_work: vec![T::one(); n],
            z_ub_inv: vec![T::one(); n],
            w_ub: vec![T::one(); n],
            n_lb: data.n_lb,
            n_ub: data.n_ub,
            work: vec![T::zero(); dim],
            work_m: vec![T::zero(); m],
        };
        kkt.unit_scalings(data);
        kkt
    }

    fn update_scalings(
        &mut self,
        data: &ProblemData<T, Matrix<T>>,
        rho: T,
        delta: T,
        s: &[T],
        s_lb: &[T],
        s_ub: &[T],
        z: &[T],
        z_lb: &[T],
        z_ub: &[T],
    ) {
        self.rho = rho;
        self.delta = delta;
        self.n_lb = data.n_lb;
        self.n_ub = data.n_ub;

        self.s_work.copy_from(s);
        self.z_inv.scalarop_from(T::recip, z);
        for j in 0..data.m {
            self.w_z[j] = T::recip(s[j] / z[j] + delta);
        }
        for k in 0..data.n_lb {
            self.s_lb_work[k] = s_lb[k];
            self.z_lb_inv[k] = T::recip(z_lb[k]);
            self.w_lb[k] = T::recip(s_lb[k] / z_lb[k] + delta);
        }
        for k in 0..data.n_ub {
            self.s_ub_work[k] = s_ub[k];
            self.z_ub_inv[k] = T::recip(z_ub[k]);
            self.w_ub[k] = T::recip(s_ub[k] / z_ub[k] + delta);
        }
    }

    fn factorize(&mut self, data: &ProblemData<T, Matrix<T>>, _reg_limit: T) -> bool {
        self.assemble(data);
        self.factor()
    }

    fn solve(&mut self, data: &ProblemData<T, Matrix<T>>, rhs: &StepRhs<T>, lhs: &mut StepRhs<T>) {
        let (n, p, m) = (self.n, self.p, self.m);

        //fold the eliminated inequality block into the variable rhs
        for j in 0..m {
            let rhat_z = rhs.z[j] - self.z_inv[j] * rhs.s[j];
            self.work_m[j] = self.w_z[j] * rhat_z;
        }
        self.work[0..n].copy_from(&rhs.x);
        data.GT.gemv(&mut self.work[0..n], &self.work_m, T::one(), T::one());

        //and the eliminated box-bound blocks
        for k in 0..data.n_lb {
            let rhat_lb = rhs.z_lb[k] - self.z_lb_inv[k] * rhs.s_lb[k];
            self.work[data.x_lb_idx[k]] -= self.w_lb[k] * rhat_lb;
        }
        for k in 0..data.n_ub {
            let rhat_ub = rhs.z_ub[k] - self.z_ub_inv[k] * rhs.s_ub[k];
            self.work[data.x_ub_idx[k]] += self.w_ub[k] * rhat_ub;
        }
        self.work[n..n + p].copy_from(&rhs.y);

        self.backsolve();

        lhs.x.copy_from(&self.work[0..n]);
        lhs.y.copy_from(&self.work[n..n + p]);

        //recover the eliminated blocks.  G·Δx lands in lhs.z first
        data.GT.gemv_t(&mut lhs.z, &lhs.x, T::one(), T::zero());
        for j in 0..m {
            let rhat_z = rhs.z[j] - self.z_inv[j] * rhs.s[j];
            lhs.z[j] = self.w_z[j] * (lhs.z[j] - rhat_z);
            lhs.s[j] = self.z_inv[j] * (rhs.s[j] - self.s_work[j] * lhs.z[j]);
        }
        for k in 0..data.n_lb {
            let rhat_lb = rhs.z_lb[k] - self.z_lb_inv[k] * rhs.s_lb[k];
            lhs.z_lb[k] = -self.w_lb[k] * (lhs.x[data.x_lb_idx[k]] + rhat_lb);
            lhs.s_lb[k] = self.z_lb_inv[k] * (rhs.s_lb[k] - self.s_lb_work[k] * lhs.z_lb[k]);
        }
        for k in 0..data.n_ub {
            let rhat_ub = rhs.z_ub[k] - self.z_ub_inv[k] * rhs.s_ub[k];
            lhs.z_ub[k] = self.w_ub[k] * (lhs.x[data.x_ub_idx[k]] - rhat_ub);
            lhs.s_ub[k] = self.z_ub_inv[k] * (rhs.s_ub[k] - self.s_ub_work[k] * lhs.z_ub[k]);
        }
    }

    fn update_data(&mut self, data: &ProblemData<T, Matrix<T>>, _options: KktDataUpdates) {
        //the dense system is reassembled from the data at every
        //factorization, so only the scaling state needs resetting for a
        //possibly changed bound set
        self.unit_scalings(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::traits::KktSystem;

    fn small_data() -> ProblemData<f64, Matrix<f64>> {
        let P = Matrix::from(&[
            [2., 0.5], //
            [0.5, 1.],
        ]);
        let A = Matrix::from(&[[1., 1.]]);
        let G = Matrix::from(&[[1., 0.]]);
        ProblemData::new(
            &P,
            &[1., 1.],
            &A,
            &[1.],
            &G,
            &[2.],
            Some(&[-f64::INFINITY, 0.]),
            Some(&[3., f64::INFINITY]),
        )
        .unwrap()
    }

    #[test]
    fn test_dense_kkt_blocked_equations() {
        let data = small_data();
        let (rho, delta) = (1e-6, 1e-4);
        let mut kkt = DenseKkt::new(&data, rho, delta);
        assert!(kkt.factorize(&data, 1e-10));

        let mut rhs = StepRhs::new(2, 1, 1);
        let mut lhs = StepRhs::new(2, 1, 1);
        rhs.x.copy_from_slice(&[1., -1.]);
        rhs.y[0] = 0.25;
        rhs.z[0] = -0.5;
        rhs.z_lb[0] = 1.5;
        rhs.z_ub[0] = -0.75;
        rhs.s[0] = 0.1;
        rhs.s_lb[0] = 0.2;
        rhs.s_ub[0] = 0.3;

        kkt.solve(&data, &rhs, &mut lhs);

        let (dx, dy, dz) = (&lhs.x, &lhs.y, &lhs.z);
        let (dzlb, dzub) = (&lhs.z_lb, &lhs.z_ub);
        let (ds, dslb, dsub) = (&lhs.s, &lhs.s_lb, &lhs.s_ub);

        // (P+ρI)dx + Aᵀdy + Gᵀdz - E_lbᵀdz_lb + E_ubᵀdz_ub = rx
        // lower bound sits on x1, upper bound on x0
        let r0 = (2. + rho) * dx[0] + 0.5 * dx[1] + dy[0] + dz[0] + dzub[0];
        let r1 = 0.5 * dx[0] + (1. + rho) * dx[1] + dy[0] - dzlb[0];
        assert!((r0 - rhs.x[0]).abs() < 1e-9);
        assert!((r1 - rhs.x[1]).abs() < 1e-9);

        // A dx - δ dy = ry
        assert!((dx[0] + dx[1] - delta * dy[0] - rhs.y[0]).abs() < 1e-9);

        // G dx + ds - δ dz = rz
        assert!((dx[0] + ds[0] - delta * dz[0] - rhs.z[0]).abs() < 1e-9);

        // -dx1 + ds_lb - δ dz_lb = rz_lb ;  dx0 + ds_ub - δ dz_ub = rz_ub
        assert!((-dx[1] + dslb[0] - delta * dzlb[0] - rhs.z_lb[0]).abs() < 1e-9);
        assert!((dx[0] + dsub[0] - delta * dzub[0] - rhs.z_ub[0]).abs() < 1e-9);

        // unit complementarity rows: ds + dz = rs
        assert!((ds[0] + dz[0] - rhs.s[0]).abs() < 1e-9);
        assert!((dslb[0] + dzlb[0] - rhs.s_lb[0]).abs() < 1e-9);
        assert!((dsub[0] + dzub[0] - rhs.s_ub[0]).abs() < 1e-9);
    }

    #[test]
    fn test_dense_factor_fails_without_regularization() {
        // A rank-deficient equality block with δ = 0 has a zero trailing
        // pivot and must be rejected
        let P = Matrix::identity(2);
        let A = Matrix::from(&[
            [1., 1.], //
            [1., 1.],
        ]);
        let G = Matrix::zeros(0, 2);
        let data =
            ProblemData::new(&P, &[0., 0.], &A, &[1., 1.], &G, &[], None, None).unwrap();

        let mut kkt = DenseKkt::new(&data, 0.0, 0.0);
        assert!(!kkt.factorize(&data, 1e-10));

        let mut kkt = DenseKkt::new(&data, 1e-6, 1e-4);
        assert!(kkt.factorize(&data, 1e-10));
    }
}
