#![allow(non_snake_case)]

use crate::algebra::*;
use crate::solver::data::ProblemData;
use crate::solver::sparse::ldl::LdlFactorization;
use crate::solver::sparse::ordering::{permute_sparse_symmetric, AmdOrdering, Ordering};
use crate::solver::traits::{KktDataUpdates, KktSystem, StepRhs};

/// Block elimination strategy for the sparse KKT system.
///
/// Only the full three block form is implemented; the box-bound blocks are
/// always folded into the variable diagonal since they are diagonal
/// selectors at every iterate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KktMode {
    #[default]
    Full,
}

/// Sparse KKT system under a fill-reducing ordering.
///
/// Holds the permuted upper triangular KKT matrix
///
/// ```text
/// [ P + ρI + Σ 1/(θ_b+δ)·e e'     Aᵀ        Gᵀ        ]
/// [ A                             -δI                 ]
/// [ G                                       -(Θ+δI)   ]
/// ```
///
/// with every diagonal entry structurally present, entry maps from the
/// problem data into the permuted values, and an LDLᵀ engine with signed
/// pivots (+ on the variable block, - on the dual blocks).
pub struct SparseKkt<T, O = AmdOrdering>
where
    O: Ordering,
{
    mode: KktMode,
    n: usize,
    p: usize,
    m: usize,

    ordering: O,
    PKPt: CscMatrix<T>,
    ldl: LdlFactorization<T>,

    //maps from data entries to PKPt value positions
    p_map: Vec<usize>,
    a_map: Vec<usize>,
    g_map: Vec<usize>,
    diag_map: Vec<usize>,

    //diagonal of P, zero where structurally absent
    p_diag: Vec<T>,
    p_diag_pos: Vec<Option<usize>>,

    //current scalings
    rho: T,
    delta: T,
    s_work: Vec<T>,
    z_inv: Vec<T>,
    s_lb_work: Vec<T>,
    z_lb_inv: Vec<T>,
    w_lb: Vec<T>,
    s_ub_work: Vec<T>,
    z_ub_inv: Vec<T>,
    w_ub: Vec<T>,
    n_lb: usize,
    n_ub: usize,

    //solve workspace
    x_reg: Vec<T>,
    rhs_work: Vec<T>,
    sol_work: Vec<T>,
}

impl<T, O> SparseKkt<T, O>
where
    T: FloatT,
    O: Ordering,
{
    pub fn mode(&self) -> KktMode {
        self.mode
    }

    //reset the interior point scalings to their unit initial state
    fn unit_scalings(&mut self, data: &ProblemData<T, CscMatrix<T>>) {
        self.n_lb = data.n_lb;
        self.n_ub = data.n_ub;
        self.s_work.set(T::one());
        self.z_inv.set(T::one());
        self.s_lb_work.set(T::one());
        self.z_lb_inv.set(T::one());
        self.s_ub_work.set(T::one());
        self.z_ub_inv.set(T::one());
        let w = T::recip(T::one() + self.delta);
        self.w_lb.set(w);
        self.w_ub.set(w);
    }

    //write every diagonal entry of the KKT matrix from the current
    //regularization and scaling state
    fn write_diagonals(&mut self, data: &ProblemData<T, CscMatrix<T>>) {
        let (n, p, m) = (self.n, self.p, self.m);

        self.x_reg.copy_from(&self.p_diag);
        self.x_reg.translate(self.rho);
        for k in 0..self.n_lb {
            self.x_reg[data.x_lb_idx[k]] += self.w_lb[k];
        }
        for k in 0..self.n_ub {
            self.x_reg[data.x_ub_idx[k]] += self.w_ub[k];
        }

        for i in 0..n {
            self.PKPt.nzval[self.diag_map[i]] = self.x_reg[i];
        }
        for j in 0..p {
            self.PKPt.nzval[self.diag_map[n + j]] = -self.delta;
        }
        for j in 0..m {
            self.PKPt.nzval[self.diag_map[n + p + j]] =
                -self.s_work[j] * self.z_inv[j] - self.delta;
        }
    }
}

impl<T, O> KktSystem<T, CscMatrix<T>> for SparseKkt<T, O>
where
    T: FloatT,
    O: Ordering,
{
    fn new(data: &ProblemData<T, CscMatrix<T>>, rho: T, delta: T) -> Self {
        let (n, p, m) = (data.n, data.p, data.m);
        let dim = n + p + m;

        let P = &data.P_utri;
        let AT = &data.AT;
        let GT = &data.GT;

        let p_diag_pos = triu_diag_positions(P);
        let mut p_diag = vec![T::zero(); n];
        for (i, pos) in p_diag_pos.iter().enumerate() {
            if let Some(pos) = pos {
                p_diag[i] = P.nzval[*pos];
            }
        }

        //count entries per KKT column, forcing a diagonal everywhere
        let mut nnz = 0;
        for j in 0..n {
            let col_nnz = P.colptr[j + 1] - P.colptr[j];
            nnz += col_nnz + usize::from(p_diag_pos[j].is_none());
        }
        nnz += AT.nnz() + p;
        nnz += GT.nnz() + m;

        let mut K = CscMatrix::<T>::spalloc(dim, dim, nnz);
        let mut p_map = vec![0; P.nnz()];
        let mut a_map = vec![0; AT.nnz()];
        let mut g_map = vec![0; GT.nnz()];
        let mut diag_map = vec![0; dim];

        //variable block columns carry the P entries and a diagonal
        let mut ptr = 0;
        for j in 0..n {
            K.colptr[j] = ptr;
            for k in P.colptr[j]..P.colptr[j + 1] {
                K.rowval[ptr] = P.rowval[k];
                K.nzval[ptr] = P.nzval[k];
                p_map[k] = ptr;
                ptr += 1;
            }
            if p_diag_pos[j].is_none() {
                K.rowval[ptr] = j;
                ptr += 1;
            }
            diag_map[j] = ptr - 1;
        }
        //equality block columns carry an AT column and the dual diagonal
        for j in 0..p {
            K.colptr[n + j] = ptr;
            for k in AT.colptr[j]..AT.colptr[j + 1] {
                K.rowval[ptr] = AT.rowval[k];
                K.nzval[ptr] = AT.nzval[k];
                a_map[k] = ptr;
                ptr += 1;
            }
            K.rowval[ptr] = n + j;
            diag_map[n + j] = ptr;
            ptr += 1;
        }
        //inequality block columns carry a GT column and the scaled diagonal
        for j in 0..m {
            K.colptr[n + p + j] = ptr;
            for k in GT.colptr[j]..GT.colptr[j + 1] {
                K.rowval[ptr] = GT.rowval[k];
                K.nzval[ptr] = GT.nzval[k];
                g_map[k] = ptr;
                ptr += 1;
            }
            K.rowval[ptr] = n + p + j;
            diag_map[n + p + j] = ptr;
            ptr += 1;
        }
        K.colptr[dim] = ptr;
        debug_assert_eq!(ptr, nnz);

        //fill reducing ordering on the assembled pattern
        let mut ordering = O::default();
        ordering.init(dim, &K.colptr, &K.rowval);
        let (PKPt, k_map) = permute_sparse_symmetric(&K, ordering.iperm());

        //compose the data entry maps with the permutation map
        for v in p_map.iter_mut() {
            *v = k_map[*v];
        }
        for v in a_map.iter_mut() {
            *v = k_map[*v];
        }
        for v in g_map.iter_mut() {
            *v = k_map[*v];
        }
        for v in diag_map.iter_mut() {
            *v = k_map[*v];
        }

        //expected pivot signs follow the original block of each column
        let dsigns: Vec<i8> = ordering
            .perm()
            .iter()
            .map(|&old| if old < n { 1 } else { -1 })
            .collect();

        let ldl = LdlFactorization::new(&PKPt, dsigns)
            .expect("internal: assembled KKT matrix has invalid structure");

        let mut kkt = Self {
            mode: KktMode::Full,
            n,
            p,
            m,
            ordering,
            PKPt,
            ldl,
            p_map,
            a_map,
            g_map,
            diag_map,
            p_diag,
            p_diag_pos,
            rho,
            delta,
            s_work: vec![T::one(); m],
            z_inv: vec![T::one(); m],
            s_lb_work: vec![T::one(); n],
            z_lb_inv: vec![T::one(); n],
            w_lb: vec![T::one(); n],
            s_ub_work: vec![T::one(); n],
            z_ub_inv: vec![T::one(); n],
            w_ub: vec![T::one(); n],
            n_lb: data.n_lb,
            n_ub: data.n_ub,
            x_reg: vec![T::zero(); n],
            rhs_work: vec![T::zero(); dim],
            sol_work: vec![T::zero(); dim],
        };
        kkt.unit_scalings(data);
        kkt.write_diagonals(data);
        kkt
    }

    fn update_scalings(
        &mut self,
        data: &ProblemData<T, CscMatrix<T>>,
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

        self.write_diagonals(data);
    }

    fn factorize(&mut self, _data: &ProblemData<T, CscMatrix<T>>, reg_limit: T) -> bool {
        self.ldl.factor(&self.PKPt, reg_limit).is_ok()
    }

    fn solve(
        &mut self,
        data: &ProblemData<T, CscMatrix<T>>,
        rhs: &StepRhs<T>,
        lhs: &mut StepRhs<T>,
    ) {
        let (n, p, m) = (self.n, self.p, self.m);

        //assemble the reduced right hand side: bound blocks and the
        //complementarity residuals fold into the variable and inequality
        //entries
        let w = &mut self.rhs_work;
        w[0..n].copy_from(&rhs.x);
        for k in 0..data.n_lb {
            let rhat_lb = rhs.z_lb[k] - self.z_lb_inv[k] * rhs.s_lb[k];
            w[data.x_lb_idx[k]] -= self.w_lb[k] * rhat_lb;
        }
        for k in 0..data.n_ub {
            let rhat_ub = rhs.z_ub[k] - self.z_ub_inv[k] * rhs.s_ub[k];
            w[data.x_ub_idx[k]] += self.w_ub[k] * rhat_ub;
        }
        w[n..n + p].copy_from(&rhs.y);
        for j in 0..m {
            w[n + p + j] = rhs.z[j] - self.z_inv[j] * rhs.s[j];
        }

        //permute, backsolve, unpermute
        let perm = self.ordering.perm();
        for (i, &pi) in perm.iter().enumerate() {
            self.sol_work[i] = w[pi];
        }
        self.ldl.solve(&mut self.sol_work);
        for (i, &pi) in perm.iter().enumerate() {
            w[pi] = self.sol_work[i];
        }

        lhs.x.copy_from(&w[0..n]);
        lhs.y.copy_from(&w[n..n + p]);
        lhs.z.copy_from(&w[n + p..]);

        //recover the eliminated blocks
        for j in 0..m {
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

    fn update_data(&mut self, data: &ProblemData<T, CscMatrix<T>>, options: KktDataUpdates) {
        if options.p {
            let P = &data.P_utri;
            for (k, &pos) in self.p_map.iter().enumerate() {
                self.PKPt.nzval[pos] = P.nzval[k];
            }
            for (i, pos) in self.p_diag_pos.iter().enumerate() {
                self.p_diag[i] = match pos {
                    Some(pos) => P.nzval[*pos],
                    None => T::zero(),
                };
            }
        }
        if options.a {
            for (k, &pos) in self.a_map.iter().enumerate() {
                self.PKPt.nzval[pos] = data.AT.nzval[k];
            }
        }
        if options.g {
            for (k, &pos) in self.g_map.iter().enumerate() {
                self.PKPt.nzval[pos] = data.GT.nzval[k];
            }
        }

        //the active bound set may have changed, so return the scaling
        //state to its setup-fresh form
        self.unit_scalings(data);
        self.write_diagonals(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::sparse::ordering::NaturalOrdering;
    use crate::solver::traits::KktSystem;

    fn small_data() -> ProblemData<f64, CscMatrix<f64>> {
        // P = I2, A = [1 1], G = [1 0], lower bound on x1
        let P = CscMatrix::identity(2);
        let A = CscMatrix::new(1, 2, vec![0, 1, 2], vec![0, 0], vec![1., 1.]);
        let G = CscMatrix::new(1, 2, vec![0, 1, 1], vec![0], vec![1.]);
        ProblemData::new(
            &P,
            &[1., 1.],
            &A,
            &[1.],
            &G,
            &[2.],
            Some(&[-f64::INFINITY, 0.]),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_kkt_solve_full_system() {
        let data = small_data();
        let (rho, delta) = (1e-6, 1e-4);
        let mut kkt = SparseKkt::<f64, NaturalOrdering>::new(&data, rho, delta);
        assert_eq!(kkt.mode(), KktMode::Full);
        assert!(kkt.factorize(&data, 1e-10));

        let mut rhs = StepRhs::new(2, 1, 1);
        let mut lhs = StepRhs::new(2, 1, 1);
        rhs.x.copy_from_slice(&[1., -2.]);
        rhs.y[0] = 0.5;
        rhs.z[0] = -1.;
        rhs.z_lb[0] = 2.;
        rhs.s[0] = 0.25;
        rhs.s_lb[0] = -0.5;

        kkt.solve(&data, &rhs, &mut lhs);

        let (dx, dy, dz, dzlb) = (&lhs.x, &lhs.y, &lhs.z, &lhs.z_lb);
        let (ds, dslb) = (&lhs.s, &lhs.s_lb);

        //with unit scalings the blocked equations must hold:
        // (P+ρI)dx + A'dy + G'dz - e1'dz_lb = rx
        let r0 = (1. + rho) * dx[0] + dy[0] + dz[0];
        let r1 = (1. + rho) * dx[1] + dy[0] - dzlb[0];
        assert!((r0 - rhs.x[0]).abs() < 1e-10);
        assert!((r1 - rhs.x[1]).abs() < 1e-10);

        // A dx - δ dy = ry
        let ry = dx[0] + dx[1] - delta * dy[0];
        assert!((ry - rhs.y[0]).abs() < 1e-10);

        // G dx + ds - δ dz = rz
        let rz = dx[0] + ds[0] - delta * dz[0];
        assert!((rz - rhs.z[0]).abs() < 1e-10);

        // -dx[1] + ds_lb - δ dz_lb = rz_lb
        let rzlb = -dx[1] + dslb[0] - delta * dzlb[0];
        assert!((rzlb - rhs.z_lb[0]).abs() < 1e-10);

        // z ds + s dz = rs (unit s and z)
        assert!((ds[0] + dz[0] - rhs.s[0]).abs() < 1e-10);
        assert!((dslb[0] + dzlb[0] - rhs.s_lb[0]).abs() < 1e-10);
    }

    #[test]
    fn test_kkt_amd_matches_natural() {
        let data = small_data();
        let mut kkt_nat = SparseKkt::<f64, NaturalOrdering>::new(&data, 1e-6, 1e-4);
        let mut kkt_amd = SparseKkt::<f64, AmdOrdering>::new(&data, 1e-6, 1e-4);
        assert!(kkt_nat.factorize(&data, 1e-10));
        assert!(kkt_amd.factorize(&data, 1e-10));

        let mut rhs = StepRhs::new(2, 1, 1);
        rhs.x.copy_from_slice(&[0.3, 0.7]);
        rhs.y[0] = -1.;
        rhs.z[0] = 2.;
        rhs.z_lb[0] = 1.;

        let mut lhs_nat = StepRhs::new(2, 1, 1);
        let mut lhs_amd = StepRhs::new(2, 1, 1);
        kkt_nat.solve(&data, &rhs, &mut lhs_nat);
        kkt_amd.solve(&data, &rhs, &mut lhs_amd);

        assert!(lhs_nat.x.norm_inf_diff(&lhs_amd.x) < 1e-12);
        assert!(lhs_nat.y.norm_inf_diff(&lhs_amd.y) < 1e-12);
        assert!(lhs_nat.z.norm_inf_diff(&lhs_amd.z) < 1e-12);
        assert!(lhs_nat.z_lb[..1].norm_inf_diff(&lhs_amd.z_lb[..1]) < 1e-12);
    }
}
