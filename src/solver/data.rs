#![allow(non_snake_case)]

use crate::algebra::*;
use crate::solver::get_infinity;
use crate::solver::solver::SolverError;
use crate::solver::traits::MatrixKind;

/// Problem data store shared by the dense and sparse solver variants.
///
/// P is held as its upper triangle only.  A and G are held transposed so
/// that the products Aᵀy and Gᵀz are column operations.  Box bounds are
/// compacted to their finite entries: `x_lb_n[k] = -x_lb[x_lb_idx[k]]` for
/// the k-th finite lower bound (sign flipped so that every bound residual
/// has the same shape), and `x_ub[k] = x_ub[x_ub_idx[k]]`.  The index
/// vectors are strictly increasing.
#[derive(Debug, Clone)]
pub struct ProblemData<T, M> {
    /// number of variables
    pub n: usize,
    /// number of equality constraints
    pub p: usize,
    /// number of inequality constraints
    pub m: usize,

    /// upper triangle of the quadratic cost
    pub P_utri: M,
    /// transpose of the equality constraint matrix
    pub AT: M,
    /// transpose of the inequality constraint matrix
    pub GT: M,
    /// entry map from user A values into AT (sparse only)
    pub(crate) a_map: Vec<usize>,
    /// entry map from user G values into GT (sparse only)
    pub(crate) g_map: Vec<usize>,

    /// linear cost
    pub c: Vec<T>,
    /// equality right hand side
    pub b: Vec<T>,
    /// inequality right hand side
    pub h: Vec<T>,

    /// number of finite lower bounds
    pub n_lb: usize,
    /// number of finite upper bounds
    pub n_ub: usize,
    /// negated finite lower bounds, packed
    pub x_lb_n: Vec<T>,
    /// finite upper bounds, packed
    pub x_ub: Vec<T>,
    /// variable indices of the packed lower bounds
    pub x_lb_idx: Vec<usize>,
    /// variable indices of the packed upper bounds
    pub x_ub_idx: Vec<usize>,
}

impl<T, M> ProblemData<T, M>
where
    T: FloatT,
    M: MatrixKind<F = T>,
{
    pub fn new(
        P: &M,
        c: &[T],
        A: &M,
        b: &[T],
        G: &M,
        h: &[T],
        x_lb: Option<&[T]>,
        x_ub: Option<&[T]>,
    ) -> Result<Self, SolverError> {
        let n = P.nrows();
        let p = A.nrows();
        let m = G.nrows();

        if P.ncols() != n {
            return Err(SolverError::InvalidDimensions("P must be square"));
        }
        if A.ncols() != n {
            return Err(SolverError::InvalidDimensions("A must have n columns"));
        }
        if G.ncols() != n {
            return Err(SolverError::InvalidDimensions("G must have n columns"));
        }
        if c.len() != n {
            return Err(SolverError::InvalidDimensions("c must have length n"));
        }
        if b.len() != p {
            return Err(SolverError::InvalidDimensions("b must have length p"));
        }
        if h.len() != m {
            return Err(SolverError::InvalidDimensions("h must have length m"));
        }
        if let Some(lb) = x_lb {
            if lb.len() != n {
                return Err(SolverError::InvalidDimensions("x_lb must have length n"));
            }
        }
        if let Some(ub) = x_ub {
            if ub.len() != n {
                return Err(SolverError::InvalidDimensions("x_ub must have length n"));
            }
        }

        let P_utri = M::store_triu(P)?;
        let (AT, a_map) = M::store_transposed(A);
        let (GT, g_map) = M::store_transposed(G);

        let mut data = Self {
            n,
            p,
            m,
            P_utri,
            AT,
            GT,
            a_map,
            g_map,
            c: c.to_vec(),
            b: b.to_vec(),
            h: h.to_vec(),
            n_lb: 0,
            n_ub: 0,
            x_lb_n: vec![T::zero(); n],
            x_ub: vec![T::zero(); n],
            x_lb_idx: vec![0; n],
            x_ub_idx: vec![0; n],
        };
        data.setup_lb_data(x_lb);
        data.setup_ub_data(x_ub);

        Ok(data)
    }

    /// total number of complementarity pairs
    pub fn total_ineq(&self) -> usize {
        self.m + self.n_lb + self.n_ub
    }

    /// Compact the finite lower bounds, dropping entries at or beyond the
    /// infinity threshold.
    pub(crate) fn setup_lb_data(&mut self, x_lb: Option<&[T]>) {
        let inf = T::from_f64(get_infinity()).unwrap();
        let mut n_lb = 0;
        if let Some(x_lb) = x_lb {
            for (i, &v) in x_lb.iter().enumerate() {
                if v > -inf {
                    self.x_lb_n[n_lb] = -v;
                    self.x_lb_idx[n_lb] = i;
                    n_lb += 1;
                }
            }
        }
        self.n_lb = n_lb;
    }

    /// Compact the finite upper bounds.
    pub(crate) fn setup_ub_data(&mut self, x_ub: Option<&[T]>) {
        let inf = T::from_f64(get_infinity()).unwrap();
        let mut n_ub = 0;
        if let Some(x_ub) = x_ub {
            for (i, &v) in x_ub.iter().enumerate() {
                if v < inf {
                    self.x_ub[n_ub] = v;
                    self.x_ub_idx[n_ub] = i;
                    n_ub += 1;
                }
            }
        }
        self.n_ub = n_ub;
    }

    // ------------------------------------------
    // partial updates.  shapes are validated against the stored problem;
    // sparse pattern changes are refused by the MatrixKind layer.
    // ------------------------------------------

    pub(crate) fn set_P(&mut self, P: &M) -> Result<(), SolverError> {
        M::update_values_triu(&mut self.P_utri, P)
    }

    pub(crate) fn set_A(&mut self, A: &M) -> Result<(), SolverError> {
        if A.nrows() != self.p || A.ncols() != self.n {
            return Err(SolverError::InvalidDimensions("A has wrong dimensions"));
        }
        M::update_values_transposed(&mut self.AT, &self.a_map, A)
    }

    pub(crate) fn set_G(&mut self, G: &M) -> Result<(), SolverError> {
        if G.nrows() != self.m || G.ncols() != self.n {
            return Err(SolverError::InvalidDimensions("G has wrong dimensions"));
        }
        M::update_values_transposed(&mut self.GT, &self.g_map, G)
    }

    pub(crate) fn set_c(&mut self, c: &[T]) -> Result<(), SolverError> {
        if c.len() != self.n {
            return Err(SolverError::InvalidDimensions("c must have length n"));
        }
        self.c.copy_from(c);
        Ok(())
    }

    pub(crate) fn set_b(&mut self, b: &[T]) -> Result<(), SolverError> {
        if b.len() != self.p {
            return Err(SolverError::InvalidDimensions("b must have length p"));
        }
        self.b.copy_from(b);
        Ok(())
    }

    pub(crate) fn set_h(&mut self, h: &[T]) -> Result<(), SolverError> {
        if h.len() != self.m {
            return Err(SolverError::InvalidDimensions("h must have length m"));
        }
        self.h.copy_from(h);
        Ok(())
    }

    pub(crate) fn set_bounds(
        &mut self,
        x_lb: Option<&[T]>,
        x_ub: Option<&[T]>,
    ) -> Result<(), SolverError> {
        if let Some(lb) = x_lb {
            if lb.len() != self.n {
                return Err(SolverError::InvalidDimensions("x_lb must have length n"));
            }
            self.setup_lb_data(Some(lb));
        }
        if let Some(ub) = x_ub {
            if ub.len() != self.n {
                return Err(SolverError::InvalidDimensions("x_ub must have length n"));
            }
            self.setup_ub_data(Some(ub));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_compaction() {
        let P = CscMatrix::<f64>::identity(3);
        let A = CscMatrix::zeros(0, 3);
        let G = CscMatrix::zeros(0, 3);
        let c = [0.; 3];

        let data = ProblemData::new(
            &P,
            &c,
            &A,
            &[],
            &G,
            &[],
            Some(&[-1., -2e30, 3.]),
            Some(&[f64::INFINITY, 5., 1e30]),
        )
        .unwrap();

        assert_eq!(data.n_lb, 2);
        assert_eq!(&data.x_lb_idx[..2], &[0, 2]);
        assert_eq!(&data.x_lb_n[..2], &[1., -3.]);

        assert_eq!(data.n_ub, 1);
        assert_eq!(&data.x_ub_idx[..1], &[1]);
        assert_eq!(&data.x_ub[..1], &[5.]);
    }

    #[test]
    fn test_dimension_checks() {
        let P = CscMatrix::<f64>::identity(2);
        let A = CscMatrix::zeros(1, 2);
        let G = CscMatrix::zeros(0, 2);

        assert!(matches!(
            ProblemData::new(&P, &[0.], &A, &[1.], &G, &[], None, None),
            Err(SolverError::InvalidDimensions(_))
        ));
        assert!(ProblemData::new(&P, &[0., 0.], &A, &[1.], &G, &[], None, None).is_ok());
    }
}
