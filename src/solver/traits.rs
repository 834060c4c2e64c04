#![allow(non_snake_case)]

use crate::algebra::*;
use crate::solver::data::ProblemData;
use crate::solver::solver::SolverError;

/// Storage-kind seam between the dense and sparse solver variants.
///
/// The two variants share the driver, data store and preconditioner; this
/// trait carries the handful of operations whose implementation depends on
/// the matrix storage.  Implemented by [`Matrix`](crate::algebra::Matrix)
/// and [`CscMatrix`](crate::algebra::CscMatrix).
pub trait MatrixKind:
    MatrixMath<T = Self::F> + MatrixVectorMultiply<T = Self::F> + Clone + std::fmt::Debug
{
    type F: FloatT;

    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;

    /// Store the upper triangle of a square matrix supplied by the user.
    fn store_triu(src: &Self) -> Result<Self, SolverError>;

    /// Store the transpose of `src`, together with a map taking entry
    /// positions of `src` to positions in the transpose.  The map is empty
    /// for storage kinds that do not need one.
    fn store_transposed(src: &Self) -> (Self, Vec<usize>);

    /// Refresh a stored upper triangle from new values with the original
    /// sparsity pattern.  Pattern or shape changes are refused.
    fn update_values_triu(dst: &mut Self, src: &Self) -> Result<(), SolverError>;

    /// Refresh a stored transpose through the map produced by
    /// [`store_transposed`](MatrixKind::store_transposed).
    fn update_values_transposed(
        dst: &mut Self,
        map: &[usize],
        src: &Self,
    ) -> Result<(), SolverError>;
}

impl<T: FloatT> MatrixKind for Matrix<T> {
    type F = T;

    fn nrows(&self) -> usize {
        self.m
    }
    fn ncols(&self) -> usize {
        self.n
    }

    fn store_triu(src: &Self) -> Result<Self, SolverError> {
        if !src.is_square() {
            return Err(SolverError::InvalidDimensions("P must be square"));
        }
        Ok(src.to_triu())
    }

    fn store_transposed(src: &Self) -> (Self, Vec<usize>) {
        (src.transpose(), Vec::new())
    }

    fn update_values_triu(dst: &mut Self, src: &Self) -> Result<(), SolverError> {
        if src.m != dst.m || src.n != dst.n {
            return Err(SolverError::InvalidDimensions("P has wrong dimensions"));
        }
        for j in 0..dst.n {
            for i in 0..=j {
                dst[(i, j)] = src[(i, j)];
            }
        }
        Ok(())
    }

    fn update_values_transposed(
        dst: &mut Self,
        _map: &[usize],
        src: &Self,
    ) -> Result<(), SolverError> {
        if src.m != dst.n || src.n != dst.m {
            return Err(SolverError::InvalidDimensions("matrix has wrong dimensions"));
        }
        dst.transpose_from(src);
        Ok(())
    }
}

impl<T: FloatT> MatrixKind for CscMatrix<T> {
    type F = T;

    fn nrows(&self) -> usize {
        self.m
    }
    fn ncols(&self) -> usize {
        self.n
    }

    fn store_triu(src: &Self) -> Result<Self, SolverError> {
        if !src.is_square() {
            return Err(SolverError::InvalidDimensions("P must be square"));
        }
        Ok(src.to_triu())
    }

    fn store_transposed(src: &Self) -> (Self, Vec<usize>) {
        src.transpose_with_map()
    }

    fn update_values_triu(dst: &mut Self, src: &Self) -> Result<(), SolverError> {
        if src.m != dst.m || src.n != dst.n {
            return Err(SolverError::InvalidDimensions("P has wrong dimensions"));
        }
        // the stored pattern is the upper triangle of the original input.
        // entries within a column are sorted by row, so the triu entries of
        // each incoming column are its leading entries.  validate every
        // column before touching any stored value
        for j in 0..dst.n {
            let dst_nnz = dst.colptr[j + 1] - dst.colptr[j];
            let src_triu_nnz = (src.colptr[j]..src.colptr[j + 1])
                .take_while(|&k| src.rowval[k] <= j)
                .count();
            if src_triu_nnz != dst_nnz {
                return Err(SolverError::PatternMismatch);
            }
        }
        for j in 0..dst.n {
            let dst_nnz = dst.colptr[j + 1] - dst.colptr[j];
            let (fdst, fsrc) = (dst.colptr[j], src.colptr[j]);
            dst.nzval[fdst..fdst + dst_nnz].copy_from_slice(&src.nzval[fsrc..fsrc + dst_nnz]);
        }
        Ok(())
    }

    fn update_values_transposed(
        dst: &mut Self,
        map: &[usize],
        src: &Self,
    ) -> Result<(), SolverError> {
        if src.m != dst.n || src.n != dst.m {
            return Err(SolverError::InvalidDimensions("matrix has wrong dimensions"));
        }
        if src.nnz() != dst.nnz() {
            return Err(SolverError::PatternMismatch);
        }
        for (ptr, &dest) in map.iter().enumerate() {
            dst.nzval[dest] = src.nzval[ptr];
        }
        Ok(())
    }
}

/// Residual / step direction buffers in the blocked iterate shape.
///
/// Used both for KKT right hand sides and for the returned step.  The bound
/// blocks are in packed form with only the leading `n_lb` / `n_ub` entries
/// meaningful.
#[derive(Debug, Clone)]
pub struct StepRhs<T> {
    pub x: Vec<T>,
    pub y: Vec<T>,
    pub z: Vec<T>,
    pub z_lb: Vec<T>,
    pub z_ub: Vec<T>,
    pub s: Vec<T>,
    pub s_lb: Vec<T>,
    pub s_ub: Vec<T>,
}

impl<T: FloatT> StepRhs<T> {
    pub fn new(n: usize, p: usize, m: usize) -> Self {
        Self {
            x: vec![T::zero(); n],
            y: vec![T::zero(); p],
            z: vec![T::zero(); m],
            z_lb: vec![T::zero(); n],
            z_ub: vec![T::zero(); n],
            s: vec![T::zero(); m],
            s_lb: vec![T::zero(); n],
            s_ub: vec![T::zero(); n],
        }
    }
}

/// Selects which data blocks a KKT system refresh should pull from the
/// problem data after an update.
#[derive(Debug, Clone, Copy, Default)]
pub struct KktDataUpdates {
    pub p: bool,
    pub a: bool,
    pub g: bool,
}

/// Contract between the IPM driver and a KKT system implementation.
///
/// A KKT system owns the assembled (regularized) matrix, its factors and
/// all working storage.  Everything is allocated in [`new`](KktSystem::new);
/// the remaining operations must not allocate.
pub trait KktSystem<T, M>: Sized
where
    T: FloatT,
    M: MatrixKind<F = T>,
{
    /// Build the symbolic structure and load initial values, with unit
    /// slack/multiplier scalings.
    fn new(data: &ProblemData<T, M>, rho: T, delta: T) -> Self;

    /// Load the current proximal weights and interior point scalings into
    /// the KKT diagonals.
    #[allow(clippy::too_many_arguments)]
    fn update_scalings(
        &mut self,
        data: &ProblemData<T, M>,
        rho: T,
        delta: T,
        s: &[T],
        s_lb: &[T],
        s_ub: &[T],
        z: &[T],
        z_lb: &[T],
        z_ub: &[T],
    );

    /// Numeric factorization with the current values.  Returns false on
    /// failure, in which case the driver inflates the regularization and
    /// retries.
    fn factorize(&mut self, data: &ProblemData<T, M>, reg_limit: T) -> bool;

    /// Solve the full blocked Newton system, recovering the eliminated
    /// slack and bound blocks.  `rhs.s*` carry the complementarity
    /// residuals.
    fn solve(&mut self, data: &ProblemData<T, M>, rhs: &StepRhs<T>, lhs: &mut StepRhs<T>);

    /// Pull refreshed values for the selected blocks from the problem data,
    /// leaving the symbolic structure untouched.
    fn update_data(&mut self, data: &ProblemData<T, M>, options: KktDataUpdates);
}
