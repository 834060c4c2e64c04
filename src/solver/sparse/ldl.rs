#![allow(non_snake_case)]
use crate::algebra::*;
use std::iter::zip;
use thiserror::Error;

/// Failure modes of [`LdlFactorization`].
///
/// The structural variants are raised at construction; the pivot variants
/// during numeric factorization, where the solver treats them as a signal
/// to inflate its regularization and retry.
#[derive(Error, Debug)]
pub enum LdlError {
    #[error("only square matrices can be factorized")]
    NotSquare,
    #[error("every column needs at least one stored entry")]
    EmptyColumn,
    #[error("entries below the diagonal are not allowed")]
    NotUpperTriangular,
    #[error("a pivot vanished despite regularization")]
    ZeroPivot,
    #[error("accumulated pivot corrections exceeded the budget")]
    ExcessiveRegularization,
}

/// LDLᵀ factorization of a sparse symmetric quasidefinite matrix.
///
/// The matrix is supplied in upper triangular CSC form and is owned by the
/// caller, who may refresh its values in place and refactor; the symbolic
/// analysis from construction is reused.  No fill-reducing permutation is
/// applied here: the caller is expected to order the matrix beforehand.
///
/// Every diagonal position carries an expected pivot sign (+1 in the
/// positive definite block, -1 in the dual blocks).  During numeric
/// factorization a pivot d with `sign·d < reg_limit` is bumped to
/// `sign·max(|d|, reg_limit)`.  The factorization reports
/// [`LdlError::ExcessiveRegularization`] once the accumulated bump
/// magnitude exceeds `1/reg_limit`, which the solver treats as a
/// factorization failure.
#[derive(Debug)]
pub struct LdlFactorization<T = f64> {
    // lower triangular factor
    pub L: CscMatrix<T>,
    // D and its inverse for A = LDL^T
    pub D: Vec<T>,
    pub Dinv: Vec<T>,
    // expected pivot signs
    Dsigns: Vec<i8>,
    // symbolic analysis
    etree: Vec<usize>,
    Lnz: Vec<usize>,
    // workspace data
    iwork: Vec<usize>,
    bwork: Vec<bool>,
    fwork: Vec<T>,
    // number of bumped pivots in the last factorization
    regularize_count: usize,
}

const LDL_UNKNOWN: usize = usize::MAX;
const LDL_USED: bool = true;
const LDL_UNUSED: bool = false;

impl<T> LdlFactorization<T>
where
    T: FloatT,
{
    pub fn new(A: &CscMatrix<T>, Dsigns: Vec<i8>) -> Result<Self, LdlError> {
        check_structure(A)?;
        assert_eq!(Dsigns.len(), A.ncols());

        let n = A.ncols();
        let mut etree = vec![0; n];
        let mut Lnz = vec![0; n]; //nonzeros in each L column
        let mut iwork = vec![0; n * 3];
        let bwork = vec![false; n];
        let fwork = vec![T::zero(); n];

        _etree(n, &A.colptr, &A.rowval, &mut iwork, &mut Lnz, &mut etree)?;

        //total nonzeros in the factorization
        let sumLnz = Lnz.iter().sum();
        let L = CscMatrix::spalloc(n, n, sumLnz);

        let D = vec![T::zero(); n];
        let Dinv = vec![T::zero(); n];

        Ok(Self {
            L,
            D,
            Dinv,
            Dsigns,
            etree,
            Lnz,
            iwork,
            bwork,
            fwork,
            regularize_count: 0,
        })
    }

    pub fn regularize_count(&self) -> usize {
        self.regularize_count
    }

    /// Numeric factorization of `A`, whose pattern must be the one
    /// analyzed at construction.
    pub fn factor(&mut self, A: &CscMatrix<T>, reg_limit: T) -> Result<(), LdlError> {
        _factor_inner(
            A.n,
            &A.colptr,
            &A.rowval,
            &A.nzval,
            &mut self.L.colptr,
            &mut self.L.rowval,
            &mut self.L.nzval,
            &mut self.D,
            &mut self.Dinv,
            &self.Lnz,
            &self.etree,
            &mut self.bwork,
            &mut self.iwork,
            &mut self.fwork,
            &self.Dsigns,
            reg_limit,
            &mut self.regularize_count,
        )
    }

    // Solves Ax = b using the LDL factors, in place (x replaces b)
    pub fn solve(&self, b: &mut [T]) {
        assert_eq!(b.len(), self.D.len());

        _lsolve(&self.L.colptr, &self.L.rowval, &self.L.nzval, b);
        zip(b.iter_mut(), &self.Dinv).for_each(|(b, d)| *b *= *d);
        _ltsolve(&self.L.colptr, &self.L.rowval, &self.L.nzval, b);
    }
}

fn check_structure<T: FloatT>(A: &CscMatrix<T>) -> Result<(), LdlError> {
    if !A.is_square() {
        return Err(LdlError::NotSquare);
    }

    if !A.is_triu() {
        return Err(LdlError::NotUpperTriangular);
    }

    //Error if A doesn't have at least one entry in every column
    if !A.colptr.windows(2).all(|c| c[0] < c[1]) {
        return Err(LdlError::EmptyColumn);
    }

    Ok(())
}

// Compute the elimination tree for a quasidefinite matrix
// in compressed sparse column form.
fn _etree(
    n: usize,
    Ap: &[usize],
    Ai: &[usize],
    work: &mut [usize],
    Lnz: &mut [usize],
    etree: &mut [usize],
) -> Result<(), LdlError> {
    work[..n].fill(0);
    Lnz.fill(0);
    etree.fill(LDL_UNKNOWN);

    for j in 0..n {
        work[j] = j;
        for istart in Ai.iter().take(Ap[j + 1]).skip(Ap[j]) {
            let mut i = *istart;

            while work[i] != j {
                if etree[i] == LDL_UNKNOWN {
                    etree[i] = j;
                }
                Lnz[i] += 1; // nonzeros in this column
                work[i] = j;
                i = etree[i];
            }
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn _factor_inner<T: FloatT>(
    n: usize,
    Ap: &[usize],
    Ai: &[usize],
    Ax: &[T],
    Lp: &mut [usize],
    Li: &mut [usize],
    Lx: &mut [T],
    D: &mut [T],
    Dinv: &mut [T],
    Lnz: &[usize],
    etree: &[usize],
    bwork: &mut [bool],
    iwork: &mut [usize],
    fwork: &mut [T],
    Dsigns: &[i8],
    reg_limit: T,
    regularize_count: &mut usize,
) -> Result<(), LdlError> {
    *regularize_count = 0;
    let mut bump_total = T::zero();
    let bump_budget = T::recip(reg_limit);

    // partition working memory into pieces
    let y_markers = bwork;
    let (y_idx, iwork) = iwork.split_at_mut(n);
    let (elim_buffer, next_colspace) = iwork.split_at_mut(n);
    let y_vals = fwork;

    //set Lp to cumsum(Lnz), starting from zero
    Lp[0] = 0;
    let mut acc = 0;
    for (Lp, Lnz) in zip(&mut Lp[1..], Lnz) {
        *Lp = acc + Lnz;
        acc = *Lp;
    }

    // set all y_idx to be 'unused' initially.  In each column of L, the
    // next available space to start is just the first space in the column
    y_markers.fill(LDL_UNUSED);
    y_vals.fill(T::zero());
    D.fill(T::zero());
    next_colspace.copy_from_slice(&Lp[0..Lp.len() - 1]);

    // first element of the diagonal D
    D[0] = Ax[0];
    regularize_pivot(
        &mut D[0],
        Dsigns[0],
        reg_limit,
        &mut bump_total,
        regularize_count,
    );
    if D[0] == T::zero() {
        return Err(LdlError::ZeroPivot);
    }
    Dinv[0] = T::recip(D[0]);

    // Start from the second row (k=1) here.  The upper LH corner is
    // trivially 0 in L b/c we are only computing the subdiagonal elements
    for k in 1..n {
        // NB : For each k, we compute a solution to
        // y = L(0:(k-1),0:k-1))\b, where b is the kth
        // column of A that sits above the diagonal.
        // The solution y is then the kth row of L,
        // with an implied '1' at the diagonal entry.

        // number of nonzeros in this row of L
        let mut nnz_y = 0;

        // This loop determines where nonzeros will go in the kth row
        // of L, but doesn't compute the actual values
        for i in Ap[k]..Ap[k + 1] {
            let bidx = Ai[i]; //we are working on this element of b

            // Initialize D[k] as the element of this column
            // corresponding to the diagonal place.  Don't use
            // this element as part of the elimination step
            // that computes the k^th row of L
            if bidx == k {
                D[k] = Ax[i];
                continue;
            }

            y_vals[bidx] = Ax[i]; // initialise y(bidx) = b(bidx)

            // use the forward elimination tree to figure out which
            // elements must be eliminated after this element of b
            let next_idx = bidx;

            if y_markers[next_idx] == LDL_UNUSED {
                y_markers[next_idx] = LDL_USED;
                elim_buffer[0] = next_idx; // it goes at the start of the current list
                let mut nnz_e = 1; //length of unvisited elimination path from here

                let mut next_idx = etree[bidx];

                while next_idx != LDL_UNKNOWN && next_idx < k {
                    if y_markers[next_idx] == LDL_USED {
                        break;
                    }

                    y_markers[next_idx] = LDL_USED;
                    elim_buffer[nnz_e] = next_idx; // it goes in the current list
                    next_idx = etree[next_idx]; // one step further along tree
                    nnz_e += 1;
                }

                // now put the buffered elimination list into my current
                // ordering in reverse order
                while nnz_e != 0 {
                    nnz_e -= 1;
                    y_idx[nnz_y] = elim_buffer[nnz_e];
                    nnz_y += 1;
                }
            }
        }

        // This for loop places nonzero values in the k^th row
        for i in (0..nnz_y).rev() {
            // which column are we working on?
            let cidx = y_idx[i];

            // loop along the elements in this column of L and subtract
            // to solve to y
            let tmp_idx = next_colspace[cidx];
            let y_vals_cidx = y_vals[cidx];

            for j in Lp[cidx]..tmp_idx {
                y_vals[Li[j]] -= Lx[j] * y_vals_cidx;
            }

            // Now I have the cidx^th element of y = L\b.
            // so compute the corresponding element of this row of L
            // and put it into the right place
            Lx[tmp_idx] = y_vals_cidx * Dinv[cidx];
            D[k] -= y_vals_cidx * Lx[tmp_idx];

            // record which row it went into
            Li[tmp_idx] = k;
            next_colspace[cidx] += 1;

            // reset the y_vals and indices back to zero and LDL_UNUSED
            // once I'm done with them
            y_vals[cidx] = T::zero();
            y_markers[cidx] = LDL_UNUSED;
        }

        // dynamic pivot regularization
        regularize_pivot(
            &mut D[k],
            Dsigns[k],
            reg_limit,
            &mut bump_total,
            regularize_count,
        );
        if bump_total > bump_budget {
            return Err(LdlError::ExcessiveRegularization);
        }
        if D[k] == T::zero() {
            return Err(LdlError::ZeroPivot);
        }

        Dinv[k] = T::recip(D[k]);
    }

    if bump_total > bump_budget {
        return Err(LdlError::ExcessiveRegularization);
    }
    Ok(())
}

// Bump a pivot of the wrong sign or small modulus to sign·max(|d|, reg_limit),
// accumulating the applied correction.
fn regularize_pivot<T: FloatT>(
    d: &mut T,
    sign: i8,
    reg_limit: T,
    bump_total: &mut T,
    count: &mut usize,
) {
    let sign = T::from_i8(sign).unwrap();
    if *d * sign < reg_limit {
        let bumped = sign * T::max(T::abs(*d), reg_limit);
        *bump_total += T::abs(bumped - *d);
        *d = bumped;
        *count += 1;
    }
}

// Solves (L+I)x = b, with x replacing b
fn _lsolve<T: FloatT>(Lp: &[usize], Li: &[usize], Lx: &[T], x: &mut [T]) {
    for i in 0..x.len() {
        let xi = x[i];
        let (f, l) = (Lp[i], Lp[i + 1]);
        let Lx = &Lx[f..l];
        let Li = &Li[f..l];
        for (&Lij, &Lxj) in zip(Li, Lx) {
            x[Lij] -= Lxj * xi;
        }
    }
}

// Solves (L+I)'x = b, with x replacing b
fn _ltsolve<T: FloatT>(Lp: &[usize], Li: &[usize], Lx: &[T], x: &mut [T]) {
    for i in (0..x.len()).rev() {
        let mut s = T::zero();
        let (f, l) = (Lp[i], Lp[i + 1]);
        let Lx = &Lx[f..l];
        let Li = &Li[f..l];
        for (&Lij, &Lxj) in zip(Li, Lx) {
            s += Lxj * x[Lij];
        }
        x[i] -= s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_matrix_4x4() -> CscMatrix<f64> {
        // A = [ 4.  1.  0.  1.]
        //     [ 1.  5.  2.  0.]
        //     [ 0.  2. -3.  1.]
        //     [ 1.  0.  1. -2.]  (upper triangle stored)
        CscMatrix::new(
            4,
            4,
            vec![0, 1, 3, 5, 8],
            vec![0, 0, 1, 1, 2, 0, 2, 3],
            vec![4., 1., 5., 2., -3., 1., 1., -2.],
        )
    }

    #[test]
    fn test_ldl_solve() {
        let A = test_matrix_4x4();
        let signs = vec![1, 1, -1, -1];
        let mut ldl = LdlFactorization::new(&A, signs).unwrap();
        ldl.factor(&A, 1e-12).unwrap();
        assert_eq!(ldl.regularize_count(), 0);

        //solve against a known product.  symv gives b = A*x0
        let x0 = vec![1., -2., 3., -4.];
        let mut b = vec![0.; 4];
        A.symv_triu(&mut b, &x0, 1.0, 0.0);

        ldl.solve(&mut b);
        assert!(b.norm_inf_diff(&x0) < 1e-10);
    }

    #[test]
    fn test_ldl_refactor_with_updated_values() {
        let mut A = test_matrix_4x4();
        let signs = vec![1, 1, -1, -1];
        let mut ldl = LdlFactorization::new(&A, signs).unwrap();
        ldl.factor(&A, 1e-12).unwrap();

        //re-scale values in place and refactor on the same pattern
        A.nzval.scale(2.0);
        ldl.factor(&A, 1e-12).unwrap();

        let x0 = vec![0.5, 1.5, -2.5, 1.0];
        let mut b = vec![0.; 4];
        A.symv_triu(&mut b, &x0, 1.0, 0.0);
        ldl.solve(&mut b);
        assert!(b.norm_inf_diff(&x0) < 1e-10);
    }

    #[test]
    fn test_ldl_regularizes_zero_pivot() {
        // first pivot is structurally present but zero
        let A = CscMatrix::new(2, 2, vec![0, 1, 3], vec![0, 0, 1], vec![0., 1., 3.]);
        let mut ldl = LdlFactorization::new(&A, vec![1, -1]).unwrap();
        ldl.factor(&A, 1e-7).unwrap();
        assert_eq!(ldl.regularize_count(), 1);
        assert!(ldl.D[0] >= 1e-7);
        assert!(ldl.D[1] < 0.0);
    }

    #[test]
    fn test_ldl_gives_up_on_excessive_regularization() {
        // the (2,2) entry of the Schur complement flips sign so hard that
        // the correction exceeds the 1/reg_limit budget
        let A = CscMatrix::new(2, 2, vec![0, 1, 3], vec![0, 0, 1], vec![0., 1., 3.]);
        let mut ldl = LdlFactorization::new(&A, vec![1, 1]).unwrap();
        assert!(matches!(
            ldl.factor(&A, 1e-7),
            Err(LdlError::ExcessiveRegularization)
        ));
    }

    #[test]
    fn test_ldl_structure_errors() {
        //not square
        let A = CscMatrix::<f64>::zeros(2, 3);
        assert!(matches!(
            LdlFactorization::new(&A, vec![1, 1, 1]),
            Err(LdlError::NotSquare)
        ));

        //empty column
        let A = CscMatrix::new(2, 2, vec![0, 1, 1], vec![0], vec![1.0]);
        assert!(matches!(
            LdlFactorization::new(&A, vec![1, 1]),
            Err(LdlError::EmptyColumn)
        ));

        //not triu
        let A = CscMatrix::new(2, 2, vec![0, 2, 3], vec![0, 1, 1], vec![1., 2., 3.]);
        assert!(matches!(
            LdlFactorization::new(&A, vec![1, 1]),
            Err(LdlError::NotUpperTriangular)
        ));
    }
}
