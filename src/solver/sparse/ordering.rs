#![allow(non_snake_case)]

use crate::algebra::*;
use std::cmp::{max, min};

/// Fill-reducing symmetric orderings for the sparse KKT system.
///
/// An ordering is initialized from the upper triangular pattern of a
/// symmetric matrix and yields a permutation `perm` (elimination order,
/// new position to old index) together with its inverse `iperm`.
pub trait Ordering: Default {
    fn init(&mut self, n: usize, colptr: &[usize], rowval: &[usize]);
    fn perm(&self) -> &[usize];
    fn iperm(&self) -> &[usize];
}

/// The identity ordering, for problems whose structure is already
/// factorization friendly.
#[derive(Debug, Default)]
pub struct NaturalOrdering {
    perm: Vec<usize>,
    iperm: Vec<usize>,
}

impl Ordering for NaturalOrdering {
    fn init(&mut self, n: usize, _colptr: &[usize], _rowval: &[usize]) {
        self.perm = (0..n).collect();
        self.iperm = (0..n).collect();
    }

    fn perm(&self) -> &[usize] {
        &self.perm
    }
    fn iperm(&self) -> &[usize] {
        &self.iperm
    }
}

/// Minimum degree ordering on the symmetric pattern.
///
/// Vertices are eliminated in order of current degree in the elimination
/// graph, with ties broken by smallest vertex index, and the neighborhood
/// of each eliminated vertex turned into a clique.
#[derive(Debug, Default)]
pub struct AmdOrdering {
    perm: Vec<usize>,
    iperm: Vec<usize>,
}

impl Ordering for AmdOrdering {
    fn init(&mut self, n: usize, colptr: &[usize], rowval: &[usize]) {
        //symmetric adjacency (diagonal excluded) from the triu pattern
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        for col in 0..n {
            for &row in rowval.iter().take(colptr[col + 1]).skip(colptr[col]) {
                if row != col {
                    adj[row].push(col);
                    adj[col].push(row);
                }
            }
        }
        for nbrs in adj.iter_mut() {
            nbrs.sort_unstable();
            nbrs.dedup();
        }

        let mut alive = vec![true; n];
        self.perm = Vec::with_capacity(n);
        self.iperm = vec![0; n];

        for _ in 0..n {
            //smallest index among minimum degree vertices
            let mut pivot = usize::MAX;
            let mut best = usize::MAX;
            for (v, nbrs) in adj.iter().enumerate() {
                if alive[v] && nbrs.len() < best {
                    best = nbrs.len();
                    pivot = v;
                }
            }

            //connect the neighborhood of the pivot into a clique
            let nbrs = std::mem::take(&mut adj[pivot]);
            for (i, &a) in nbrs.iter().enumerate() {
                for &b in nbrs.iter().skip(i + 1) {
                    if let Err(pos) = adj[a].binary_search(&b) {
                        adj[a].insert(pos, b);
                        let pos = adj[b].binary_search(&a).unwrap_err();
                        adj[b].insert(pos, a);
                    }
                }
            }

            //remove the pivot from the graph
            for &a in nbrs.iter() {
                if let Ok(pos) = adj[a].binary_search(&pivot) {
                    adj[a].remove(pos);
                }
            }
            alive[pivot] = false;
            self.perm.push(pivot);
        }

        for (new, &old) in self.perm.iter().enumerate() {
            self.iperm[old] = new;
        }
    }

    fn perm(&self) -> &[usize] {
        &self.perm
    }
    fn iperm(&self) -> &[usize] {
        &self.iperm
    }
}

/// Given a sparse symmetric matrix `A` (upper triangular entries only),
/// return the permuted sparse symmetric matrix `P = π A πᵀ` (also upper
/// triangular, with row-sorted columns) for the inverse permutation
/// `iperm`, together with the map taking each stored entry position of `A`
/// to its position in `P`.
///
/// The map lets numeric updates flow into the permuted matrix without
/// recomputing positions.
pub fn permute_sparse_symmetric<T: FloatT>(
    A: &CscMatrix<T>,
    iperm: &[usize],
) -> (CscMatrix<T>, Vec<usize>) {
    let n = A.ncols();
    let mut P = CscMatrix::<T>::spalloc(n, n, A.nnz());
    let mut AtoPAPt = vec![0; A.nnz()];

    _permute_symmetric_inner(
        A,
        &mut AtoPAPt,
        iperm,
        &mut P.rowval,
        &mut P.colptr,
        &mut P.nzval,
    );
    _sort_columns(&mut P, &mut AtoPAPt);
    (P, AtoPAPt)
}

// the main placement pass, following the book:
// Timothy Davis - Direct Methods for Sparse Linear Systems
fn _permute_symmetric_inner<T: FloatT>(
    A: &CscMatrix<T>,
    AtoPAPt: &mut [usize],
    iperm: &[usize],
    Pr: &mut [usize],
    Pc: &mut [usize],
    Pv: &mut [T],
) {
    // 1. count number of entries that each column of P will have
    let n = A.nrows();
    let mut num_entries = vec![0; n];
    let Ar = &A.rowval;
    let Ac = &A.colptr;
    let Av = &A.nzval;

    // count the number of upper-triangle entries in columns of P,
    // keeping in mind the row permutation
    for colA in 0..n {
        let colP = iperm[colA];
        // loop over entries of A in column A...
        for rowA in Ar.iter().take(Ac[colA + 1]).skip(Ac[colA]) {
            let rowP = iperm[*rowA];
            // ...and check if entry is upper triangular
            if *rowA <= colA {
                // determine to which column the entry belongs after permutation
                let col_idx = max(rowP, colP);
                num_entries[col_idx] += 1;
            }
        }
    }

    // 2. calculate permuted Pc = P.colptr from number of entries
    // Pc is one longer than num_entries here.
    Pc[0] = 0;
    let mut acc = 0;
    for (Pckp1, ne) in std::iter::zip(&mut Pc[1..], &num_entries) {
        *Pckp1 = acc + ne;
        acc = *Pckp1;
    }
    // reuse this memory to keep track of free entries in rowval
    num_entries.copy_from_slice(&Pc[0..n]);

    // use alias
    let mut row_starts = num_entries;

    // 3. permute the row entries and position of corresponding nzval
    for colA in 0..n {
        let colP = iperm[colA];
        // loop over rows of A and determine where each row entry of A should be stored
        for rowA_idx in Ac[colA]..Ac[colA + 1] {
            let rowA = Ar[rowA_idx];
            // check if upper triangular
            if rowA <= colA {
                let rowP = iperm[rowA];
                // determine column to store the entry
                let col_idx = max(colP, rowP);

                // find next free location in rowval (this results in
                // unordered columns in the rowval)
                let rowP_idx = row_starts[col_idx];

                // store rowval and nzval
                Pr[rowP_idx] = min(colP, rowP);
                Pv[rowP_idx] = Av[rowA_idx];

                //record this into the mapping vector
                AtoPAPt[rowA_idx] = rowP_idx;

                // increment next free location
                row_starts[col_idx] += 1;
            }
        }
    }
}

// restore row-sorted columns after the placement pass, carrying the
// entry map along with the reordering
fn _sort_columns<T: FloatT>(P: &mut CscMatrix<T>, AtoPAPt: &mut [usize]) {
    let mut posmap = vec![0usize; P.nnz()];
    let mut scratch: Vec<(usize, T, usize)> = Vec::with_capacity(P.nrows());

    for col in 0..P.ncols() {
        let (first, last) = (P.colptr[col], P.colptr[col + 1]);

        scratch.clear();
        for ptr in first..last {
            scratch.push((P.rowval[ptr], P.nzval[ptr], ptr));
        }
        scratch.sort_unstable_by_key(|&(row, _, _)| row);

        for (offset, &(row, val, old_ptr)) in scratch.iter().enumerate() {
            let new_ptr = first + offset;
            P.rowval[new_ptr] = row;
            P.nzval[new_ptr] = val;
            posmap[old_ptr] = new_ptr;
        }
    }

    for dest in AtoPAPt.iter_mut() {
        *dest = posmap[*dest];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_4x4() -> CscMatrix<f64> {
        // 1 0 2 3
        // 0 4 0 5
        // 0 0 6 0
        // 0 0 0 7
        CscMatrix::new(
            4,
            4,
            vec![0, 1, 2, 4, 7],
            vec![0, 1, 0, 2, 0, 1, 3],
            vec![1., 4., 2., 6., 3., 5., 7.],
        )
    }

    #[test]
    fn test_natural_ordering_is_identity() {
        let A = pattern_4x4();
        let mut ordering = NaturalOrdering::default();
        ordering.init(A.ncols(), &A.colptr, &A.rowval);
        assert_eq!(ordering.perm(), &[0, 1, 2, 3]);
        assert_eq!(ordering.iperm(), &[0, 1, 2, 3]);

        let (C, map) = permute_sparse_symmetric(&A, ordering.iperm());
        assert_eq!(C, A);
        assert_eq!(map, (0..A.nnz()).collect::<Vec<_>>());
    }

    #[test]
    fn test_amd_ordering() {
        let A = pattern_4x4();
        let mut ordering = AmdOrdering::default();
        ordering.init(A.ncols(), &A.colptr, &A.rowval);
        assert_eq!(ordering.perm(), &[1, 2, 0, 3]);

        let (C, map) = permute_sparse_symmetric(&A, ordering.iperm());

        let C_expect = CscMatrix::new(
            4,
            4,
            vec![0, 1, 2, 4, 7],
            vec![0, 1, 1, 2, 0, 2, 3],
            vec![4., 6., 2., 1., 5., 3., 7.],
        );
        assert_eq!(C, C_expect);
        assert_eq!(map, vec![3, 0, 2, 1, 5, 4, 6]);
    }

    #[test]
    fn test_permute_roundtrip() {
        let A = pattern_4x4();
        let mut ordering = AmdOrdering::default();
        ordering.init(A.ncols(), &A.colptr, &A.rowval);

        let (C, _) = permute_sparse_symmetric(&A, ordering.iperm());

        //permuting C by the inverse ordering must reproduce A
        let (B, _) = permute_sparse_symmetric(&C, ordering.perm());
        assert_eq!(B, A);
    }
}
