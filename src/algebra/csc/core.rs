#![allow(non_snake_case)]

use crate::algebra::{FloatT, SparseFormatError};

/// Sparse matrix in standard Compressed Sparse Column (CSC) format
///
/// __Example usage__ : To construct the 3 x 3 matrix
/// ```text
/// A = [1.  3.  5.]
///     [2.  0.  6.]
///     [0.  4.  7.]
/// ```
///
/// ```no_run
/// use proxip::algebra::CscMatrix;
///
/// let A : CscMatrix<f64> = CscMatrix::new(
///    3,                                // m
///    3,                                // n
///    vec![0, 2, 4, 7],                 //colptr
///    vec![0, 1, 0, 2, 0, 1, 2],        //rowval
///    vec![1., 2., 3., 4., 5., 6., 7.], //nzval
///  );
///
/// // optional correctness check
/// assert!(A.check_format().is_ok());
///
/// ```

#[derive(Debug, Clone, PartialEq)]
pub struct CscMatrix<T = f64> {
    /// number of rows
    pub m: usize,
    /// number of columns
    pub n: usize,
    /// CSC format column pointer.
    ///
    /// This field should have length `n+1`. The last entry corresponds
    /// to the number of nonzeros and should agree with the lengths
    /// of the `rowval` and `nzval` fields.
    pub colptr: Vec<usize>,
    /// vector of row indices
    pub rowval: Vec<usize>,
    /// vector of non-zero matrix elements
    pub nzval: Vec<T>,
}

impl<T> CscMatrix<T>
where
    T: FloatT,
{
    /// `CscMatrix` constructor.
    ///
    /// # Panics
    /// Makes rudimentary dimensional compatibility checks and panics on
    /// failure.   This constructor does __not__ ensure that row indices
    /// are all in bounds or that data is arranged such that entries within
    /// each column appear in order of increasing row index.   Responsibility
    /// for ensuring these conditions hold is left to the caller.
    pub fn new(m: usize, n: usize, colptr: Vec<usize>, rowval: Vec<usize>, nzval: Vec<T>) -> Self {
        assert_eq!(rowval.len(), nzval.len());
        assert_eq!(colptr.len(), n + 1);
        assert_eq!(colptr[n], rowval.len());
        CscMatrix {
            m,
            n,
            colptr,
            rowval,
            nzval,
        }
    }

    /// allocate space for a sparse matrix with `nnz` elements
    pub fn spalloc(m: usize, n: usize, nnz: usize) -> Self {
        let mut colptr = vec![0; n + 1];
        let rowval = vec![0; nnz];
        let nzval = vec![T::zero(); nnz];
        colptr[n] = nnz;

        CscMatrix::new(m, n, colptr, rowval, nzval)
    }

    /// Identity matrix of size `n`
    pub fn identity(n: usize) -> Self {
        let colptr = (0usize..=n).collect();
        let rowval = (0usize..n).collect();
        let nzval = vec![T::one(); n];

        CscMatrix::new(n, n, colptr, rowval, nzval)
    }

    /// m x n matrix with no structural entries
    pub fn zeros(m: usize, n: usize) -> Self {
        CscMatrix::spalloc(m, n, 0)
    }

    /// number of nonzeros
    pub fn nnz(&self) -> usize {
        self.colptr[self.n]
    }

    /// number of rows
    pub fn nrows(&self) -> usize {
        self.m
    }

    /// number of columns
    pub fn ncols(&self) -> usize {
        self.n
    }

    /// true if the matrix is square
    pub fn is_square(&self) -> bool {
        self.m == self.n
    }

    /// Check that matrix data is correctly formatted.
    pub fn check_format(&self) -> Result<(), SparseFormatError> {
        if self.rowval.len() != self.nzval.len() {
            return Err(SparseFormatError::WrongLengths);
        }

        if self.colptr.is_empty()
            || (self.colptr.len() - 1) != self.n
            || self.colptr[self.n] != self.rowval.len()
        {
            return Err(SparseFormatError::WrongLengths);
        }

        //check for colptr monotonicity
        if self.colptr.windows(2).any(|c| c[0] > c[1]) {
            return Err(SparseFormatError::DecreasingColptr);
        }

        //check for rowval monotonicity within each column
        for col in 0..self.n {
            let rng = self.colptr[col]..self.colptr[col + 1];
            if self.rowval[rng].windows(2).any(|c| c[0] >= c[1]) {
                return Err(SparseFormatError::UnsortedColumn);
            }
        }
        //check for row values out of bounds
        if !self.rowval.iter().all(|r| r < &self.m) {
            return Err(SparseFormatError::RowIndexOutOfRange);
        }

        Ok(())
    }

    /// Allocates a new matrix containing only entries from the upper triangular part
    pub fn to_triu(&self) -> Self {
        assert_eq!(self.m, self.n);
        let (m, n) = (self.m, self.n);
        let mut colptr = vec![0; n + 1];
        let mut nnz = 0;

        //count the number of entries in the upper triangle
        //and place the totals into colptr

        for col in 0..n {
            //start / stop indices for the current column
            let first = self.colptr[col];
            let last = self.colptr[col + 1];
            let rows = &self.rowval[first..last];

            // number of entries on or above diagonal in this column,
            // shifted by 1 (i.e. colptr keeps a 0 in the first column)
            colptr[col + 1] = rows.iter().filter(|&row| *row <= col).count();
            nnz += colptr[col + 1];
        }

        //allocate and copy the upper triangle entries of
        //each column into the new value vector.
        //NB! : assumes that entries in each column have
        //monotonically increasing row numbers
        let mut rowval = vec![0; nnz];
        let mut nzval = vec![T::zero(); nnz];

        for col in 0..n {
            let ntriu = colptr[col + 1];

            //start / stop indices for the destination
            let fdest = colptr[col];
            let ldest = fdest + ntriu;

            //start / stop indices for the source
            let fsrc = self.colptr[col];
            let lsrc = fsrc + ntriu;

            //copy upper triangle values
            rowval[fdest..ldest].copy_from_slice(&self.rowval[fsrc..lsrc]);
            nzval[fdest..ldest].copy_from_slice(&self.nzval[fsrc..lsrc]);

            //this should now be cumsum of the counts
            colptr[col + 1] = ldest;
        }
        CscMatrix::new(m, n, colptr, rowval, nzval)
    }

    /// True if the matrix is upper triangular
    pub fn is_triu(&self) -> bool {
        // check lower triangle for any structural entries, regardless
        // of the values that may be assigned to them
        for col in 0..self.n {
            let first = self.colptr[col];
            let last = self.colptr[col + 1];
            let rows = &self.rowval[first..last];

            if rows.iter().any(|&row| row > col) {
                return false;
            }
        }
        true
    }

    /// Transpose into a newly allocated matrix, together with a map taking
    /// each entry position of `self` to its position in the transpose.
    ///
    /// The map allows subsequent value-only refreshes of the transpose from
    /// matrices with the pattern of `self`, without touching the structure.
    pub fn transpose_with_map(&self) -> (Self, Vec<usize>) {
        let (m, n) = (self.m, self.n);
        let mut At = CscMatrix::spalloc(n, m, self.nnz());
        let mut map = vec![0usize; self.nnz()];

        //count entries of each row of self, i.e. each column of At,
        //into the colptr of At (shifted by one)
        At.colptr.fill(0);
        for &row in self.rowval.iter() {
            At.colptr[row + 1] += 1;
        }
        for i in 0..m {
            At.colptr[i + 1] += At.colptr[i];
        }

        //next free slot in each transposed column
        let mut next = At.colptr[0..m].to_vec();

        for col in 0..n {
            for ptr in self.colptr[col]..self.colptr[col + 1] {
                let row = self.rowval[ptr];
                let dest = next[row];
                At.rowval[dest] = col;
                At.nzval[dest] = self.nzval[ptr];
                map[ptr] = dest;
                next[row] += 1;
            }
        }

        (At, map)
    }

    /// Returns the value at the given (row,col) index as an Option.
    /// Returns None if the given index is not a structural nonzero.
    ///
    /// # Panics
    /// Panics if the given index is out of bounds.
    pub fn get_entry(&self, idx: (usize, usize)) -> Option<T> {
        let (row, col) = idx;
        assert!(row < self.m && col < self.n);

        let first = self.colptr[col];
        let last = self.colptr[col + 1];
        let rows_in_this_column = &self.rowval[first..last];
        match rows_in_this_column.binary_search(&row) {
            Ok(idx) => Some(self.nzval[first + idx]),
            Err(_) => None,
        }
    }
}

/// Positions of the diagonal entries of a square triu matrix, as indices
/// into its `nzval` array.  Returns None for any column with no structural
/// diagonal entry.
pub(crate) fn triu_diag_positions<T: FloatT>(A: &CscMatrix<T>) -> Vec<Option<usize>> {
    assert!(A.is_square());
    let mut pos = vec![None; A.n];
    for col in 0..A.n {
        let first = A.colptr[col];
        let last = A.colptr[col + 1];
        //triu data with sorted rows puts any diagonal entry last in its column
        if last > first && A.rowval[last - 1] == col {
            pos[col] = Some(last - 1);
        }
    }
    pos
}

#[test]
fn test_csc_transpose_with_map() {
    // A = [1.  3.  5.]
    //     [2.  0.  6.]
    //     [0.  4.  7.]
    let A = CscMatrix::new(
        3,
        3,
        vec![0, 2, 4, 7],
        vec![0, 1, 0, 2, 0, 1, 2],
        vec![1., 2., 3., 4., 5., 6., 7.],
    );

    let (At, map) = A.transpose_with_map();
    assert!(At.check_format().is_ok());
    assert_eq!(At.get_entry((0, 0)).unwrap(), 1.);
    assert_eq!(At.get_entry((0, 1)).unwrap(), 2.);
    assert_eq!(At.get_entry((1, 0)).unwrap(), 3.);
    assert_eq!(At.get_entry((2, 2)).unwrap(), 7.);
    assert_eq!(At.get_entry((1, 1)), None);

    //map sends each entry of A to the same value in At
    for (ptr, &dest) in map.iter().enumerate() {
        assert_eq!(A.nzval[ptr], At.nzval[dest]);
    }

    let mut roundtrip = std::iter::zip(&map, &A.nzval).collect::<Vec<_>>();
    roundtrip.sort_by_key(|(dest, _)| **dest);
    let vals: Vec<f64> = roundtrip.iter().map(|(_, &v)| v).collect();
    assert_eq!(vals, At.nzval);
}

#[test]
fn test_csc_to_triu() {
    let A = CscMatrix::new(
        2,
        2,
        vec![0, 2, 4],
        vec![0, 1, 0, 1],
        vec![4., 1., 1., 2.],
    );
    let B = A.to_triu();
    assert!(B.is_triu());
    assert_eq!(B.nnz(), 3);
    assert_eq!(B.get_entry((0, 0)).unwrap(), 4.);
    assert_eq!(B.get_entry((0, 1)).unwrap(), 1.);
    assert_eq!(B.get_entry((1, 1)).unwrap(), 2.);
}
