use thiserror::Error;

/// Ways a user-supplied CSC matrix can be malformed.
///
/// Returned by [`check_format`](crate::algebra::CscMatrix::check_format),
/// which callers are encouraged to run on hand-assembled matrices before
/// `setup`.
#[derive(Error, Debug)]
pub enum SparseFormatError {
    #[error("array lengths disagree with the stated shape")]
    WrongLengths,
    #[error("column pointers must be non-decreasing")]
    DecreasingColptr,
    #[error("row indices within a column must be strictly increasing")]
    UnsortedColumn,
    #[error("a row index is out of range for the stated row count")]
    RowIndexOutOfRange,
}
