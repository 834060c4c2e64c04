mod kkt;
mod ldl;
mod ordering;

pub use kkt::{KktMode, SparseKkt};
pub use ldl::{LdlError, LdlFactorization};
pub use ordering::{permute_sparse_symmetric, AmdOrdering, NaturalOrdering, Ordering};
