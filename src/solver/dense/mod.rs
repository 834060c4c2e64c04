mod kkt;

pub use kkt::DenseKkt;
