//! Sparse matrix storage

mod csr;

pub use csr::CsrMatrix;
