//! Dense direct solvers

mod lu;

pub use lu::{LuError, LuFactorization, lu_factorize, lu_solve};
