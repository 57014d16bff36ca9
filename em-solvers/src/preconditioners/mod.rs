//! Preconditioners for the Krylov solvers

mod diagonal;
mod ilu;

pub use crate::traits::IdentityPreconditioner;
pub use diagonal::DiagonalPreconditioner;
pub use ilu::IluPreconditioner;
