//! Sparse linear solvers for the tower field simulation
//!
//! - **Sparse storage**: CSR with parallel matrix-vector products
//! - **Iterative**: restarted GMRES with right preconditioning
//! - **Preconditioners**: Jacobi, ILU(0)
//! - **Direct**: dense LU with partial pivoting, for small systems
//!
//! All kernels are generic over [`ComplexField`], so the same code runs on
//! the real block form of a complex system (`f64`) and on `Complex64`.
//!
//! # Example
//!
//! ```
//! use tower_em_solvers::{
//!     CsrMatrix, GmresConfig, IluPreconditioner, gmres_preconditioned_with_guess,
//! };
//! use ndarray::array;
//!
//! let a = CsrMatrix::from_triplets(2, 2, vec![(0, 0, 2.0), (0, 1, 1.0), (1, 1, 3.0)]);
//! let b = array![3.0, 3.0];
//! let ilu = IluPreconditioner::from_csr(&a);
//! let sol = gmres_preconditioned_with_guess(&a, &ilu, &b, None, &GmresConfig::default());
//! assert!(sol.converged);
//! ```

pub mod direct;
pub mod helpers;
pub mod iterative;
pub mod preconditioners;
pub mod sparse;
pub mod traits;

pub use sparse::CsrMatrix;
pub use traits::{ComplexField, IdentityPreconditioner, LinearOperator, Preconditioner};

pub use iterative::{GmresConfig, GmresSolution, gmres, gmres_preconditioned_with_guess};

pub use direct::{LuError, LuFactorization, lu_factorize, lu_solve};

pub use preconditioners::{DiagonalPreconditioner, IluPreconditioner};

/// Crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::version().is_empty());
    }
}
