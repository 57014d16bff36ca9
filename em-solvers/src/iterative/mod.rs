//! Krylov subspace solvers

mod gmres;

pub use gmres::{GmresConfig, GmresSolution, gmres, gmres_preconditioned_with_guess};
