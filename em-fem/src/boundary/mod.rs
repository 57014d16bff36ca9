//! Boundary conditions on tagged faces
//!
//! - Dirichlet: complex value imposed on both components of the coupled system
//! - Robin: α u + β ∂u/∂n = 0, added to the real operator block

mod dirichlet;
mod robin;

pub use dirichlet::{DirichletBC, apply_dirichlet, dirichlet_values};
pub use robin::{RobinBC, apply_robin};
