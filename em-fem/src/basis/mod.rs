//! Linear Lagrange basis on tetrahedra

mod lagrange;
mod shape;

pub use lagrange::{p1_tetrahedron, p1_tetrahedron_grad};
pub use shape::{Jacobian, physical_gradients, tet_volume};
