//! Quadrature rules on the reference tetrahedron

mod gauss;

pub use gauss::{QuadraturePoint, gauss_tetrahedron};
