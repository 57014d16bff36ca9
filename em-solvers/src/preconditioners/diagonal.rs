//! Jacobi preconditioner, M = diag(A)

use crate::sparse::CsrMatrix;
use crate::traits::{ComplexField, Preconditioner};
use ndarray::Array1;
use num_traits::Float;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Jacobi preconditioner; zero diagonal entries are left unscaled
#[derive(Debug, Clone)]
pub struct DiagonalPreconditioner<T: ComplexField> {
    inv_diag: Array1<T>,
}

impl<T: ComplexField> DiagonalPreconditioner<T> {
    pub fn from_csr(matrix: &CsrMatrix<T>) -> Self {
        let inv_diag = matrix.diagonal().mapv(|d| {
            if d.norm() > T::Real::min_positive_value() {
                d.inv()
            } else {
                T::one()
            }
        });
        Self { inv_diag }
    }
}

impl<T: ComplexField> Preconditioner<T> for DiagonalPreconditioner<T> {
    fn apply(&self, r: &Array1<T>) -> Array1<T> {
        assert_eq!(r.len(), self.inv_diag.len(), "Jacobi: length mismatch");

        #[cfg(feature = "rayon")]
        if let (Some(rs), Some(ds)) = (r.as_slice(), self.inv_diag.as_slice()) {
            let z: Vec<T> = rs
                .par_iter()
                .zip(ds.par_iter())
                .map(|(&ri, &di)| ri * di)
                .collect();
            return Array1::from_vec(z);
        }

        r * &self.inv_diag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_jacobi_scaling() {
        let a = CsrMatrix::from_triplets(3, 3, vec![(0, 0, 2.0_f64), (1, 1, -4.0), (2, 0, 1.0)]);
        let p = DiagonalPreconditioner::from_csr(&a);
        let z = p.apply(&array![2.0, 2.0, 5.0]);
        assert_relative_eq!(z[0], 1.0);
        assert_relative_eq!(z[1], -0.5);
        // missing diagonal falls back to identity
        assert_relative_eq!(z[2], 5.0);
    }
}
