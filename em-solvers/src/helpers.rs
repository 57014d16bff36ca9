//! Dense vector kernels used by the Krylov solvers

use crate::traits::ComplexField;
use ndarray::Array1;
use num_traits::{Float, Zero};

/// Inner product (x, y) = Σ conj(x_i) y_i
#[inline]
pub fn inner_product<T: ComplexField>(x: &Array1<T>, y: &Array1<T>) -> T {
    assert_eq!(x.len(), y.len(), "inner product length mismatch");
    x.iter()
        .zip(y.iter())
        .fold(T::zero(), |acc, (xi, yi)| acc + xi.conj() * *yi)
}

/// Squared 2-norm Σ |x_i|²
#[inline]
pub fn vector_norm_sqr<T: ComplexField>(x: &Array1<T>) -> T::Real {
    x.iter()
        .fold(T::Real::zero(), |acc, xi| acc + xi.norm_sqr())
}

/// 2-norm
#[inline]
pub fn vector_norm<T: ComplexField>(x: &Array1<T>) -> T::Real {
    Float::sqrt(vector_norm_sqr(x))
}

/// y += α x
#[inline]
pub fn axpy<T: ComplexField>(alpha: T, x: &Array1<T>, y: &mut Array1<T>) {
    for (xi, yi) in x.iter().zip(y.iter_mut()) {
        *yi += alpha * *xi;
    }
}
