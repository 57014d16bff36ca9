//! Core traits shared by the solvers
//!
//! - [`ComplexField`]: scalar types the solvers operate on (real or complex)
//! - [`LinearOperator`]: anything that can apply y = A x
//! - [`Preconditioner`]: approximate inverse applied to residuals

use ndarray::Array1;
use num_complex::Complex64;
use num_traits::{Float, FromPrimitive, NumAssign, One, ToPrimitive, Zero};
use std::fmt::Debug;
use std::ops::Neg;

/// Scalar type usable by the Krylov solvers and factorizations.
///
/// Implemented for `f64` (coupled real systems) and `Complex64`
/// (native complex systems).
pub trait ComplexField:
    NumAssign + Clone + Copy + Send + Sync + Debug + Zero + One + Neg<Output = Self> + 'static
{
    /// Underlying real type
    type Real: Float + NumAssign + FromPrimitive + ToPrimitive + Send + Sync + Debug + 'static;

    /// Complex conjugate
    fn conj(&self) -> Self;

    /// Squared magnitude |z|²
    fn norm_sqr(&self) -> Self::Real;

    /// Magnitude |z|
    fn norm(&self) -> Self::Real {
        self.norm_sqr().sqrt()
    }

    /// Embed a real value
    fn from_real(r: Self::Real) -> Self;

    /// Multiplicative inverse
    fn inv(&self) -> Self;
}

impl ComplexField for Complex64 {
    type Real = f64;

    #[inline]
    fn conj(&self) -> Self {
        Complex64::conj(self)
    }

    #[inline]
    fn norm_sqr(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    #[inline]
    fn from_real(r: f64) -> Self {
        Complex64::new(r, 0.0)
    }

    #[inline]
    fn inv(&self) -> Self {
        let denom = ComplexField::norm_sqr(self);
        Complex64::new(self.re / denom, -self.im / denom)
    }
}

impl ComplexField for f64 {
    type Real = f64;

    #[inline]
    fn conj(&self) -> Self {
        *self
    }

    #[inline]
    fn norm_sqr(&self) -> f64 {
        *self * *self
    }

    #[inline]
    fn from_real(r: f64) -> Self {
        r
    }

    #[inline]
    fn inv(&self) -> Self {
        1.0 / *self
    }
}

/// Matrix-like object that can perform matrix-vector products
pub trait LinearOperator<T: ComplexField>: Send + Sync {
    /// Number of rows
    fn num_rows(&self) -> usize;

    /// Number of columns
    fn num_cols(&self) -> usize;

    /// y = A x
    fn apply(&self, x: &Array1<T>) -> Array1<T>;

    /// Whether the operator is square
    fn is_square(&self) -> bool {
        self.num_rows() == self.num_cols()
    }
}

/// Preconditioner M ≈ A, applied as M⁻¹ r
pub trait Preconditioner<T: ComplexField>: Send + Sync {
    /// z = M⁻¹ r
    fn apply(&self, r: &Array1<T>) -> Array1<T>;
}

/// No-op preconditioner
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPreconditioner;

impl<T: ComplexField> Preconditioner<T> for IdentityPreconditioner {
    fn apply(&self, r: &Array1<T>) -> Array1<T> {
        r.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_complex_inverse() {
        let z = Complex64::new(3.0, 4.0);
        let product = z * ComplexField::inv(&z);
        assert_relative_eq!(product.re, 1.0, epsilon = 1e-14);
        assert_relative_eq!(product.im, 0.0, epsilon = 1e-14);
        assert_relative_eq!(ComplexField::norm(&z), 5.0, epsilon = 1e-14);
    }

    #[test]
    fn test_real_field() {
        let x = -2.0_f64;
        assert_eq!(ComplexField::conj(&x), -2.0);
        assert_relative_eq!(ComplexField::norm(&x), 2.0);
        assert_relative_eq!(ComplexField::inv(&x), -0.5);
    }

    #[test]
    fn test_identity_preconditioner() {
        let r = Array1::from(vec![1.0_f64, -2.0, 3.0]);
        let z = Preconditioner::<f64>::apply(&IdentityPreconditioner, &r);
        assert_eq!(z, r);
    }
}
