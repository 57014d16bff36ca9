//! Dense LU factorization with partial pivoting

use crate::traits::ComplexField;
use ndarray::{Array1, Array2};
use num_traits::{Float, FromPrimitive, One, Zero};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LuError {
    #[error("Matrix is singular or nearly singular")]
    SingularMatrix,
    #[error("Matrix dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// PA = LU, with L unit lower triangular stored below the diagonal of `lu`
#[derive(Debug, Clone)]
pub struct LuFactorization<T: ComplexField> {
    pub lu: Array2<T>,
    /// `perm[i]` is the row of A that ended up in row i
    pub perm: Vec<usize>,
    pub n: usize,
}

impl<T: ComplexField> LuFactorization<T> {
    pub fn solve(&self, b: &Array1<T>) -> Result<Array1<T>, LuError> {
        if b.len() != self.n {
            return Err(LuError::DimensionMismatch {
                expected: self.n,
                got: b.len(),
            });
        }

        let mut x: Array1<T> = Array1::from_iter(self.perm.iter().map(|&p| b[p]));

        for i in 0..self.n {
            let mut acc = x[i];
            for j in 0..i {
                acc -= self.lu[[i, j]] * x[j];
            }
            x[i] = acc;
        }

        for i in (0..self.n).rev() {
            let mut acc = x[i];
            for j in (i + 1)..self.n {
                acc -= self.lu[[i, j]] * x[j];
            }
            x[i] = acc * self.lu[[i, i]].inv();
        }

        Ok(x)
    }
}

/// Factorize a square matrix. A pivot column whose largest magnitude is
/// below `n · ε · max|a_ij|` is reported as singular.
pub fn lu_factorize<T: ComplexField>(a: &Array2<T>) -> Result<LuFactorization<T>, LuError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(LuError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }

    let scale = a
        .iter()
        .fold(T::Real::zero(), |acc, v| Float::max(acc, v.norm()));
    let n_real = T::Real::from_usize(n.max(1)).unwrap_or_else(T::Real::one);
    let threshold = Float::max(
        scale * T::Real::epsilon() * n_real,
        T::Real::min_positive_value(),
    );

    let mut lu = a.clone();
    let mut perm: Vec<usize> = (0..n).collect();

    for k in 0..n {
        let (pivot_row, pivot_mag) = (k..n)
            .map(|i| (i, lu[[i, k]].norm()))
            .fold((k, T::Real::zero()), |best, cur| {
                if cur.1 > best.1 { cur } else { best }
            });

        if pivot_mag <= threshold {
            return Err(LuError::SingularMatrix);
        }

        if pivot_row != k {
            for j in 0..n {
                lu.swap([k, j], [pivot_row, j]);
            }
            perm.swap(k, pivot_row);
        }

        let inv_pivot = lu[[k, k]].inv();
        for i in (k + 1)..n {
            let mult = lu[[i, k]] * inv_pivot;
            lu[[i, k]] = mult;
            if mult.norm() == T::Real::zero() {
                continue;
            }
            for j in (k + 1)..n {
                let u_kj = lu[[k, j]];
                lu[[i, j]] -= mult * u_kj;
            }
        }
    }

    Ok(LuFactorization { lu, perm, n })
}

/// Factorize and solve in one call
pub fn lu_solve<T: ComplexField>(a: &Array2<T>, b: &Array1<T>) -> Result<Array1<T>, LuError> {
    lu_factorize(a)?.solve(b)
}
