//! ILU(0): incomplete LU restricted to the sparsity pattern of A

use crate::sparse::CsrMatrix;
use crate::traits::{ComplexField, Preconditioner};
use ndarray::Array1;
use num_traits::Float;

/// ILU(0) preconditioner
///
/// L (unit diagonal, strictly lower part) and U share one value array laid
/// out on the pattern of A.
#[derive(Debug, Clone)]
pub struct IluPreconditioner<T: ComplexField> {
    n: usize,
    values: Vec<T>,
    col_indices: Vec<usize>,
    row_ptrs: Vec<usize>,
    /// Position of the diagonal entry in each row, if stored
    diag_pos: Vec<Option<usize>>,
}

impl<T: ComplexField> IluPreconditioner<T> {
    /// Factorize in IKJ order. Pivots smaller than the smallest positive
    /// real are skipped, leaving the row unchanged for that column.
    pub fn from_csr(matrix: &CsrMatrix<T>) -> Self {
        let n = matrix.num_rows;
        let cols = &matrix.col_indices;
        let ptrs = &matrix.row_ptrs;
        let mut values = matrix.values.clone();

        let diag_pos: Vec<Option<usize>> = (0..n)
            .map(|i| {
                cols[ptrs[i]..ptrs[i + 1]]
                    .binary_search(&i)
                    .ok()
                    .map(|p| ptrs[i] + p)
            })
            .collect();

        let tiny = T::Real::min_positive_value();
        for i in 0..n {
            for idx in ptrs[i]..ptrs[i + 1] {
                let k = cols[idx];
                if k >= i {
                    break;
                }
                let Some(kk) = diag_pos[k] else { continue };
                let pivot = values[kk];
                if pivot.norm() <= tiny {
                    continue;
                }
                let l_ik = values[idx] * pivot.inv();
                values[idx] = l_ik;

                // a_ij -= l_ik * u_kj for j > k present in both rows
                let row_k = (kk + 1)..ptrs[k + 1];
                for j_idx in (idx + 1)..ptrs[i + 1] {
                    let j = cols[j_idx];
                    if let Ok(p) = cols[row_k.clone()].binary_search(&j) {
                        let u_kj = values[row_k.start + p];
                        values[j_idx] -= l_ik * u_kj;
                    }
                }
            }
        }

        Self {
            n,
            values,
            col_indices: cols.clone(),
            row_ptrs: ptrs.clone(),
            diag_pos,
        }
    }
}

impl<T: ComplexField> Preconditioner<T> for IluPreconditioner<T> {
    fn apply(&self, r: &Array1<T>) -> Array1<T> {
        assert_eq!(r.len(), self.n, "ILU: length mismatch");
        let mut y = r.to_vec();

        // L y = r
        for i in 0..self.n {
            let mut acc = y[i];
            for idx in self.row_ptrs[i]..self.row_ptrs[i + 1] {
                let j = self.col_indices[idx];
                if j >= i {
                    break;
                }
                acc -= self.values[idx] * y[j];
            }
            y[i] = acc;
        }

        // U z = y
        let tiny = T::Real::min_positive_value();
        for i in (0..self.n).rev() {
            let mut acc = y[i];
            let start = self.diag_pos[i].map_or(self.row_ptrs[i], |d| d + 1);
            for idx in start..self.row_ptrs[i + 1] {
                let j = self.col_indices[idx];
                if j > i {
                    acc -= self.values[idx] * y[j];
                }
            }
            y[i] = match self.diag_pos[i] {
                Some(d) if self.values[d].norm() > tiny => acc * self.values[d].inv(),
                _ => acc,
            };
        }

        Array1::from_vec(y)
    }
}
