//! Compressed Sparse Row matrix
//!
//! Row `i` owns the slice `row_ptrs[i]..row_ptrs[i + 1]` of `col_indices`
//! and `values`. Column indices within a row are sorted and unique.

use crate::traits::{ComplexField, LinearOperator};
use ndarray::{Array1, Array2};
use std::ops::Range;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Row count above which `matvec` switches to the rayon kernel
#[cfg(feature = "rayon")]
const PARALLEL_ROW_THRESHOLD: usize = 512;

/// Compressed Sparse Row matrix
#[derive(Debug, Clone)]
pub struct CsrMatrix<T: ComplexField> {
    pub num_rows: usize,
    pub num_cols: usize,
    /// Non-zero values in row-major order
    pub values: Vec<T>,
    /// Column index of each value
    pub col_indices: Vec<usize>,
    /// Start offsets of each row, with `row_ptrs[num_rows] == nnz`
    pub row_ptrs: Vec<usize>,
}

impl<T: ComplexField> CsrMatrix<T> {
    /// Empty matrix of the given shape
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        Self {
            num_rows,
            num_cols,
            values: Vec::new(),
            col_indices: Vec::new(),
            row_ptrs: vec![0; num_rows + 1],
        }
    }

    /// Build from COO triplets `(row, col, value)`; duplicates are summed.
    pub fn from_triplets(
        num_rows: usize,
        num_cols: usize,
        mut triplets: Vec<(usize, usize, T)>,
    ) -> Self {
        triplets.sort_unstable_by_key(|&(r, c, _)| (r, c));

        let mut values: Vec<T> = Vec::with_capacity(triplets.len());
        let mut col_indices: Vec<usize> = Vec::with_capacity(triplets.len());
        let mut row_counts = vec![0usize; num_rows];
        let mut last: Option<(usize, usize)> = None;

        for (row, col, val) in triplets {
            debug_assert!(row < num_rows && col < num_cols);
            if last == Some((row, col)) {
                if let Some(v) = values.last_mut() {
                    *v += val;
                }
                continue;
            }
            values.push(val);
            col_indices.push(col);
            row_counts[row] += 1;
            last = Some((row, col));
        }

        let mut row_ptrs = Vec::with_capacity(num_rows + 1);
        row_ptrs.push(0);
        let mut offset = 0;
        for count in row_counts {
            offset += count;
            row_ptrs.push(offset);
        }

        Self {
            num_rows,
            num_cols,
            values,
            col_indices,
            row_ptrs,
        }
    }

    /// Build from a dense matrix, keeping entries with |a_ij| > threshold
    pub fn from_dense(dense: &Array2<T>, threshold: T::Real) -> Self {
        let mut triplets = Vec::new();
        for ((i, j), &v) in dense.indexed_iter() {
            if v.norm() > threshold {
                triplets.push((i, j, v));
            }
        }
        Self::from_triplets(dense.nrows(), dense.ncols(), triplets)
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn row_range(&self, row: usize) -> Range<usize> {
        self.row_ptrs[row]..self.row_ptrs[row + 1]
    }

    /// `(col, value)` pairs of a row, in column order
    pub fn row_entries(&self, row: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let range = self.row_range(row);
        self.col_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    fn row_dot(&self, row: usize, x: &[T]) -> T {
        self.row_range(row).fold(T::zero(), |acc, idx| {
            acc + self.values[idx] * x[self.col_indices[idx]]
        })
    }

    /// y = A x
    pub fn matvec(&self, x: &Array1<T>) -> Array1<T> {
        assert_eq!(x.len(), self.num_cols, "matvec: input length mismatch");
        let x_owned;
        let xs = match x.as_slice() {
            Some(s) => s,
            None => {
                x_owned = x.to_vec();
                &x_owned
            }
        };

        #[cfg(feature = "rayon")]
        if self.num_rows >= PARALLEL_ROW_THRESHOLD {
            let y: Vec<T> = (0..self.num_rows)
                .into_par_iter()
                .map(|i| self.row_dot(i, xs))
                .collect();
            return Array1::from_vec(y);
        }

        Array1::from_iter((0..self.num_rows).map(|i| self.row_dot(i, xs)))
    }

    /// Entry (i, j), zero when not stored
    pub fn get(&self, i: usize, j: usize) -> T {
        let range = self.row_range(i);
        match self.col_indices[range.clone()].binary_search(&j) {
            Ok(pos) => self.values[range.start + pos],
            Err(_) => T::zero(),
        }
    }

    /// Main diagonal
    pub fn diagonal(&self) -> Array1<T> {
        let n = self.num_rows.min(self.num_cols);
        Array1::from_iter((0..n).map(|i| self.get(i, i)))
    }

    /// Dense copy, for small matrices and the direct solver
    pub fn to_dense(&self) -> Array2<T> {
        let mut dense = Array2::from_elem((self.num_rows, self.num_cols), T::zero());
        for i in 0..self.num_rows {
            for (j, v) in self.row_entries(i) {
                dense[[i, j]] = v;
            }
        }
        dense
    }
}

impl<T: ComplexField> LinearOperator<T> for CsrMatrix<T> {
    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn num_cols(&self) -> usize {
        self.num_cols
    }

    fn apply(&self, x: &Array1<T>) -> Array1<T> {
        self.matvec(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use num_complex::Complex64;

    #[test]
    fn test_from_triplets_sums_duplicates() {
        let triplets = vec![
            (1, 1, 2.0_f64),
            (0, 0, 1.0),
            (1, 1, 3.0),
            (0, 2, -1.0),
        ];
        let m = CsrMatrix::from_triplets(3, 3, triplets);
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.row_ptrs, vec![0, 2, 3, 3]);
        assert_relative_eq!(m.get(1, 1), 5.0);
        assert_relative_eq!(m.get(0, 2), -1.0);
        assert_relative_eq!(m.get(2, 2), 0.0);
    }

    #[test]
    fn test_matvec_matches_dense() {
        let dense = array![[4.0_f64, -1.0, 0.0], [-1.0, 4.0, -1.0], [0.0, -1.0, 4.0]];
        let m = CsrMatrix::from_dense(&dense, 0.0);
        let x = array![1.0, 2.0, 3.0];
        let y = m.matvec(&x);
        let expected = dense.dot(&x);
        for i in 0..3 {
            assert_relative_eq!(y[i], expected[i], epsilon = 1e-14);
        }
        assert_eq!(m.to_dense(), dense);
    }

    #[test]
    fn test_complex_diagonal() {
        let m = CsrMatrix::from_triplets(
            2,
            2,
            vec![
                (0, 0, Complex64::new(1.0, 1.0)),
                (1, 0, Complex64::new(2.0, 0.0)),
                (1, 1, Complex64::new(0.0, -3.0)),
            ],
        );
        let d = m.diagonal();
        assert_eq!(d[0], Complex64::new(1.0, 1.0));
        assert_eq!(d[1], Complex64::new(0.0, -3.0));
    }

    #[test]
    fn test_large_matvec_uses_all_rows() {
        let n = 1000;
        let triplets: Vec<_> = (0..n).map(|i| (i, i, (i + 1) as f64)).collect();
        let m = CsrMatrix::from_triplets(n, n, triplets);
        let y = m.apply(&Array1::from_elem(n, 1.0));
        assert_relative_eq!(y[0], 1.0);
        assert_relative_eq!(y[n - 1], n as f64);
    }
}
