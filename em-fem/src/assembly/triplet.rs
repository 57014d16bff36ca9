use ndarray::Array1;
use tower_em_solvers::CsrMatrix;

/// Sparse matrix in coordinate form; duplicate entries are summed on conversion
#[derive(Debug, Clone, Default)]
pub struct TripletMatrix {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    pub values: Vec<f64>,
    /// Square dimension
    pub dim: usize,
}

impl TripletMatrix {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            ..Default::default()
        }
    }

    pub fn from_triplets(dim: usize, triplets: Vec<(usize, usize, f64)>) -> Self {
        let mut m = Self::new(dim);
        m.rows.reserve(triplets.len());
        m.cols.reserve(triplets.len());
        m.values.reserve(triplets.len());
        for (i, j, v) in triplets {
            m.add(i, j, v);
        }
        m
    }

    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        self.rows.push(i);
        self.cols.push(j);
        self.values.push(value);
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Append `factor · other`; zero factors append nothing
    pub fn add_scaled(&mut self, other: &TripletMatrix, factor: f64) {
        assert_eq!(self.dim, other.dim, "triplet dimension mismatch");
        if factor == 0.0 {
            return;
        }
        self.rows.extend_from_slice(&other.rows);
        self.cols.extend_from_slice(&other.cols);
        self.values.extend(other.values.iter().map(|v| v * factor));
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .zip(&self.cols)
            .zip(&self.values)
            .map(|((&i, &j), &v)| (i, j, v))
    }

    pub fn to_csr(&self) -> CsrMatrix<f64> {
        CsrMatrix::from_triplets(self.dim, self.dim, self.iter().collect())
    }

    /// y = A x without compressing
    pub fn matvec(&self, x: &Array1<f64>) -> Array1<f64> {
        let mut y = Array1::zeros(self.dim);
        for (i, j, v) in self.iter() {
            y[i] += v * x[j];
        }
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_duplicates_sum_in_csr() {
        let mut m = TripletMatrix::new(2);
        m.add(0, 0, 1.0);
        m.add(0, 0, 2.0);
        m.add(1, 0, -1.0);
        assert_eq!(m.nnz(), 3);
        let csr = m.to_csr();
        assert_eq!(csr.nnz(), 2);
        assert_relative_eq!(csr.get(0, 0), 3.0);
        let y = m.matvec(&array![1.0, 5.0]);
        assert_relative_eq!(y[0], 3.0);
        assert_relative_eq!(y[1], -1.0);
    }

    #[test]
    fn test_add_scaled() {
        let mut a = TripletMatrix::from_triplets(2, vec![(0, 1, 1.0)]);
        let b = TripletMatrix::from_triplets(2, vec![(0, 1, 2.0), (1, 1, 4.0)]);
        a.add_scaled(&b, 0.5);
        a.add_scaled(&b, 0.0);
        let csr = a.to_csr();
        assert_relative_eq!(csr.get(0, 1), 2.0);
        assert_relative_eq!(csr.get(1, 1), 2.0);
        assert_eq!(a.nnz(), 3);
    }
}
