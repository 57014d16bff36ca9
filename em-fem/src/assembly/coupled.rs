//! Real block form of a complex linear system
//!
//! (A + iB)(φr + iφi) = fr + i·fi is stored with interleaved unknowns
//! `[φr₀, φi₀, φr₁, φi₁, …]`:
//!
//! ```text
//! row 2k   :  A φr − B φi = fr
//! row 2k+1 :  B φr + A φi = fi
//! ```

use super::TripletMatrix;
use ndarray::Array1;

/// Assembled coupled system ready for boundary conditions and solving
#[derive(Debug, Clone)]
pub struct CoupledProblem {
    pub matrix: TripletMatrix,
    pub rhs: Array1<f64>,
    /// Number of mesh nodes; the system has twice as many unknowns
    pub num_nodes: usize,
}

impl CoupledProblem {
    pub fn from_blocks(
        a: &TripletMatrix,
        b: &TripletMatrix,
        rhs_real: &Array1<f64>,
        rhs_imag: &Array1<f64>,
    ) -> Self {
        let n = a.dim;
        assert_eq!(b.dim, n, "block dimension mismatch");
        assert_eq!(rhs_real.len(), n, "real load length mismatch");
        assert_eq!(rhs_imag.len(), n, "imaginary load length mismatch");

        let mut matrix = TripletMatrix::new(2 * n);
        let reserve = 2 * (a.nnz() + b.nnz());
        matrix.rows.reserve(reserve);
        matrix.cols.reserve(reserve);
        matrix.values.reserve(reserve);

        for (i, j, v) in a.iter() {
            matrix.add(2 * i, 2 * j, v);
            matrix.add(2 * i + 1, 2 * j + 1, v);
        }
        for (i, j, v) in b.iter() {
            matrix.add(2 * i, 2 * j + 1, -v);
            matrix.add(2 * i + 1, 2 * j, v);
        }

        Self {
            matrix,
            rhs: interleave(rhs_real, rhs_imag),
            num_nodes: n,
        }
    }

    pub fn num_dofs(&self) -> usize {
        2 * self.num_nodes
    }
}

/// Interleave two node fields into `[r₀, i₀, r₁, i₁, …]`
pub fn interleave(real: &Array1<f64>, imag: &Array1<f64>) -> Array1<f64> {
    Array1::from_iter(real.iter().zip(imag).flat_map(|(&r, &i)| [r, i]))
}

/// Split an interleaved vector into its real and imaginary node fields
pub fn deinterleave(x: &Array1<f64>) -> (Array1<f64>, Array1<f64>) {
    let real = Array1::from_iter(x.iter().step_by(2).copied());
    let imag = Array1::from_iter(x.iter().skip(1).step_by(2).copied());
    (real, imag)
}
