//! Reference-to-physical mapping for linear tetrahedra

use super::lagrange::p1_tetrahedron_grad;

/// Affine map Jacobian J[r][c] = ∂x_r/∂ξ_c
#[derive(Debug, Clone, Copy)]
pub struct Jacobian {
    pub matrix: [[f64; 3]; 3],
    pub det: f64,
    pub inverse: [[f64; 3]; 3],
}

impl Jacobian {
    /// Jacobian of the map defined by the four vertex coordinates
    pub fn from_tet(coords: &[[f64; 3]; 4]) -> Self {
        let grads = p1_tetrahedron_grad();
        let mut j = [[0.0; 3]; 3];
        for (g, x) in grads.iter().zip(coords) {
            for r in 0..3 {
                for c in 0..3 {
                    j[r][c] += g[c] * x[r];
                }
            }
        }

        let det = j[0][0] * (j[1][1] * j[2][2] - j[1][2] * j[2][1])
            - j[0][1] * (j[1][0] * j[2][2] - j[1][2] * j[2][0])
            + j[0][2] * (j[1][0] * j[2][1] - j[1][1] * j[2][0]);
        let inv_det = 1.0 / det;

        let inverse = [
            [
                (j[1][1] * j[2][2] - j[1][2] * j[2][1]) * inv_det,
                (j[0][2] * j[2][1] - j[0][1] * j[2][2]) * inv_det,
                (j[0][1] * j[1][2] - j[0][2] * j[1][1]) * inv_det,
            ],
            [
                (j[1][2] * j[2][0] - j[1][0] * j[2][2]) * inv_det,
                (j[0][0] * j[2][2] - j[0][2] * j[2][0]) * inv_det,
                (j[0][2] * j[1][0] - j[0][0] * j[1][2]) * inv_det,
            ],
            [
                (j[1][0] * j[2][1] - j[1][1] * j[2][0]) * inv_det,
                (j[0][1] * j[2][0] - j[0][0] * j[2][1]) * inv_det,
                (j[0][0] * j[1][1] - j[0][1] * j[1][0]) * inv_det,
            ],
        ];

        Self {
            matrix: j,
            det,
            inverse,
        }
    }

    /// ∇_x N = J⁻ᵀ ∇_ξ N
    pub fn transform_gradient(&self, grad_ref: &[f64; 3]) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (i, o) in out.iter_mut().enumerate() {
            *o = (0..3).map(|j| self.inverse[j][i] * grad_ref[j]).sum();
        }
        out
    }

    /// Map a reference point to physical coordinates given vertex 0
    pub fn map_point(&self, origin: &[f64; 3], xi: &[f64; 3]) -> [f64; 3] {
        let mut x = *origin;
        for (r, xr) in x.iter_mut().enumerate() {
            *xr += (0..3).map(|c| self.matrix[r][c] * xi[c]).sum::<f64>();
        }
        x
    }
}

/// Unsigned volume of a tetrahedron
pub fn tet_volume(coords: &[[f64; 3]; 4]) -> f64 {
    Jacobian::from_tet(coords).det.abs() / 6.0
}

/// Physical gradients of the four P1 shape functions and the element volume
pub fn physical_gradients(coords: &[[f64; 3]; 4]) -> ([[f64; 3]; 4], f64) {
    let jac = Jacobian::from_tet(coords);
    let grads = p1_tetrahedron_grad().map(|g| jac.transform_gradient(&g));
    (grads, jac.det.abs() / 6.0)
}
