//! Symmetric Gauss rules on the reference tetrahedron
//!
//! Reference tetrahedron: (0,0,0), (1,0,0), (0,1,0), (0,0,1), volume 1/6.

#[derive(Debug, Clone, Copy)]
pub struct QuadraturePoint {
    /// Reference coordinates (xi, eta, zeta)
    pub coords: [f64; 3],
    pub weight: f64,
}

impl QuadraturePoint {
    pub fn new_3d(xi: f64, eta: f64, zeta: f64, weight: f64) -> Self {
        Self {
            coords: [xi, eta, zeta],
            weight,
        }
    }

    #[inline]
    pub fn xi(&self) -> f64 {
        self.coords[0]
    }

    #[inline]
    pub fn eta(&self) -> f64 {
        self.coords[1]
    }

    #[inline]
    pub fn zeta(&self) -> f64 {
        self.coords[2]
    }
}

/// Tetrahedron rule exact for polynomials of degree `order` (1 or 2)
pub fn gauss_tetrahedron(order: usize) -> Vec<QuadraturePoint> {
    if order <= 1 {
        return vec![QuadraturePoint::new_3d(0.25, 0.25, 0.25, 1.0 / 6.0)];
    }
    let a = (5.0 - 5.0_f64.sqrt()) / 20.0;
    let b = (5.0 + 3.0 * 5.0_f64.sqrt()) / 20.0;
    let w = 1.0 / 24.0;
    vec![
        QuadraturePoint::new_3d(a, a, a, w),
        QuadraturePoint::new_3d(b, a, a, w),
        QuadraturePoint::new_3d(a, b, a, w),
        QuadraturePoint::new_3d(a, a, b, w),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weights_sum_to_reference_measure() {
        for order in 1..=2 {
            let tet: f64 = gauss_tetrahedron(order).iter().map(|q| q.weight).sum();
            assert_relative_eq!(tet, 1.0 / 6.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_tet_rule_integrates_quadratic() {
        // ∫ xi² over the reference tet = 1/60
        let integral: f64 = gauss_tetrahedron(2)
            .iter()
            .map(|q| q.xi() * q.xi() * q.weight)
            .sum();
        assert_relative_eq!(integral, 1.0 / 60.0, epsilon = 1e-14);
    }
}
