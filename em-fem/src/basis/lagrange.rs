/// P1 shape functions on the reference tetrahedron
pub fn p1_tetrahedron(xi: f64, eta: f64, zeta: f64) -> [f64; 4] {
    [1.0 - xi - eta - zeta, xi, eta, zeta]
}

/// Reference gradients of the P1 tetrahedron shape functions (constant)
pub fn p1_tetrahedron_grad() -> [[f64; 3]; 4] {
    [
        [-1.0, -1.0, -1.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ]
}
