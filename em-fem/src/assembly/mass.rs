//! Coefficient-weighted mass, M_ij = Σ_e c_e ∫_e N_i N_j dΩ

use super::{TripletMatrix, collect_element_triplets};
use crate::basis::{Jacobian, p1_tetrahedron};
use crate::mesh::Mesh;
use crate::quadrature::gauss_tetrahedron;

fn element_mass(mesh: &Mesh, elem_idx: usize, coefficient: f64) -> Vec<(usize, usize, f64)> {
    if coefficient == 0.0 {
        return Vec::new();
    }
    let nodes = mesh.elements[elem_idx].nodes;
    let det = Jacobian::from_tet(&mesh.element_coords(elem_idx)).det.abs();

    let mut local = [[0.0; 4]; 4];
    for qp in gauss_tetrahedron(2) {
        let n = p1_tetrahedron(qp.xi(), qp.eta(), qp.zeta());
        for (i, row) in local.iter_mut().enumerate() {
            for (j, m_ij) in row.iter_mut().enumerate() {
                *m_ij += n[i] * n[j] * det * qp.weight;
            }
        }
    }

    let mut triplets = Vec::with_capacity(16);
    for i in 0..4 {
        for j in 0..4 {
            triplets.push((nodes[i], nodes[j], coefficient * local[i][j]));
        }
    }
    triplets
}

/// Mass matrix with a piecewise-constant coefficient per element
///
/// Elements with a zero coefficient contribute no entries.
pub fn assemble_weighted_mass(mesh: &Mesh, coefficients: &[f64]) -> TripletMatrix {
    assert_eq!(
        coefficients.len(),
        mesh.num_elements(),
        "one coefficient per element"
    );
    let triplets =
        collect_element_triplets(mesh.num_elements(), |e| element_mass(mesh, e, coefficients[e]));
    TripletMatrix::from_triplets(mesh.num_nodes(), triplets)
}
