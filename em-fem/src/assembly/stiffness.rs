//! Coefficient-weighted stiffness, K_ij = Σ_e c_e ∫_e ∇N_i · ∇N_j dΩ

use super::{TripletMatrix, collect_element_triplets};
use crate::basis::physical_gradients;
use crate::mesh::Mesh;

fn element_stiffness(mesh: &Mesh, elem_idx: usize, coefficient: f64) -> Vec<(usize, usize, f64)> {
    let nodes = mesh.elements[elem_idx].nodes;
    let (grads, volume) = physical_gradients(&mesh.element_coords(elem_idx));

    let mut triplets = Vec::with_capacity(16);
    for i in 0..4 {
        for j in 0..4 {
            let dot: f64 = (0..3).map(|d| grads[i][d] * grads[j][d]).sum();
            let value = coefficient * dot * volume;
            if value != 0.0 {
                triplets.push((nodes[i], nodes[j], value));
            }
        }
    }
    triplets
}

/// Stiffness matrix with a piecewise-constant coefficient per element
pub fn assemble_weighted_stiffness(mesh: &Mesh, coefficients: &[f64]) -> TripletMatrix {
    assert_eq!(
        coefficients.len(),
        mesh.num_elements(),
        "one coefficient per element"
    );
    let triplets = collect_element_triplets(mesh.num_elements(), |e| {
        element_stiffness(mesh, e, coefficients[e])
    });
    TripletMatrix::from_triplets(mesh.num_nodes(), triplets)
}
