//! Gradient recovery for P1 fields
//!
//! P1 gradients are constant per element. Nodal values are recovered as the
//! volume-weighted average over the elements sharing each node.

use crate::basis::physical_gradients;
use crate::mesh::Mesh;
use ndarray::{Array1, Array2};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Gradient of `values` on one element, and the element volume
pub fn element_gradient(mesh: &Mesh, elem_idx: usize, values: &Array1<f64>) -> ([f64; 3], f64) {
    let (grads, volume) = physical_gradients(&mesh.element_coords(elem_idx));
    let nodes = &mesh.elements[elem_idx].nodes;
    let mut g = [0.0; 3];
    for (a, grad) in grads.iter().enumerate() {
        let u = values[nodes[a]];
        for d in 0..3 {
            g[d] += u * grad[d];
        }
    }
    (g, volume)
}

/// Gradient of `values` on every element
pub fn element_gradients(mesh: &Mesh, values: &Array1<f64>) -> Vec<[f64; 3]> {
    #[cfg(feature = "parallel")]
    let iter = (0..mesh.num_elements()).into_par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = 0..mesh.num_elements();

    iter.map(|e| element_gradient(mesh, e, values).0).collect()
}

/// Nodal gradient (N×3) by volume-weighted averaging of element gradients.
/// Nodes touched by no element get a zero gradient.
pub fn nodal_gradients(mesh: &Mesh, values: &Array1<f64>) -> Array2<f64> {
    let n = mesh.num_nodes();
    let mut sum = Array2::<f64>::zeros((n, 3));
    let mut weight = vec![0.0; n];

    for e in 0..mesh.num_elements() {
        let (g, volume) = element_gradient(mesh, e, values);
        for &node in &mesh.elements[e].nodes {
            weight[node] += volume;
            for d in 0..3 {
                sum[[node, d]] += volume * g[d];
            }
        }
    }

    for (node, w) in weight.iter().enumerate() {
        if *w > 0.0 {
            for d in 0..3 {
                sum[[node, d]] /= w;
            }
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Point, box_mesh_tetrahedra};
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_field_recovered_exactly() {
        let mesh = box_mesh_tetrahedra(0.0, 2.0, -1.0, 1.0, 0.0, 3.0, 3, 2, 4);
        let u = Array1::from_iter(mesh.nodes.iter().map(|p| 2.0 * p.x - p.y + 0.5 * p.z + 7.0));

        for g in element_gradients(&mesh, &u) {
            assert_relative_eq!(g[0], 2.0, epsilon = 1e-10);
            assert_relative_eq!(g[1], -1.0, epsilon = 1e-10);
            assert_relative_eq!(g[2], 0.5, epsilon = 1e-10);
        }

        let nodal = nodal_gradients(&mesh, &u);
        assert_eq!(nodal.dim(), (mesh.num_nodes(), 3));
        for row in nodal.rows() {
            assert_relative_eq!(row[0], 2.0, epsilon = 1e-10);
            assert_relative_eq!(row[1], -1.0, epsilon = 1e-10);
            assert_relative_eq!(row[2], 0.5, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_isolated_node_gets_zero() {
        let mut mesh = box_mesh_tetrahedra(0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1, 1, 1);
        let lone = mesh.add_node(Point::new(5.0, 5.0, 5.0));
        let u = Array1::from_iter(mesh.nodes.iter().map(|p| p.x));
        let nodal = nodal_gradients(&mesh, &u);
        assert_eq!(nodal.row(lone).to_vec(), vec![0.0, 0.0, 0.0]);
        assert_relative_eq!(nodal[[0, 0]], 1.0, epsilon = 1e-12);
    }
}
