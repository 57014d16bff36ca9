//! Load vector b_i = ∫ f N_i dΩ

use crate::basis::{Jacobian, p1_tetrahedron};
use crate::mesh::{Mesh, Point};
use crate::quadrature::gauss_tetrahedron;
use ndarray::Array1;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

fn element_load<F>(mesh: &Mesh, elem_idx: usize, source: &F) -> ([usize; 4], [f64; 4])
where
    F: Fn(&Point) -> f64,
{
    let coords = mesh.element_coords(elem_idx);
    let jac = Jacobian::from_tet(&coords);
    let det = jac.det.abs();

    let mut local = [0.0; 4];
    for qp in gauss_tetrahedron(2) {
        let x = jac.map_point(&coords[0], &qp.coords);
        let f = source(&Point::from(x));
        let n = p1_tetrahedron(qp.xi(), qp.eta(), qp.zeta());
        for (b, ni) in local.iter_mut().zip(n) {
            *b += f * ni * det * qp.weight;
        }
    }
    (mesh.elements[elem_idx].nodes, local)
}

/// Assemble the load vector of a scalar source
pub fn assemble_load<F>(mesh: &Mesh, source: F) -> Array1<f64>
where
    F: Fn(&Point) -> f64 + Sync,
{
    #[cfg(feature = "parallel")]
    let contributions: Vec<([usize; 4], [f64; 4])> = (0..mesh.num_elements())
        .into_par_iter()
        .map(|e| element_load(mesh, e, &source))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let contributions: Vec<([usize; 4], [f64; 4])> = (0..mesh.num_elements())
        .map(|e| element_load(mesh, e, &source))
        .collect();

    let mut rhs = Array1::zeros(mesh.num_nodes());
    for (nodes, local) in contributions {
        for (n, v) in nodes.into_iter().zip(local) {
            rhs[n] += v;
        }
    }
    rhs
}
