//! Dirichlet (essential) conditions by row and column elimination

use crate::assembly::{CoupledProblem, TripletMatrix};
use crate::mesh::{Mesh, Point};
use num_complex::Complex64;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

type ValueFn = dyn Fn(&Point) -> Complex64 + Send + Sync;

/// Complex value u = g imposed on every node of faces with `tag`
#[derive(Clone)]
pub struct DirichletBC {
    pub tag: i32,
    value_fn: Arc<ValueFn>,
}

impl std::fmt::Debug for DirichletBC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirichletBC").field("tag", &self.tag).finish()
    }
}

impl DirichletBC {
    pub fn new<F>(tag: i32, value_fn: F) -> Self
    where
        F: Fn(&Point) -> Complex64 + Send + Sync + 'static,
    {
        Self {
            tag,
            value_fn: Arc::new(value_fn),
        }
    }

    /// Spatially constant value
    pub fn constant(tag: i32, value: Complex64) -> Self {
        Self::new(tag, move |_| value)
    }

    pub fn value(&self, p: &Point) -> Complex64 {
        (self.value_fn)(p)
    }

    pub fn boundary_nodes(&self, mesh: &Mesh) -> BTreeSet<usize> {
        mesh.nodes_with_marker(self.tag)
    }
}

/// Value of every constrained node. A node shared by several tags keeps
/// the value of the first condition in `bcs`.
pub fn dirichlet_values(mesh: &Mesh, bcs: &[DirichletBC]) -> BTreeMap<usize, Complex64> {
    let mut values = BTreeMap::new();
    for bc in bcs {
        for node in bc.boundary_nodes(mesh) {
            values
                .entry(node)
                .or_insert_with(|| bc.value(&mesh.nodes[node]));
        }
    }
    values
}

/// Impose the conditions on a coupled problem.
///
/// For node k with value g, rows 2k and 2k+1 become identity rows with
/// right-hand sides Re g and Im g. Their columns are removed from the
/// other rows and moved to the right-hand side. Returns the imposed values.
pub fn apply_dirichlet(
    problem: &mut CoupledProblem,
    mesh: &Mesh,
    bcs: &[DirichletBC],
) -> BTreeMap<usize, Complex64> {
    let values = dirichlet_values(mesh, bcs);
    let num_dofs = problem.num_dofs();

    let mut fixed: Vec<Option<f64>> = vec![None; num_dofs];
    for (&node, g) in &values {
        fixed[2 * node] = Some(g.re);
        fixed[2 * node + 1] = Some(g.im);
    }

    let old = std::mem::take(&mut problem.matrix);
    let mut matrix = TripletMatrix::new(num_dofs);
    for (i, j, v) in old.iter() {
        match (fixed[i], fixed[j]) {
            (Some(_), _) => {}
            (None, Some(g)) => problem.rhs[i] -= v * g,
            (None, None) => matrix.add(i, j, v),
        }
    }
    for (dof, g) in fixed.iter().enumerate() {
        if let Some(g) = *g {
            matrix.add(dof, dof, 1.0);
            problem.rhs[dof] = g;
        }
    }
    problem.matrix = matrix;

    log::debug!(
        "Dirichlet: {} nodes constrained on tags {:?}",
        values.len(),
        bcs.iter().map(|bc| bc.tag).collect::<Vec<_>>()
    );
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{CoupledProblem, assemble_weighted_stiffness};
    use crate::mesh::unit_cube_tetrahedra;
    use approx::assert_relative_eq;
    use ndarray::Array1;
    use tower_em_solvers::lu_solve;

    fn marked_cube() -> Mesh {
        let mut mesh = unit_cube_tetrahedra(3);
        mesh.mark_boundary(1, |c| c.z < 1e-12);
        mesh.mark_boundary(2, |c| c.z > 1.0 - 1e-12);
        mesh
    }

    #[test]
    fn test_first_condition_wins_on_shared_nodes() {
        let mut mesh = marked_cube();
        mesh.mark_boundary(3, |c| c.x < 1e-12);
        let bcs = [
            DirichletBC::constant(1, Complex64::new(1.0, 0.0)),
            DirichletBC::constant(3, Complex64::new(5.0, 0.0)),
        ];
        let values = dirichlet_values(&mesh, &bcs);
        // node 0 sits on both the bottom and the x = 0 face
        assert_eq!(values[&0], Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_complex_potential_between_plates() {
        // Laplace with u = 0 at z = 0 and u = 1 + 2i at z = 1 gives u = (1 + 2i) z
        let mesh = marked_cube();
        let k = assemble_weighted_stiffness(&mesh, &vec![1.0; mesh.num_elements()]);
        let zero = TripletMatrix::new(mesh.num_nodes());
        let f = Array1::zeros(mesh.num_nodes());
        let mut problem = CoupledProblem::from_blocks(&k, &zero, &f, &f);
        let bcs = [
            DirichletBC::constant(1, Complex64::new(0.0, 0.0)),
            DirichletBC::constant(2, Complex64::new(1.0, 2.0)),
        ];
        let values = apply_dirichlet(&mut problem, &mesh, &bcs);
        assert_eq!(values.len(), 32);

        let x = lu_solve(&problem.matrix.to_csr().to_dense(), &problem.rhs).unwrap();
        for (n, p) in mesh.nodes.iter().enumerate() {
            assert_relative_eq!(x[2 * n], p.z, epsilon = 1e-10);
            assert_relative_eq!(x[2 * n + 1], 2.0 * p.z, epsilon = 1e-10);
        }
    }
}
