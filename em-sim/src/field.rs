//! Electric field E = −∇φ from the solved potential

use crate::materials::Material;
use ndarray::{Array1, Array2, Zip};
use serde::{Deserialize, Serialize};
use tower_em_fem::mesh::Mesh;
use tower_em_fem::postprocess::nodal_gradients;

/// Nodal electric field, one row per mesh node
#[derive(Debug, Clone)]
pub struct ElectricField {
    pub e_real: Array2<f64>,
    pub e_imag: Array2<f64>,
    /// sqrt(|E_real|² + |E_imag|²)
    pub e_mag: Array1<f64>,
}

impl ElectricField {
    pub fn from_potential(mesh: &Mesh, phi_real: &Array1<f64>, phi_imag: &Array1<f64>) -> Self {
        let e_real = -nodal_gradients(mesh, phi_real);
        let e_imag = -nodal_gradients(mesh, phi_imag);
        let e_mag = magnitude(&e_real, &e_imag);
        log::info!(
            "Field magnitude {:.3e} .. {:.3e} V/m",
            e_mag.fold(f64::INFINITY, |a, &b| a.min(b)),
            e_mag.fold(0.0, |a: f64, &b| a.max(b))
        );
        Self {
            e_real,
            e_imag,
            e_mag,
        }
    }

    pub fn len(&self) -> usize {
        self.e_mag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.e_mag.is_empty()
    }
}

/// Row-wise magnitude of a complex vector field; the squared sum is clamped at zero
pub fn magnitude(e_real: &Array2<f64>, e_imag: &Array2<f64>) -> Array1<f64> {
    let mut mag = Array1::zeros(e_real.nrows());
    Zip::from(&mut mag)
        .and(e_real.rows())
        .and(e_imag.rows())
        .for_each(|m, re, im| {
            let sq = re.dot(&re) + im.dot(&im);
            *m = sq.max(0.0).sqrt();
        });
    mag
}

/// |E| inside conducting material, a sanity check on the conductor potential
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConductorFieldStats {
    pub nodes: usize,
    pub mean: f64,
    pub max: f64,
}

/// Statistics of |E| over nodes with σ above `sigma_min`
pub fn conductor_field_stats(
    e_mag: &Array1<f64>,
    materials: &[Material],
    sigma_min: f64,
) -> Option<ConductorFieldStats> {
    let values: Vec<f64> = e_mag
        .iter()
        .zip(materials)
        .filter(|(_, m)| m.sigma > sigma_min)
        .map(|(&e, _)| e)
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(ConductorFieldStats {
        nodes: values.len(),
        mean: values.iter().sum::<f64>() / values.len() as f64,
        max: values.iter().copied().fold(0.0, f64::max),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use tower_em_fem::mesh::unit_cube_tetrahedra;

    #[test]
    fn test_uniform_field_from_linear_potential() {
        let mesh = unit_cube_tetrahedra(2);
        let phi_real = Array1::from_iter(mesh.nodes.iter().map(|p| 3.0 * p.x));
        let phi_imag = Array1::from_iter(mesh.nodes.iter().map(|p| -4.0 * p.z));
        let field = ElectricField::from_potential(&mesh, &phi_real, &phi_imag);
        assert_eq!(field.len(), mesh.num_nodes());
        for i in 0..field.len() {
            assert_relative_eq!(field.e_real[[i, 0]], -3.0, epsilon = 1e-10);
            assert_relative_eq!(field.e_imag[[i, 2]], 4.0, epsilon = 1e-10);
            assert_relative_eq!(field.e_mag[i], 5.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_magnitude_is_norm() {
        let re = array![[1.0, 2.0, 2.0], [0.0, 0.0, 0.0]];
        let im = array![[0.0, 0.0, 0.0], [0.0, -3.0, 4.0]];
        let mag = magnitude(&re, &im);
        assert_relative_eq!(mag[0], 3.0);
        assert_relative_eq!(mag[1], 5.0);
        assert!(mag.iter().all(|&m| m >= 0.0));
    }

    #[test]
    fn test_conductor_stats() {
        let e_mag = array![1.0, 10.0, 30.0];
        let mats = [
            Material::new(0.0, 1.0),
            Material::new(35000.0, 1.0),
            Material::new(5.0, 1.0),
        ];
        let stats = conductor_field_stats(&e_mag, &mats, 1.0).unwrap();
        assert_eq!(stats.nodes, 2);
        assert_relative_eq!(stats.mean, 20.0);
        assert_relative_eq!(stats.max, 30.0);
        assert!(conductor_field_stats(&e_mag, &mats[..1], 1.0).is_none());
    }
}
