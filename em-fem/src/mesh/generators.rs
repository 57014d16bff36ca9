//! Structured tetrahedral meshes for tests and quick studies

use super::{Mesh, Point};

/// Box `[x_min, x_max] × [y_min, y_max] × [z_min, z_max]` split into
/// `nx × ny × nz` cubes of six tetrahedra each (Kuhn split along the
/// main diagonal). Boundary faces are detected with marker 0.
#[allow(clippy::too_many_arguments)]
pub fn box_mesh_tetrahedra(
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    z_min: f64,
    z_max: f64,
    nx: usize,
    ny: usize,
    nz: usize,
) -> Mesh {
    let mut mesh = Mesh::new();
    let dx = (x_max - x_min) / nx as f64;
    let dy = (y_max - y_min) / ny as f64;
    let dz = (z_max - z_min) / nz as f64;

    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                mesh.add_node(Point::new(
                    x_min + i as f64 * dx,
                    y_min + j as f64 * dy,
                    z_min + k as f64 * dz,
                ));
            }
        }
    }

    let idx = |i: usize, j: usize, k: usize| k * (ny + 1) * (nx + 1) + j * (nx + 1) + i;

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let n000 = idx(i, j, k);
                let n100 = idx(i + 1, j, k);
                let n010 = idx(i, j + 1, k);
                let n110 = idx(i + 1, j + 1, k);
                let n001 = idx(i, j, k + 1);
                let n101 = idx(i + 1, j, k + 1);
                let n011 = idx(i, j + 1, k + 1);
                let n111 = idx(i + 1, j + 1, k + 1);

                for tet in [
                    [n000, n100, n110, n111],
                    [n000, n110, n010, n111],
                    [n000, n010, n011, n111],
                    [n000, n011, n001, n111],
                    [n000, n001, n101, n111],
                    [n000, n101, n100, n111],
                ] {
                    mesh.add_element(tet, None);
                }
            }
        }
    }

    mesh.detect_boundaries();
    mesh
}

/// Unit cube with `n` cells per side
pub fn unit_cube_tetrahedra(n: usize) -> Mesh {
    box_mesh_tetrahedra(0.0, 1.0, 0.0, 1.0, 0.0, 1.0, n, n, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::tet_volume;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_mesh_counts() {
        let mesh = box_mesh_tetrahedra(0.0, 2.0, 0.0, 1.0, -1.0, 1.0, 2, 3, 4);
        assert_eq!(mesh.num_nodes(), 3 * 4 * 5);
        assert_eq!(mesh.num_elements(), 6 * 2 * 3 * 4);
        // two triangles per quad on the surface
        let quads = 2 * (2 * 3 + 2 * 4 + 3 * 4);
        assert_eq!(mesh.boundaries.len(), 2 * quads);
    }

    #[test]
    fn test_box_mesh_volume() {
        let mesh = box_mesh_tetrahedra(0.0, 2.0, 0.0, 1.0, -1.0, 1.0, 2, 2, 2);
        let total: f64 = (0..mesh.num_elements())
            .map(|e| tet_volume(&mesh.element_coords(e)))
            .sum();
        assert_relative_eq!(total, 4.0, epsilon = 1e-12);
    }
}
