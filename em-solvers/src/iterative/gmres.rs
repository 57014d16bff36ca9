//! Restarted GMRES (Saad & Schultz, 1986)
//!
//! Right preconditioning is used, A M⁻¹ y = b with x = M⁻¹ y, so the
//! residual tracked by the Givens recurrence is the true residual of the
//! unpreconditioned system.

use crate::helpers::{axpy, inner_product, vector_norm};
use crate::traits::{ComplexField, IdentityPreconditioner, LinearOperator, Preconditioner};
use ndarray::{Array1, Array2};
use num_traits::{Float, One, ToPrimitive, Zero};

/// GMRES configuration
#[derive(Debug, Clone)]
pub struct GmresConfig<R> {
    /// Maximum number of restart cycles
    pub max_iterations: usize,
    /// Krylov dimension per cycle
    pub restart: usize,
    /// Relative residual target ‖b − Ax‖ / ‖b‖
    pub tolerance: R,
    /// Log progress every N inner iterations (0 disables)
    pub print_interval: usize,
}

impl Default for GmresConfig<f64> {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            restart: 50,
            tolerance: 1e-8,
            print_interval: 0,
        }
    }
}

/// GMRES result
#[derive(Debug, Clone)]
pub struct GmresSolution<T: ComplexField> {
    pub x: Array1<T>,
    /// Total inner iterations (operator applications)
    pub iterations: usize,
    /// Completed restart cycles
    pub restarts: usize,
    /// Final relative residual
    pub residual: T::Real,
    pub converged: bool,
}

/// Unpreconditioned GMRES from a zero initial guess
pub fn gmres<T, A>(operator: &A, b: &Array1<T>, config: &GmresConfig<T::Real>) -> GmresSolution<T>
where
    T: ComplexField,
    A: LinearOperator<T>,
{
    gmres_preconditioned_with_guess(operator, &IdentityPreconditioner, b, None, config)
}

/// Right-preconditioned GMRES with an optional initial guess
pub fn gmres_preconditioned_with_guess<T, A, P>(
    operator: &A,
    precond: &P,
    b: &Array1<T>,
    x0: Option<&Array1<T>>,
    config: &GmresConfig<T::Real>,
) -> GmresSolution<T>
where
    T: ComplexField,
    A: LinearOperator<T>,
    P: Preconditioner<T>,
{
    let n = b.len();
    let m = config.restart.max(1);
    let mut x = match x0 {
        Some(guess) => guess.clone(),
        None => Array1::from_elem(n, T::zero()),
    };

    let b_norm = vector_norm(b);
    if b_norm <= T::Real::min_positive_value() {
        // Only the zero vector solves A x = 0 for a nonsingular A.
        return GmresSolution {
            x: Array1::from_elem(n, T::zero()),
            iterations: 0,
            restarts: 0,
            residual: T::Real::zero(),
            converged: true,
        };
    }

    let breakdown_tol = T::Real::epsilon() * b_norm;
    let mut total_iterations = 0;
    let mut restarts = 0;

    for _cycle in 0..config.max_iterations {
        let r: Array1<T> = b - &operator.apply(&x);
        let beta = vector_norm(&r);
        let rel_residual = beta / b_norm;
        if rel_residual < config.tolerance {
            return GmresSolution {
                x,
                iterations: total_iterations,
                restarts,
                residual: rel_residual,
                converged: true,
            };
        }

        let mut v: Vec<Array1<T>> = Vec::with_capacity(m + 1);
        v.push(r.mapv(|ri| ri * T::from_real(T::Real::one() / beta)));
        let mut h: Array2<T> = Array2::from_elem((m + 1, m), T::zero());
        let mut cs: Vec<T> = Vec::with_capacity(m);
        let mut sn: Vec<T> = Vec::with_capacity(m);
        let mut g: Array1<T> = Array1::from_elem(m + 1, T::zero());
        g[0] = T::from_real(beta);

        let mut basis_len = 0;
        let mut finished = false;
        let mut estimate = rel_residual;

        for j in 0..m {
            total_iterations += 1;
            basis_len = j + 1;

            let mut w = operator.apply(&precond.apply(&v[j]));
            for i in 0..=j {
                let h_ij = inner_product(&v[i], &w);
                h[[i, j]] = h_ij;
                axpy(-h_ij, &v[i], &mut w);
            }
            let w_norm = vector_norm(&w);
            h[[j + 1, j]] = T::from_real(w_norm);

            let lucky = w_norm <= breakdown_tol;
            if !lucky {
                v.push(w.mapv(|wi| wi * T::from_real(T::Real::one() / w_norm)));
            }

            for i in 0..j {
                let upper = cs[i].conj() * h[[i, j]] + sn[i].conj() * h[[i + 1, j]];
                h[[i + 1, j]] = -sn[i] * h[[i, j]] + cs[i] * h[[i + 1, j]];
                h[[i, j]] = upper;
            }

            let (c, s) = givens_rotation(h[[j, j]], h[[j + 1, j]]);
            cs.push(c);
            sn.push(s);
            h[[j, j]] = c.conj() * h[[j, j]] + s.conj() * h[[j + 1, j]];
            h[[j + 1, j]] = T::zero();

            let upper = c.conj() * g[j] + s.conj() * g[j + 1];
            g[j + 1] = -s * g[j] + c * g[j + 1];
            g[j] = upper;

            estimate = g[j + 1].norm() / b_norm;
            if config.print_interval > 0 && total_iterations % config.print_interval == 0 {
                log::info!(
                    "GMRES iteration {} (restart {}): relative residual = {:.6e}",
                    total_iterations,
                    restarts,
                    estimate.to_f64().unwrap_or(f64::NAN)
                );
            }

            if estimate < config.tolerance || lucky {
                finished = true;
                break;
            }
        }

        let y = solve_upper_triangular(&h, &g, basis_len);
        let mut update = Array1::from_elem(n, T::zero());
        for (i, &yi) in y.iter().enumerate() {
            axpy(yi, &v[i], &mut update);
        }
        x = x + precond.apply(&update);

        if finished {
            return GmresSolution {
                x,
                iterations: total_iterations,
                restarts,
                residual: estimate,
                converged: estimate < config.tolerance,
            };
        }
        restarts += 1;
    }

    let r: Array1<T> = b - &operator.apply(&x);
    let rel_residual = vector_norm(&r) / b_norm;
    GmresSolution {
        x,
        iterations: total_iterations,
        restarts,
        residual: rel_residual,
        converged: rel_residual < config.tolerance,
    }
}

/// Rotation (c, s) that zeroes `b` in the pair (a, b)
fn givens_rotation<T: ComplexField>(a: T, b: T) -> (T, T) {
    let r = Float::sqrt(a.norm_sqr() + b.norm_sqr());
    if r <= T::Real::min_positive_value() {
        return (T::one(), T::zero());
    }
    let inv = T::from_real(T::Real::one() / r);
    (a * inv, b * inv)
}

/// Back substitution on the leading k×k block of H
fn solve_upper_triangular<T: ComplexField>(h: &Array2<T>, g: &Array1<T>, k: usize) -> Array1<T> {
    let mut y = Array1::from_elem(k, T::zero());
    for i in (0..k).rev() {
        let mut sum = g[i];
        for j in (i + 1)..k {
            sum -= h[[i, j]] * y[j];
        }
        let diag = h[[i, i]];
        y[i] = if diag.norm() > T::Real::min_positive_value() {
            sum * diag.inv()
        } else {
            T::zero()
        };
    }
    y
}
