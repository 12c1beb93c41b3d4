//! Levenberg–Marquardt refinement and covariance of a lateration solution.
//!
//! The weighted residual of observation `i` at position `x` is
//!
//! ```text
//! rᵢ(x) = (‖x − pᵢ‖ − dᵢ) / σᵢ        ∂rᵢ/∂x = (x − pᵢ)ᵀ / (‖x − pᵢ‖ σᵢ)
//! ```
//!
//! Each iteration solves `(JᵀJ + λ·diag(JᵀJ)) δ = −Jᵀr`. An accepted step divides the
//! damping by ten, a rejected one multiplies it by ten. The loop ends on a relative cost
//! decrease below the tolerance, a zero cost, a damping overflow, or the iteration cap.
use nalgebra::{DMatrix, DVector, SMatrix, SVector};

use crate::constants::SINGULARITY_RCOND;
use crate::lateration_errors::LaterationError;

const MAX_DAMPING: f64 = 1e16;
const MIN_RANGE: f64 = 1e-12;

/// Outcome of the nonlinear stage.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Refinement<const D: usize> {
    pub position: SVector<f64, D>,
    pub cost: f64,
    pub iterations: usize,
}

/// Weighted residuals and Jacobian at `x`.
pub(crate) fn residuals_and_jacobian<const D: usize>(
    positions: &[SVector<f64, D>],
    distances: &[f64],
    std_devs: &[f64],
    x: &SVector<f64, D>,
) -> (DVector<f64>, DMatrix<f64>) {
    let n = positions.len();
    let mut r = DVector::<f64>::zeros(n);
    let mut j = DMatrix::<f64>::zeros(n, D);
    for i in 0..n {
        let diff = x - positions[i];
        let range = diff.norm();
        let sigma = std_devs[i];
        r[i] = (range - distances[i]) / sigma;
        if range > MIN_RANGE {
            for k in 0..D {
                j[(i, k)] = diff[k] / (range * sigma);
            }
        }
    }
    (r, j)
}

fn cost_at<const D: usize>(
    positions: &[SVector<f64, D>],
    distances: &[f64],
    std_devs: &[f64],
    x: &SVector<f64, D>,
) -> f64 {
    positions
        .iter()
        .zip(distances.iter().zip(std_devs))
        .map(|(p, (d, s))| ((x - p).norm() - d) / s)
        .map(|r| r * r)
        .sum()
}

/// Minimize the weighted squared residuals starting from `initial`.
pub(crate) fn levenberg_marquardt<const D: usize>(
    positions: &[SVector<f64, D>],
    distances: &[f64],
    std_devs: &[f64],
    initial: SVector<f64, D>,
    max_iterations: usize,
    tolerance: f64,
    initial_damping: f64,
) -> Refinement<D> {
    let mut x = initial;
    let mut lambda = initial_damping;
    let (mut r, mut jac) = residuals_and_jacobian(positions, distances, std_devs, &x);
    let mut cost = r.norm_squared();
    let mut iterations = 0;

    while iterations < max_iterations && cost > 0.0 {
        iterations += 1;

        let jtj = jac.transpose() * &jac;
        let gradient = jac.transpose() * &r;
        if gradient.amax() == 0.0 {
            break;
        }

        let mut damped = jtj.clone();
        for k in 0..D {
            damped[(k, k)] += lambda * jtj[(k, k)].max(MIN_RANGE);
        }

        let Some(step) = damped.lu().solve(&(-gradient)) else {
            lambda *= 10.0;
            if lambda > MAX_DAMPING {
                break;
            }
            continue;
        };

        let candidate = x + SVector::<f64, D>::from_iterator(step.iter().copied());
        let candidate_cost = cost_at(positions, distances, std_devs, &candidate);

        if candidate_cost.is_finite() && candidate_cost < cost {
            let decrease = (cost - candidate_cost) / cost;
            x = candidate;
            cost = candidate_cost;
            (r, jac) = residuals_and_jacobian(positions, distances, std_devs, &x);
            lambda = (lambda / 10.0).max(f64::MIN_POSITIVE);
            if decrease < tolerance {
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > MAX_DAMPING {
                break;
            }
        }
    }

    Refinement {
        position: x,
        cost,
        iterations,
    }
}

/// Covariance `(JᵀJ)⁻¹` of the weighted problem at `x`.
///
/// Return
/// ----------
/// * `Err(SingularSystem)` if the Jacobian is rank-deficient (degenerate geometry).
pub(crate) fn covariance<const D: usize>(
    positions: &[SVector<f64, D>],
    distances: &[f64],
    std_devs: &[f64],
    x: &SVector<f64, D>,
) -> Result<SMatrix<f64, D, D>, LaterationError> {
    let (_, jac) = residuals_and_jacobian(positions, distances, std_devs, x);
    let information = jac.transpose() * &jac;

    let singular_values = information.clone().singular_values();
    let max_sv = singular_values.max();
    if !(singular_values.min() > SINGULARITY_RCOND * max_sv) {
        return Err(LaterationError::SingularSystem);
    }

    let inverse = information
        .try_inverse()
        .ok_or(LaterationError::SingularSystem)?;
    // symmetrize away round-off
    let symmetric = (&inverse + inverse.transpose()) * 0.5;
    Ok(SMatrix::<f64, D, D>::from_iterator(symmetric.iter().copied()))
}
