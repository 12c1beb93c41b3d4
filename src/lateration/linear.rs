//! Closed-form linear lateration.
//!
//! Both formulations expand `‖x − pᵢ‖² = dᵢ²` into `‖x‖² − 2pᵢ·x + ‖pᵢ‖² − dᵢ² = 0`.
//!
//! * **Inhomogeneous**: subtracting the first equation from the others removes `‖x‖²`
//!   and leaves `2(pᵢ − p₀)·x = d₀² − dᵢ² + ‖pᵢ‖² − ‖p₀‖²`, solved in the least-squares
//!   sense by SVD (`n − 1 ≥ D` rows).
//! * **Homogeneous**: every equation becomes a row `[−2pᵢᵀ, 1, ‖pᵢ‖² − dᵢ²]` acting on
//!   `u ∝ (x, ‖x‖², 1)`; `u` is the eigenvector of `AᵀA` with the smallest eigenvalue.
//!
//! Inputs are expected already centered and scaled (see [`Normalization`]), which keeps
//! the entries of `A` of order one.
use nalgebra::{DMatrix, DVector, SVector, SymmetricEigen};

use crate::constants::SINGULARITY_RCOND;
use crate::lateration_errors::LaterationError;

/// Similarity transform `p' = (p − c) / s` applied before the linear stage.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Normalization<const D: usize> {
    pub centroid: SVector<f64, D>,
    pub scale: f64,
}

impl<const D: usize> Normalization<D> {
    pub fn from_positions(positions: &[SVector<f64, D>]) -> Self {
        let n = positions.len().max(1) as f64;
        let centroid = positions
            .iter()
            .fold(SVector::<f64, D>::zeros(), |acc, p| acc + p)
            / n;
        let rms = (positions
            .iter()
            .map(|p| (p - centroid).norm_squared())
            .sum::<f64>()
            / n)
            .sqrt();
        let scale = if rms > f64::EPSILON { rms } else { 1.0 };
        Self { centroid, scale }
    }

    pub fn apply(&self, p: &SVector<f64, D>) -> SVector<f64, D> {
        (p - self.centroid) / self.scale
    }

    pub fn revert(&self, p: &SVector<f64, D>) -> SVector<f64, D> {
        p * self.scale + self.centroid
    }
}

/// Solve the differenced system against the first observation.
pub(crate) fn solve_inhomogeneous<const D: usize>(
    positions: &[SVector<f64, D>],
    distances: &[f64],
) -> Result<SVector<f64, D>, LaterationError> {
    let n = positions.len();
    let p0 = positions[0];
    let d0 = distances[0];

    let mut a = DMatrix::<f64>::zeros(n - 1, D);
    let mut b = DVector::<f64>::zeros(n - 1);
    for i in 1..n {
        let pi = positions[i];
        for j in 0..D {
            a[(i - 1, j)] = 2.0 * (pi[j] - p0[j]);
        }
        b[i - 1] = d0 * d0 - distances[i] * distances[i] + pi.norm_squared() - p0.norm_squared();
    }

    let svd = a.svd(true, true);
    let max_sv = svd.singular_values.max();
    let min_sv = svd.singular_values.min();
    if svd.singular_values.len() < D || !(min_sv > SINGULARITY_RCOND * max_sv) {
        return Err(LaterationError::SingularSystem);
    }

    let x = svd
        .solve(&b, SINGULARITY_RCOND * max_sv)
        .map_err(|_| LaterationError::SingularSystem)?;
    Ok(SVector::<f64, D>::from_iterator(x.iter().copied()))
}

/// Solve for the null vector of the homogeneous system.
pub(crate) fn solve_homogeneous<const D: usize>(
    positions: &[SVector<f64, D>],
    distances: &[f64],
) -> Result<SVector<f64, D>, LaterationError> {
    let n = positions.len();
    let cols = D + 2;

    let mut a = DMatrix::<f64>::zeros(n, cols);
    for (i, (p, d)) in positions.iter().zip(distances).enumerate() {
        for j in 0..D {
            a[(i, j)] = -2.0 * p[j];
        }
        a[(i, D)] = 1.0;
        a[(i, D + 1)] = p.norm_squared() - d * d;
    }

    let eigen = SymmetricEigen::new(a.transpose() * &a);
    let mut order: Vec<usize> = (0..cols).collect();
    order.sort_by(|&i, &j| eigen.eigenvalues[i].total_cmp(&eigen.eigenvalues[j]));

    let largest = eigen.eigenvalues[order[cols - 1]].abs();
    let second = eigen.eigenvalues[order[1]].abs();
    // a second null direction means the geometry does not pin the position down
    if !(second > SINGULARITY_RCOND * largest) {
        return Err(LaterationError::SingularSystem);
    }

    let u = eigen.eigenvectors.column(order[0]);
    let w = u[D + 1];
    if w.abs() <= f64::EPSILON * u.norm() {
        return Err(LaterationError::SingularSystem);
    }
    Ok(SVector::<f64, D>::from_fn(|j, _| u[j] / w))
}
