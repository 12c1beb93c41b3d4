//! # Lateration solver
//!
//! This module turns **reference positions + distances** (and optionally distance
//! standard deviations and an initial guess) into a position estimate with an
//! optional covariance.
//!
//! ## Algorithm outline
//!
//! 1. **Validation** – at least `D + 1` observations, matching lengths, strictly
//!    positive standard deviations; distances are clamped to `≥ 0`.
//! 2. **Linear stage** (optional, default on) – positions are centered on their
//!    centroid and scaled by their RMS spread, then the inhomogeneous (default) or
//!    homogeneous linearization is solved in closed form.
//!    Without it, the seed is the provided initial position or the centroid.
//! 3. **Nonlinear stage** (optional, default on, always run when the linear stage is
//!    off) – Levenberg–Marquardt on `(‖x − pᵢ‖ − dᵢ)/σᵢ`.
//! 4. **Covariance** (optional) – `(JᵀWJ)⁻¹` at the final position; a rank-deficient
//!    Jacobian yields [`LaterationError::SingularSystem`].
//!
//! ## Example
//!
//! ```rust
//! use nalgebra::Vector2;
//! use radiolateration::lateration::{solve, LaterationParams};
//!
//! let positions = [Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0), Vector2::new(0.0, 10.0)];
//! let truth = Vector2::new(3.0, 4.0);
//! let distances: Vec<f64> = positions.iter().map(|p| (p - truth).norm()).collect();
//!
//! let solution = solve(&positions, &distances, None, None, &LaterationParams::default()).unwrap();
//! assert!((solution.position - truth).norm() < 1e-6);
//! ```
//!
//! ## See also
//!
//! - [`RobustLateration`](crate::robust::robust_estimator::RobustLateration) – calls [`solve`] on
//!   random subsets and on the final inlier set.
use nalgebra::{SMatrix, SVector};

use crate::constants::{
    DEFAULT_HOMOGENEOUS_LINEAR_SOLVER_USED, DEFAULT_LINEAR_SOLVER_USED, DEFAULT_LM_INITIAL_DAMPING,
    DEFAULT_LM_MAX_ITERATIONS, DEFAULT_LM_TOLERANCE,
};
use crate::lateration_errors::LaterationError;

pub(crate) mod linear;
pub(crate) mod nonlinear;

use linear::{solve_homogeneous, solve_inhomogeneous, Normalization};
use nonlinear::{covariance, levenberg_marquardt};

/// Configuration of one lateration solve.
///
/// Fields
/// -----------------
/// * `linear_solver_used` – run the closed-form linear stage.
/// * `homogeneous_linear_solver_used` – use the homogeneous instead of the inhomogeneous form.
/// * `refined` – run the Levenberg–Marquardt stage after the linear one.
/// * `covariance_computed` – compute the covariance of the final position.
/// * `max_iterations` – Levenberg–Marquardt iteration cap.
/// * `tolerance` – relative cost-decrease tolerance of Levenberg–Marquardt.
/// * `initial_damping` – initial Levenberg–Marquardt damping `λ`.
#[derive(Debug, Clone, PartialEq)]
pub struct LaterationParams {
    pub linear_solver_used: bool,
    pub homogeneous_linear_solver_used: bool,
    pub refined: bool,
    pub covariance_computed: bool,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub initial_damping: f64,
}

impl Default for LaterationParams {
    fn default() -> Self {
        Self {
            linear_solver_used: DEFAULT_LINEAR_SOLVER_USED,
            homogeneous_linear_solver_used: DEFAULT_HOMOGENEOUS_LINEAR_SOLVER_USED,
            refined: true,
            covariance_computed: false,
            max_iterations: DEFAULT_LM_MAX_ITERATIONS,
            tolerance: DEFAULT_LM_TOLERANCE,
            initial_damping: DEFAULT_LM_INITIAL_DAMPING,
        }
    }
}

impl LaterationParams {
    pub fn builder() -> LaterationParamsBuilder {
        LaterationParamsBuilder::new()
    }

    /// Whether the Levenberg–Marquardt stage runs with this configuration.
    pub fn runs_nonlinear_stage(&self) -> bool {
        self.refined || !self.linear_solver_used
    }

    pub(crate) fn validate(&self) -> Result<(), LaterationError> {
        if self.max_iterations == 0 {
            return Err(LaterationError::invalid(
                "lateration max_iterations must be >= 1",
            ));
        }
        if !(self.tolerance > 0.0) {
            return Err(LaterationError::invalid("lateration tolerance must be > 0"));
        }
        if !(self.initial_damping > 0.0) {
            return Err(LaterationError::invalid(
                "lateration initial_damping must be > 0",
            ));
        }
        Ok(())
    }
}

/// Builder for [`LaterationParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct LaterationParamsBuilder {
    params: LaterationParams,
}

impl LaterationParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn linear_solver_used(mut self, v: bool) -> Self {
        self.params.linear_solver_used = v;
        self
    }
    pub fn homogeneous_linear_solver_used(mut self, v: bool) -> Self {
        self.params.homogeneous_linear_solver_used = v;
        self
    }
    pub fn refined(mut self, v: bool) -> Self {
        self.params.refined = v;
        self
    }
    pub fn covariance_computed(mut self, v: bool) -> Self {
        self.params.covariance_computed = v;
        self
    }
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.params.max_iterations = v;
        self
    }
    pub fn tolerance(mut self, v: f64) -> Self {
        self.params.tolerance = v;
        self
    }
    pub fn initial_damping(mut self, v: f64) -> Self {
        self.params.initial_damping = v;
        self
    }

    /// Validate and produce the [`LaterationParams`].
    ///
    /// Validation rules
    /// -----------------
    /// * `max_iterations ≥ 1`, `tolerance > 0`, `initial_damping > 0`.
    pub fn build(self) -> Result<LaterationParams, LaterationError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

/// Position found by [`solve`].
#[derive(Debug, Clone, PartialEq)]
pub struct LaterationSolution<const D: usize> {
    pub position: SVector<f64, D>,
    pub covariance: Option<SMatrix<f64, D, D>>,
    /// Weighted sum of squared residuals at `position`.
    pub cost: f64,
    /// Levenberg–Marquardt iterations (0 when only the linear stage ran).
    pub iterations: usize,
}

/// Estimate a position from reference positions and distances.
///
/// Arguments
/// -----------------
/// * `positions`: reference positions `pᵢ`.
/// * `distances`: measured distances `dᵢ` (negative values are clamped to 0).
/// * `std_devs`: optional distance standard deviations `σᵢ` (all 1 when absent).
/// * `initial_position`: seed used when the linear stage is disabled (centroid otherwise).
/// * `params`: solver configuration.
///
/// Return
/// ----------
/// * `Ok(LaterationSolution)` with the covariance when `params.covariance_computed`.
/// * `Err(InvalidArgument)` on mismatched lengths or a standard deviation `≤ 0`.
/// * `Err(InsufficientObservations)` with fewer than `D + 1` observations.
/// * `Err(SingularSystem)` on degenerate geometry.
pub fn solve<const D: usize>(
    positions: &[SVector<f64, D>],
    distances: &[f64],
    std_devs: Option<&[f64]>,
    initial_position: Option<&SVector<f64, D>>,
    params: &LaterationParams,
) -> Result<LaterationSolution<D>, LaterationError> {
    let n = positions.len();
    if distances.len() != n {
        return Err(LaterationError::InvalidArgument(format!(
            "{} positions but {} distances",
            n,
            distances.len()
        )));
    }
    if n < D + 1 {
        return Err(LaterationError::InsufficientObservations {
            required: D + 1,
            actual: n,
        });
    }

    let sigmas = match std_devs {
        Some(s) if s.len() != n => {
            return Err(LaterationError::InvalidArgument(format!(
                "{} positions but {} distance standard deviations",
                n,
                s.len()
            )))
        }
        Some(s) => {
            if s.iter().any(|v| !(*v > 0.0) || !v.is_finite()) {
                return Err(LaterationError::invalid(
                    "distance standard deviations must be > 0",
                ));
            }
            s.to_vec()
        }
        None => vec![1.0; n],
    };
    let distances: Vec<f64> = distances.iter().map(|d| d.max(0.0)).collect();

    let norm = Normalization::from_positions(positions);
    let seed = if params.linear_solver_used {
        let scaled: Vec<_> = positions.iter().map(|p| norm.apply(p)).collect();
        let scaled_d: Vec<_> = distances.iter().map(|d| d / norm.scale).collect();
        let x = if params.homogeneous_linear_solver_used {
            solve_homogeneous(&scaled, &scaled_d)?
        } else {
            solve_inhomogeneous(&scaled, &scaled_d)?
        };
        norm.revert(&x)
    } else {
        initial_position.copied().unwrap_or(norm.centroid)
    };

    let (position, cost, iterations) = if params.runs_nonlinear_stage() {
        let refined = levenberg_marquardt(
            positions,
            &distances,
            &sigmas,
            seed,
            params.max_iterations,
            params.tolerance,
            params.initial_damping,
        );
        (refined.position, refined.cost, refined.iterations)
    } else {
        let (r, _) = nonlinear::residuals_and_jacobian(positions, &distances, &sigmas, &seed);
        (seed, r.norm_squared(), 0)
    };

    let covariance = if params.covariance_computed {
        Some(covariance(positions, &distances, &sigmas, &position)?)
    } else {
        None
    };

    Ok(LaterationSolution {
        position,
        covariance,
        cost,
        iterations,
    })
}

#[cfg(test)]
mod lateration_test {
    use approx::assert_relative_eq;
    use nalgebra::{Vector2, Vector3};

    use super::*;

    fn triangle() -> (Vec<Vector2<f64>>, Vec<f64>) {
        let positions = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(0.0, 10.0),
        ];
        let truth = Vector2::new(3.0, 4.0);
        let distances = positions.iter().map(|p| (p - truth).norm()).collect();
        (positions, distances)
    }

    #[test]
    fn test_reference_triangle_all_stages() {
        let (positions, distances) = triangle();
        let truth = Vector2::new(3.0, 4.0);

        for homogeneous in [false, true] {
            for refined in [false, true] {
                let params = LaterationParams::builder()
                    .homogeneous_linear_solver_used(homogeneous)
                    .refined(refined)
                    .build()
                    .unwrap();
                let solution = solve(&positions, &distances, None, None, &params).unwrap();
                assert_relative_eq!(solution.position, truth, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_nonlinear_only_from_initial_position() {
        let (positions, distances) = triangle();
        let params = LaterationParams::builder()
            .linear_solver_used(false)
            .refined(false)
            .max_iterations(500)
            .build()
            .unwrap();
        assert!(params.runs_nonlinear_stage());

        let seed = Vector2::new(2.0, 2.0);
        let solution = solve(&positions, &distances, None, Some(&seed), &params).unwrap();
        assert_relative_eq!(solution.position, Vector2::new(3.0, 4.0), epsilon = 1e-6);
        assert!(solution.iterations > 0);
    }

    #[test]
    fn test_input_validation() {
        let (positions, distances) = triangle();
        let params = LaterationParams::default();

        assert_eq!(
            solve(&positions[..2], &distances[..2], None, None, &params),
            Err(LaterationError::InsufficientObservations {
                required: 3,
                actual: 2
            })
        );
        assert!(matches!(
            solve(&positions, &distances[..2], None, None, &params),
            Err(LaterationError::InvalidArgument(_))
        ));
        assert!(matches!(
            solve(&positions, &distances, Some(&[1.0, 0.0, 1.0]), None, &params),
            Err(LaterationError::InvalidArgument(_))
        ));
        assert!(LaterationParams::builder().tolerance(0.0).build().is_err());
        assert!(LaterationParams::builder().max_iterations(0).build().is_err());
    }

    #[test]
    fn test_negative_distances_are_clamped() {
        let positions = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(0.0, 10.0),
            Vector2::new(10.0, 10.0),
        ];
        let distances = vec![-1.0, 10.0, 10.0, 200f64.sqrt()];
        let solution =
            solve(&positions, &distances, None, None, &LaterationParams::default()).unwrap();
        assert_relative_eq!(solution.position, Vector2::new(0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_covariance_3d() {
        let positions = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(10.0, 0.0, 0.0),
            Vector3::new(0.0, 10.0, 0.0),
            Vector3::new(0.0, 0.0, 10.0),
            Vector3::new(10.0, 10.0, 10.0),
        ];
        let truth = Vector3::new(2.0, 3.0, 4.0);
        let distances: Vec<f64> = positions.iter().map(|p| (p - truth).norm()).collect();
        let params = LaterationParams::builder()
            .covariance_computed(true)
            .build()
            .unwrap();

        let solution = solve(&positions, &distances, Some(&[0.1; 5]), None, &params).unwrap();
        assert_relative_eq!(solution.position, truth, epsilon = 1e-8);

        let cov = solution.covariance.unwrap();
        assert_relative_eq!(cov, cov.transpose(), epsilon = 1e-12);
        assert!(cov.diagonal().iter().all(|v| *v > 0.0 && *v < 0.1));
    }

    #[test]
    fn test_collinear_covariance_fails() {
        let positions = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(5.0, 0.0),
            Vector2::new(10.0, 0.0),
        ];
        let truth = Vector2::new(3.0, 0.0);
        let distances: Vec<f64> = positions.iter().map(|p| (p - truth).norm()).collect();
        let params = LaterationParams::builder()
            .linear_solver_used(false)
            .covariance_computed(true)
            .build()
            .unwrap();
        let seed = Vector2::new(3.0, 0.0);
        assert_eq!(
            solve(&positions, &distances, None, Some(&seed), &params),
            Err(LaterationError::SingularSystem)
        );
    }
}
