//! # Robust lateration
//!
//! [`RobustLateration`] runs the consensus loop shared by the five [`RobustMethod`]s over
//! a fixed [`ObservationSet`]:
//!
//! ```text
//! repeat until the adaptive iteration count (or max_iterations) is reached:
//!     draw a subset of k observations (uniform or quality weighted)
//!     fit a preliminary position on the subset           ─ failed fits are skipped
//!     score the position against every observation
//!     keep it if it strictly improves the best score     ─ updates the inlier ratio ε
//!     N ← ceil(log(1 − confidence) / log(1 − εᵏ))
//! refine the best position on its inliers, compute its covariance
//! ```
//!
//! Iteration and progress events are reported to a [`RobustEstimatorListener`].
//!
//! ## Example
//!
//! ```rust
//! use nalgebra::Vector2;
//! use rand::{rngs::StdRng, SeedableRng};
//! use radiolateration::observations::observation_builder::ObservationBuilder;
//! use radiolateration::radio_source::RadioSource;
//! use radiolateration::readings::{Fingerprint, RangingReading};
//! use radiolateration::robust::robust_estimator::{RobustLateration, SilentListener};
//! use radiolateration::robust::{RobustMethod, RobustParams};
//!
//! let sources = vec![
//!     RadioSource::new("a", Vector2::new(0.0, 0.0)),
//!     RadioSource::new("b", Vector2::new(10.0, 0.0)),
//!     RadioSource::new("c", Vector2::new(0.0, 10.0)),
//!     RadioSource::new("d", Vector2::new(10.0, 10.0)),
//! ];
//! let truth = Vector2::new(3.0, 4.0);
//! let fingerprint: Fingerprint = sources
//!     .iter()
//!     .map(|s| RangingReading::new(s.id(), (s.position() - truth).norm(), None).unwrap().into())
//!     .collect();
//!
//! let set = ObservationBuilder::default().build(&sources, &fingerprint, None, None);
//! let params = RobustParams::for_method(RobustMethod::Msac);
//! let robust = RobustLateration::new(RobustMethod::Msac, &set, &params, None).unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(3);
//! let solution = robust.estimate(&mut rng, &mut SilentListener).unwrap();
//! assert!((solution.position - truth).norm() < 1e-6);
//! ```
use nalgebra::{SMatrix, SVector};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::lateration::nonlinear::covariance;
use crate::lateration::{solve, LaterationParams};
use crate::lateration_errors::LaterationError;
use crate::observations::ObservationSet;
use crate::robust::sampling::{uniform_subset, weighted_subset, Subset};
use crate::robust::scoring::{
    consensus_ratio, improves, inliers, median_inlier_threshold, required_iterations, residuals,
    score,
};
use crate::robust::{RobustMethod, RobustParams};

/// Receives the iteration and progress events of the consensus loop.
pub trait RobustEstimatorListener {
    /// Called after every iteration, with the 1-based iteration number.
    fn on_next_iteration(&mut self, _iteration: usize) {}

    /// Called when progress (in `[0, 1]`) advanced by more than the configured delta,
    /// and once with `1.0` when the loop ends.
    fn on_progress_change(&mut self, _progress: f64) {}
}

/// Listener ignoring every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentListener;

impl RobustEstimatorListener for SilentListener {}

/// Inlier classification of the best model.
///
/// Fields
/// -----------------
/// * `inliers` – one flag per observation, in observation-set order.
/// * `num_inliers` – number of `true` flags.
/// * `residuals` – absolute residuals of the best model, when kept.
/// * `best_score` – score of the best model (inlier count, median of squared
///   residuals or truncated sum, depending on the method).
/// * `inlier_threshold` – residual bound used for the classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InliersData {
    inliers: Vec<bool>,
    num_inliers: usize,
    residuals: Option<Vec<f64>>,
    best_score: f64,
    inlier_threshold: f64,
}

impl InliersData {
    pub fn inliers(&self) -> &[bool] {
        &self.inliers
    }

    pub fn num_inliers(&self) -> usize {
        self.num_inliers
    }

    pub fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    pub fn inlier_threshold(&self) -> f64 {
        self.inlier_threshold
    }

    /// Indices of the inlier observations.
    pub fn inlier_indices(&self) -> Vec<usize> {
        self.inliers
            .iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then_some(i))
            .collect()
    }
}

/// Outcome of [`RobustLateration::estimate`].
#[derive(Debug, Clone, PartialEq)]
pub struct RobustSolution<const D: usize> {
    pub position: SVector<f64, D>,
    pub covariance: Option<SMatrix<f64, D, D>>,
    pub inliers_data: Option<InliersData>,
    pub iterations: usize,
}

struct BestModel<const D: usize> {
    position: SVector<f64, D>,
    score: f64,
    residuals: Vec<f64>,
    mask: Vec<bool>,
    num_inliers: usize,
    inlier_threshold: f64,
}

/// Consensus loop over one observation set.
#[derive(Debug, Clone)]
pub struct RobustLateration<'a, const D: usize> {
    method: RobustMethod,
    observations: &'a ObservationSet<D>,
    params: &'a RobustParams,
    initial_position: Option<SVector<f64, D>>,
    subset_size: usize,
}

impl<'a, const D: usize> RobustLateration<'a, D> {
    /// Arguments
    /// -----------------
    /// * `method`: robust method driving sampling, scoring and stopping.
    /// * `observations`: observations to fit.
    /// * `params`: loop configuration.
    /// * `initial_position`: seed of the nonlinear stage when the linear stage is disabled.
    ///
    /// Return
    /// ----------
    /// * `Err(InvalidArgument)` if `params` is invalid or the subset size is below `D + 1`.
    pub fn new(
        method: RobustMethod,
        observations: &'a ObservationSet<D>,
        params: &'a RobustParams,
        initial_position: Option<SVector<f64, D>>,
    ) -> Result<Self, LaterationError> {
        params.validate()?;
        let subset_size = params.subset_size(D);
        if subset_size < D + 1 {
            return Err(LaterationError::InvalidArgument(format!(
                "preliminary subset size {subset_size} below the minimum {}",
                D + 1
            )));
        }
        Ok(Self {
            method,
            observations,
            params,
            initial_position,
            subset_size,
        })
    }

    pub fn method(&self) -> RobustMethod {
        self.method
    }

    pub fn subset_size(&self) -> usize {
        self.subset_size
    }

    fn draw(&self, rng: &mut impl Rng, weights: Option<&[f64]>) -> Option<Subset> {
        match weights {
            Some(w) => weighted_subset(rng, w, self.subset_size),
            None => uniform_subset(rng, self.observations.len(), self.subset_size),
        }
    }

    /// Run the consensus loop.
    ///
    /// Arguments
    /// -----------------
    /// * `rng`: random source of the subset draws.
    /// * `listener`: receives iteration and progress events.
    ///
    /// Return
    /// ----------
    /// * `Ok(RobustSolution)` with the best (optionally refined) position.
    /// * `Err(RobustEstimationFailed)` if there are fewer observations than the subset size
    ///   or no subset produced a usable model.
    pub fn estimate(
        &self,
        rng: &mut impl Rng,
        listener: &mut dyn RobustEstimatorListener,
    ) -> Result<RobustSolution<D>, LaterationError> {
        let n = self.observations.len();
        let k = self.subset_size;
        if n < k {
            return Err(LaterationError::RobustEstimationFailed(format!(
                "{n} observations for subsets of {k}"
            )));
        }

        let params = self.params;
        let method = self.method;
        let sampling_weights = (method.is_quality_weighted()
            && self.observations.is_quality_weighted())
        .then(|| self.observations.sampling_weights());

        let preliminary = LaterationParams {
            refined: params.preliminary_solution_refined,
            covariance_computed: false,
            ..params.lateration.clone()
        };

        debug!(
            method = %method,
            observations = n,
            subset_size = k,
            weighted = sampling_weights.is_some(),
            "starting robust lateration"
        );

        let mut best: Option<BestModel<D>> = None;
        let mut required = params.max_iterations;
        let mut iteration = 0;
        let mut last_progress = 0.0;

        while iteration < required {
            iteration += 1;
            let mut converged = false;

            match self.draw(rng, sampling_weights.as_deref()) {
                None => trace!(iteration, "no subset could be drawn"),
                Some(subset) => {
                    let (p, d, s) = self.observations.select(&subset);
                    match solve(&p, &d, Some(&s), self.initial_position.as_ref(), &preliminary) {
                        Err(e) => trace!(iteration, error = %e, "skipping subset"),
                        Ok(fit) => {
                            let r = residuals(self.observations, &fit.position);
                            let candidate = score(method, &r, params.threshold);
                            if improves(method, candidate, best.as_ref().map(|b| b.score)) {
                                let inlier_threshold = if method.is_median_based() {
                                    median_inlier_threshold(
                                        candidate,
                                        n,
                                        k,
                                        params.inlier_factor,
                                        params.threshold,
                                    )
                                } else {
                                    params.threshold
                                };
                                let (mask, num_inliers) = inliers(&r, inlier_threshold);
                                debug!(iteration, score = candidate, num_inliers, "new best model");

                                required = required_iterations(
                                    params.confidence,
                                    consensus_ratio(method, num_inliers, n),
                                    k,
                                    params.max_iterations,
                                );
                                converged = method.is_median_based()
                                    && candidate <= params.threshold * params.threshold;

                                best = Some(BestModel {
                                    position: fit.position,
                                    score: candidate,
                                    residuals: r,
                                    mask,
                                    num_inliers,
                                    inlier_threshold,
                                });
                            }
                        }
                    }
                }
            }

            listener.on_next_iteration(iteration);
            let progress = (iteration as f64 / required as f64).min(1.0);
            if progress - last_progress > params.progress_delta {
                last_progress = progress;
                listener.on_progress_change(progress);
            }

            if converged {
                break;
            }
        }

        if last_progress < 1.0 {
            listener.on_progress_change(1.0);
        }

        let best = best.ok_or_else(|| {
            LaterationError::RobustEstimationFailed(format!(
                "no usable model after {iteration} iterations"
            ))
        })?;

        let inlier_indices: Vec<usize> = best
            .mask
            .iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then_some(i))
            .collect();
        let (p, d, s) = self.observations.select(&inlier_indices);
        let enough_inliers = inlier_indices.len() >= D + 1;

        let mut position = best.position;
        if params.result_refined && enough_inliers {
            let refinement = LaterationParams {
                linear_solver_used: false,
                refined: true,
                covariance_computed: false,
                ..params.lateration.clone()
            };
            match solve(&p, &d, Some(&s), Some(&best.position), &refinement) {
                Ok(refined) => position = refined.position,
                Err(e) => trace!(error = %e, "keeping preliminary position"),
            }
        }

        let covariance = if params.covariance_kept && enough_inliers {
            match covariance(&p, &d, &s, &position) {
                Ok(c) => Some(c),
                Err(e) => {
                    trace!(error = %e, "covariance not available");
                    None
                }
            }
        } else {
            None
        };

        debug!(
            iterations = iteration,
            num_inliers = best.num_inliers,
            "robust lateration finished"
        );

        let inliers_data = params.inliers_kept.then(|| InliersData {
            inliers: best.mask,
            num_inliers: best.num_inliers,
            residuals: params.residuals_kept.then_some(best.residuals),
            best_score: best.score,
            inlier_threshold: best.inlier_threshold,
        });

        Ok(RobustSolution {
            position,
            covariance,
            inliers_data,
            iterations: iteration,
        })
    }
}
