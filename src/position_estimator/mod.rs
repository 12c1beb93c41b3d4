//! # Position estimator
//!
//! [`PositionEstimator`] is the entry point of the crate. It holds one snapshot
//! (radio sources + one [`Fingerprint`]), the configuration of the observation
//! builder and of the consensus loop, and the result of the last estimation.
//!
//! ## Lifecycle
//!
//! ```text
//!            set_sources + set_fingerprint (enough observations)
//! NotReady ───────────────────────────────────────────────────▶ Ready
//!                                                                 │ estimate()
//!                                     success or failure          ▼
//!                              Ready ◀─────────────────────── Locked
//! ```
//!
//! While locked, every setter and `estimate()` itself fail with
//! [`LaterationError::Locked`] and leave the configuration untouched. Listener callbacks
//! run while locked and receive `&mut PositionEstimator`, so this also holds from inside
//! a callback.
//!
//! ## Observation cache
//!
//! Observations are rebuilt as soon as a setter affecting them succeeds: sources,
//! fingerprint, quality scores, source-position covariance usage, fallback distance
//! standard deviation, even distribution of readings and preliminary subset size.
//! [`observations`](PositionEstimator::observations) always reflects the current
//! configuration.
//!
//! ## Example
//!
//! ```rust
//! use nalgebra::Vector2;
//! use radiolateration::position_estimator::PositionEstimator2D;
//! use radiolateration::radio_source::RadioSource;
//! use radiolateration::readings::{Fingerprint, RangingReading};
//!
//! let sources = vec![
//!     RadioSource::new("a", Vector2::new(0.0, 0.0)),
//!     RadioSource::new("b", Vector2::new(10.0, 0.0)),
//!     RadioSource::new("c", Vector2::new(0.0, 10.0)),
//! ];
//! let truth = Vector2::new(3.0, 4.0);
//! let fingerprint: Fingerprint = sources
//!     .iter()
//!     .map(|s| RangingReading::new(s.id(), (s.position() - truth).norm(), None).unwrap().into())
//!     .collect();
//!
//! let mut estimator = PositionEstimator2D::builder()
//!     .sources(sources)
//!     .fingerprint(fingerprint)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//!
//! let position = estimator.estimate().unwrap();
//! assert!((position - truth).norm() < 1e-6);
//! ```
use std::fmt;

use nalgebra::{SMatrix, SVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::constants::{DEFAULT_INLIER_THRESHOLD, DEFAULT_STOP_THRESHOLD};
use crate::lateration_errors::LaterationError;
use crate::observations::observation_builder::{ObservationBuilder, ObservationBuilderConfig};
use crate::observations::ObservationSet;
use crate::radio_source::RadioSource;
use crate::readings::Fingerprint;
use crate::robust::robust_estimator::{InliersData, RobustLateration};
use crate::robust::{gt0, RobustMethod, RobustParams};

pub mod builder;
pub mod listener;

pub use builder::PositionEstimatorBuilder;
pub use listener::PositionEstimatorListener;

use listener::ListenerBridge;

/// Readiness / locking state of a [`PositionEstimator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EstimatorState {
    NotReady,
    Ready,
    Locked,
}

/// Result of the last successful [`PositionEstimator::estimate`].
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationResult<const D: usize> {
    pub position: SVector<f64, D>,
    pub covariance: Option<SMatrix<f64, D, D>>,
    pub inliers_data: Option<InliersData>,
    pub iterations: usize,
}

/// Robust position estimator over radio sources and one fingerprint.
pub struct PositionEstimator<const D: usize> {
    method: RobustMethod,
    sources: Option<Vec<RadioSource<D>>>,
    fingerprint: Option<Fingerprint>,
    listener: Option<Box<dyn PositionEstimatorListener<D>>>,
    initial_position: Option<SVector<f64, D>>,
    source_quality_scores: Option<Vec<f64>>,
    reading_quality_scores: Option<Vec<f64>>,
    observation_config: ObservationBuilderConfig,
    params: RobustParams,
    threshold: f64,
    stop_threshold: f64,
    observations: ObservationSet<D>,
    result: Option<EstimationResult<D>>,
    locked: bool,
    seed: Option<u64>,
    rng: StdRng,
}

pub type PositionEstimator2D = PositionEstimator<2>;
pub type PositionEstimator3D = PositionEstimator<3>;

impl<const D: usize> fmt::Debug for PositionEstimator<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionEstimator")
            .field("dimensions", &D)
            .field("method", &self.method)
            .field("state", &self.state())
            .field("sources", &self.sources.as_ref().map(Vec::len))
            .field("readings", &self.fingerprint.as_ref().map(Fingerprint::len))
            .field("observations", &self.observations.len())
            .field("has_listener", &self.listener.is_some())
            .field("params", &self.robust_params())
            .finish_non_exhaustive()
    }
}

impl<const D: usize> PositionEstimator<D> {
    /// Create an empty estimator using `method`.
    ///
    /// Return
    /// ----------
    /// * `Err(InvalidArgument)` unless `D` is 2 or 3.
    pub fn new(method: RobustMethod) -> Result<Self, LaterationError> {
        if !(2..=3).contains(&D) {
            return Err(LaterationError::InvalidArgument(format!(
                "only 2 and 3 dimensions are supported, got {D}"
            )));
        }
        Ok(Self {
            method,
            sources: None,
            fingerprint: None,
            listener: None,
            initial_position: None,
            source_quality_scores: None,
            reading_quality_scores: None,
            observation_config: ObservationBuilderConfig::default(),
            params: RobustParams::for_method(method),
            threshold: DEFAULT_INLIER_THRESHOLD,
            stop_threshold: DEFAULT_STOP_THRESHOLD,
            observations: ObservationSet::default(),
            result: None,
            locked: false,
            seed: None,
            rng: StdRng::from_os_rng(),
        })
    }

    /// Factory applying the default method policy.
    ///
    /// An explicit `method` always wins. Otherwise PROMedS is selected when both
    /// quality-score arrays are supplied, RANSAC when they are not.
    ///
    /// See also
    /// ------------
    /// * [`RobustMethod::default_for`]
    /// * [`PositionEstimatorBuilder::build`] – same policy, with every other input.
    pub fn create(
        method: Option<RobustMethod>,
        source_quality_scores: Option<Vec<f64>>,
        reading_quality_scores: Option<Vec<f64>>,
    ) -> Result<Self, LaterationError> {
        let mut builder = Self::builder();
        if let Some(method) = method {
            builder = builder.method(method);
        }
        if let (Some(sources), Some(readings)) = (source_quality_scores, reading_quality_scores) {
            builder = builder.quality_scores(sources, readings);
        }
        builder.build()
    }

    pub fn builder() -> PositionEstimatorBuilder<D> {
        PositionEstimatorBuilder::new()
    }

    // ------------------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------------------

    pub fn method(&self) -> RobustMethod {
        self.method
    }

    pub fn number_of_dimensions(&self) -> usize {
        D
    }

    /// Minimum number of sources (and of distinct observed sources) to estimate a position.
    pub fn min_required_sources(&self) -> usize {
        D + 1
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// `true` when enough sources are known and the cached observations cover at least
    /// `max(preliminary_subset_size, D + 1)` entries from `D + 1` distinct sources.
    pub fn is_ready(&self) -> bool {
        let required = self.min_required_sources();
        let enough_sources = self.sources.as_ref().is_some_and(|s| s.len() >= required);
        enough_sources
            && self.fingerprint.is_some()
            && self.observations.len() >= self.preliminary_subset_size().max(required)
            && self.observations.distinct_sources() >= required
    }

    pub fn state(&self) -> EstimatorState {
        if self.locked {
            EstimatorState::Locked
        } else if self.is_ready() {
            EstimatorState::Ready
        } else {
            EstimatorState::NotReady
        }
    }

    fn check_unlocked(&self) -> Result<(), LaterationError> {
        if self.locked {
            Err(LaterationError::Locked)
        } else {
            Ok(())
        }
    }

    // ------------------------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------------------------

    pub fn sources(&self) -> Option<&[RadioSource<D>]> {
        self.sources.as_deref()
    }

    /// Replace the known radio sources.
    ///
    /// Return
    /// ----------
    /// * `Err(InvalidArgument)` if `sources` is empty.
    /// * `Err(Locked)` during an estimation.
    pub fn set_sources(&mut self, sources: Vec<RadioSource<D>>) -> Result<(), LaterationError> {
        self.check_unlocked()?;
        if sources.is_empty() {
            return Err(LaterationError::invalid("sources must not be empty"));
        }
        self.sources = Some(sources);
        self.rebuild_observations()
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    /// Replace the fingerprint.
    ///
    /// Return
    /// ----------
    /// * `Err(InvalidArgument)` if the fingerprint holds no reading.
    /// * `Err(Locked)` during an estimation.
    pub fn set_fingerprint(&mut self, fingerprint: Fingerprint) -> Result<(), LaterationError> {
        self.check_unlocked()?;
        if fingerprint.is_empty() {
            return Err(LaterationError::invalid("fingerprint must contain readings"));
        }
        self.fingerprint = Some(fingerprint);
        self.rebuild_observations()
    }

    /// Listener currently attached. `None` while its own callbacks run.
    pub fn listener(&self) -> Option<&dyn PositionEstimatorListener<D>> {
        self.listener.as_deref()
    }

    pub fn set_listener(
        &mut self,
        listener: Option<Box<dyn PositionEstimatorListener<D>>>,
    ) -> Result<(), LaterationError> {
        self.check_unlocked()?;
        self.listener = listener;
        Ok(())
    }

    pub fn initial_position(&self) -> Option<&SVector<f64, D>> {
        self.initial_position.as_ref()
    }

    /// Seed of the nonlinear stage when the linear stage is disabled.
    pub fn set_initial_position(
        &mut self,
        position: Option<SVector<f64, D>>,
    ) -> Result<(), LaterationError> {
        self.check_unlocked()?;
        self.initial_position = position;
        Ok(())
    }

    // ------------------------------------------------------------------------------------
    // Quality scores
    // ------------------------------------------------------------------------------------

    pub fn source_quality_scores(&self) -> Option<&[f64]> {
        self.source_quality_scores.as_deref()
    }

    pub fn fingerprint_readings_quality_scores(&self) -> Option<&[f64]> {
        self.reading_quality_scores.as_deref()
    }

    /// Set one quality score per source (higher is better).
    ///
    /// Ignored without error by RANSAC, LMedS and MSAC, which do not use quality scores;
    /// the getter then keeps returning `None`.
    ///
    /// Return
    /// ----------
    /// * `Err(InvalidArgument)` (PROSAC / PROMedS) if `scores` is empty, holds a non-finite
    ///   value, or does not match the number of sources.
    pub fn set_source_quality_scores(&mut self, scores: Vec<f64>) -> Result<(), LaterationError> {
        self.check_unlocked()?;
        if !self.method.is_quality_weighted() {
            return Ok(());
        }
        validate_quality_scores(&scores, self.sources.as_ref().map(Vec::len), "source")?;
        self.source_quality_scores = Some(scores);
        self.rebuild_observations()
    }

    /// Set one quality score per fingerprint reading (higher is better).
    ///
    /// Same rules as [`set_source_quality_scores`](Self::set_source_quality_scores), the
    /// length being checked against the fingerprint.
    pub fn set_fingerprint_readings_quality_scores(
        &mut self,
        scores: Vec<f64>,
    ) -> Result<(), LaterationError> {
        self.check_unlocked()?;
        if !self.method.is_quality_weighted() {
            return Ok(());
        }
        validate_quality_scores(
            &scores,
            self.fingerprint.as_ref().map(Fingerprint::len),
            "fingerprint reading",
        )?;
        self.reading_quality_scores = Some(scores);
        self.rebuild_observations()
    }

    // ------------------------------------------------------------------------------------
    // Observation builder configuration
    // ------------------------------------------------------------------------------------

    pub fn is_radio_source_position_covariance_used(&self) -> bool {
        self.observation_config.use_radio_source_position_covariance
    }

    pub fn set_radio_source_position_covariance_used(
        &mut self,
        used: bool,
    ) -> Result<(), LaterationError> {
        self.check_unlocked()?;
        self.observation_config.use_radio_source_position_covariance = used;
        self.rebuild_observations()
    }

    pub fn fallback_distance_standard_deviation(&self) -> f64 {
        self.observation_config.fallback_distance_std_dev
    }

    pub fn set_fallback_distance_standard_deviation(
        &mut self,
        std_dev: f64,
    ) -> Result<(), LaterationError> {
        self.check_unlocked()?;
        let config = ObservationBuilderConfig {
            fallback_distance_std_dev: std_dev,
            ..self.observation_config.clone()
        };
        config.validate()?;
        self.observation_config = config;
        self.rebuild_observations()
    }

    pub fn is_evenly_distribute_readings(&self) -> bool {
        self.observation_config.evenly_distribute_readings
    }

    pub fn set_evenly_distribute_readings(&mut self, evenly: bool) -> Result<(), LaterationError> {
        self.check_unlocked()?;
        self.observation_config.evenly_distribute_readings = evenly;
        self.rebuild_observations()
    }

    /// Observations derived from the current snapshot and configuration.
    pub fn observations(&self) -> &ObservationSet<D> {
        &self.observations
    }

    fn rebuild_observations(&mut self) -> Result<(), LaterationError> {
        let builder = ObservationBuilder::new(self.observation_config.clone())?;
        self.observations = match (&self.sources, &self.fingerprint) {
            (Some(sources), Some(fingerprint)) => builder.build(
                sources,
                fingerprint,
                self.source_quality_scores.as_deref(),
                self.reading_quality_scores.as_deref(),
            ),
            _ => ObservationSet::default(),
        };
        Ok(())
    }

    // ------------------------------------------------------------------------------------
    // Consensus loop configuration
    // ------------------------------------------------------------------------------------

    fn update_params(
        &mut self,
        update: impl FnOnce(&mut RobustParams),
    ) -> Result<(), LaterationError> {
        self.check_unlocked()?;
        let mut params = self.params.clone();
        update(&mut params);
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Parameters handed to the consensus loop, with the threshold matching the method.
    pub fn robust_params(&self) -> RobustParams {
        let threshold = if self.method.is_median_based() {
            self.stop_threshold
        } else {
            self.threshold
        };
        RobustParams {
            threshold,
            ..self.params.clone()
        }
    }

    pub fn confidence(&self) -> f64 {
        self.params.confidence
    }

    /// Return
    /// ----------
    /// * `Err(InvalidArgument)` unless `0 < confidence < 1`.
    pub fn set_confidence(&mut self, confidence: f64) -> Result<(), LaterationError> {
        self.update_params(|p| p.confidence = confidence)
    }

    pub fn max_iterations(&self) -> usize {
        self.params.max_iterations
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<(), LaterationError> {
        self.update_params(|p| p.max_iterations = max_iterations)
    }

    pub fn progress_delta(&self) -> f64 {
        self.params.progress_delta
    }

    pub fn set_progress_delta(&mut self, delta: f64) -> Result<(), LaterationError> {
        self.update_params(|p| p.progress_delta = delta)
    }

    /// Inlier threshold used by RANSAC, MSAC and PROSAC.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f64) -> Result<(), LaterationError> {
        self.check_unlocked()?;
        if !gt0(threshold) {
            return Err(LaterationError::invalid("threshold must be > 0"));
        }
        self.threshold = threshold;
        Ok(())
    }

    /// Stop threshold used by LMedS and PROMedS.
    pub fn stop_threshold(&self) -> f64 {
        self.stop_threshold
    }

    pub fn set_stop_threshold(&mut self, threshold: f64) -> Result<(), LaterationError> {
        self.check_unlocked()?;
        if !gt0(threshold) {
            return Err(LaterationError::invalid("stop threshold must be > 0"));
        }
        self.stop_threshold = threshold;
        Ok(())
    }

    pub fn inlier_factor(&self) -> f64 {
        self.params.inlier_factor
    }

    pub fn set_inlier_factor(&mut self, factor: f64) -> Result<(), LaterationError> {
        self.update_params(|p| p.inlier_factor = factor)
    }

    pub fn preliminary_subset_size(&self) -> usize {
        self.params.subset_size(D)
    }

    /// Set the number of observations drawn per iteration and rebuild the observations.
    ///
    /// The observations do not depend on the subset size: the rebuild yields the same set
    /// as any other rebuild from the current sources, fingerprint and quality scores. Only
    /// readiness changes, since [`is_ready`](Self::is_ready) compares the cache size with
    /// the subset size.
    ///
    /// Return
    /// ----------
    /// * `Err(InvalidArgument)` if `size < D + 1`.
    pub fn set_preliminary_subset_size(&mut self, size: usize) -> Result<(), LaterationError> {
        self.check_unlocked()?;
        if size < self.min_required_sources() {
            return Err(LaterationError::InvalidArgument(format!(
                "preliminary subset size must be >= {}, got {size}",
                self.min_required_sources()
            )));
        }
        self.params.preliminary_subset_size = Some(size);
        self.rebuild_observations()
    }

    pub fn is_linear_solver_used(&self) -> bool {
        self.params.lateration.linear_solver_used
    }

    pub fn set_linear_solver_used(&mut self, used: bool) -> Result<(), LaterationError> {
        self.update_params(|p| p.lateration.linear_solver_used = used)
    }

    pub fn is_homogeneous_linear_solver_used(&self) -> bool {
        self.params.lateration.homogeneous_linear_solver_used
    }

    pub fn set_homogeneous_linear_solver_used(
        &mut self,
        used: bool,
    ) -> Result<(), LaterationError> {
        self.update_params(|p| p.lateration.homogeneous_linear_solver_used = used)
    }

    pub fn is_preliminary_solution_refined(&self) -> bool {
        self.params.preliminary_solution_refined
    }

    pub fn set_preliminary_solution_refined(
        &mut self,
        refined: bool,
    ) -> Result<(), LaterationError> {
        self.update_params(|p| p.preliminary_solution_refined = refined)
    }

    pub fn is_result_refined(&self) -> bool {
        self.params.result_refined
    }

    pub fn set_result_refined(&mut self, refined: bool) -> Result<(), LaterationError> {
        self.update_params(|p| p.result_refined = refined)
    }

    pub fn is_covariance_kept(&self) -> bool {
        self.params.covariance_kept
    }

    pub fn set_covariance_kept(&mut self, kept: bool) -> Result<(), LaterationError> {
        self.update_params(|p| p.covariance_kept = kept)
    }

    pub fn is_inliers_kept(&self) -> bool {
        self.params.inliers_kept
    }

    pub fn set_inliers_kept(&mut self, kept: bool) -> Result<(), LaterationError> {
        self.update_params(|p| p.inliers_kept = kept)
    }

    pub fn is_residuals_kept(&self) -> bool {
        self.params.residuals_kept
    }

    pub fn set_residuals_kept(&mut self, kept: bool) -> Result<(), LaterationError> {
        self.update_params(|p| p.residuals_kept = kept)
    }

    /// Seed set with [`set_seed`](Self::set_seed), if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Reseed the subset sampler, making subsequent estimations reproducible.
    pub fn set_seed(&mut self, seed: u64) -> Result<(), LaterationError> {
        self.check_unlocked()?;
        self.seed = Some(seed);
        self.rng = StdRng::seed_from_u64(seed);
        Ok(())
    }

    // ------------------------------------------------------------------------------------
    // Estimation
    // ------------------------------------------------------------------------------------

    pub fn estimation_result(&self) -> Option<&EstimationResult<D>> {
        self.result.as_ref()
    }

    pub fn estimated_position(&self) -> Option<&SVector<f64, D>> {
        self.result.as_ref().map(|r| &r.position)
    }

    pub fn covariance(&self) -> Option<&SMatrix<f64, D, D>> {
        self.result.as_ref().and_then(|r| r.covariance.as_ref())
    }

    pub fn inliers_data(&self) -> Option<&InliersData> {
        self.result.as_ref().and_then(|r| r.inliers_data.as_ref())
    }

    /// Estimate the position of the fingerprint.
    ///
    /// The estimator is locked for the whole call. The listener sees
    /// `on_estimate_start`, then iteration and progress events, then `on_estimate_end`
    /// (still locked, only on success).
    ///
    /// Return
    /// ----------
    /// * `Ok(position)`, also available through [`estimated_position`](Self::estimated_position)
    ///   until the next call.
    /// * `Err(Locked)` when called during an estimation.
    /// * `Err(NotReady)` when [`is_ready`](Self::is_ready) is `false`; nothing is changed.
    /// * `Err(RobustEstimationFailed)` when no model could be fitted; the previous result
    ///   is cleared.
    pub fn estimate(&mut self) -> Result<SVector<f64, D>, LaterationError> {
        self.check_unlocked()?;
        if !self.is_ready() {
            return Err(LaterationError::NotReady);
        }

        self.locked = true;
        self.result = None;
        debug!(
            method = %self.method,
            dimensions = D,
            observations = self.observations.len(),
            "estimating position"
        );

        let mut listener = self.listener.take();
        if let Some(l) = listener.as_deref_mut() {
            l.on_estimate_start(self);
        }

        let observations = self.observations.clone();
        let params = self.robust_params();
        let mut rng = self.rng.clone();

        let outcome = match RobustLateration::new(
            self.method,
            &observations,
            &params,
            self.initial_position,
        ) {
            Ok(robust) => {
                let mut bridge = ListenerBridge {
                    estimator: &mut *self,
                    listener: listener.as_deref_mut(),
                };
                robust.estimate(&mut rng, &mut bridge)
            }
            Err(e) => Err(e),
        };
        self.rng = rng;

        let solution = match outcome {
            Ok(solution) => solution,
            Err(e) => {
                debug!(error = %e, "position estimation failed");
                self.locked = false;
                self.listener = listener;
                return Err(e);
            }
        };

        let position = solution.position;
        self.result = Some(EstimationResult {
            position,
            covariance: solution.covariance,
            inliers_data: solution.inliers_data,
            iterations: solution.iterations,
        });

        if let Some(l) = listener.as_deref_mut() {
            l.on_estimate_end(self);
        }
        self.locked = false;
        self.listener = listener;

        debug!(?position, "position estimated");
        Ok(position)
    }
}

fn validate_quality_scores(
    scores: &[f64],
    expected: Option<usize>,
    what: &str,
) -> Result<(), LaterationError> {
    if scores.is_empty() {
        return Err(LaterationError::InvalidArgument(format!(
            "{what} quality scores must not be empty"
        )));
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(LaterationError::InvalidArgument(format!(
            "{what} quality scores must be finite"
        )));
    }
    match expected {
        Some(n) if n != scores.len() => Err(LaterationError::InvalidArgument(format!(
            "{} {what} quality scores for {n} entries",
            scores.len()
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod position_estimator_test {
    use nalgebra::Vector2;

    use super::*;
    use crate::constants::{DEFAULT_CONFIDENCE, DEFAULT_MAX_ITERATIONS};
    use crate::readings::RangingReading;

    fn snapshot() -> (Vec<RadioSource<2>>, Fingerprint) {
        let sources = vec![
            RadioSource::new("a", Vector2::new(0.0, 0.0)),
            RadioSource::new("b", Vector2::new(10.0, 0.0)),
            RadioSource::new("c", Vector2::new(0.0, 10.0)),
        ];
        let truth = Vector2::new(3.0, 4.0);
        let fingerprint = sources
            .iter()
            .map(|s| {
                RangingReading::new(s.id(), (s.position() - truth).norm(), None)
                    .unwrap()
                    .into()
            })
            .collect();
        (sources, fingerprint)
    }

    #[test]
    fn test_defaults() {
        let estimator = PositionEstimator2D::new(RobustMethod::Msac).unwrap();
        assert_eq!(estimator.method(), RobustMethod::Msac);
        assert_eq!(estimator.number_of_dimensions(), 2);
        assert_eq!(estimator.min_required_sources(), 3);
        assert_eq!(estimator.preliminary_subset_size(), 3);
        assert_eq!(estimator.confidence(), DEFAULT_CONFIDENCE);
        assert_eq!(estimator.max_iterations(), DEFAULT_MAX_ITERATIONS);
        assert_eq!(estimator.state(), EstimatorState::NotReady);
        assert!(estimator.is_radio_source_position_covariance_used());
        assert!(estimator.is_evenly_distribute_readings());
        assert!(estimator.is_linear_solver_used());
        assert!(!estimator.is_homogeneous_linear_solver_used());
        assert!(!estimator.is_preliminary_solution_refined());
        assert!(estimator.is_result_refined());
        assert!(estimator.is_covariance_kept());
        assert!(estimator.estimated_position().is_none());
        assert!(estimator.listener().is_none());
    }

    #[test]
    fn test_unsupported_dimension() {
        assert!(matches!(
            PositionEstimator::<4>::new(RobustMethod::Ransac),
            Err(LaterationError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_quality_scores_ignored_by_unweighted_methods() {
        let (sources, _) = snapshot();
        let mut estimator = PositionEstimator2D::new(RobustMethod::Lmeds).unwrap();
        estimator.set_sources(sources).unwrap();
        assert!(estimator.set_source_quality_scores(vec![]).is_ok());
        assert!(estimator.source_quality_scores().is_none());

        let mut estimator = PositionEstimator2D::new(RobustMethod::Prosac).unwrap();
        estimator.set_sources(snapshot().0).unwrap();
        assert!(estimator.set_source_quality_scores(vec![]).is_err());
        assert!(estimator.set_source_quality_scores(vec![1.0, 2.0]).is_err());
        estimator.set_source_quality_scores(vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(estimator.source_quality_scores(), Some(&[1.0, 2.0, 3.0][..]));
    }

    #[test]
    fn test_thresholds_follow_method() {
        let mut estimator = PositionEstimator2D::new(RobustMethod::Promeds).unwrap();
        estimator.set_threshold(0.5).unwrap();
        estimator.set_stop_threshold(1e-3).unwrap();
        assert_eq!(estimator.robust_params().threshold, 1e-3);
        assert!(estimator.set_stop_threshold(-1.0).is_err());
        assert_eq!(estimator.stop_threshold(), 1e-3);

        let mut estimator = PositionEstimator2D::new(RobustMethod::Ransac).unwrap();
        estimator.set_threshold(0.5).unwrap();
        assert_eq!(estimator.robust_params().threshold, 0.5);
    }

    #[test]
    fn test_estimate_reference_triangle() {
        let (sources, fingerprint) = snapshot();
        let mut estimator = PositionEstimator2D::new(RobustMethod::Ransac).unwrap();
        assert_eq!(estimator.estimate(), Err(LaterationError::NotReady));

        estimator.set_sources(sources).unwrap();
        estimator.set_fingerprint(fingerprint).unwrap();
        estimator.set_seed(1).unwrap();
        assert_eq!(estimator.state(), EstimatorState::Ready);

        let position = estimator.estimate().unwrap();
        assert!((position - Vector2::new(3.0, 4.0)).norm() < 1e-6);
        assert_eq!(estimator.estimated_position(), Some(&position));
        assert!(estimator.covariance().is_some());
        assert_eq!(estimator.inliers_data().map(InliersData::num_inliers), Some(3));
        assert!(!estimator.is_locked());
    }
}
