//! Fluent construction of a [`PositionEstimator`].
use nalgebra::SVector;

use crate::lateration_errors::LaterationError;
use crate::position_estimator::{PositionEstimator, PositionEstimatorListener};
use crate::radio_source::RadioSource;
use crate::readings::Fingerprint;
use crate::robust::RobustMethod;

/// Builder accepting any combination of the estimator inputs.
///
/// Every input goes through the matching setter of [`PositionEstimator`] when
/// [`build`](Self::build) runs, so invalid inputs fail there with
/// [`LaterationError::InvalidArgument`] rather than at `estimate()` time.
pub struct PositionEstimatorBuilder<const D: usize> {
    method: Option<RobustMethod>,
    sources: Option<Vec<RadioSource<D>>>,
    fingerprint: Option<Fingerprint>,
    listener: Option<Box<dyn PositionEstimatorListener<D>>>,
    initial_position: Option<SVector<f64, D>>,
    quality_scores: Option<(Vec<f64>, Vec<f64>)>,
    seed: Option<u64>,
}

impl<const D: usize> Default for PositionEstimatorBuilder<D> {
    fn default() -> Self {
        Self {
            method: None,
            sources: None,
            fingerprint: None,
            listener: None,
            initial_position: None,
            quality_scores: None,
            seed: None,
        }
    }
}

impl<const D: usize> PositionEstimatorBuilder<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: RobustMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn sources(mut self, sources: Vec<RadioSource<D>>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn listener(mut self, listener: impl PositionEstimatorListener<D> + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn initial_position(mut self, position: SVector<f64, D>) -> Self {
        self.initial_position = Some(position);
        self
    }

    /// One score per source and one per fingerprint reading.
    pub fn quality_scores(mut self, sources: Vec<f64>, readings: Vec<f64>) -> Self {
        self.quality_scores = Some((sources, readings));
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the estimator.
    ///
    /// Without an explicit method, PROMedS is selected when quality scores were given and
    /// RANSAC otherwise.
    ///
    /// Return
    /// ----------
    /// * `Err(InvalidArgument)` on the first invalid input (empty sources, empty
    ///   fingerprint, quality scores not matching the sources or readings, `D ∉ {2, 3}`).
    pub fn build(self) -> Result<PositionEstimator<D>, LaterationError> {
        let method = self
            .method
            .unwrap_or_else(|| RobustMethod::default_for(self.quality_scores.is_some()));
        let mut estimator = PositionEstimator::new(method)?;

        if let Some(seed) = self.seed {
            estimator.set_seed(seed)?;
        }
        if let Some(sources) = self.sources {
            estimator.set_sources(sources)?;
        }
        if let Some(fingerprint) = self.fingerprint {
            estimator.set_fingerprint(fingerprint)?;
        }
        if let Some((sources, readings)) = self.quality_scores {
            estimator.set_source_quality_scores(sources)?;
            estimator.set_fingerprint_readings_quality_scores(readings)?;
        }
        estimator.set_initial_position(self.initial_position)?;
        estimator.set_listener(self.listener)?;
        Ok(estimator)
    }
}
