//! # Observation builder
//!
//! Turns a `(sources, fingerprint, quality scores)` snapshot into the ordered
//! [`ObservationSet`] consumed by the robust estimator.
//!
//! ## Expansion rules
//!
//! 1. A reading whose `source_id` matches no source is discarded.
//! 2. A ranging reading yields one observation with its measured distance.
//! 3. An RSSI reading yields one observation with the distance derived by
//!    [`rssi_to_distance`]; it is discarded if the source has no transmitter description.
//! 4. A combined ranging + RSSI reading yields **both** observations, which are then
//!    independent entries for sampling and scoring.
//!
//! ## Standard deviations
//!
//! A missing reading standard deviation is replaced by the configured fallback.
//! When source position covariances are used, the position uncertainty is added
//! in quadrature: `σ² = σ_reading² + tr(Σ_source)`, or `σ_reading² + fallback²` for
//! a source without covariance.
//!
//! ## Ordering and sampling weights
//!
//! Observations are grouped per source. When quality scores are usable, sources are
//! ordered by decreasing source quality and readings by decreasing observation quality.
//! With `evenly_distribute_readings`, groups are interleaved round-robin (best reading
//! of every source first) and each sampling weight is divided by the number of
//! observations of its source, so that no source dominates the weighted sampling.
use std::collections::HashMap;

use tracing::trace;

use crate::constants::{
    DEFAULT_EVENLY_DISTRIBUTE_READINGS, DEFAULT_USE_RADIO_SOURCE_POSITION_COVARIANCE,
    FALLBACK_DISTANCE_STANDARD_DEVIATION, QUALITY_WEIGHT_FLOOR,
};
use crate::lateration_errors::LaterationError;
use crate::observations::{Observation, ObservationSet};
use crate::radio_source::RadioSource;
use crate::readings::path_loss::rssi_to_distance;
use crate::readings::Fingerprint;

/// Configuration of the [`ObservationBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationBuilderConfig {
    pub use_radio_source_position_covariance: bool,
    pub fallback_distance_std_dev: f64,
    pub evenly_distribute_readings: bool,
}

impl Default for ObservationBuilderConfig {
    fn default() -> Self {
        Self {
            use_radio_source_position_covariance: DEFAULT_USE_RADIO_SOURCE_POSITION_COVARIANCE,
            fallback_distance_std_dev: FALLBACK_DISTANCE_STANDARD_DEVIATION,
            evenly_distribute_readings: DEFAULT_EVENLY_DISTRIBUTE_READINGS,
        }
    }
}

impl ObservationBuilderConfig {
    /// Check that the fallback standard deviation is strictly positive and finite.
    pub fn validate(&self) -> Result<(), LaterationError> {
        let s = self.fallback_distance_std_dev;
        if !(s > 0.0) || !s.is_finite() {
            return Err(LaterationError::invalid(
                "fallback distance standard deviation must be > 0",
            ));
        }
        Ok(())
    }
}

/// Builds observation sets from sources and fingerprints.
#[derive(Debug, Clone, Default)]
pub struct ObservationBuilder {
    config: ObservationBuilderConfig,
}

impl ObservationBuilder {
    pub fn new(config: ObservationBuilderConfig) -> Result<Self, LaterationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ObservationBuilderConfig {
        &self.config
    }

    /// Build the observation set of one snapshot.
    ///
    /// Arguments
    /// -----------------
    /// * `sources`: known radio sources.
    /// * `fingerprint`: readings captured at the unknown location.
    /// * `source_quality_scores`: optional score per source.
    /// * `reading_quality_scores`: optional score per fingerprint reading.
    ///
    /// Return
    /// ----------
    /// * An [`ObservationSet`]; it is quality weighted only when both score arrays are
    ///   present and match the source and reading counts.
    pub fn build<const D: usize>(
        &self,
        sources: &[RadioSource<D>],
        fingerprint: &Fingerprint,
        source_quality_scores: Option<&[f64]>,
        reading_quality_scores: Option<&[f64]>,
    ) -> ObservationSet<D> {
        // first occurrence of a duplicated id wins
        let index: HashMap<&str, usize> = sources
            .iter()
            .enumerate()
            .rev()
            .map(|(i, s)| (s.id(), i))
            .collect();

        let scores = match (source_quality_scores, reading_quality_scores) {
            (Some(s), Some(r)) if s.len() == sources.len() && r.len() == fingerprint.len() => {
                Some((s, r))
            }
            _ => None,
        };

        let mut raw = Vec::with_capacity(fingerprint.len() * 2);
        for (reading_index, reading) in fingerprint.readings().iter().enumerate() {
            let Some(&source_index) = index.get(reading.source_id()) else {
                trace!(source_id = reading.source_id(), "discarding reading of unknown source");
                continue;
            };
            let source = &sources[source_index];
            let quality = scores.map_or(0.0, |(s, r)| s[source_index] + r[reading_index]);

            if let Some(ranging) = reading.ranging() {
                raw.push(Observation {
                    position: *source.position(),
                    distance: ranging.distance(),
                    distance_std_dev: self.distance_std_dev(source, ranging.distance_std_dev()),
                    quality_score: quality,
                    sampling_weight: 1.0,
                    source_index,
                    reading_index,
                });
            }

            if let Some(rssi) = reading.rssi() {
                match source.power() {
                    Some(power) => {
                        let estimated =
                            rssi_to_distance(power, rssi.rssi_dbm(), rssi.rssi_std_dev());
                        raw.push(Observation {
                            position: *source.position(),
                            distance: estimated.distance,
                            distance_std_dev: self.distance_std_dev(source, estimated.std_dev),
                            quality_score: quality,
                            sampling_weight: 1.0,
                            source_index,
                            reading_index,
                        });
                    }
                    None => trace!(
                        source_id = source.id(),
                        "discarding rssi reading of a source without transmitter power"
                    ),
                }
            }
        }

        let source_scores = scores.map(|(s, _)| s);
        let ordered = self.arrange(raw, source_scores);
        ObservationSet::new(ordered, scores.is_some())
    }

    fn distance_std_dev<const D: usize>(
        &self,
        source: &RadioSource<D>,
        reading: Option<f64>,
    ) -> f64 {
        let fallback = self.config.fallback_distance_std_dev;
        let base = reading.filter(|s| *s > 0.0).unwrap_or(fallback);
        if !self.config.use_radio_source_position_covariance {
            return base;
        }
        let position_variance = source
            .position_covariance()
            .map_or(fallback * fallback, |c| c.trace().max(0.0));
        (base * base + position_variance).sqrt()
    }

    /// Order observations per source and assign sampling weights.
    fn arrange<const D: usize>(
        &self,
        raw: Vec<Observation<D>>,
        source_scores: Option<&[f64]>,
    ) -> Vec<Observation<D>> {
        let mut groups: Vec<Vec<Observation<D>>> = Vec::new();
        let mut slot: HashMap<usize, usize> = HashMap::new();
        for obs in raw {
            let g = *slot.entry(obs.source_index).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[g].push(obs);
        }

        if let Some(scores) = source_scores {
            groups.sort_by(|a, b| scores[b[0].source_index].total_cmp(&scores[a[0].source_index]));
            for group in groups.iter_mut() {
                group.sort_by(|a, b| b.quality_score.total_cmp(&a.quality_score));
            }
        }

        let (min_q, max_q) = groups
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), o| {
                (lo.min(o.quality_score), hi.max(o.quality_score))
            });
        let floor = QUALITY_WEIGHT_FLOOR * (max_q - min_q).max(1.0);
        let evenly = self.config.evenly_distribute_readings;

        for group in groups.iter_mut() {
            let share = if evenly { group.len() as f64 } else { 1.0 };
            for obs in group.iter_mut() {
                obs.sampling_weight = (obs.quality_score - min_q + floor) / share;
            }
        }

        if !evenly {
            return groups.into_iter().flatten().collect();
        }

        let total = groups.iter().map(Vec::len).sum();
        let mut ordered = Vec::with_capacity(total);
        let mut iters: Vec<_> = groups.into_iter().map(Vec::into_iter).collect();
        while ordered.len() < total {
            for it in iters.iter_mut() {
                if let Some(obs) = it.next() {
                    ordered.push(obs);
                }
            }
        }
        ordered
    }
}
