//! # Observations
//!
//! An [`Observation`] is the homogeneous "reference position + distance + distance
//! standard deviation" triple consumed by the lateration solver, enriched with the
//! quality score and the sampling weight used by the quality-weighted robust methods.
//!
//! Observations are derived once per build of the estimator cache by the
//! [`ObservationBuilder`](crate::observations::observation_builder::ObservationBuilder)
//! and are immutable afterwards. They are grouped in an [`ObservationSet`], which also
//! records whether usable quality scores were available.
use nalgebra::SVector;

pub mod observation_builder;

/// A distance-like observation of one reading against one source.
///
/// Fields
/// -----------------
/// * `position`: known position of the source.
/// * `distance`: measured or RSSI-derived distance (≥ 0).
/// * `distance_std_dev`: standard deviation of `distance` (> 0).
/// * `quality_score`: combined source + reading quality (higher is better).
/// * `sampling_weight`: strictly positive weight used by PROSAC / PROMedS sampling.
/// * `source_index`: index of the source in the estimator's source list.
/// * `reading_index`: index of the reading in the fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<const D: usize> {
    pub position: SVector<f64, D>,
    pub distance: f64,
    pub distance_std_dev: f64,
    pub quality_score: f64,
    pub sampling_weight: f64,
    pub source_index: usize,
    pub reading_index: usize,
}

/// Ordered observations built from one (sources, fingerprint) snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservationSet<const D: usize> {
    observations: Vec<Observation<D>>,
    quality_weighted: bool,
}

impl<const D: usize> ObservationSet<D> {
    pub fn new(observations: Vec<Observation<D>>, quality_weighted: bool) -> Self {
        Self {
            observations,
            quality_weighted,
        }
    }

    pub fn observations(&self) -> &[Observation<D>] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// `true` when source and reading quality scores were both available and length-matched.
    pub fn is_quality_weighted(&self) -> bool {
        self.quality_weighted
    }

    pub fn positions(&self) -> Vec<SVector<f64, D>> {
        self.observations.iter().map(|o| o.position).collect()
    }

    pub fn distances(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.distance).collect()
    }

    pub fn distance_std_devs(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.distance_std_dev).collect()
    }

    pub fn quality_scores(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.quality_score).collect()
    }

    pub fn sampling_weights(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.sampling_weight).collect()
    }

    /// Number of distinct sources contributing at least one observation.
    pub fn distinct_sources(&self) -> usize {
        use itertools::Itertools;
        self.observations.iter().map(|o| o.source_index).unique().count()
    }

    /// Keep only the observations selected by `indices`, in that order.
    pub(crate) fn select(&self, indices: &[usize]) -> (Vec<SVector<f64, D>>, Vec<f64>, Vec<f64>) {
        let mut positions = Vec::with_capacity(indices.len());
        let mut distances = Vec::with_capacity(indices.len());
        let mut std_devs = Vec::with_capacity(indices.len());
        for &i in indices {
            let o = &self.observations[i];
            positions.push(o.position);
            distances.push(o.distance);
            std_devs.push(o.distance_std_dev);
        }
        (positions, distances, std_devs)
    }
}
