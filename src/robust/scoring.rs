//! Residuals, model scores, inlier classification and the adaptive iteration count.
use nalgebra::SVector;

use crate::constants::{MAD_GAUSSIAN_SCALE, MEDIAN_BREAKDOWN_RATIO};
use crate::observations::ObservationSet;
use crate::robust::RobustMethod;

/// Absolute residuals `|‖x − pᵢ‖ − dᵢ|` of every observation.
pub(crate) fn residuals<const D: usize>(set: &ObservationSet<D>, x: &SVector<f64, D>) -> Vec<f64> {
    set.observations()
        .iter()
        .map(|o| ((x - o.position).norm() - o.distance).abs())
        .collect()
}

/// Median of `values`, averaging the two middle elements on even lengths.
pub(crate) fn median(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    let mut v = values.to_vec();
    let mid = n / 2;
    let (_, upper, _) = v.select_nth_unstable_by(mid, f64::total_cmp);
    let upper = *upper;
    if n % 2 == 1 {
        return upper;
    }
    let lower = v[..mid].iter().copied().fold(f64::NEG_INFINITY, f64::max);
    0.5 * (lower + upper)
}

/// Score of a candidate model.
pub(crate) fn score(method: RobustMethod, residuals: &[f64], threshold: f64) -> f64 {
    match method {
        RobustMethod::Ransac | RobustMethod::Prosac => {
            residuals.iter().filter(|r| **r <= threshold).count() as f64
        }
        RobustMethod::Lmeds | RobustMethod::Promeds => {
            let squared: Vec<f64> = residuals.iter().map(|r| r * r).collect();
            median(&squared)
        }
        RobustMethod::Msac => {
            let t2 = threshold * threshold;
            residuals.iter().map(|r| (r * r).min(t2)).sum()
        }
    }
}

/// Strict improvement test; the first best model is never replaced by an equal one.
pub(crate) fn improves(method: RobustMethod, candidate: f64, best: Option<f64>) -> bool {
    if candidate.is_nan() {
        return false;
    }
    match (method, best) {
        (_, None) => true,
        (RobustMethod::Ransac | RobustMethod::Prosac, Some(b)) => candidate > b,
        (_, Some(b)) => candidate < b,
    }
}

/// Inlier threshold of the median-based methods:
/// `max(factor · 1.4826 · (1 + 5/(n − k)) · √median, t)`.
pub(crate) fn median_inlier_threshold(
    median_sq: f64,
    n: usize,
    k: usize,
    inlier_factor: f64,
    threshold: f64,
) -> f64 {
    let dof = n.saturating_sub(k).max(1) as f64;
    let sigma = MAD_GAUSSIAN_SCALE * (1.0 + 5.0 / dof) * median_sq.max(0.0).sqrt();
    (inlier_factor * sigma).max(threshold)
}

/// Inlier mask of a model given its residuals.
pub(crate) fn inliers(residuals: &[f64], inlier_threshold: f64) -> (Vec<bool>, usize) {
    let mask: Vec<bool> = residuals.iter().map(|r| *r <= inlier_threshold).collect();
    let count = mask.iter().filter(|m| **m).count();
    (mask, count)
}

/// Inlier ratio that sizes the search after a new best model.
///
/// The median-based inlier threshold scales with the candidate's own median, so a
/// contaminated candidate can classify every observation as an inlier. Their ratio is
/// therefore capped at [`MEDIAN_BREAKDOWN_RATIO`].
pub(crate) fn consensus_ratio(method: RobustMethod, num_inliers: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let ratio = num_inliers as f64 / n as f64;
    if method.is_median_based() {
        ratio.min(MEDIAN_BREAKDOWN_RATIO)
    } else {
        ratio
    }
}

/// Iterations needed to draw one outlier-free subset of size `k` with probability
/// `confidence`, given an inlier ratio, capped at `max_iterations`.
pub(crate) fn required_iterations(
    confidence: f64,
    inlier_ratio: f64,
    k: usize,
    max_iterations: usize,
) -> usize {
    if inlier_ratio >= 1.0 {
        return 1;
    }
    if !(inlier_ratio > 0.0) {
        return max_iterations;
    }
    let all_inliers = inlier_ratio.powi(k as i32);
    let denom = (1.0 - all_inliers).ln();
    if !(denom < 0.0) {
        return max_iterations;
    }
    let n = ((1.0 - confidence).ln() / denom).ceil();
    if n.is_finite() && n < max_iterations as f64 {
        (n as usize).max(1)
    } else {
        max_iterations
    }
}
