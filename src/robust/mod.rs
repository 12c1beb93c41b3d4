//! # Robust estimation
//!
//! One consensus loop, five flavours. The [`RobustMethod`] tag selects how subsets are
//! drawn, how a candidate position is scored against every observation, and when the
//! loop may stop early:
//!
//! | Method    | Sampling            | Score                         | Better | Early stop            |
//! |-----------|---------------------|-------------------------------|--------|-----------------------|
//! | RANSAC    | uniform             | inlier count (`r ≤ t`)        | higher | adaptive count        |
//! | LMedS     | uniform             | median of `r²`                | lower  | adaptive, `med ≤ t²`  |
//! | MSAC      | uniform             | `Σ min(r², t²)`               | lower  | adaptive count        |
//! | PROSAC    | quality weighted    | inlier count (`r ≤ t`)        | higher | adaptive count        |
//! | PROMedS   | quality weighted    | median of `r²`                | lower  | adaptive, `med ≤ t²`  |
//!
//! The quality-weighted methods fall back to uniform sampling when the observation set
//! carries no usable quality scores.
//!
//! ## Modules
//!
//! * [`robust_estimator`] – the consensus loop, its listener and result types.
//! * `sampling` – subset draws (uniform and weighted, without replacement).
//! * `scoring` – residuals, scores, inlier masks and the adaptive iteration count.
use std::cmp::Ordering::{Equal, Greater, Less};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONFIDENCE, DEFAULT_COVARIANCE_KEPT, DEFAULT_INLIERS_KEPT, DEFAULT_INLIER_FACTOR,
    DEFAULT_INLIER_THRESHOLD, DEFAULT_MAX_ITERATIONS, DEFAULT_PRELIMINARY_SOLUTION_REFINED,
    DEFAULT_PROGRESS_DELTA, DEFAULT_RESIDUALS_KEPT, DEFAULT_RESULT_REFINED,
    DEFAULT_STOP_THRESHOLD,
};
use crate::lateration::LaterationParams;
use crate::lateration_errors::LaterationError;

pub mod robust_estimator;
pub(crate) mod sampling;
pub(crate) mod scoring;

/// Robust estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RobustMethod {
    #[default]
    Ransac,
    Lmeds,
    Msac,
    Prosac,
    Promeds,
}

impl RobustMethod {
    pub const ALL: [RobustMethod; 5] = [
        RobustMethod::Ransac,
        RobustMethod::Lmeds,
        RobustMethod::Msac,
        RobustMethod::Prosac,
        RobustMethod::Promeds,
    ];

    /// `true` for PROSAC and PROMedS, which sample by quality score.
    pub fn is_quality_weighted(self) -> bool {
        matches!(self, RobustMethod::Prosac | RobustMethod::Promeds)
    }

    /// `true` for LMedS and PROMedS, which score with the median of squared residuals.
    pub fn is_median_based(self) -> bool {
        matches!(self, RobustMethod::Lmeds | RobustMethod::Promeds)
    }

    /// Default threshold of the method: the inlier threshold for RANSAC, MSAC and PROSAC,
    /// the stop threshold for LMedS and PROMedS.
    pub fn default_threshold(self) -> f64 {
        if self.is_median_based() {
            DEFAULT_STOP_THRESHOLD
        } else {
            DEFAULT_INLIER_THRESHOLD
        }
    }

    /// Method picked when none is given explicitly: PROMedS when quality scores are
    /// supplied for both sources and readings, RANSAC otherwise.
    pub fn default_for(has_quality_scores: bool) -> Self {
        if has_quality_scores {
            RobustMethod::Promeds
        } else {
            RobustMethod::Ransac
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RobustMethod::Ransac => "RANSAC",
            RobustMethod::Lmeds => "LMedS",
            RobustMethod::Msac => "MSAC",
            RobustMethod::Prosac => "PROSAC",
            RobustMethod::Promeds => "PROMedS",
        }
    }
}

impl fmt::Display for RobustMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RobustMethod {
    type Err = LaterationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RobustMethod::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| LaterationError::InvalidArgument(format!("unknown robust method '{s}'")))
    }
}

/// Configuration of the consensus loop.
///
/// Fields
/// -----------------
/// * `confidence` – probability that at least one drawn subset is outlier-free, in `(0, 1)`.
/// * `max_iterations` – hard cap on the number of iterations.
/// * `progress_delta` – minimum progress increase between two progress notifications.
/// * `threshold` – inlier threshold (RANSAC, MSAC, PROSAC) or stop threshold (LMedS, PROMedS).
/// * `inlier_factor` – multiplier of the robust standard deviation classifying LMedS /
///   PROMedS inliers.
/// * `preliminary_subset_size` – observations per subset; `None` means the minimum `D + 1`.
/// * `preliminary_solution_refined` – run Levenberg–Marquardt on each subset.
/// * `result_refined` – refit the best model with all its inliers.
/// * `covariance_kept` – compute the covariance of the final position.
/// * `inliers_kept` / `residuals_kept` – retain the inlier mask / residuals of the best model.
/// * `lateration` – solver configuration (linear stage selection, Levenberg–Marquardt settings).
#[derive(Debug, Clone, PartialEq)]
pub struct RobustParams {
    pub confidence: f64,
    pub max_iterations: usize,
    pub progress_delta: f64,
    pub threshold: f64,
    pub inlier_factor: f64,
    pub preliminary_subset_size: Option<usize>,
    pub preliminary_solution_refined: bool,
    pub result_refined: bool,
    pub covariance_kept: bool,
    pub inliers_kept: bool,
    pub residuals_kept: bool,
    pub lateration: LaterationParams,
}

impl Default for RobustParams {
    fn default() -> Self {
        Self::for_method(RobustMethod::default())
    }
}

impl RobustParams {
    /// Defaults with the threshold of `method`.
    pub fn for_method(method: RobustMethod) -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            progress_delta: DEFAULT_PROGRESS_DELTA,
            threshold: method.default_threshold(),
            inlier_factor: DEFAULT_INLIER_FACTOR,
            preliminary_subset_size: None,
            preliminary_solution_refined: DEFAULT_PRELIMINARY_SOLUTION_REFINED,
            result_refined: DEFAULT_RESULT_REFINED,
            covariance_kept: DEFAULT_COVARIANCE_KEPT,
            inliers_kept: DEFAULT_INLIERS_KEPT,
            residuals_kept: DEFAULT_RESIDUALS_KEPT,
            lateration: LaterationParams::default(),
        }
    }

    pub fn builder(method: RobustMethod) -> RobustParamsBuilder {
        RobustParamsBuilder::new(method)
    }

    /// Subset size for a `D`-dimensional problem.
    pub fn subset_size(&self, dims: usize) -> usize {
        self.preliminary_subset_size.unwrap_or(dims + 1)
    }

    /// Check every bound listed on [`RobustParamsBuilder::build`].
    pub(crate) fn validate(&self) -> Result<(), LaterationError> {
        if !(gt0(self.confidence) && lt(self.confidence, 1.0)) {
            return Err(LaterationError::invalid("confidence must be in (0, 1)"));
        }
        if self.max_iterations == 0 {
            return Err(LaterationError::invalid("max_iterations must be >= 1"));
        }
        if !(ge0(self.progress_delta) && le(self.progress_delta, 1.0)) {
            return Err(LaterationError::invalid("progress_delta must be in [0, 1]"));
        }
        if !gt0(self.threshold) {
            return Err(LaterationError::invalid("threshold must be > 0"));
        }
        if !le(1.0, self.inlier_factor) {
            return Err(LaterationError::invalid("inlier_factor must be >= 1"));
        }
        if self.preliminary_subset_size == Some(0) {
            return Err(LaterationError::invalid(
                "preliminary_subset_size must be >= 1",
            ));
        }
        self.lateration.validate()
    }
}

// ---- Numeric helpers for PartialOrd (NaN is never valid) ----

#[inline]
pub(crate) fn gt0(x: f64) -> bool {
    x.partial_cmp(&0.0) == Some(Greater)
}

#[inline]
pub(crate) fn ge0(x: f64) -> bool {
    matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
}

#[inline]
pub(crate) fn le(a: f64, b: f64) -> bool {
    matches!(a.partial_cmp(&b), Some(Less) | Some(Equal))
}

#[inline]
pub(crate) fn lt(a: f64, b: f64) -> bool {
    a.partial_cmp(&b) == Some(Less)
}

/// Fluent builder for [`RobustParams`].
#[derive(Debug, Clone)]
pub struct RobustParamsBuilder {
    params: RobustParams,
}

impl RobustParamsBuilder {
    pub fn new(method: RobustMethod) -> Self {
        Self {
            params: RobustParams::for_method(method),
        }
    }

    pub fn confidence(mut self, v: f64) -> Self {
        self.params.confidence = v;
        self
    }
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.params.max_iterations = v;
        self
    }
    pub fn progress_delta(mut self, v: f64) -> Self {
        self.params.progress_delta = v;
        self
    }
    pub fn threshold(mut self, v: f64) -> Self {
        self.params.threshold = v;
        self
    }
    pub fn inlier_factor(mut self, v: f64) -> Self {
        self.params.inlier_factor = v;
        self
    }
    pub fn preliminary_subset_size(mut self, v: usize) -> Self {
        self.params.preliminary_subset_size = Some(v);
        self
    }
    pub fn preliminary_solution_refined(mut self, v: bool) -> Self {
        self.params.preliminary_solution_refined = v;
        self
    }
    pub fn result_refined(mut self, v: bool) -> Self {
        self.params.result_refined = v;
        self
    }
    pub fn covariance_kept(mut self, v: bool) -> Self {
        self.params.covariance_kept = v;
        self
    }
    pub fn inliers_kept(mut self, v: bool) -> Self {
        self.params.inliers_kept = v;
        self
    }
    pub fn residuals_kept(mut self, v: bool) -> Self {
        self.params.residuals_kept = v;
        self
    }

    // --- Lateration solver ---
    pub fn linear_solver_used(mut self, v: bool) -> Self {
        self.params.lateration.linear_solver_used = v;
        self
    }
    pub fn homogeneous_linear_solver_used(mut self, v: bool) -> Self {
        self.params.lateration.homogeneous_linear_solver_used = v;
        self
    }
    pub fn lateration(mut self, v: LaterationParams) -> Self {
        self.params.lateration = v;
        self
    }

    /// Finalize the builder and produce a [`RobustParams`] instance.
    ///
    /// Validation rules
    /// -----------------
    /// * `0 < confidence < 1`
    /// * `max_iterations ≥ 1`
    /// * `0 ≤ progress_delta ≤ 1`
    /// * `threshold > 0`
    /// * `inlier_factor ≥ 1`
    /// * `preliminary_subset_size ≥ 1` when set (the `≥ D + 1` bound is checked by
    ///   [`RobustLateration::new`](crate::robust::robust_estimator::RobustLateration::new))
    /// * the nested [`LaterationParams`] bounds.
    ///
    /// Returns
    /// -----------------
    /// * `Ok(RobustParams)` if all values are valid.
    /// * `Err(LaterationError::InvalidArgument)` naming the first violated rule.
    pub fn build(self) -> Result<RobustParams, LaterationError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

impl fmt::Display for RobustParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            const PARAM_COL: usize = 46;
            writeln!(f, "Robust Estimation Parameters")?;
            writeln!(f, "----------------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Consensus loop]")?;
            line!(
                "confidence              = {:.4}",
                self.confidence,
                "Probability of an outlier-free subset"
            )?;
            line!("max_iterations          = {}", self.max_iterations, "Iteration cap")?;
            line!(
                "progress_delta          = {:.3}",
                self.progress_delta,
                "Progress notification step"
            )?;
            line!("threshold               = {:.3e}", self.threshold, "Inlier or stop threshold")?;
            line!(
                "inlier_factor           = {:.3}",
                self.inlier_factor,
                "LMedS / PROMedS inlier factor"
            )?;
            match self.preliminary_subset_size {
                Some(k) => line!("preliminary_subset_size = {}", k, "Observations per subset")?,
                None => line!("preliminary_subset_size = {}", "D+1", "Observations per subset")?,
            }

            writeln!(f, "\n[Refinement / outputs]")?;
            line!(
                "preliminary_refined     = {}",
                self.preliminary_solution_refined,
                "Levenberg–Marquardt on subsets"
            )?;
            line!(
                "result_refined          = {}",
                self.result_refined,
                "Refit best model on inliers"
            )?;
            line!(
                "covariance_kept         = {}",
                self.covariance_kept,
                "Compute final covariance"
            )?;
            line!("inliers_kept            = {}", self.inliers_kept, "Keep inlier mask")?;
            line!("residuals_kept          = {}", self.residuals_kept, "Keep residuals")?;

            writeln!(f, "\n[Lateration solver]")?;
            line!(
                "linear_solver_used      = {}",
                self.lateration.linear_solver_used,
                "Closed-form initial guess"
            )?;
            line!(
                "homogeneous_linear      = {}",
                self.lateration.homogeneous_linear_solver_used,
                "Homogeneous formulation"
            )?;
            line!(
                "lm_max_iterations       = {}",
                self.lateration.max_iterations,
                "Levenberg–Marquardt iteration cap"
            )?;
            line!(
                "lm_tolerance            = {:.1e}",
                self.lateration.tolerance,
                "Relative cost decrease tolerance"
            )?;

            Ok(())
        } else {
            write!(
                f,
                "RobustParams(confidence={:.3}, max_iterations={}, threshold={:.1e}, \
                 inlier_factor={:.2}, result_refined={}, covariance_kept={})",
                self.confidence,
                self.max_iterations,
                self.threshold,
                self.inlier_factor,
                self.result_refined,
                self.covariance_kept,
            )
        }
    }
}
