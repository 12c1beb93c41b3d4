//! # Constants
//!
//! This module centralizes the **default values** of every tunable parameter and the
//! **physical constants** used by the RSSI path-loss conversion.
//!
//! ## Overview
//!
//! - Robust estimation defaults (confidence, iteration cap, progress granularity, thresholds)
//! - Lateration solver defaults (Levenberg–Marquardt tolerances)
//! - Observation builder defaults (fallback distance standard deviation)

// -------------------------------------------------------------------------------------------------
// Physical constants
// -------------------------------------------------------------------------------------------------

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Path-loss exponent of free-space propagation
pub const DEFAULT_PATH_LOSS_EXPONENT: f64 = 2.0;

// -------------------------------------------------------------------------------------------------
// Observation builder defaults
// -------------------------------------------------------------------------------------------------

/// Distance standard deviation used when a reading carries none, and as the source
/// position uncertainty when a source lacks a position covariance.
pub const FALLBACK_DISTANCE_STANDARD_DEVIATION: f64 = 1e-3;

/// Whether source position covariances are folded into distance standard deviations by default.
pub const DEFAULT_USE_RADIO_SOURCE_POSITION_COVARIANCE: bool = true;

/// Whether readings are evenly distributed among sources by default.
pub const DEFAULT_EVENLY_DISTRIBUTE_READINGS: bool = true;

/// Relative floor added to shifted quality scores so that every observation keeps
/// a strictly positive sampling weight.
pub const QUALITY_WEIGHT_FLOOR: f64 = 1e-2;

// -------------------------------------------------------------------------------------------------
// Robust estimation defaults
// -------------------------------------------------------------------------------------------------

/// Default probability that at least one sampled subset is outlier-free.
pub const DEFAULT_CONFIDENCE: f64 = 0.99;

/// Default upper bound on the number of consensus iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 5000;

/// Default progress granularity between two listener notifications.
pub const DEFAULT_PROGRESS_DELTA: f64 = 0.05;

/// Default inlier threshold (distance units) for RANSAC, MSAC and PROSAC.
pub const DEFAULT_INLIER_THRESHOLD: f64 = 0.1;

/// Default stop threshold (distance units) for LMedS and PROMedS.
pub const DEFAULT_STOP_THRESHOLD: f64 = 1e-5;

/// Default factor applied to the robust standard deviation to classify LMedS/PROMedS inliers.
pub const DEFAULT_INLIER_FACTOR: f64 = 1.5;

/// Consistency constant of the median absolute deviation for Gaussian noise.
pub const MAD_GAUSSIAN_SCALE: f64 = 1.4826;

/// Largest outlier-free ratio the median-based methods assume when sizing the search.
pub const MEDIAN_BREAKDOWN_RATIO: f64 = 0.5;

/// Default for refining the preliminary solutions found on each subset.
pub const DEFAULT_PRELIMINARY_SOLUTION_REFINED: bool = false;

/// Default for refining the best model with all its inliers.
pub const DEFAULT_RESULT_REFINED: bool = true;

/// Default for keeping the covariance of the final estimate.
pub const DEFAULT_COVARIANCE_KEPT: bool = true;

/// Default for keeping the inlier mask of the best model.
pub const DEFAULT_INLIERS_KEPT: bool = true;

/// Default for keeping the residuals of the best model.
pub const DEFAULT_RESIDUALS_KEPT: bool = false;

// -------------------------------------------------------------------------------------------------
// Lateration solver defaults
// -------------------------------------------------------------------------------------------------

/// Default for running the closed-form linear stage.
pub const DEFAULT_LINEAR_SOLVER_USED: bool = true;

/// Default for the homogeneous (instead of inhomogeneous) linear formulation.
pub const DEFAULT_HOMOGENEOUS_LINEAR_SOLVER_USED: bool = false;

/// Default maximum number of Levenberg–Marquardt iterations.
pub const DEFAULT_LM_MAX_ITERATIONS: usize = 100;

/// Default relative cost-decrease tolerance of Levenberg–Marquardt.
pub const DEFAULT_LM_TOLERANCE: f64 = 1e-12;

/// Default initial Levenberg–Marquardt damping.
pub const DEFAULT_LM_INITIAL_DAMPING: f64 = 1e-3;

/// Ratio between the smallest and the largest singular value under which a system is singular.
pub const SINGULARITY_RCOND: f64 = 1e-12;
