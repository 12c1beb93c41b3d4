//! Robust position estimation from radio sources.
//!
//! Known radio sources and one fingerprint of ranging / RSSI readings go in, a 2D or 3D
//! position (with covariance and inlier classification) comes out. See
//! [`position_estimator::PositionEstimator`] for the entry point.
pub mod constants;
pub mod lateration;
pub mod lateration_errors;
pub mod observations;
pub mod position_estimator;
#[cfg(feature = "progress")]
pub mod progress_bar;
pub mod radio_source;
pub mod readings;
pub mod robust;

pub use lateration_errors::LaterationError;
pub use position_estimator::{
    EstimationResult, EstimatorState, PositionEstimator, PositionEstimator2D, PositionEstimator3D,
    PositionEstimatorListener,
};
pub use robust::RobustMethod;
