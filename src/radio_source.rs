//! # Radio sources
//!
//! A [`RadioSource`] is a reference emitter placed at a **known position** (2D or 3D),
//! optionally with a position covariance describing how well that position is known,
//! and optionally with a [`TransmitterPower`] description required to turn RSSI
//! readings into distances.
//!
//! Sources are identified by a string `id`; readings refer to their source through
//! that identifier (see [`Reading::source_id`](crate::readings::Reading::source_id)).
//!
//! ## Example
//!
//! ```rust
//! use nalgebra::Vector2;
//! use radiolateration::radio_source::{RadioSource, TransmitterPower};
//!
//! let ap = RadioSource::new("ap-1", Vector2::new(0.0, 0.0))
//!     .with_power(TransmitterPower::new(-20.0, 2.4e9).unwrap());
//! assert!(ap.power().is_some());
//! ```
use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PATH_LOSS_EXPONENT;
use crate::lateration_errors::LaterationError;

/// Transmitter description of a source, needed by the path-loss conversion.
///
/// Fields
/// -----------------
/// * `transmitted_power_dbm`: transmitted power (dBm).
/// * `transmitted_power_std_dev`: optional standard deviation of the transmitted power (dB).
/// * `frequency_hz`: carrier frequency (Hz), strictly positive.
/// * `path_loss_exponent`: log-distance path-loss exponent (2.0 in free space).
/// * `path_loss_exponent_std_dev`: optional standard deviation of the exponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmitterPower {
    pub transmitted_power_dbm: f64,
    pub transmitted_power_std_dev: Option<f64>,
    pub frequency_hz: f64,
    pub path_loss_exponent: f64,
    pub path_loss_exponent_std_dev: Option<f64>,
}

impl TransmitterPower {
    /// Free-space transmitter with no uncertainty on its parameters.
    ///
    /// Return
    /// ----------
    /// * `Err(InvalidArgument)` if the frequency is not strictly positive or the power is not finite.
    pub fn new(transmitted_power_dbm: f64, frequency_hz: f64) -> Result<Self, LaterationError> {
        if !transmitted_power_dbm.is_finite() {
            return Err(LaterationError::invalid("transmitted power must be finite"));
        }
        if !(frequency_hz > 0.0) || !frequency_hz.is_finite() {
            return Err(LaterationError::invalid("frequency must be > 0"));
        }
        Ok(Self {
            transmitted_power_dbm,
            transmitted_power_std_dev: None,
            frequency_hz,
            path_loss_exponent: DEFAULT_PATH_LOSS_EXPONENT,
            path_loss_exponent_std_dev: None,
        })
    }

    pub fn with_transmitted_power_std_dev(mut self, std_dev: f64) -> Result<Self, LaterationError> {
        if !(std_dev >= 0.0) {
            return Err(LaterationError::invalid(
                "transmitted power standard deviation must be >= 0",
            ));
        }
        self.transmitted_power_std_dev = Some(std_dev);
        Ok(self)
    }

    pub fn with_path_loss_exponent(
        mut self,
        exponent: f64,
        std_dev: Option<f64>,
    ) -> Result<Self, LaterationError> {
        if !(exponent > 0.0) {
            return Err(LaterationError::invalid("path loss exponent must be > 0"));
        }
        if let Some(s) = std_dev {
            if !(s >= 0.0) {
                return Err(LaterationError::invalid(
                    "path loss exponent standard deviation must be >= 0",
                ));
            }
        }
        self.path_loss_exponent = exponent;
        self.path_loss_exponent_std_dev = std_dev;
        Ok(self)
    }
}

/// A reference emitter at a known position.
///
/// Fields
/// -----------------
/// * `id`: identity referenced by readings.
/// * `position`: known position in a `D`-dimensional frame.
/// * `position_covariance`: optional `D×D` covariance of `position`.
/// * `power`: optional transmitter description (required by RSSI readings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioSource<const D: usize> {
    id: String,
    position: SVector<f64, D>,
    position_covariance: Option<SMatrix<f64, D, D>>,
    power: Option<TransmitterPower>,
}

impl<const D: usize> RadioSource<D> {
    pub fn new(id: impl Into<String>, position: SVector<f64, D>) -> Self {
        Self {
            id: id.into(),
            position,
            position_covariance: None,
            power: None,
        }
    }

    /// Attach a position covariance.
    ///
    /// Return
    /// ----------
    /// * `Err(InvalidArgument)` if the matrix is not symmetric or has a negative or non-finite diagonal.
    pub fn with_position_covariance(
        mut self,
        covariance: SMatrix<f64, D, D>,
    ) -> Result<Self, LaterationError> {
        let symmetric =
            (covariance - covariance.transpose()).amax() <= 1e-9 * covariance.amax().max(1.0);
        let diagonal_ok = covariance.diagonal().iter().all(|v| v.is_finite() && *v >= 0.0);
        if !symmetric || !diagonal_ok {
            return Err(LaterationError::invalid(
                "position covariance must be symmetric with a non-negative diagonal",
            ));
        }
        self.position_covariance = Some(covariance);
        Ok(self)
    }

    pub fn with_power(mut self, power: TransmitterPower) -> Self {
        self.power = Some(power);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> &SVector<f64, D> {
        &self.position
    }

    pub fn position_covariance(&self) -> Option<&SMatrix<f64, D, D>> {
        self.position_covariance.as_ref()
    }

    pub fn power(&self) -> Option<&TransmitterPower> {
        self.power.as_ref()
    }
}

#[cfg(test)]
mod radio_source_test {
    use nalgebra::{Matrix2, Vector2};

    use super::*;

    #[test]
    fn test_transmitter_validation() {
        assert!(TransmitterPower::new(-20.0, 0.0).is_err());
        assert!(TransmitterPower::new(f64::NAN, 2.4e9).is_err());

        let power = TransmitterPower::new(-20.0, 2.4e9)
            .unwrap()
            .with_path_loss_exponent(2.5, Some(0.1))
            .unwrap();
        assert_eq!(power.path_loss_exponent, 2.5);
        assert_eq!(power.path_loss_exponent_std_dev, Some(0.1));
        assert!(power.clone().with_path_loss_exponent(0.0, None).is_err());
        assert!(power.with_transmitted_power_std_dev(-1.0).is_err());
    }

    #[test]
    fn test_position_covariance_validation() {
        let source = RadioSource::new("s", Vector2::new(1.0, 2.0));
        assert!(source
            .clone()
            .with_position_covariance(Matrix2::new(1.0, 0.5, 0.0, 1.0))
            .is_err());
        assert!(source
            .clone()
            .with_position_covariance(Matrix2::new(-1.0, 0.0, 0.0, 1.0))
            .is_err());

        let source = source
            .with_position_covariance(Matrix2::new(0.04, 0.01, 0.01, 0.09))
            .unwrap();
        assert_eq!(source.id(), "s");
        assert_eq!(source.position(), &Vector2::new(1.0, 2.0));
        assert_eq!(
            source.position_covariance(),
            Some(&Matrix2::new(0.04, 0.01, 0.01, 0.09))
        );
    }
}
