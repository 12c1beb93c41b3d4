//! # Readings and fingerprints
//!
//! A **reading** is one measurement captured at the unknown location and tied to exactly
//! one [`RadioSource`](crate::radio_source::RadioSource) through its `source_id`:
//!
//! - [`RangingReading`] – a measured distance, optionally with its standard deviation,
//! - [`RssiReading`] – a received power (dBm), optionally with its standard deviation,
//! - [`RangingAndRssiReading`] – both at once.
//!
//! A [`Fingerprint`] is the ordered collection of readings captured at one location.
//! The order has no meaning for the estimate but is kept stable, so that sampling is
//! reproducible under a fixed seed.
//!
//! RSSI values are turned into distances by the log-distance model of
//! [`path_loss`]; this needs the source's [`TransmitterPower`](crate::radio_source::TransmitterPower).
use serde::{Deserialize, Serialize};

use crate::lateration_errors::LaterationError;

pub mod path_loss;

fn check_std_dev(std_dev: Option<f64>, what: &str) -> Result<(), LaterationError> {
    match std_dev {
        Some(s) if !(s > 0.0) || !s.is_finite() => Err(LaterationError::InvalidArgument(format!(
            "{what} standard deviation must be > 0"
        ))),
        _ => Ok(()),
    }
}

/// Distance measured to a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangingReading {
    source_id: String,
    distance: f64,
    distance_std_dev: Option<f64>,
}

impl RangingReading {
    /// Return
    /// ----------
    /// * `Err(InvalidArgument)` if the distance is negative / not finite or the standard deviation is not > 0.
    pub fn new(
        source_id: impl Into<String>,
        distance: f64,
        distance_std_dev: Option<f64>,
    ) -> Result<Self, LaterationError> {
        if !(distance >= 0.0) || !distance.is_finite() {
            return Err(LaterationError::invalid("distance must be >= 0"));
        }
        check_std_dev(distance_std_dev, "distance")?;
        Ok(Self {
            source_id: source_id.into(),
            distance,
            distance_std_dev,
        })
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn distance_std_dev(&self) -> Option<f64> {
        self.distance_std_dev
    }
}

/// Power received from a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RssiReading {
    source_id: String,
    rssi_dbm: f64,
    rssi_std_dev: Option<f64>,
}

impl RssiReading {
    pub fn new(
        source_id: impl Into<String>,
        rssi_dbm: f64,
        rssi_std_dev: Option<f64>,
    ) -> Result<Self, LaterationError> {
        if !rssi_dbm.is_finite() {
            return Err(LaterationError::invalid("rssi must be finite"));
        }
        check_std_dev(rssi_std_dev, "rssi")?;
        Ok(Self {
            source_id: source_id.into(),
            rssi_dbm,
            rssi_std_dev,
        })
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn rssi_dbm(&self) -> f64 {
        self.rssi_dbm
    }

    pub fn rssi_std_dev(&self) -> Option<f64> {
        self.rssi_std_dev
    }
}

/// Distance and received power measured on the same source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangingAndRssiReading {
    ranging: RangingReading,
    rssi: RssiReading,
}

impl RangingAndRssiReading {
    pub fn new(
        source_id: impl Into<String>,
        distance: f64,
        distance_std_dev: Option<f64>,
        rssi_dbm: f64,
        rssi_std_dev: Option<f64>,
    ) -> Result<Self, LaterationError> {
        let source_id = source_id.into();
        Ok(Self {
            ranging: RangingReading::new(source_id.clone(), distance, distance_std_dev)?,
            rssi: RssiReading::new(source_id, rssi_dbm, rssi_std_dev)?,
        })
    }

    pub fn source_id(&self) -> &str {
        self.ranging.source_id()
    }

    pub fn ranging(&self) -> &RangingReading {
        &self.ranging
    }

    pub fn rssi(&self) -> &RssiReading {
        &self.rssi
    }
}

/// One reading of a fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reading {
    Ranging(RangingReading),
    Rssi(RssiReading),
    RangingAndRssi(RangingAndRssiReading),
}

impl Reading {
    pub fn source_id(&self) -> &str {
        match self {
            Reading::Ranging(r) => r.source_id(),
            Reading::Rssi(r) => r.source_id(),
            Reading::RangingAndRssi(r) => r.source_id(),
        }
    }

    /// Ranging part of the reading, if any.
    pub fn ranging(&self) -> Option<&RangingReading> {
        match self {
            Reading::Ranging(r) => Some(r),
            Reading::RangingAndRssi(r) => Some(r.ranging()),
            Reading::Rssi(_) => None,
        }
    }

    /// RSSI part of the reading, if any.
    pub fn rssi(&self) -> Option<&RssiReading> {
        match self {
            Reading::Rssi(r) => Some(r),
            Reading::RangingAndRssi(r) => Some(r.rssi()),
            Reading::Ranging(_) => None,
        }
    }
}

impl From<RangingReading> for Reading {
    fn from(r: RangingReading) -> Self {
        Reading::Ranging(r)
    }
}

impl From<RssiReading> for Reading {
    fn from(r: RssiReading) -> Self {
        Reading::Rssi(r)
    }
}

impl From<RangingAndRssiReading> for Reading {
    fn from(r: RangingAndRssiReading) -> Self {
        Reading::RangingAndRssi(r)
    }
}

/// Readings captured at one unknown location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    readings: Vec<Reading>,
}

impl Fingerprint {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self { readings }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl FromIterator<Reading> for Fingerprint {
    fn from_iter<I: IntoIterator<Item = Reading>>(iter: I) -> Self {
        Fingerprint::new(iter.into_iter().collect())
    }
}
