//! Log-distance path-loss conversion from received power to distance.
//!
//! With `k = c / (4π f)`, the received power of a source transmitting `Pt` dBm
//! at distance `d` follows
//!
//! ```text
//! Pr = Pt + 10·n·log10(k) − 10·n·log10(d)
//! d  = k · 10^((Pt − Pr) / (10·n))
//! ```
//!
//! The distance standard deviation is propagated to first order from the
//! variances of `Pt`, `Pr` and `n`:
//!
//! ```text
//! ∂d/∂Pt = d·ln10 / (10n)      ∂d/∂Pr = −d·ln10 / (10n)
//! ∂d/∂n  = −d·ln10·(Pt − Pr) / (10n²)
//! ```
use std::f64::consts::{LN_10, PI};

use crate::constants::SPEED_OF_LIGHT;
use crate::radio_source::TransmitterPower;

/// Distance estimated from one RSSI value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathLossDistance {
    pub distance: f64,
    /// `None` when neither the RSSI nor the transmitter carries an uncertainty.
    pub std_dev: Option<f64>,
}

/// Wavelength factor `k = c / (4π f)`.
#[inline]
pub fn wavelength_factor(frequency_hz: f64) -> f64 {
    SPEED_OF_LIGHT / (4.0 * PI * frequency_hz)
}

/// Received power (dBm) expected at `distance` from a transmitter.
pub fn received_power(power: &TransmitterPower, distance: f64) -> f64 {
    let k = wavelength_factor(power.frequency_hz);
    let n = power.path_loss_exponent;
    power.transmitted_power_dbm + 10.0 * n * k.log10() - 10.0 * n * distance.log10()
}

/// Convert a received power into a distance and its first-order standard deviation.
///
/// Arguments
/// -----------------
/// * `power`: transmitter description of the source.
/// * `rssi_dbm`: received power (dBm).
/// * `rssi_std_dev`: optional standard deviation of the received power (dB).
///
/// Return
/// ----------
/// * The estimated distance (always ≥ 0) and, when any variance is known, its standard deviation.
pub fn rssi_to_distance(
    power: &TransmitterPower,
    rssi_dbm: f64,
    rssi_std_dev: Option<f64>,
) -> PathLossDistance {
    let k = wavelength_factor(power.frequency_hz);
    let n = power.path_loss_exponent;
    let delta = power.transmitted_power_dbm - rssi_dbm;
    let distance = k * 10f64.powf(delta / (10.0 * n));

    let d_power = distance * LN_10 / (10.0 * n);
    let d_exponent = -distance * LN_10 * delta / (10.0 * n * n);

    let terms = [
        power.transmitted_power_std_dev.map(|s| (d_power * s).powi(2)),
        rssi_std_dev.map(|s| (d_power * s).powi(2)),
        power.path_loss_exponent_std_dev.map(|s| (d_exponent * s).powi(2)),
    ];

    let variance = terms
        .iter()
        .flatten()
        .fold(None, |acc: Option<f64>, v| Some(acc.unwrap_or(0.0) + v));

    PathLossDistance {
        distance: distance.max(0.0),
        std_dev: variance.map(f64::sqrt),
    }
}
