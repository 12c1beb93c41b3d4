#![allow(dead_code)]

use nalgebra::SVector;
use rand::distr::{Distribution, Uniform};
use rand::Rng;
use rand_distr::Normal;
use radiolateration::radio_source::RadioSource;
use radiolateration::readings::{Fingerprint, RangingReading, Reading};

/// `n` sources uniformly spread in `[-extent, extent]^D`, named `s0`, `s1`, ...
pub fn random_sources<const D: usize>(
    rng: &mut impl Rng,
    n: usize,
    extent: f64,
) -> Vec<RadioSource<D>> {
    let uniform = Uniform::new(-extent, extent).unwrap();
    (0..n)
        .map(|i| RadioSource::new(format!("s{i}"), SVector::from_fn(|_, _| uniform.sample(rng))))
        .collect()
}

pub fn random_point<const D: usize>(rng: &mut impl Rng, extent: f64) -> SVector<f64, D> {
    let uniform = Uniform::new(-extent, extent).unwrap();
    SVector::from_fn(|_, _| uniform.sample(rng))
}

/// One exact ranging reading per source.
pub fn exact_fingerprint<const D: usize>(
    sources: &[RadioSource<D>],
    truth: &SVector<f64, D>,
) -> Fingerprint {
    sources
        .iter()
        .map(|s| reading(s, (s.position() - truth).norm(), None))
        .collect()
}

/// One ranging reading per source with Gaussian noise of `sigma`; the readings of the
/// sources listed in `outliers` get an extra gross error of at least `5` units.
pub fn noisy_fingerprint<const D: usize>(
    rng: &mut impl Rng,
    sources: &[RadioSource<D>],
    truth: &SVector<f64, D>,
    sigma: f64,
    outliers: &[usize],
) -> Fingerprint {
    let noise = Normal::new(0.0, sigma).unwrap();
    let gross = Normal::new(0.0, 30.0).unwrap();
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut d = (s.position() - truth).norm() + noise.sample(rng);
            if outliers.contains(&i) {
                let e: f64 = gross.sample(rng);
                d += if e.abs() < 5.0 { 5.0 } else { e.abs() };
            }
            reading(s, d.max(0.0), Some(sigma))
        })
        .collect()
}

pub fn reading<const D: usize>(
    source: &RadioSource<D>,
    distance: f64,
    std_dev: Option<f64>,
) -> Reading {
    RangingReading::new(source.id(), distance, std_dev)
        .unwrap()
        .into()
}

/// The `(0,0)`, `(10,0)`, `(0,10)` triangle with exact distances to `(3,4)`.
pub fn reference_triangle() -> (Vec<RadioSource<2>>, Fingerprint) {
    let sources = vec![
        RadioSource::new("a", SVector::from([0.0, 0.0])),
        RadioSource::new("b", SVector::from([10.0, 0.0])),
        RadioSource::new("c", SVector::from([0.0, 10.0])),
    ];
    let fingerprint = exact_fingerprint(&sources, &SVector::from([3.0, 4.0]));
    (sources, fingerprint)
}
