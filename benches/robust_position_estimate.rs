//! Benchmarks of a full `PositionEstimator::estimate` call.
//!
//! Run with:
//!   cargo bench --bench robust_position_estimate
//!   cargo bench robust_position_estimate -- robust_position_estimate/promeds

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::Vector2;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

use radiolateration::radio_source::RadioSource;
use radiolateration::readings::{Fingerprint, RangingReading};
use radiolateration::{PositionEstimator2D, RobustMethod};

/// 30 sources on a 100 × 100 square, 20 % of the readings corrupted.
fn make_fixture() -> (Vec<RadioSource<2>>, Fingerprint, Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.05).expect("normal");
    let truth = Vector2::new(40.0, 55.0);

    let sources: Vec<RadioSource<2>> = (0..30)
        .map(|i| {
            let p = Vector2::new(rng.random_range(0.0..100.0), rng.random_range(0.0..100.0));
            RadioSource::new(format!("s{i}"), p)
        })
        .collect();

    let fingerprint: Fingerprint = sources
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut d = (s.position() - truth).norm() + noise.sample(&mut rng);
            if i % 5 == 0 {
                d += rng.random_range(10.0..40.0);
            }
            RangingReading::new(s.id(), d, Some(0.05))
                .expect("ranging reading")
                .into()
        })
        .collect();

    let source_scores = (0..30).map(|_| rng.random_range(0.0..1.0)).collect();
    let reading_scores = (0..30)
        .map(|i| if i % 5 == 0 { 0.1 } else { 0.9 })
        .collect();
    (sources, fingerprint, source_scores, reading_scores)
}

fn bench_estimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("robust_position_estimate");
    let (sources, fingerprint, source_scores, reading_scores) = make_fixture();

    for method in RobustMethod::ALL {
        let mut builder = PositionEstimator2D::builder()
            .method(method)
            .sources(sources.clone())
            .fingerprint(fingerprint.clone())
            .seed(7);
        if method.is_quality_weighted() {
            builder = builder.quality_scores(source_scores.clone(), reading_scores.clone());
        }
        let mut estimator = builder.build().expect("estimator");
        if method == RobustMethod::Ransac {
            estimator.set_threshold(0.3).expect("threshold");
        }

        group.bench_function(method.name().to_lowercase(), |b| {
            b.iter(|| {
                let res = estimator.estimate();
                black_box(&res);
            })
        });
    }

    group.finish();
}

criterion_group!(robust_benches, bench_estimate);
criterion_main!(robust_benches);
