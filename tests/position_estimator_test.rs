use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use nalgebra::Vector2;
use radiolateration::constants::{
    DEFAULT_CONFIDENCE, DEFAULT_INLIER_FACTOR, DEFAULT_MAX_ITERATIONS, DEFAULT_PROGRESS_DELTA,
    DEFAULT_STOP_THRESHOLD, FALLBACK_DISTANCE_STANDARD_DEVIATION,
};
use radiolateration::radio_source::RadioSource;
use radiolateration::readings::Fingerprint;
use radiolateration::{
    EstimatorState, LaterationError, PositionEstimator2D, PositionEstimatorListener, RobustMethod,
};

mod common;
use common::{exact_fingerprint, reading, reference_triangle};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Start { locked: bool },
    Iteration(usize),
    Progress(f64),
    End { locked: bool, has_result: bool },
}

/// Records every event and tries every mutator from inside each callback.
#[derive(Clone, Default)]
struct LockRecorder {
    events: Rc<RefCell<Vec<Event>>>,
    mutations: Rc<RefCell<Vec<Result<(), LaterationError>>>>,
}

impl LockRecorder {
    fn try_everything(&self, e: &mut PositionEstimator2D) {
        let (sources, fingerprint) = reference_triangle();
        let attempts = vec![
            e.set_sources(sources),
            e.set_fingerprint(fingerprint),
            e.set_listener(None),
            e.set_initial_position(Some(Vector2::new(1.0, 1.0))),
            e.set_radio_source_position_covariance_used(false),
            e.set_fallback_distance_standard_deviation(1.0),
            e.set_confidence(0.5),
            e.set_max_iterations(10),
            e.set_progress_delta(0.5),
            e.set_threshold(1.0),
            e.set_stop_threshold(1.0),
            e.set_inlier_factor(2.0),
            e.set_preliminary_subset_size(4),
            e.set_evenly_distribute_readings(false),
            e.set_linear_solver_used(false),
            e.set_homogeneous_linear_solver_used(true),
            e.set_preliminary_solution_refined(true),
            e.set_result_refined(false),
            e.set_covariance_kept(false),
            e.set_inliers_kept(false),
            e.set_residuals_kept(true),
            e.set_source_quality_scores(vec![1.0; 3]),
            e.set_fingerprint_readings_quality_scores(vec![1.0; 3]),
            e.set_seed(3),
            e.estimate().map(|_| ()),
        ];
        self.mutations.borrow_mut().extend(attempts);
    }
}

impl PositionEstimatorListener<2> for LockRecorder {
    fn on_estimate_start(&mut self, estimator: &mut PositionEstimator2D) {
        self.events.borrow_mut().push(Event::Start {
            locked: estimator.is_locked(),
        });
        self.try_everything(estimator);
    }

    fn on_estimate_end(&mut self, estimator: &mut PositionEstimator2D) {
        self.events.borrow_mut().push(Event::End {
            locked: estimator.state() == EstimatorState::Locked,
            has_result: estimator.estimated_position().is_some(),
        });
        self.try_everything(estimator);
    }

    fn on_estimate_next_iteration(
        &mut self,
        estimator: &mut PositionEstimator2D,
        iteration: usize,
    ) {
        self.events.borrow_mut().push(Event::Iteration(iteration));
        self.try_everything(estimator);
    }

    fn on_estimate_progress_change(&mut self, estimator: &mut PositionEstimator2D, progress: f64) {
        self.events.borrow_mut().push(Event::Progress(progress));
        self.try_everything(estimator);
    }
}

fn ready_estimator(method: RobustMethod) -> PositionEstimator2D {
    let (sources, fingerprint) = reference_triangle();
    PositionEstimator2D::builder()
        .method(method)
        .sources(sources)
        .fingerprint(fingerprint)
        .seed(7)
        .build()
        .unwrap()
}

#[test]
fn defaults_match_constants() {
    let estimator = PositionEstimator2D::new(RobustMethod::Promeds).unwrap();
    assert_eq!(estimator.confidence(), DEFAULT_CONFIDENCE);
    assert_eq!(estimator.max_iterations(), DEFAULT_MAX_ITERATIONS);
    assert_eq!(estimator.progress_delta(), DEFAULT_PROGRESS_DELTA);
    assert_eq!(estimator.stop_threshold(), DEFAULT_STOP_THRESHOLD);
    assert_eq!(estimator.inlier_factor(), DEFAULT_INLIER_FACTOR);
    assert_eq!(
        estimator.fallback_distance_standard_deviation(),
        FALLBACK_DISTANCE_STANDARD_DEVIATION
    );
    assert!(estimator.is_inliers_kept());
    assert!(!estimator.is_residuals_kept());
    assert_eq!(estimator.preliminary_subset_size(), 3);
    assert!(estimator.source_quality_scores().is_none());
    assert!(estimator.seed().is_none());
}

#[test]
fn reference_triangle_every_method() {
    for method in RobustMethod::ALL {
        let mut estimator = ready_estimator(method);
        assert_eq!(estimator.state(), EstimatorState::Ready);

        let position = estimator.estimate().unwrap();
        assert_relative_eq!(position, Vector2::new(3.0, 4.0), epsilon = 1e-6);
        assert_eq!(estimator.state(), EstimatorState::Ready);
        assert_eq!(estimator.method(), method);
    }
}

#[test]
fn not_ready_estimate_changes_nothing() {
    let (sources, fingerprint) = reference_triangle();
    let mut estimator = PositionEstimator2D::new(RobustMethod::Ransac).unwrap();
    assert_eq!(estimator.estimate(), Err(LaterationError::NotReady));

    // two sources are not enough in 2D
    estimator.set_sources(sources[..2].to_vec()).unwrap();
    estimator.set_fingerprint(fingerprint).unwrap();
    assert!(!estimator.is_ready());
    assert_eq!(estimator.estimate(), Err(LaterationError::NotReady));
    assert_eq!(estimator.state(), EstimatorState::NotReady);
    assert!(estimator.estimation_result().is_none());

    // three sources but the fingerprint only observes two of them
    let mut estimator = PositionEstimator2D::new(RobustMethod::Ransac).unwrap();
    let truth = Vector2::new(3.0, 4.0);
    estimator.set_sources(sources.clone()).unwrap();
    estimator
        .set_fingerprint(exact_fingerprint(&sources[..2], &truth))
        .unwrap();
    assert_eq!(estimator.estimate(), Err(LaterationError::NotReady));
}

#[test]
fn mutators_fail_while_locked_from_every_callback() {
    let recorder = LockRecorder::default();
    let mut estimator = ready_estimator(RobustMethod::Ransac);
    estimator.set_listener(Some(Box::new(recorder.clone()))).unwrap();

    estimator.estimate().unwrap();

    let mutations = recorder.mutations.borrow();
    assert!(!mutations.is_empty());
    assert!(mutations.iter().all(|m| *m == Err(LaterationError::Locked)));

    // configuration untouched
    assert_eq!(estimator.confidence(), DEFAULT_CONFIDENCE);
    assert_eq!(estimator.max_iterations(), DEFAULT_MAX_ITERATIONS);
    assert_eq!(estimator.preliminary_subset_size(), 3);
    assert!(estimator.is_linear_solver_used());
    assert!(estimator.initial_position().is_none());
    assert_eq!(estimator.seed(), Some(7));
    assert!(estimator.listener().is_some());
    assert!(!estimator.is_locked());

    let events = recorder.events.borrow();
    assert_eq!(events.first(), Some(&Event::Start { locked: true }));
    assert_eq!(
        events.last(),
        Some(&Event::End {
            locked: true,
            has_result: true
        })
    );
    assert!(events.contains(&Event::Iteration(1)));
    assert!(events.contains(&Event::Progress(1.0)));
}

#[test]
fn failed_estimation_unlocks_without_end_notification() {
    // collinear sources: every subset is singular
    let sources: Vec<RadioSource<2>> = (0..4)
        .map(|i| RadioSource::new(format!("s{i}"), Vector2::new(i as f64 * 3.0, 0.0)))
        .collect();
    let fingerprint: Fingerprint = sources.iter().map(|s| reading(s, 2.0, None)).collect();

    let recorder = LockRecorder::default();
    let mut estimator = PositionEstimator2D::builder()
        .sources(sources)
        .fingerprint(fingerprint)
        .listener(recorder.clone())
        .seed(1)
        .build()
        .unwrap();
    estimator.set_max_iterations(25).unwrap();

    assert!(matches!(
        estimator.estimate(),
        Err(LaterationError::RobustEstimationFailed(_))
    ));
    assert!(!estimator.is_locked());
    assert!(estimator.estimated_position().is_none());

    let events = recorder.events.borrow();
    assert!(matches!(events.first(), Some(Event::Start { .. })));
    assert!(!events.iter().any(|e| matches!(e, Event::End { .. })));
    assert_eq!(
        events.iter().filter(|e| matches!(e, Event::Iteration(_))).count(),
        25
    );
}

#[test]
fn preliminary_subset_size_rebuilds_cache() {
    let (sources, fingerprint) = reference_triangle();
    let mut estimator = PositionEstimator2D::builder()
        .sources(sources.clone())
        .fingerprint(fingerprint)
        .build()
        .unwrap();
    assert!(estimator.is_ready());

    assert!(matches!(
        estimator.set_preliminary_subset_size(2),
        Err(LaterationError::InvalidArgument(_))
    ));
    assert_eq!(estimator.preliminary_subset_size(), 3);

    let before = estimator.observations().clone();

    // four observations needed now, only three available
    estimator.set_preliminary_subset_size(4).unwrap();
    assert_eq!(estimator.preliminary_subset_size(), 4);
    assert_eq!(estimator.observations(), &before);
    assert!(!estimator.is_ready());

    // a second reading of the first source completes the cache
    let truth = Vector2::new(3.0, 4.0);
    let mut readings = exact_fingerprint(&sources, &truth).readings().to_vec();
    readings.push(reading(&sources[0], 5.0, Some(0.01)));
    let fingerprint = Fingerprint::new(readings);
    estimator.set_fingerprint(fingerprint.clone()).unwrap();
    assert_eq!(estimator.observations().len(), 4);
    assert!(estimator.is_ready());

    // rebuilding for another subset size reflects the current snapshot
    let fresh = PositionEstimator2D::builder()
        .sources(sources.clone())
        .fingerprint(fingerprint)
        .build()
        .unwrap();
    estimator.set_preliminary_subset_size(3).unwrap();
    assert_eq!(estimator.observations(), fresh.observations());
    estimator.set_preliminary_subset_size(4).unwrap();
    assert_eq!(estimator.observations(), fresh.observations());

    let position = estimator.estimate().unwrap();
    assert_relative_eq!(position, truth, epsilon = 1e-6);
}

#[test]
fn estimated_position_is_stable_until_next_estimate() {
    let mut estimator = ready_estimator(RobustMethod::Msac);
    let position = estimator.estimate().unwrap();

    for _ in 0..3 {
        assert_eq!(estimator.estimated_position(), Some(&position));
    }
    let covariance = *estimator.covariance().unwrap();
    assert_relative_eq!(covariance, covariance.transpose(), epsilon = 1e-15);

    estimator.set_covariance_kept(false).unwrap();
    estimator.estimate().unwrap();
    assert!(estimator.covariance().is_none());
}

#[test]
fn factory_default_policy() {
    let estimator = PositionEstimator2D::create(None, None, None).unwrap();
    assert_eq!(estimator.method(), RobustMethod::Ransac);

    let estimator =
        PositionEstimator2D::create(None, Some(vec![1.0; 3]), Some(vec![1.0; 3])).unwrap();
    assert_eq!(estimator.method(), RobustMethod::Promeds);
    assert_eq!(estimator.source_quality_scores(), Some(&[1.0; 3][..]));

    // a single array is not a pair of quality scores
    let estimator = PositionEstimator2D::create(None, Some(vec![1.0; 3]), None).unwrap();
    assert_eq!(estimator.method(), RobustMethod::Ransac);

    let estimator = PositionEstimator2D::create(Some(RobustMethod::Lmeds), None, None).unwrap();
    assert_eq!(estimator.method(), RobustMethod::Lmeds);
}

#[test]
fn invalid_setter_inputs() {
    let mut estimator = PositionEstimator2D::new(RobustMethod::Ransac).unwrap();
    assert!(estimator.set_sources(vec![]).is_err());
    assert!(estimator.set_fingerprint(Fingerprint::default()).is_err());
    assert!(estimator.set_confidence(0.0).is_err());
    assert!(estimator.set_confidence(1.0).is_err());
    assert!(estimator.set_max_iterations(0).is_err());
    assert!(estimator.set_progress_delta(-0.1).is_err());
    assert!(estimator.set_threshold(0.0).is_err());
    assert!(estimator.set_inlier_factor(0.9).is_err());
    assert!(estimator.set_fallback_distance_standard_deviation(0.0).is_err());
    assert_eq!(estimator.confidence(), DEFAULT_CONFIDENCE);
}
