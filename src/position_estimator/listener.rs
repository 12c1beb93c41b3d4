//! Listener of a [`PositionEstimator`] and the bridge feeding it from the consensus loop.
//!
//! Every callback receives the estimator itself, still locked: reading its state is fine,
//! any mutator (or a nested `estimate()`) fails with
//! [`LaterationError::Locked`](crate::lateration_errors::LaterationError::Locked).
use crate::position_estimator::PositionEstimator;
use crate::robust::robust_estimator::RobustEstimatorListener;

/// Observer of the estimation lifecycle.
///
/// All methods have empty default implementations.
///
/// Order of calls for one successful `estimate()`:
///
/// ```text
/// on_estimate_start
/// (on_estimate_next_iteration | on_estimate_progress_change)*
/// on_estimate_end
/// ```
///
/// `on_estimate_end` is not called when the estimation fails.
pub trait PositionEstimatorListener<const D: usize> {
    fn on_estimate_start(&mut self, _estimator: &mut PositionEstimator<D>) {}

    fn on_estimate_end(&mut self, _estimator: &mut PositionEstimator<D>) {}

    fn on_estimate_next_iteration(
        &mut self,
        _estimator: &mut PositionEstimator<D>,
        _iteration: usize,
    ) {
    }

    fn on_estimate_progress_change(
        &mut self,
        _estimator: &mut PositionEstimator<D>,
        _progress: f64,
    ) {
    }
}

/// Forwards consensus-loop events to the estimator's listener.
pub(crate) struct ListenerBridge<'a, const D: usize> {
    pub estimator: &'a mut PositionEstimator<D>,
    pub listener: Option<&'a mut (dyn PositionEstimatorListener<D> + 'static)>,
}

impl<const D: usize> RobustEstimatorListener for ListenerBridge<'_, D> {
    fn on_next_iteration(&mut self, iteration: usize) {
        if let Some(listener) = self.listener.as_mut() {
            listener.on_estimate_next_iteration(self.estimator, iteration);
        }
    }

    fn on_progress_change(&mut self, progress: f64) {
        if let Some(listener) = self.listener.as_mut() {
            listener.on_estimate_progress_change(self.estimator, progress);
        }
    }
}
