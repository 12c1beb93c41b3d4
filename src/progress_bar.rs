//! Terminal progress listener (feature `progress`).
//!
//! [`ProgressBarListener`] is a
//! [`PositionEstimatorListener`](crate::position_estimator::PositionEstimatorListener)
//! drawing an indicatif bar of the consensus loop progress. Elapsed time and ETA come from
//! the bar itself; the message carries the method, the iteration count and the mean
//! iteration time.
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::position_estimator::{PositionEstimator, PositionEstimatorListener};

const BAR_LENGTH: u64 = 1000;

/// Draws the progress of every `estimate()` on the terminal.
///
/// The bar is created on `on_estimate_start` and cleared on `on_estimate_end`.
#[derive(Debug, Default)]
pub struct ProgressBarListener {
    bar: Option<ProgressBar>,
    hidden: bool,
    method: String,
    started: Option<Instant>,
    iterations: usize,
}

impl ProgressBarListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener that tracks iterations without drawing anything.
    pub fn hidden() -> Self {
        Self {
            hidden: true,
            ..Self::default()
        }
    }

    /// Iterations seen during the current (or last) estimation.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Mean wall time of one iteration, `None` before the first iteration.
    pub fn mean_iteration_time(&self) -> Option<Duration> {
        let started = self.started?;
        let count = u32::try_from(self.iterations).ok().filter(|c| *c > 0)?;
        Some(started.elapsed() / count)
    }

    fn message(&self) -> String {
        match self.mean_iteration_time() {
            Some(mean) => format!(
                "{} | iteration {} | {:.1?}/it",
                self.method, self.iterations, mean
            ),
            None => format!("{} | starting", self.method),
        }
    }
}

impl<const D: usize> PositionEstimatorListener<D> for ProgressBarListener {
    fn on_estimate_start(&mut self, estimator: &mut PositionEstimator<D>) {
        let target = if self.hidden {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        };
        let pb = ProgressBar::with_draw_target(Some(BAR_LENGTH), target);
        pb.set_style(
            ProgressStyle::with_template(
                "{bar:40.cyan/blue} ({percent:>3}%) | {elapsed_precise} | ETA {eta} | {msg}",
            )
            .expect("indicatif template"),
        );

        self.method = format!(
            "{} on {} observations",
            estimator.method(),
            estimator.observations().len()
        );
        self.started = Some(Instant::now());
        self.iterations = 0;
        pb.set_message(self.message());
        if !self.hidden {
            pb.enable_steady_tick(Duration::from_millis(200));
        }
        self.bar = Some(pb);
    }

    fn on_estimate_next_iteration(
        &mut self,
        _estimator: &mut PositionEstimator<D>,
        iteration: usize,
    ) {
        self.iterations = iteration;
        if let Some(pb) = self.bar.as_ref() {
            pb.set_message(self.message());
        }
    }

    fn on_estimate_progress_change(
        &mut self,
        _estimator: &mut PositionEstimator<D>,
        progress: f64,
    ) {
        if let Some(pb) = self.bar.as_ref() {
            pb.set_position((progress.clamp(0.0, 1.0) * BAR_LENGTH as f64) as u64);
        }
    }

    fn on_estimate_end(&mut self, _estimator: &mut PositionEstimator<D>) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}
