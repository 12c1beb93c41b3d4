use thiserror::Error;

/// Errors raised by the readings, the lateration solver, the robust estimator
/// and the position estimator façade.
///
/// Variants
/// -----------------
/// * `InvalidArgument` – bad or missing constructor / setter input, always surfaced immediately.
/// * `NotReady` – `estimate()` called before sources and fingerprint allow a solution.
/// * `Locked` – a mutation (or a nested `estimate()`) attempted while an estimation runs.
/// * `InsufficientObservations` – fewer observations than the solver needs (`D + 1`).
/// * `SingularSystem` – degenerate geometry (collinear / coplanar sources, rank-deficient Jacobian).
/// * `RobustEstimationFailed` – no iteration of the consensus loop produced a usable model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LaterationError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Estimator is not ready: sources and fingerprint are missing or insufficient")]
    NotReady,

    #[error("Estimator is locked while an estimation is in progress")]
    Locked,

    #[error("Insufficient observations: at least {required} required, got {actual}")]
    InsufficientObservations { required: usize, actual: usize },

    #[error("Lateration system is singular; source geometry may be degenerate")]
    SingularSystem,

    #[error("Robust estimation failed: {0}")]
    RobustEstimationFailed(String),
}

impl LaterationError {
    /// Shorthand used by the validating builders and setters.
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        LaterationError::InvalidArgument(msg.into())
    }
}
