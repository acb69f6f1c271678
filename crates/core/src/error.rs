use thiserror::Error;

/// Failure taxonomy for the detection pipeline.
///
/// Every variant can be rendered into the `error` field of an
/// [`EnsembleResult`](crate::EnsembleResult), so callers never have to catch
/// anything.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectError {
    #[error("Invalid input shape: {0}")]
    InvalidInputShape(String),

    #[error("Insufficient samples: got {got}, need at least {required}")]
    InsufficientSamples { got: usize, required: usize },

    #[error("Preprocessing failed: {0}")]
    PreprocessingFailure(String),

    #[error("Training failed: {0}")]
    TrainingFailure(String),

    #[error("Detector {detector} failed to score: {reason}")]
    DetectorScoringFailure { detector: String, reason: String },

    #[error("Circuit breaker open: retry after {retry_after_secs}s")]
    CircuitOpen { retry_after_secs: u64 },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl DetectError {
    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInputShape(_) => "invalid_input_shape",
            Self::InsufficientSamples { .. } => "insufficient_samples",
            Self::PreprocessingFailure(_) => "preprocessing_failure",
            Self::TrainingFailure(_) => "training_failure",
            Self::DetectorScoringFailure { .. } => "detector_scoring_failure",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::WorkerPool(_) => "worker_pool",
        }
    }

    /// Whether this error should count against the reliability guard.
    ///
    /// A rejected call while the breaker is open is the guard's own output,
    /// not a new failure.
    pub fn counts_as_failure(&self) -> bool {
        !matches!(self, Self::CircuitOpen { .. })
    }
}
