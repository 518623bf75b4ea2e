use std::time::Duration;

use dpdpa_core::{ConfigurationError, ExtractionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("matching run cancelled; no report was produced")]
    Cancelled,

    #[error("matching run exceeded its {0:?} time limit; retry with a longer timeout or a narrower scope")]
    Timeout(Duration),

    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

impl PipelineError {
    /// Whether the caller can fix the input or simply retry.
    ///
    /// Invariant violations are defects and never recoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvariantViolation(_))
    }
}
