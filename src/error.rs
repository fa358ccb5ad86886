//! Error types shared across the pipeline.

use thiserror::Error;

/// Error type for every stage of the pipeline, from collection to serving.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Insufficient or malformed rows reaching the cleaner.
    #[error("insufficient data: {0}")]
    DataQuality(String),

    /// A transform precondition was violated or learned parameters were misused.
    #[error("transform error: {0}")]
    Transform(String),

    /// Input width does not match the width seen during fit.
    #[error("feature mismatch: expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    /// Training loss became non-finite; no artifact must be produced.
    #[error("training diverged: {0}")]
    TrainingDivergence(String),

    /// A persisted artifact was written by an incompatible version of this crate.
    #[error("artifact format version mismatch: expected {expected}, found {found}")]
    ArtifactVersion { expected: u32, found: u32 },

    /// A prediction request is malformed. Fatal to the request, not the process.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Failure while talking to the listing site.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for PipelineError {
    fn from(err: bincode::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;
