// src/error.rs - Error types for the swing analysis engine
use thiserror::Error;

/// Reasons a batch analysis produces no result at all.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Clip duration unknown or not positive; the detector is never called.
    #[error("Input unavailable: clip duration {duration:?} is not usable")]
    InputUnavailable { duration: Option<f64> },

    /// Too few frames produced a pose to compute metrics from.
    #[error("Insufficient pose coverage: {posed} posed frames, need at least {required}")]
    InsufficientCoverage { posed: usize, required: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

impl AnalysisError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequenceError {
    #[error("Timestamp {timestamp} at index {index} does not follow {previous}")]
    NonMonotonicTimestamp {
        index: usize,
        previous: f64,
        timestamp: f64,
    },
}

/// Failure inside a pose detector implementation.
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Pose detector unavailable: {0}")]
    Unavailable(String),

    #[error("Pose detection failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Nothing to export: {0}")]
    Empty(String),
}
