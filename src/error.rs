//! Error types for model loading and prediction

use std::path::PathBuf;
use thiserror::Error;

/// Failure to acquire a predictor. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read model artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model artifact {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("model schema mismatch: {0}")]
    Schema(String),

    #[error("ONNX runtime error: {0}")]
    Runtime(String),
}

/// Failure of a single prediction. Recoverable: the predictor stays usable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("column '{0}' is missing from the patient record")]
    MissingColumn(&'static str),

    #[error("column '{0}' is not part of the model schema")]
    UnexpectedColumn(String),

    #[error("value '{value}' is not a known category for column '{column}'")]
    UnknownCategory { column: &'static str, value: String },

    #[error("column '{column}' expects a {expected} value")]
    TypeMismatch {
        column: &'static str,
        expected: &'static str,
    },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("predictor returned an invalid output: {0}")]
    InvalidOutput(String),

    #[error("predictor panicked: {0}")]
    Panicked(String),
}
