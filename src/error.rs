//! Error types for the analysis pipeline.
//!
//! Stage-local failures (clustering, anomaly detection) are caught by the
//! orchestrator and degraded to per-stage markers in the report; only input
//! failures are surfaced to the caller as-is.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the analysis pipeline.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Input file has an extension the loader does not handle.
    #[error("Unsupported file extension: {0}")]
    UnsupportedFormat(String),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// The clustering stage failed internally.
    #[error("Clustering failed: {0}")]
    Clustering(String),

    /// The anomaly detection stage failed internally.
    #[error("Anomaly detection failed: {0}")]
    AnomalyDetection(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Stable error code, usable by callers that dispatch on failure kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Clustering(_) => "CLUSTERING_FAILED",
            Self::AnomalyDetection(_) => "ANOMALY_DETECTION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Whether the orchestrator may catch this error and keep going with a
    /// degraded report instead of aborting.
    pub fn is_stage_local(&self) -> bool {
        matches!(self, Self::Clustering(_) | Self::AnomalyDetection(_))
    }
}

/// Errors serialize as `{code, message}` so downstream consumers can show
/// them without parsing display strings.
impl Serialize for AnalysisError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalysisError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
