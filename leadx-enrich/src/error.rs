//! Error types for leadx-enrich
//!
//! Per-record provider failures never surface here; they are absorbed by the
//! resolver. These errors cover the batch as a whole.

use thiserror::Error;

/// Batch-level error type
#[derive(Debug, Error)]
pub enum EnrichError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input (e.g. a table without a header row)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// leadx-common error
    #[error("Common error: {0}")]
    Common(#[from] leadx_common::Error),
}

/// Result type for batch operations
pub type EnrichResult<T> = Result<T, EnrichError>;
