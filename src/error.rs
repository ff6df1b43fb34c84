//! Error types for execforge operations.
//!
//! Target-code failures are never errors in this crate: executors capture
//! them as data on the execution outcome. The types here cover the remaining
//! surfaces — invalid recommendation construction and export formatting.

use thiserror::Error;

/// Errors raised when constructing or filtering recommendations.
///
/// Out-of-range confidence or priority values indicate a programming error
/// in the caller, so construction fails immediately instead of clamping.
#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("Confidence must be within [0.0, 1.0], got {0}")]
    ConfidenceOutOfRange(f64),

    #[error("Priority must be within [{min}, {max}], got {value}")]
    PriorityOutOfRange { value: u8, min: u8, max: u8 },

    #[error("Expected savings cannot be negative: {0}")]
    NegativeSavings(f64),
}

/// Errors that can occur during result export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Batch export length mismatch: {results} results, {predictions} predictions, {recommendations} recommendation lists")]
    BatchLengthMismatch {
        results: usize,
        predictions: usize,
        recommendations: usize,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
