//! Error types for model loading and validation.

use thiserror::Error;

/// Errors raised where user or storage input enters the book model.
#[derive(Debug, Error)]
pub enum BookError {
    /// Page geometry cannot hold a single line of body text.
    #[error("invalid page dimensions: {0}")]
    InvalidDimensions(String),
    /// A cover field failed validation.
    #[error("invalid cover field `{field}`: {reason}")]
    InvalidCover {
        field: &'static str,
        reason: String,
    },
    /// A book/config document is not valid JSON for its schema.
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    /// A book/config document could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
