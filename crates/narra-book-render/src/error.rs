use narra_book::BookError;
use thiserror::Error;

/// Failure laying out a book or one of its stories.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Page geometry rejected before any story was laid out.
    #[error("invalid page dimensions: {0}")]
    InvalidDimensions(String),
    /// A media item is neither `image/*` nor `video/*`.
    #[error("media {media_id} has unsupported content type {content_type:?}")]
    UnsupportedMedia {
        media_id: String,
        content_type: String,
    },
    /// A story exceeded one of the configured layout limits.
    #[error("layout limit exceeded: {kind} (actual={actual} limit={limit})")]
    LimitExceeded {
        kind: &'static str,
        actual: usize,
        limit: usize,
    },
}

impl From<BookError> for LayoutError {
    fn from(value: BookError) -> Self {
        match value {
            BookError::InvalidDimensions(reason) => Self::InvalidDimensions(reason),
            other => Self::InvalidDimensions(other.to_string()),
        }
    }
}
