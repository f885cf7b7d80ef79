use std::time::Duration;

use narra_book_render::LayoutError;
use thiserror::Error;

/// Failure of a whole PDF generation.
#[derive(Debug, Error)]
pub enum PdfError {
    /// Generation did not finish within the configured budget. No partial
    /// document is returned.
    #[error("pdf generation timed out after {0:?}")]
    GenerationTimeout(Duration),
    #[error("invalid pdf options: {0}")]
    InvalidOptions(String),
    #[error("book layout failed: {0}")]
    Layout(#[from] LayoutError),
}

/// Failure loading one image. Always recovered by the generator.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("fetching {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    #[error("failed to decode {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl AssetError {
    pub fn url(&self) -> &str {
        match self {
            Self::Fetch { url, .. } | Self::Timeout { url, .. } | Self::Decode { url, .. } => url,
        }
    }
}
