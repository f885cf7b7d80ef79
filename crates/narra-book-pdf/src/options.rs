use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PdfError;

/// Knobs for one PDF generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PdfOptions {
    /// Budget for the whole generation, layout included.
    pub generation_timeout_ms: u64,
    /// Budget for a single asset fetch.
    pub asset_timeout_ms: u64,
    /// Yield to the runtime after this many pages.
    pub yield_every_pages: usize,
    /// Flate-compress page content streams.
    pub compress: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            generation_timeout_ms: 45_000,
            asset_timeout_ms: 8_000,
            yield_every_pages: 4,
            compress: true,
        }
    }
}

impl PdfOptions {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    pub fn asset_timeout(&self) -> Duration {
        Duration::from_millis(self.asset_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), PdfError> {
        if self.generation_timeout_ms == 0 {
            return Err(PdfError::InvalidOptions(
                "generation timeout must be positive".to_string(),
            ));
        }
        if self.asset_timeout_ms == 0 {
            return Err(PdfError::InvalidOptions(
                "asset timeout must be positive".to_string(),
            ));
        }
        if self.yield_every_pages == 0 {
            return Err(PdfError::InvalidOptions(
                "yield_every_pages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
