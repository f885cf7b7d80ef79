//! Layout configuration shared by the render back-ends.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dimensions::PageDimensions;
use crate::error::BookError;

/// Which structural pages the index builder emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Emit table-of-contents pages after the cover.
    pub include_toc: bool,
    /// Give each story a dedicated title page instead of a title header on
    /// its first text page.
    pub story_title_pages: bool,
    /// Draw a drop cap on the first paragraph of the first story.
    pub drop_cap: bool,
}

impl LayoutOptions {
    /// On-screen preview: cover, then text and media pages per story.
    pub const fn preview() -> Self {
        Self {
            include_toc: false,
            story_title_pages: false,
            drop_cap: true,
        }
    }

    /// Printed book: cover, contents, then title/text/media pages per story.
    pub const fn print() -> Self {
        Self {
            include_toc: true,
            story_title_pages: true,
            drop_cap: true,
        }
    }
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self::preview()
    }
}

/// Hard caps applied per story while building the page index.
///
/// A story over any cap is skipped with a diagnostic; the rest of the book
/// still lays out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutLimits {
    pub max_story_bytes: usize,
    pub max_paragraphs_per_story: usize,
    pub max_media_per_story: usize,
    pub max_stories: usize,
}

impl Default for LayoutLimits {
    fn default() -> Self {
        Self {
            max_story_bytes: 1024 * 1024,
            max_paragraphs_per_story: 4096,
            max_media_per_story: 256,
            max_stories: 1024,
        }
    }
}

impl LayoutLimits {
    /// Tight bounds for interactive previews on small devices.
    pub const fn compact() -> Self {
        Self {
            max_story_bytes: 128 * 1024,
            max_paragraphs_per_story: 512,
            max_media_per_story: 64,
            max_stories: 256,
        }
    }
}

/// Everything a render pass needs besides the book itself.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    pub dimensions: PageDimensions,
    pub layout: LayoutOptions,
    pub limits: LayoutLimits,
    /// Prefix for media paths that are not already absolute URLs.
    pub media_base_url: Option<String>,
}

impl BookConfig {
    /// Settings for the printed export.
    pub fn print() -> Self {
        Self {
            layout: LayoutOptions::print(),
            ..Self::default()
        }
    }

    pub fn from_json_str(input: &str) -> Result<Self, BookError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BookError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| BookError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&input)
    }

    pub fn validate(&self) -> Result<(), BookError> {
        self.dimensions.validate()
    }
}
