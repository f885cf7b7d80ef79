//! Story model, page geometry and navigation for Narra memoir books.
//!
//! This crate holds the inputs shared by every renderer: the story/media
//! snapshot, the [`PageDimensions`] all back-ends measure against, the typed
//! [`CoverData`], and the page navigator used by readers of a laid-out book.
//! Pagination and drawing live in `narra-book-render`.

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod config;
pub mod cover;
pub mod dimensions;
pub mod error;
pub mod model;
pub mod navigation;

pub use config::{BookConfig, LayoutLimits, LayoutOptions};
pub use cover::{Color, CoverData, CoverLayoutMode, AUTHOR_SIZE_RANGE, TITLE_SIZE_RANGE};
pub use dimensions::{PageDimensions, POINTS_PER_INCH};
pub use error::BookError;
pub use model::{BookSnapshot, MediaId, MediaItem, MediaKind, Story, StoryId};
pub use navigation::{BookNavigator, InputMap, NavCommand, NavInput, TocEntry, TocRow};
