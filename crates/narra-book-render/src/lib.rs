//! Pagination, global page index, and render IR for Narra books.
//!
//! [`BookLayout`] is computed once per book snapshot and shared by every
//! back-end; [`BookRenderer`] turns its pages into [`RenderPage`] draw
//! commands that the HTML, canvas and PDF renderers consume.

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

mod cache;
mod cover_layout;
mod error;
mod page_index;
mod render_engine;
mod render_ir;
mod render_layout;

pub use cache::PaginationCache;
pub use cover_layout::{
    cover_font_sizes, layout_cover_text, size_multiplier, CoverTextLayout, PositionedLine,
    COVER_LINE_HEIGHT_RATIO, SIZE_MULTIPLIER_RANGE, TITLE_MAX_WIDTH_RATIO,
};
pub use error::LayoutError;
pub use page_index::{
    toc_entries_per_page, BookLayout, BookLayoutEngine, CurrentStory, LayoutDiagnostic, Page,
    StoryLayoutEntry,
};
pub use render_engine::{
    BookRenderer, RenderPageIter, CONTENTS_HEADING, EMPTY_PAGE_TEXT, MEDIA_PLACEHOLDER_TEXT,
};
pub use render_ir::{
    DrawCommand, FontFace, ImageFallback, ImageFit, ImageObjectCommand, PageChromeCommand,
    PageChromeKind, PageMetrics, PaginationProfileId, RectCommand, RenderPage, RuleCommand,
    TextAlign, TextCommand, TextRole, TextStyle,
};
pub use render_layout::{
    line_baseline_offset, truncate_text_to_width, wrap_text, wrap_words, DropCap,
    ParagraphSlice, Paginator, StandardFontMeasurer, StoryLayoutFlags, StoryPagination,
    TextMeasurer, TextPageLayout, WrappedParagraph, DROP_CAP_GAP_PX,
};
