//! Global page index over all stories of a book.

use core::ops::Range;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use narra_book::{
    BookConfig, BookSnapshot, LayoutLimits, LayoutOptions, MediaItem, PageDimensions, Story,
    StoryId, TocEntry,
};
use serde::Serialize;

use crate::cache::PaginationCache;
use crate::error::LayoutError;
use crate::render_ir::PaginationProfileId;
use crate::render_layout::{
    Paginator, StoryLayoutFlags, StoryPagination, TextMeasurer, TextPageLayout,
};

/// Lines the contents heading occupies above the first entry.
pub const CONTENTS_HEADING_LINES: usize = 3;

/// One page of the book.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Page {
    Cover,
    TableOfContents {
        /// 0-based position among the contents pages.
        toc_page: usize,
        /// Indices into [`BookLayout::toc_entries`].
        entries: Range<usize>,
    },
    StoryTitle {
        story_id: StoryId,
    },
    Text {
        story_id: StoryId,
        paragraph_index_range: Range<usize>,
        /// 1-based position among the story's text pages.
        page_within_story: usize,
    },
    Media {
        story_id: StoryId,
        media_id: String,
        /// Position in the story's ordered media list.
        media_index: usize,
    },
}

impl Page {
    pub fn story_id(&self) -> Option<&str> {
        match self {
            Self::Cover | Self::TableOfContents { .. } => None,
            Self::StoryTitle { story_id }
            | Self::Text { story_id, .. }
            | Self::Media { story_id, .. } => Some(story_id),
        }
    }

    /// Text and media pages carry the running header and footer.
    pub fn is_content_page(&self) -> bool {
        matches!(self, Self::Text { .. } | Self::Media { .. })
    }
}

/// Page span of one laid-out story.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoryLayoutEntry {
    /// Position in the snapshot's story list.
    pub story_index: usize,
    pub story_id: StoryId,
    /// First global page index of this story.
    pub first_page_index: usize,
    /// Pages occupied, title page included.
    pub page_count: usize,
    pub has_title_page: bool,
    pub text_page_count: usize,
    pub media_page_count: usize,
}

impl StoryLayoutEntry {
    pub fn contains_global_page(&self, global_page_index: usize) -> bool {
        if self.page_count == 0 {
            return false;
        }
        let start = self.first_page_index;
        let end = start.saturating_add(self.page_count);
        global_page_index >= start && global_page_index < end
    }

    pub fn page_range(&self) -> Range<usize> {
        self.first_page_index..self.first_page_index + self.page_count
    }
}

/// A global page resolved back to its story.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurrentStory<'a> {
    pub story: &'a Story,
    pub story_index: usize,
    /// 1-based offset of the page inside the story's span.
    pub page_within_story: usize,
    pub is_media_page: bool,
    pub media_item: Option<&'a MediaItem>,
    /// Text layout, for text pages.
    pub text_page: Option<&'a TextPageLayout>,
}

/// Recoverable events recorded while building a layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutDiagnostic {
    /// The story failed layout and was left out of the book.
    StorySkipped { story_id: StoryId, error: LayoutError },
    /// A cached pagination was reused.
    CacheHit { story_id: StoryId, page_count: usize },
    /// The story was paginated from scratch.
    CacheMiss { story_id: StoryId },
}

/// Builds [`BookLayout`]s with a fixed configuration and measurer.
#[derive(Clone)]
pub struct BookLayoutEngine {
    config: BookConfig,
    measurer: Arc<dyn TextMeasurer>,
}

impl fmt::Debug for BookLayoutEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookLayoutEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BookLayoutEngine {
    pub fn new(config: BookConfig) -> Self {
        Self {
            config,
            measurer: crate::render_layout::StandardFontMeasurer::shared(),
        }
    }

    pub fn with_text_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    pub fn paginator(&self) -> Paginator {
        Paginator::new(self.config.dimensions).with_text_measurer(Arc::clone(&self.measurer))
    }

    /// Lay out `snapshot` from scratch.
    pub fn layout(&self, snapshot: Arc<BookSnapshot>) -> Result<BookLayout, LayoutError> {
        let mut cache = PaginationCache::new();
        self.layout_with_cache(snapshot, &mut cache)
    }

    /// Lay out `snapshot`, reusing still-valid story paginations from `cache`.
    ///
    /// Invalid page geometry fails the whole build. Anything wrong with a
    /// single story only skips that story.
    pub fn layout_with_cache(
        &self,
        snapshot: Arc<BookSnapshot>,
        cache: &mut PaginationCache,
    ) -> Result<BookLayout, LayoutError> {
        let started = Instant::now();
        let dims = self.config.dimensions;
        dims.validate()?;
        let options = self.config.layout;
        let limits = self.config.limits;
        let paginator = self.paginator();

        let mut diagnostics = Vec::new();
        let mut planned: Vec<PlannedStory> = Vec::with_capacity(snapshot.stories.len());
        for (story_index, story) in snapshot.stories.iter().enumerate() {
            let flags = StoryLayoutFlags {
                reserve_title: !options.story_title_pages,
                drop_cap: options.drop_cap && planned.is_empty(),
            };
            let result = if story_index >= limits.max_stories {
                Err(LayoutError::LimitExceeded {
                    kind: "stories",
                    actual: snapshot.stories.len(),
                    limit: limits.max_stories,
                })
            } else {
                check_story(story, snapshot.media_for(&story.id), &limits)
            };
            if let Err(error) = result {
                log::warn!("skipping story {}: {}", story.id, error);
                diagnostics.push(LayoutDiagnostic::StorySkipped {
                    story_id: story.id.clone(),
                    error,
                });
                continue;
            }
            let (pagination, hit) = cache.get_or_paginate(story, &paginator, flags);
            diagnostics.push(if hit {
                LayoutDiagnostic::CacheHit {
                    story_id: story.id.clone(),
                    page_count: pagination.page_count(),
                }
            } else {
                LayoutDiagnostic::CacheMiss {
                    story_id: story.id.clone(),
                }
            });
            planned.push(PlannedStory {
                story_index,
                pagination,
            });
        }
        cache.retain_stories(snapshot.stories.iter().map(|story| story.id.as_str()));

        let per_toc_page = toc_entries_per_page(&dims);
        let toc_page_count = if options.include_toc {
            planned.len().div_ceil(per_toc_page).max(1)
        } else {
            0
        };

        let mut pages = Vec::with_capacity(1 + toc_page_count + planned.len() * 2);
        pages.push(Page::Cover);
        for toc_page in 0..toc_page_count {
            let start = toc_page * per_toc_page;
            let end = (start + per_toc_page).min(planned.len());
            pages.push(Page::TableOfContents {
                toc_page,
                entries: start..end.max(start),
            });
        }

        let mut entries = Vec::with_capacity(planned.len());
        let mut toc = Vec::with_capacity(planned.len());
        let mut story_start_page = HashMap::with_capacity(planned.len());
        let mut paginations = HashMap::with_capacity(planned.len());
        for plan in planned {
            let story = &snapshot.stories[plan.story_index];
            let media = snapshot.media_for(&story.id);
            let first_page_index = pages.len();
            story_start_page.insert(story.id.clone(), first_page_index);
            if options.story_title_pages {
                pages.push(Page::StoryTitle {
                    story_id: story.id.clone(),
                });
            }
            for text_page in &plan.pagination.pages {
                pages.push(Page::Text {
                    story_id: story.id.clone(),
                    paragraph_index_range: text_page.paragraph_index_range(),
                    page_within_story: text_page.page_within_story,
                });
            }
            for (media_index, item) in media.iter().enumerate() {
                pages.push(Page::Media {
                    story_id: story.id.clone(),
                    media_id: item.id.clone(),
                    media_index,
                });
            }
            let page_count = pages.len() - first_page_index;
            toc.push(TocEntry {
                story_id: story.id.clone(),
                title: story.display_title().to_string(),
                page: first_page_index,
                end_page: pages.len(),
            });
            entries.push(StoryLayoutEntry {
                story_index: plan.story_index,
                story_id: story.id.clone(),
                first_page_index,
                page_count,
                has_title_page: options.story_title_pages,
                text_page_count: plan.pagination.page_count(),
                media_page_count: media.len(),
            });
            paginations.insert(story.id.clone(), plan.pagination);
        }

        let profile = layout_profile(&snapshot, &self.config);
        log::debug!(
            "laid out {} of {} stories into {} pages in {}ms (profile {})",
            entries.len(),
            snapshot.stories.len(),
            pages.len(),
            started.elapsed().as_millis(),
            &profile.to_hex()[..12]
        );

        Ok(BookLayout {
            snapshot,
            config: self.config.clone(),
            measurer: Arc::clone(&self.measurer),
            pages,
            story_start_page,
            entries,
            paginations,
            toc,
            diagnostics,
            profile,
        })
    }
}

struct PlannedStory {
    story_index: usize,
    pagination: Arc<StoryPagination>,
}

fn check_story(story: &Story, media: &[MediaItem], limits: &LayoutLimits) -> Result<(), LayoutError> {
    if story.content.len() > limits.max_story_bytes {
        return Err(LayoutError::LimitExceeded {
            kind: "story_bytes",
            actual: story.content.len(),
            limit: limits.max_story_bytes,
        });
    }
    let paragraphs = story.paragraphs().count();
    if paragraphs > limits.max_paragraphs_per_story {
        return Err(LayoutError::LimitExceeded {
            kind: "paragraphs",
            actual: paragraphs,
            limit: limits.max_paragraphs_per_story,
        });
    }
    if media.len() > limits.max_media_per_story {
        return Err(LayoutError::LimitExceeded {
            kind: "media",
            actual: media.len(),
            limit: limits.max_media_per_story,
        });
    }
    if let Some(item) = media.iter().find(|item| item.kind().is_none()) {
        return Err(LayoutError::UnsupportedMedia {
            media_id: item.id.clone(),
            content_type: item.content_type.clone(),
        });
    }
    Ok(())
}

/// Contents entries that fit on one contents page.
pub fn toc_entries_per_page(dims: &PageDimensions) -> usize {
    let lines = (dims.content_height() / dims.line_height_px).floor().max(0.0) as usize;
    lines.saturating_sub(CONTENTS_HEADING_LINES).max(1)
}

fn layout_profile(snapshot: &BookSnapshot, config: &BookConfig) -> PaginationProfileId {
    let mut payload = config.dimensions.fingerprint_bytes();
    let LayoutOptions {
        include_toc,
        story_title_pages,
        drop_cap,
    } = config.layout;
    payload.extend_from_slice(&[
        u8::from(include_toc),
        u8::from(story_title_pages),
        u8::from(drop_cap),
    ]);
    payload.extend_from_slice(format!("{:?}", config.limits).as_bytes());
    for story in &snapshot.stories {
        for field in [story.id.as_str(), story.display_title(), story.content.as_str()] {
            payload.extend_from_slice(field.as_bytes());
            payload.push(0);
        }
        for item in snapshot.media_for(&story.id) {
            for field in [item.id.as_str(), item.content_type.as_str()] {
                payload.extend_from_slice(field.as_bytes());
                payload.push(0);
            }
        }
        payload.push(0xff);
    }
    PaginationProfileId::from_bytes(&payload)
}

/// Global page index for one book snapshot.
///
/// Built once and shared by every renderer, so preview and export agree on
/// page boundaries. Never persisted; rebuild it whenever stories or media
/// change.
#[derive(Clone)]
pub struct BookLayout {
    snapshot: Arc<BookSnapshot>,
    config: BookConfig,
    measurer: Arc<dyn TextMeasurer>,
    pages: Vec<Page>,
    story_start_page: HashMap<StoryId, usize>,
    entries: Vec<StoryLayoutEntry>,
    paginations: HashMap<StoryId, Arc<StoryPagination>>,
    toc: Vec<TocEntry>,
    diagnostics: Vec<LayoutDiagnostic>,
    profile: PaginationProfileId,
}

impl fmt::Debug for BookLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookLayout")
            .field("pages", &self.pages)
            .field("entries", &self.entries)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

impl BookLayout {
    /// Lay out `snapshot` with the standard measurer.
    pub fn build(snapshot: Arc<BookSnapshot>, config: &BookConfig) -> Result<Self, LayoutError> {
        BookLayoutEngine::new(config.clone()).layout(snapshot)
    }

    /// Lay out `snapshot` with the standard measurer, reusing `cache`.
    pub fn build_with_cache(
        snapshot: Arc<BookSnapshot>,
        config: &BookConfig,
        cache: &mut PaginationCache,
    ) -> Result<Self, LayoutError> {
        BookLayoutEngine::new(config.clone()).layout_with_cache(snapshot, cache)
    }

    pub fn snapshot(&self) -> &Arc<BookSnapshot> {
        &self.snapshot
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    pub fn dimensions(&self) -> &PageDimensions {
        &self.config.dimensions
    }

    pub fn measurer(&self) -> &Arc<dyn TextMeasurer> {
        &self.measurer
    }

    pub fn total_page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, global_page: usize) -> Option<&Page> {
        self.pages.get(global_page)
    }

    pub fn story_start_page(&self, story_id: &str) -> Option<usize> {
        self.story_start_page.get(story_id).copied()
    }

    pub fn story_start_pages(&self) -> &HashMap<StoryId, usize> {
        &self.story_start_page
    }

    /// Laid-out stories in book order.
    pub fn entries(&self) -> &[StoryLayoutEntry] {
        &self.entries
    }

    pub fn entry_for_global_page(&self, global_page: usize) -> Option<&StoryLayoutEntry> {
        let idx = self
            .entries
            .partition_point(|entry| entry.first_page_index + entry.page_count <= global_page);
        self.entries
            .get(idx)
            .filter(|entry| entry.contains_global_page(global_page))
    }

    pub fn pagination(&self, story_id: &str) -> Option<&Arc<StoryPagination>> {
        self.paginations.get(story_id)
    }

    /// Contents entries: story title and first global page.
    pub fn toc_entries(&self) -> &[TocEntry] {
        &self.toc
    }

    pub fn diagnostics(&self) -> &[LayoutDiagnostic] {
        &self.diagnostics
    }

    /// Stories left out of the book, with the reason.
    pub fn skipped_stories(&self) -> impl Iterator<Item = (&str, &LayoutError)> + '_ {
        self.diagnostics.iter().filter_map(|diag| match diag {
            LayoutDiagnostic::StorySkipped { story_id, error } => Some((story_id.as_str(), error)),
            _ => None,
        })
    }

    /// Fingerprint of the snapshot and configuration this layout was built from.
    pub fn profile(&self) -> PaginationProfileId {
        self.profile
    }

    /// Resolve `global_page` to its story, or `None` for cover and contents.
    pub fn current_story(&self, global_page: usize) -> Option<CurrentStory<'_>> {
        let entry = self.entry_for_global_page(global_page)?;
        let story = self.snapshot.stories.get(entry.story_index)?;
        let page_within_story = global_page - entry.first_page_index + 1;
        let (is_media_page, media_item, text_page) = match self.pages.get(global_page)? {
            Page::Media { media_index, .. } => (
                true,
                self.snapshot.media_for(&story.id).get(*media_index),
                None,
            ),
            Page::Text {
                page_within_story: text_page_number,
                ..
            } => (
                false,
                None,
                self.pagination(&story.id)
                    .and_then(|p| p.pages.get(text_page_number.saturating_sub(1))),
            ),
            _ => (false, None, None),
        };
        Some(CurrentStory {
            story,
            story_index: entry.story_index,
            page_within_story,
            is_media_page,
            media_item,
            text_page,
        })
    }
}
