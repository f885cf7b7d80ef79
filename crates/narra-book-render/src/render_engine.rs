//! Page composition: turns each [`Page`] of a [`BookLayout`] into draw commands.

use std::fmt;
use std::sync::Arc;

use narra_book::{Color, MediaItem, MediaKind, PageDimensions, Story, TocEntry};

use crate::cover_layout::layout_cover_text;
use crate::page_index::{BookLayout, Page, CONTENTS_HEADING_LINES};
use crate::render_ir::{
    DrawCommand, FontFace, ImageFallback, ImageFit, ImageObjectCommand, PageChromeCommand,
    PageChromeKind, PageMetrics, RectCommand, RenderPage, RuleCommand, TextAlign, TextCommand,
    TextRole, TextStyle,
};
use crate::render_layout::{
    line_baseline_offset, truncate_text_to_width, wrap_text, TextMeasurer, DROP_CAP_GAP_PX,
};

/// Text drawn on a media page whose image cannot be loaded.
pub const MEDIA_PLACEHOLDER_TEXT: &str = "[Could not load media]";
/// Text drawn on a text page of a story without paragraphs.
pub const EMPTY_PAGE_TEXT: &str = "No content on this page";
/// Heading of the contents pages.
pub const CONTENTS_HEADING: &str = "Contents";

const CHROME_COLOR: Color = Color::rgb(0x55, 0x55, 0x55);
const RULE_COLOR: Color = Color::rgb(0x99, 0x99, 0x99);
const PLACEHOLDER_COLOR: Color = Color::rgb(0x77, 0x77, 0x77);
const VIDEO_FILL: Color = Color::rgb(0xee, 0xee, 0xee);
const CAPTION_GAP_PX: f32 = 8.0;
const MAX_CAPTION_LINES: usize = 2;

/// Composes render pages for every back-end from one shared layout.
#[derive(Clone)]
pub struct BookRenderer {
    layout: Arc<BookLayout>,
}

impl fmt::Debug for BookRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookRenderer")
            .field("pages", &self.layout.total_page_count())
            .finish_non_exhaustive()
    }
}

impl BookRenderer {
    pub fn new(layout: Arc<BookLayout>) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Arc<BookLayout> {
        &self.layout
    }

    pub fn page_count(&self) -> usize {
        self.layout.total_page_count()
    }

    fn dims(&self) -> &PageDimensions {
        self.layout.dimensions()
    }

    fn measurer(&self) -> &dyn TextMeasurer {
        self.layout.measurer().as_ref()
    }

    /// Fetchable URL of a media item under the configured media base URL.
    pub fn media_url(&self, item: &MediaItem) -> String {
        item.resolve_url(self.layout.config().media_base_url.as_deref())
    }

    /// Iterate all pages in order.
    pub fn pages(&self) -> RenderPageIter<'_> {
        RenderPageIter {
            renderer: self,
            next: 0,
        }
    }

    /// Compose page `index`, or `None` past the end of the book.
    pub fn render_page(&self, index: usize) -> Option<RenderPage> {
        let page = self.layout.page(index)?;
        let dims = *self.dims();
        let mut out = RenderPage::new(index + 1, dims.width_px, dims.height_px);
        out.metrics = self.page_metrics(index);
        match page {
            Page::Cover => self.compose_cover(&mut out),
            Page::TableOfContents { entries, .. } => {
                let toc = self.layout.toc_entries();
                let slice = toc.get(entries.clone()).unwrap_or(&[]);
                self.compose_contents(&mut out, slice);
            }
            Page::StoryTitle { story_id } => {
                if let Some(story) = self.layout.snapshot().story(story_id) {
                    self.compose_story_title(&mut out, story);
                }
                self.compose_footer(&mut out, index);
            }
            Page::Text {
                story_id,
                page_within_story,
                ..
            } => {
                self.compose_text(&mut out, story_id, *page_within_story);
                self.compose_chrome(&mut out, index);
            }
            Page::Media {
                story_id,
                media_index,
                ..
            } => {
                if let Some(item) = self.layout.snapshot().media_for(story_id).get(*media_index) {
                    self.compose_media(&mut out, item);
                }
                self.compose_chrome(&mut out, index);
            }
        }
        Some(out)
    }

    fn page_metrics(&self, index: usize) -> PageMetrics {
        let total = self.layout.total_page_count();
        let current = self.layout.current_story(index);
        PageMetrics {
            global_page_index: index,
            global_page_count: total,
            story_index: current.map(|c| c.story_index),
            page_within_story: current.map(|c| c.page_within_story),
            progress_book: if total == 0 {
                0.0
            } else {
                (index + 1) as f32 / total as f32
            },
        }
    }

    fn body_style(&self) -> TextStyle {
        let dims = self.dims();
        TextStyle::body(dims.font_size_px, dims.line_height_px)
    }

    fn chrome_style(&self) -> TextStyle {
        let size = self.dims().font_size_px * 0.82;
        TextStyle::body(size, size * 1.2).with_color(CHROME_COLOR)
    }

    fn push_text(&self, page: &mut RenderPage, chrome: bool, x: f32, baseline_y: f32, text: String, style: TextStyle) {
        if text.is_empty() {
            return;
        }
        let width = self.measurer().measure_text_px(&text, &style);
        let cmd = DrawCommand::Text(TextCommand {
            x,
            baseline_y,
            width,
            text,
            style,
        });
        if chrome {
            page.push_chrome_command(cmd);
        } else {
            page.push_content_command(cmd);
        }
    }

    /// Push `text` centered on the page at `baseline_y`.
    fn push_centered(&self, page: &mut RenderPage, chrome: bool, baseline_y: f32, text: String, style: TextStyle) {
        let width = self.measurer().measure_text_px(&text, &style);
        let x = self.dims().center_x() - width / 2.0;
        self.push_text(page, chrome, x, baseline_y, text, style.with_align(TextAlign::Center));
    }

    fn compose_cover(&self, page: &mut RenderPage) {
        let dims = *self.dims();
        let cover = &self.layout.snapshot().cover;
        page.push_content_command(DrawCommand::Rect(RectCommand {
            x: 0.0,
            y: 0.0,
            width: dims.width_px,
            height: dims.height_px,
            fill: true,
            color: cover.background_color,
        }));
        if let Some(src) = &cover.background_image {
            page.push_content_command(DrawCommand::ImageObject(ImageObjectCommand {
                src: src.clone(),
                alt: String::new(),
                x: 0.0,
                y: 0.0,
                width: dims.width_px,
                height: dims.height_px,
                fit: ImageFit::Cover,
                fallback: ImageFallback::BackgroundOnly,
            }));
        }
        let text = layout_cover_text(cover, dims.width_px, dims.height_px, 1.0, self.measurer());
        for line in &text.title_lines {
            self.push_text(page, false, line.x, line.baseline_y, line.text.clone(), text.title_style);
        }
        if let Some(author) = &text.author {
            self.push_text(page, false, author.x, author.baseline_y, author.text.clone(), text.author_style);
        }
    }

    fn compose_contents(&self, page: &mut RenderPage, entries: &[TocEntry]) {
        let dims = *self.dims();
        let lh = dims.line_height_px;
        let heading_size = dims.font_size_px * 1.6;
        let heading_style = TextStyle::body(heading_size, heading_size * 1.2)
            .with_face(FontFace::Bold)
            .with_role(TextRole::ContentsHeading);
        self.push_centered(
            page,
            false,
            dims.content_top() + line_baseline_offset(heading_size, heading_size * 1.2),
            CONTENTS_HEADING.to_string(),
            heading_style,
        );

        let style = self.body_style().with_role(TextRole::ContentsEntry);
        let measurer = self.measurer();
        let left = dims.content_left();
        let right = left + dims.content_width();
        let dot_width = measurer.measure_text_px(".", &style).max(0.1);
        let gap = measurer.measure_text_px(" ", &style);
        let offset = line_baseline_offset(dims.font_size_px, lh);
        for (row, entry) in entries.iter().enumerate() {
            let top = dims.content_top() + (CONTENTS_HEADING_LINES + row) as f32 * lh;
            let baseline = top + offset;
            let number = entry.display_page().to_string();
            let number_width = measurer.measure_text_px(&number, &style);
            let title_max = dims.content_width() - number_width - gap * 2.0 - dot_width * 3.0;
            let title = truncate_text_to_width(&entry.title, title_max, measurer, &style);
            let title_width = measurer.measure_text_px(&title, &style);
            self.push_text(page, false, left, baseline, title, style);

            let leader_start = left + title_width + gap;
            let number_x = right - number_width;
            let dots = ((number_x - gap - leader_start) / dot_width).floor().max(0.0) as usize;
            if dots > 0 {
                self.push_text(
                    page,
                    false,
                    leader_start,
                    baseline,
                    ".".repeat(dots),
                    style.with_color(RULE_COLOR),
                );
            }
            self.push_text(
                page,
                false,
                number_x,
                baseline,
                number,
                style.with_align(TextAlign::Right),
            );
        }
    }

    fn compose_story_title(&self, page: &mut RenderPage, story: &Story) {
        let dims = *self.dims();
        let size = dims.font_size_px * 2.0;
        let style = TextStyle::body(size, size * 1.3)
            .with_face(FontFace::Bold)
            .with_role(TextRole::StoryTitle);
        let lines = wrap_text(story.display_title(), dims.content_width(), self.measurer(), &style);
        let mut top = dims.content_top() + dims.content_height() * 0.3;
        for line in lines {
            self.push_centered(
                page,
                false,
                top + line_baseline_offset(size, style.line_height_px),
                line,
                style,
            );
            top += style.line_height_px;
        }
        let rule_len = dims.content_width() / 4.0;
        page.push_content_command(DrawCommand::Rule(RuleCommand {
            x: dims.center_x() - rule_len / 2.0,
            y: top + dims.line_height_px / 2.0,
            length: rule_len,
            thickness: 0.75,
            horizontal: true,
            color: RULE_COLOR,
        }));
    }

    fn compose_text(&self, page: &mut RenderPage, story_id: &str, page_within_story: usize) {
        let dims = *self.dims();
        let (Some(story), Some(pagination)) = (
            self.layout.snapshot().story(story_id),
            self.layout.pagination(story_id),
        ) else {
            return;
        };
        let Some(text_page) = pagination.pages.get(page_within_story.saturating_sub(1)) else {
            return;
        };
        let measurer = self.measurer();
        let left = dims.content_left();
        let lh = dims.line_height_px;

        let mut cursor = dims.content_top();
        if text_page.has_title {
            let size = dims.font_size_px * 1.6;
            let style = TextStyle::body(size, size * 1.2)
                .with_face(FontFace::Bold)
                .with_role(TextRole::StoryTitle);
            let title =
                truncate_text_to_width(story.display_title(), dims.content_width(), measurer, &style);
            self.push_centered(
                page,
                false,
                cursor + line_baseline_offset(size, style.line_height_px),
                title,
                style,
            );
            let rule_len = 48.0f32.min(dims.content_width());
            page.push_content_command(DrawCommand::Rule(RuleCommand {
                x: dims.center_x() - rule_len / 2.0,
                y: cursor + style.line_height_px + 6.0,
                length: rule_len,
                thickness: 0.5,
                horizontal: true,
                color: RULE_COLOR,
            }));
            cursor += dims.title_reserve_px;
        }

        if text_page.slices.is_empty() {
            let style = self
                .body_style()
                .with_face(FontFace::Italic)
                .with_role(TextRole::Placeholder)
                .with_color(PLACEHOLDER_COLOR);
            let middle = cursor + (dims.content_bottom() - cursor) / 2.0;
            self.push_centered(page, false, middle, EMPTY_PAGE_TEXT.to_string(), style);
            return;
        }

        let body = self.body_style();
        let offset = line_baseline_offset(dims.font_size_px, lh);
        for (slice_idx, slice) in text_page.slices.iter().enumerate() {
            let Some(paragraph) = pagination.paragraphs.get(slice.paragraph) else {
                continue;
            };
            if slice_idx > 0 {
                cursor += dims.paragraph_spacing_px;
            }
            if let (Some(cap), 0) = (&paragraph.drop_cap, slice.lines.start) {
                let style = TextStyle::body(cap.size_px, cap.size_px).with_role(TextRole::DropCap);
                let baseline = cursor + (cap.lines.saturating_sub(1)) as f32 * lh + offset;
                self.push_text(page, false, left, baseline, cap.letter.clone(), style);
            }
            for line_idx in slice.lines.clone() {
                let Some(line) = paragraph.lines.get(line_idx) else {
                    continue;
                };
                let inset = match &paragraph.drop_cap {
                    Some(cap) if line_idx < cap.lines => cap.width_px + DROP_CAP_GAP_PX,
                    Some(_) => 0.0,
                    None if line_idx == 0 => dims.first_line_indent_px,
                    None => 0.0,
                };
                let top = cursor + (line_idx - slice.lines.start) as f32 * lh;
                self.push_text(page, false, left + inset, top + offset, line.clone(), body);
            }
            cursor += paragraph.slice_rows(&slice.lines) as f32 * lh;
        }
    }

    fn compose_media(&self, page: &mut RenderPage, item: &MediaItem) {
        let dims = *self.dims();
        let measurer = self.measurer();
        let caption_size = dims.font_size_px * 0.9;
        let caption_style = TextStyle::body(caption_size, caption_size * 1.4)
            .with_face(FontFace::Italic)
            .with_role(TextRole::Caption);
        let mut caption_lines = match item.caption_text() {
            Some(caption) => wrap_text(caption, dims.content_width(), measurer, &caption_style),
            None => Vec::new(),
        };
        if caption_lines.len() > MAX_CAPTION_LINES {
            let rest = caption_lines[MAX_CAPTION_LINES - 1..].join(" ");
            caption_lines.truncate(MAX_CAPTION_LINES - 1);
            caption_lines.push(truncate_text_to_width(
                &rest,
                dims.content_width(),
                measurer,
                &caption_style,
            ));
        }
        let caption_block = if caption_lines.is_empty() {
            0.0
        } else {
            CAPTION_GAP_PX + caption_lines.len() as f32 * caption_style.line_height_px
        };

        let x = dims.content_left();
        let y = dims.content_top();
        let width = dims.content_width();
        let height = (dims.content_height() - caption_block).max(dims.line_height_px);
        let src = self.media_url(item);

        match item.kind() {
            Some(MediaKind::Video) => self.compose_video(page, &src, x, y, width, height),
            _ => page.push_content_command(DrawCommand::ImageObject(ImageObjectCommand {
                src,
                alt: item.caption_text().unwrap_or_default().to_string(),
                x,
                y,
                width,
                height,
                fit: ImageFit::Contain,
                fallback: ImageFallback::Placeholder(MEDIA_PLACEHOLDER_TEXT.to_string()),
            })),
        }

        let mut top = y + height + CAPTION_GAP_PX;
        for line in caption_lines {
            self.push_centered(
                page,
                false,
                top + line_baseline_offset(caption_size, caption_style.line_height_px),
                line,
                caption_style,
            );
            top += caption_style.line_height_px;
        }
    }

    fn compose_video(&self, page: &mut RenderPage, url: &str, x: f32, y: f32, width: f32, height: f32) {
        let dims = *self.dims();
        page.push_content_command(DrawCommand::Rect(RectCommand {
            x,
            y,
            width,
            height,
            fill: true,
            color: VIDEO_FILL,
        }));
        page.push_content_command(DrawCommand::Rect(RectCommand {
            x,
            y,
            width,
            height,
            fill: false,
            color: RULE_COLOR,
        }));
        let middle = y + height / 2.0;
        let lh = dims.line_height_px;
        let label = TextStyle::body(dims.font_size_px * 1.4, lh * 1.4)
            .with_face(FontFace::Bold)
            .with_role(TextRole::MediaLabel);
        self.push_centered(page, false, middle - lh, "Video".to_string(), label);
        let watch = self
            .body_style()
            .with_face(FontFace::Italic)
            .with_role(TextRole::MediaLabel);
        self.push_centered(page, false, middle + lh * 0.5, "Watch online".to_string(), watch);
        let url_style = self.chrome_style().with_role(TextRole::MediaLabel);
        let url = truncate_text_to_width(url, width - 16.0, self.measurer(), &url_style);
        self.push_centered(page, false, middle + lh * 1.75, url, url_style);
    }

    /// Running header and footer for text and media pages.
    fn compose_chrome(&self, page: &mut RenderPage, index: usize) {
        let dims = *self.dims();
        let title = self.layout.snapshot().title.trim();
        if !title.is_empty() {
            let style = self
                .chrome_style()
                .with_face(FontFace::Italic)
                .with_role(TextRole::RunningHeader);
            let text = truncate_text_to_width(title, dims.content_width(), self.measurer(), &style);
            page.push_chrome_command(DrawCommand::PageChrome(PageChromeCommand {
                kind: PageChromeKind::Header,
                text: Some(text.clone()),
                current: None,
                total: None,
            }));
            self.push_centered(page, true, dims.header_baseline(), text, style);
        }
        self.compose_footer(page, index);
    }

    fn compose_footer(&self, page: &mut RenderPage, index: usize) {
        let dims = *self.dims();
        let number = (index + 1).to_string();
        page.push_chrome_command(DrawCommand::PageChrome(PageChromeCommand {
            kind: PageChromeKind::Footer,
            text: Some(number.clone()),
            current: Some(index + 1),
            total: Some(self.layout.total_page_count()),
        }));
        let style = self.chrome_style().with_role(TextRole::PageNumber);
        self.push_centered(page, true, dims.footer_baseline(), number, style);
    }
}

/// Iterator over the composed pages of a book.
#[derive(Debug)]
pub struct RenderPageIter<'a> {
    renderer: &'a BookRenderer,
    next: usize,
}

impl Iterator for RenderPageIter<'_> {
    type Item = RenderPage;

    fn next(&mut self) -> Option<Self::Item> {
        let page = self.renderer.render_page(self.next)?;
        self.next += 1;
        Some(page)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.renderer.page_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RenderPageIter<'_> {}

impl std::iter::FusedIterator for RenderPageIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use narra_book::{BookConfig, BookSnapshot, CoverData};

    fn media(id: &str, story: &str, content_type: &str, caption: Option<&str>) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            story_id: story.to_string(),
            file_path: format!("media/{id}"),
            content_type: content_type.to_string(),
            caption: caption.map(str::to_string),
            created_at: Default::default(),
        }
    }

    fn renderer(stories: Vec<Story>, media: Vec<MediaItem>, config: BookConfig) -> BookRenderer {
        let cover = CoverData {
            title_text: "Family Book".to_string(),
            author_text: "Rose".to_string(),
            ..CoverData::default()
        };
        let snapshot = Arc::new(BookSnapshot::new("Family Book", "Rose", stories, media, cover));
        let layout = BookLayout::build(snapshot, &config).unwrap();
        BookRenderer::new(Arc::new(layout))
    }

    #[test]
    fn renders_one_page_per_layout_page() {
        let r = renderer(
            vec![Story::new("s1", Some("One"), "Hello.")],
            vec![media("m1", "s1", "image/png", None)],
            BookConfig::default(),
        );
        assert_eq!(r.pages().len(), 3);
        let pages: Vec<RenderPage> = r.pages().collect();
        assert_eq!(pages.len(), r.page_count());
        assert_eq!(pages[2].page_number, 3);
        assert!(r.render_page(3).is_none());
    }

    #[test]
    fn cover_page_draws_background_and_centered_text() {
        let r = renderer(vec![], vec![], BookConfig::default());
        let cover = r.render_page(0).unwrap();
        assert!(matches!(
            cover.content_commands.first(),
            Some(DrawCommand::Rect(RectCommand { fill: true, .. }))
        ));
        assert_eq!(cover.texts_with_role(TextRole::CoverTitle), vec!["Family Book"]);
        assert_eq!(cover.texts_with_role(TextRole::CoverAuthor), vec!["Rose"]);
        assert!(cover.chrome_commands.is_empty());
    }

    #[test]
    fn text_page_has_title_header_chrome_and_drop_cap() {
        let r = renderer(
            vec![Story::new(
                "s1",
                Some("The Farm"),
                "We kept cows and chickens.\nEvery morning we fed them.",
            )],
            vec![],
            BookConfig::default(),
        );
        let page = r.render_page(1).unwrap();
        assert_eq!(page.texts_with_role(TextRole::StoryTitle), vec!["The Farm"]);
        assert_eq!(page.texts_with_role(TextRole::DropCap), vec!["W"]);
        assert_eq!(page.texts_with_role(TextRole::RunningHeader), vec!["Family Book"]);
        assert_eq!(page.texts_with_role(TextRole::PageNumber), vec!["2"]);
        let body = page.texts_with_role(TextRole::Body);
        assert_eq!(body, vec!["e kept cows and chickens.", "Every morning we fed them."]);

        let dims = PageDimensions::default();
        let lines: Vec<&TextCommand> = page
            .text_commands()
            .filter(|t| t.style.role == TextRole::Body)
            .collect();
        // Second paragraph is indented and sits below the 3-line drop cap.
        assert!((lines[1].x - (dims.content_left() + dims.first_line_indent_px)).abs() < 1e-3);
        let expected_top = dims.content_top() + dims.title_reserve_px + 3.0 * dims.line_height_px;
        let offset = line_baseline_offset(dims.font_size_px, dims.line_height_px);
        assert!((lines[1].baseline_y - (expected_top + offset)).abs() < 1e-3);
    }

    #[test]
    fn empty_story_renders_placeholder() {
        let r = renderer(
            vec![Story::new("s1", None, "   \n  ")],
            vec![],
            BookConfig::default(),
        );
        let page = r.render_page(1).unwrap();
        assert_eq!(page.texts_with_role(TextRole::Placeholder), vec![EMPTY_PAGE_TEXT]);
        assert!(page.texts_with_role(TextRole::Body).is_empty());
    }

    #[test]
    fn image_page_uses_contain_fit_placeholder_fallback_and_caption() {
        let mut config = BookConfig::default();
        config.media_base_url = Some("https://cdn.example.com".to_string());
        let r = renderer(
            vec![Story::new("s1", None, "x")],
            vec![media("m1", "s1", "image/jpeg", Some("The barn in 1962"))],
            config,
        );
        let page = r.render_page(2).unwrap();
        let image = page
            .content_commands
            .iter()
            .find_map(|cmd| match cmd {
                DrawCommand::ImageObject(image) => Some(image),
                _ => None,
            })
            .unwrap();
        assert_eq!(image.src, "https://cdn.example.com/media/m1");
        assert_eq!(image.fit, ImageFit::Contain);
        assert_eq!(
            image.fallback,
            ImageFallback::Placeholder(MEDIA_PLACEHOLDER_TEXT.to_string())
        );
        assert_eq!(page.texts_with_role(TextRole::Caption), vec!["The barn in 1962"]);
        let caption = page
            .text_commands()
            .find(|t| t.style.role == TextRole::Caption)
            .unwrap();
        assert!(caption.baseline_y > image.y + image.height);
    }

    #[test]
    fn video_page_draws_placeholder_frame() {
        let r = renderer(
            vec![Story::new("s1", None, "x")],
            vec![media("v1", "s1", "video/mp4", None)],
            BookConfig::default(),
        );
        let page = r.render_page(2).unwrap();
        let labels = page.texts_with_role(TextRole::MediaLabel);
        assert_eq!(&labels[..2], &["Video", "Watch online"]);
        assert!(!page
            .content_commands
            .iter()
            .any(|cmd| matches!(cmd, DrawCommand::ImageObject(_))));
    }

    #[test]
    fn print_layout_renders_contents_and_title_pages() {
        let r = renderer(
            vec![
                Story::new("a", Some("Childhood"), "Alpha."),
                Story::new("b", Some("School Years"), "Beta."),
            ],
            vec![],
            BookConfig::print(),
        );
        let toc = r.render_page(1).unwrap();
        assert_eq!(toc.texts_with_role(TextRole::ContentsHeading), vec![CONTENTS_HEADING]);
        let entries = toc.texts_with_role(TextRole::ContentsEntry);
        assert!(entries.contains(&"Childhood"));
        assert!(entries.contains(&"3"));
        assert!(entries.contains(&"5"));

        let title = r.render_page(2).unwrap();
        assert_eq!(title.texts_with_role(TextRole::StoryTitle), vec!["Childhood"]);
        assert!(title.texts_with_role(TextRole::RunningHeader).is_empty());

        let text = r.render_page(3).unwrap();
        assert!(text.texts_with_role(TextRole::StoryTitle).is_empty());
    }

    #[test]
    fn metrics_report_story_position() {
        let r = renderer(
            vec![Story::new("s1", None, "x")],
            vec![media("m1", "s1", "image/png", None)],
            BookConfig::default(),
        );
        let page = r.render_page(2).unwrap();
        assert_eq!(page.metrics.global_page_index, 2);
        assert_eq!(page.metrics.global_page_count, 3);
        assert_eq!(page.metrics.story_index, Some(0));
        assert_eq!(page.metrics.page_within_story, Some(2));
        assert!((page.metrics.progress_book - 1.0).abs() < 1e-6);
        assert_eq!(r.render_page(0).unwrap().metrics.story_index, None);
    }
}
