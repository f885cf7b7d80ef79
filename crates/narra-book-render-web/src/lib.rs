//! HTML preview backend for `narra-book-render`.
//!
//! Every page becomes one fixed-size `<section>` holding absolutely
//! positioned elements, one per draw command. The output is a single
//! self-contained document.

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

use std::fmt::Write as _;

use narra_book::TocEntry;
use narra_book_render::{
    line_baseline_offset, BookRenderer, DrawCommand, ImageFallback, ImageFit, ImageObjectCommand,
    PageMetrics, RectCommand, RenderPage, RuleCommand, TextCommand, TextRole,
};
use serde::Serialize;

/// Font stack matching the Times metrics used for layout.
pub const SERIF_FONT_STACK: &str = "\"Times New Roman\", Times, \"Liberation Serif\", serif";

/// Output switches for [`render_book_html`].
#[derive(Clone, Debug, PartialEq)]
pub struct HtmlOptions {
    /// Vertical gap between pages.
    pub page_gap_px: f32,
    /// Embed page metadata and the arrow-key pager script.
    pub include_navigation: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            page_gap_px: 24.0,
            include_navigation: true,
        }
    }
}

#[derive(Serialize)]
struct PreviewPayload<'a> {
    title: &'a str,
    author: &'a str,
    page_count: usize,
    viewport: Viewport,
    toc: Vec<TocEntryPayload<'a>>,
    pages: Vec<PageMetricsPayload>,
}

#[derive(Serialize)]
struct Viewport {
    width: f32,
    height: f32,
}

#[derive(Serialize)]
struct TocEntryPayload<'a> {
    story_id: &'a str,
    title: &'a str,
    page_index: usize,
    page_number: usize,
}

#[derive(Serialize)]
struct PageMetricsPayload {
    page_index: usize,
    story_index: Option<usize>,
    page_within_story: Option<usize>,
    progress_book: f32,
}

impl From<&PageMetrics> for PageMetricsPayload {
    fn from(metrics: &PageMetrics) -> Self {
        Self {
            page_index: metrics.global_page_index,
            story_index: metrics.story_index,
            page_within_story: metrics.page_within_story,
            progress_book: metrics.progress_book,
        }
    }
}

impl<'a> From<&'a TocEntry> for TocEntryPayload<'a> {
    fn from(entry: &'a TocEntry) -> Self {
        Self {
            story_id: &entry.story_id,
            title: &entry.title,
            page_index: entry.page,
            page_number: entry.display_page(),
        }
    }
}

/// Render every page of the book into one HTML document.
pub fn render_book_html(renderer: &BookRenderer, options: &HtmlOptions) -> String {
    let layout = renderer.layout();
    let snapshot = layout.snapshot();
    let dims = layout.dimensions();
    let pages: Vec<RenderPage> = renderer.pages().collect();

    let mut body = String::new();
    for page in &pages {
        render_page_html(page, &mut body);
    }

    let mut html = String::with_capacity(body.len() + 4096);
    html.push_str("<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\" />\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
    let _ = writeln!(
        html,
        "<title>{}</title>",
        html_escape::encode_text(document_title(&snapshot.title))
    );
    let _ = write!(
        html,
        "<style>\n\
         body {{ margin: 0; background: #e8e4dc; }}\n\
         .book {{ display: flex; flex-direction: column; align-items: center; gap: {gap}px; padding: {gap}px 0; }}\n\
         .page {{ position: relative; overflow: hidden; background: #fff; width: {w}px; height: {h}px; box-shadow: 0 4px 16px rgba(0,0,0,0.18); font-family: {font}; }}\n\
         .page > * {{ position: absolute; margin: 0; }}\n\
         .t {{ white-space: pre; }}\n\
         .media img {{ width: 100%; height: 100%; display: block; }}\n\
         .media .fallback {{ position: absolute; inset: 0; display: flex; align-items: center; justify-content: center; font-style: italic; color: #777; background: #f2f2f2; }}\n\
         .media .fallback[hidden] {{ display: none; }}\n\
         </style>\n",
        gap = css_px(options.page_gap_px),
        w = css_px(dims.width_px),
        h = css_px(dims.height_px),
        font = SERIF_FONT_STACK,
    );
    html.push_str("</head>\n<body>\n<main class=\"book\">\n");
    html.push_str(&body);
    html.push_str("</main>\n");

    if options.include_navigation {
        let payload = PreviewPayload {
            title: &snapshot.title,
            author: &snapshot.author,
            page_count: pages.len(),
            viewport: Viewport {
                width: dims.width_px,
                height: dims.height_px,
            },
            toc: layout.toc_entries().iter().map(TocEntryPayload::from).collect(),
            pages: pages.iter().map(|p| PageMetricsPayload::from(&p.metrics)).collect(),
        };
        match serde_json::to_string(&payload) {
            Ok(json) => {
                let safe_json = json.replace("</", "<\\/");
                let _ = writeln!(
                    html,
                    "<script type=\"application/json\" id=\"narra-book\">{safe_json}</script>"
                );
                html.push_str(NAV_SCRIPT);
            }
            Err(err) => log::warn!("skipping preview metadata: {err}"),
        }
    }

    html.push_str("</body>\n</html>\n");
    log::debug!(
        "rendered html preview: pages={} bytes={}",
        pages.len(),
        html.len()
    );
    html
}

fn document_title(title: &str) -> &str {
    let title = title.trim();
    if title.is_empty() {
        "Untitled Book"
    } else {
        title
    }
}

const NAV_SCRIPT: &str = r#"<script>
(() => {
  const pages = Array.from(document.querySelectorAll('.page'));
  let current = 0;
  const show = (i) => {
    if (i < 0 || i >= pages.length) return;
    current = i;
    pages[i].scrollIntoView({ block: 'center' });
  };
  document.addEventListener('keydown', (ev) => {
    if (ev.key === 'ArrowRight' || ev.key === 'PageDown') show(current + 1);
    else if (ev.key === 'ArrowLeft' || ev.key === 'PageUp') show(current - 1);
    else if (ev.key === 'Home') show(0);
    else if (ev.key === 'End') show(pages.length - 1);
  });
})();
</script>
"#;

/// Append one page as a `<section>` element.
pub fn render_page_html(page: &RenderPage, out: &mut String) {
    let _ = writeln!(
        out,
        "<section class=\"page\" id=\"page-{n}\" data-page=\"{n}\" style=\"width:{w}px;height:{h}px\">",
        n = page.page_number,
        w = css_px(page.width),
        h = css_px(page.height),
    );
    for cmd in page.merged_commands_iter() {
        match cmd {
            DrawCommand::Text(text) => write_text(text, out),
            DrawCommand::Rule(rule) => write_rule(rule, out),
            DrawCommand::Rect(rect) => write_rect(rect, out),
            DrawCommand::ImageObject(image) => write_image(image, out),
            DrawCommand::PageChrome(_) => {}
        }
    }
    out.push_str("</section>\n");
}

fn write_text(text: &TextCommand, out: &mut String) {
    let style = &text.style;
    let top = text.baseline_y - line_baseline_offset(style.size_px, style.line_height_px);
    let _ = write!(
        out,
        "<span class=\"t {role}\" style=\"left:{x}px;top:{top}px;font-size:{size}px;line-height:{lh}px;color:{color}",
        role = role_class(style.role),
        x = css_px(text.x),
        top = css_px(top),
        size = css_px(style.size_px),
        lh = css_px(style.line_height_px),
        color = style.color,
    );
    if style.face.is_bold() {
        out.push_str(";font-weight:bold");
    }
    if style.face.is_italic() {
        out.push_str(";font-style:italic");
    }
    let _ = writeln!(out, "\">{}</span>", html_escape::encode_text(&text.text));
}

fn write_rule(rule: &RuleCommand, out: &mut String) {
    let (width, height, top) = if rule.horizontal {
        (rule.length, rule.thickness, rule.y - rule.thickness / 2.0)
    } else {
        (rule.thickness, rule.length, rule.y)
    };
    let left = if rule.horizontal {
        rule.x
    } else {
        rule.x - rule.thickness / 2.0
    };
    let _ = writeln!(
        out,
        "<div class=\"rule\" style=\"left:{}px;top:{}px;width:{}px;height:{}px;background:{}\"></div>",
        css_px(left),
        css_px(top),
        css_px(width),
        css_px(height),
        rule.color,
    );
}

fn write_rect(rect: &RectCommand, out: &mut String) {
    let paint = if rect.fill {
        format!("background:{}", rect.color)
    } else {
        format!("box-sizing:border-box;border:0.75px solid {}", rect.color)
    };
    let _ = writeln!(
        out,
        "<div class=\"rect\" style=\"left:{}px;top:{}px;width:{}px;height:{}px;{paint}\"></div>",
        css_px(rect.x),
        css_px(rect.y),
        css_px(rect.width),
        css_px(rect.height),
    );
}

fn write_image(image: &ImageObjectCommand, out: &mut String) {
    let fit = match image.fit {
        ImageFit::Contain => "contain",
        ImageFit::Cover => "cover",
    };
    let _ = write!(
        out,
        "<div class=\"media\" style=\"left:{}px;top:{}px;width:{}px;height:{}px\">",
        css_px(image.x),
        css_px(image.y),
        css_px(image.width),
        css_px(image.height),
    );
    let onerror = match image.fallback {
        ImageFallback::Placeholder(_) => {
            "this.style.display='none';this.nextElementSibling.hidden=false"
        }
        ImageFallback::BackgroundOnly => "this.style.display='none'",
    };
    let _ = write!(
        out,
        "<img src=\"{}\" alt=\"{}\" style=\"object-fit:{fit}\" onerror=\"{onerror}\" />",
        html_escape::encode_double_quoted_attribute(&image.src),
        html_escape::encode_double_quoted_attribute(&image.alt),
    );
    if let ImageFallback::Placeholder(label) = &image.fallback {
        let _ = write!(
            out,
            "<span class=\"fallback\" hidden>{}</span>",
            html_escape::encode_text(label)
        );
    }
    out.push_str("</div>\n");
}

fn role_class(role: TextRole) -> &'static str {
    match role {
        TextRole::Body => "body",
        TextRole::DropCap => "drop-cap",
        TextRole::StoryTitle => "story-title",
        TextRole::RunningHeader => "running-header",
        TextRole::PageNumber => "page-number",
        TextRole::Caption => "caption",
        TextRole::ContentsHeading => "contents-heading",
        TextRole::ContentsEntry => "contents-entry",
        TextRole::Placeholder => "placeholder",
        TextRole::CoverTitle => "cover-title",
        TextRole::CoverAuthor => "cover-author",
        TextRole::MediaLabel => "media-label",
    }
}

/// CSS pixel value with at most two decimals and no trailing zeros.
fn css_px(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 100.0).round() / 100.0;
    let mut text = format!("{rounded:.2}");
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}
