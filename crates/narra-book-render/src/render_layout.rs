//! Text measurement, line wrapping and paragraph pagination.
//!
//! Every back-end draws exactly the lines produced here, so the HTML preview
//! and the PDF export always agree on page breaks.

use core::ops::Range;
use std::sync::Arc;

use narra_book::PageDimensions;
use serde::{Deserialize, Serialize};

use crate::render_ir::{FontFace, TextRole, TextStyle};

const FIT_EPSILON_PX: f32 = 0.01;
/// Horizontal gap between the drop cap glyph and the narrowed lines.
pub const DROP_CAP_GAP_PX: f32 = 4.0;

/// Text measurement hook for glyph-accurate line fitting.
pub trait TextMeasurer: Send + Sync {
    /// Measure rendered text width for the provided style.
    fn measure_text_px(&self, text: &str, style: &TextStyle) -> f32;

    /// Conservative (safe upper-bound) width estimate.
    ///
    /// Default delegates to `measure_text_px`.
    fn conservative_text_px(&self, text: &str, style: &TextStyle) -> f32 {
        self.measure_text_px(text, style)
    }
}

/// Advance widths of the standard Times faces, in 1/1000 em.
///
/// The PDF back-end draws with the built-in Type1 Times fonts, whose metrics
/// are fixed, so measuring with the same table keeps wraps identical between
/// preview and export. Glyphs outside printable ASCII fall back to a
/// class-based estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StandardFontMeasurer;

impl StandardFontMeasurer {
    pub fn new() -> Self {
        Self
    }

    /// Shared handle for APIs that take `Arc<dyn TextMeasurer>`.
    pub fn shared() -> Arc<dyn TextMeasurer> {
        Arc::new(Self)
    }
}

impl TextMeasurer for StandardFontMeasurer {
    fn measure_text_px(&self, text: &str, style: &TextStyle) -> f32 {
        let mut units = 0.0f32;
        for ch in text.chars() {
            units += times_glyph_units(ch, style.face);
        }
        units * style.size_px / 1000.0
    }

    fn conservative_text_px(&self, text: &str, style: &TextStyle) -> f32 {
        self.measure_text_px(text, style) * 1.02
    }
}

#[rustfmt::skip]
const TIMES_ROMAN_ASCII: [u16; 95] = [
    // ' ' ! " # $ % & ' ( ) * + , - . /
    250, 333, 408, 500, 500, 833, 778, 333, 333, 333, 500, 564, 250, 333, 250, 278,
    // 0-9
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    // : ; < = > ? @
    278, 278, 564, 564, 564, 444, 921,
    // A-Z
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    // [ \ ] ^ _ `
    333, 278, 333, 469, 500, 333,
    // a-z
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    // { | } ~
    480, 200, 480, 541,
];

fn times_glyph_units(ch: char, face: FontFace) -> f32 {
    let base = match ch {
        ' '..='~' => f32::from(TIMES_ROMAN_ASCII[(ch as usize) - 0x20]),
        '\u{00A0}' => 250.0,
        '\u{2018}' | '\u{2019}' => 333.0,
        '\u{201C}' | '\u{201D}' => 444.0,
        '\u{2013}' => 500.0,
        '\u{2014}' => 1000.0,
        '\u{2026}' => 1000.0,
        other => proportional_glyph_em_width(other) * 1000.0,
    };
    // Bold Times runs roughly five percent wider; italic is close to roman.
    if face.is_bold() {
        base * 1.05
    } else {
        base
    }
}

fn proportional_glyph_em_width(ch: char) -> f32 {
    match ch {
        '\t' => 1.0,
        c if c.is_whitespace() => 0.25,
        c if c.is_alphabetic() && c.is_uppercase() => 0.68,
        c if c.is_alphabetic() => 0.48,
        c if c.is_numeric() => 0.5,
        c if (c as u32) >= 0x2E80 => 1.0,
        _ => 0.56,
    }
}

/// Greedy word wrap.
///
/// A new line starts when the next word would push the line past
/// `max_width`. A word wider than `max_width` stays whole on its own line.
pub fn wrap_text(
    text: &str,
    max_width: f32,
    measurer: &dyn TextMeasurer,
    style: &TextStyle,
) -> Vec<String> {
    wrap_words(text, measurer, style, false, |_| max_width)
}

/// Greedy word wrap with a per-line width.
///
/// `line_width(i)` gives the available width of line `i`. With
/// `break_long_words`, words wider than their line are split at character
/// boundaries instead of overflowing.
pub fn wrap_words<F>(
    text: &str,
    measurer: &dyn TextMeasurer,
    style: &TextStyle,
    break_long_words: bool,
    line_width: F,
) -> Vec<String>
where
    F: Fn(usize) -> f32,
{
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() {
            let candidate_width = measurer.measure_text_px(&current, style)
                + measurer.measure_text_px(" ", style)
                + measurer.measure_text_px(word, style);
            if candidate_width <= line_width(lines.len()) + FIT_EPSILON_PX {
                current.push(' ');
                current.push_str(word);
                continue;
            }
            lines.push(core::mem::take(&mut current));
        }
        let width = line_width(lines.len());
        if break_long_words && measurer.measure_text_px(word, style) > width + FIT_EPSILON_PX {
            let mut rest = word;
            loop {
                let (head, tail) = split_to_width(rest, line_width(lines.len()), measurer, style);
                if tail.is_empty() {
                    current.push_str(head);
                    break;
                }
                lines.push(head.to_string());
                rest = tail;
            }
        } else {
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Longest prefix of `word` (at least one char) that fits `max_width`.
fn split_to_width<'a>(
    word: &'a str,
    max_width: f32,
    measurer: &dyn TextMeasurer,
    style: &TextStyle,
) -> (&'a str, &'a str) {
    let mut end = 0usize;
    for (idx, ch) in word.char_indices() {
        let next = idx + ch.len_utf8();
        if end > 0 && measurer.measure_text_px(&word[..next], style) > max_width + FIT_EPSILON_PX
        {
            break;
        }
        end = next;
    }
    word.split_at(end)
}

/// Shorten `text` with a trailing ellipsis so it fits `max_width`.
pub fn truncate_text_to_width(
    text: &str,
    max_width: f32,
    measurer: &dyn TextMeasurer,
    style: &TextStyle,
) -> String {
    if measurer.measure_text_px(text, style) <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    for ch in text.chars() {
        let mut candidate = out.clone();
        candidate.push(ch);
        candidate.push('…');
        if measurer.measure_text_px(&candidate, style) > max_width {
            break;
        }
        out.push(ch);
    }
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out.push('…');
    out
}

/// Baseline offset from the top of a line box.
pub fn line_baseline_offset(font_size_px: f32, line_height_px: f32) -> f32 {
    let half_leading = ((line_height_px - font_size_px) / 2.0).max(0.0);
    half_leading + font_size_px * 0.78
}

/// Opening letter drawn large across the first lines of a paragraph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DropCap {
    /// The letter (plus any leading punctuation) pulled out of the text.
    pub letter: String,
    /// Body lines the glyph spans.
    pub lines: usize,
    /// Glyph size.
    pub size_px: f32,
    /// Measured glyph width.
    pub width_px: f32,
    /// The paragraph had whitespace between the letter and the next word
    /// ("I was born"), so the letter is a word of its own.
    #[serde(default)]
    pub followed_by_space: bool,
}

/// One paragraph after wrapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WrappedParagraph {
    /// Position among the story's non-empty paragraphs.
    pub index: usize,
    /// Wrapped lines, in order. Without a drop cap, line 0 is indented.
    pub lines: Vec<String>,
    pub drop_cap: Option<DropCap>,
}

impl WrappedParagraph {
    /// Lines of vertical space the leading slice must reserve.
    pub fn min_lines(&self) -> usize {
        self.drop_cap.as_ref().map(|cap| cap.lines).unwrap_or(0)
    }

    /// Line rows a slice of this paragraph occupies.
    ///
    /// The leading slice never takes fewer rows than the drop cap spans.
    pub fn slice_rows(&self, lines: &Range<usize>) -> usize {
        if lines.start == 0 {
            lines.len().max(self.min_lines())
        } else {
            lines.len()
        }
    }

    /// Paragraph text rebuilt from the wrapped lines.
    pub fn text(&self) -> String {
        let body = self.lines.join(" ");
        match &self.drop_cap {
            Some(cap) if cap.followed_by_space => format!("{} {}", cap.letter, body),
            Some(cap) => format!("{}{}", cap.letter, body),
            None => body,
        }
    }
}

/// A run of consecutive lines of one paragraph placed on one page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphSlice {
    pub paragraph: usize,
    pub lines: Range<usize>,
}

/// One text page of a story.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPageLayout {
    /// 1-based position among the story's text pages.
    pub page_within_story: usize,
    /// Slices in top-to-bottom order. Empty for a story without content.
    pub slices: Vec<ParagraphSlice>,
    /// This page carries the story title header.
    pub has_title: bool,
}

impl TextPageLayout {
    /// Paragraphs touched by this page, as a half-open index range.
    pub fn paragraph_index_range(&self) -> Range<usize> {
        match (self.slices.first(), self.slices.last()) {
            (Some(first), Some(last)) => first.paragraph..last.paragraph + 1,
            _ => 0..0,
        }
    }
}

/// Pagination of one story's text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoryPagination {
    pub paragraphs: Vec<WrappedParagraph>,
    pub pages: Vec<TextPageLayout>,
}

impl StoryPagination {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty_story(&self) -> bool {
        self.paragraphs.is_empty()
    }
}

/// Per-story switches for the paginator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StoryLayoutFlags {
    /// Reserve `title_reserve_px` on the first page for the title header.
    pub reserve_title: bool,
    /// Give the first paragraph a drop cap.
    pub drop_cap: bool,
}

/// Packs wrapped paragraphs into fixed-height pages.
#[derive(Clone)]
pub struct Paginator {
    dims: PageDimensions,
    measurer: Arc<dyn TextMeasurer>,
}

impl core::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Paginator")
            .field("dims", &self.dims)
            .finish_non_exhaustive()
    }
}

impl Paginator {
    /// Paginator measuring with the standard Times metrics.
    pub fn new(dims: PageDimensions) -> Self {
        Self {
            dims,
            measurer: StandardFontMeasurer::shared(),
        }
    }

    /// Replace the text measurer.
    pub fn with_text_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    pub fn dimensions(&self) -> &PageDimensions {
        &self.dims
    }

    pub fn measurer(&self) -> &Arc<dyn TextMeasurer> {
        &self.measurer
    }

    /// Body text style derived from the page dimensions.
    pub fn body_style(&self) -> TextStyle {
        TextStyle::body(self.dims.font_size_px, self.dims.line_height_px)
    }

    /// Style of the drop cap glyph spanning `lines` body lines.
    pub fn drop_cap_style(&self, lines: usize) -> TextStyle {
        let size = self.dims.line_height_px * lines as f32
            - (self.dims.line_height_px - self.dims.font_size_px);
        TextStyle::body(size, size).with_role(TextRole::DropCap)
    }

    /// Split `content` into pages.
    ///
    /// Paragraphs are `\n`-separated, trimmed, and empty ones are dropped.
    /// Whole paragraphs are packed greedily. A paragraph that does not fit
    /// moves to the next page. A paragraph taller than a whole page starts
    /// on a fresh page and continues over as many pages as it needs, each
    /// carrying only the lines not yet placed.
    pub fn paginate(&self, content: &str, flags: StoryLayoutFlags) -> StoryPagination {
        let paragraphs = self.wrap_paragraphs(content, flags);
        let pages = self.pack(&paragraphs, flags);
        StoryPagination { paragraphs, pages }
    }

    fn first_page_lines(&self, flags: StoryLayoutFlags) -> usize {
        (self.dims.first_page_content_height(flags.reserve_title) / self.dims.line_height_px)
            .floor()
            .max(0.0) as usize
    }

    fn wrap_paragraphs(&self, content: &str, flags: StoryLayoutFlags) -> Vec<WrappedParagraph> {
        let style = self.body_style();
        let width = self.dims.content_width();
        let indent = self.dims.first_line_indent_px;
        let drop_cap_lines = usize::from(self.dims.drop_cap_lines).min(self.first_page_lines(flags));
        let measurer = self.measurer.as_ref();

        let mut out = Vec::new();
        for (index, text) in content
            .split('\n')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .enumerate()
        {
            let drop_cap = if index == 0 && flags.drop_cap && drop_cap_lines >= 2 {
                self.make_drop_cap(text, drop_cap_lines)
            } else {
                None
            };
            let wrapped = match &drop_cap {
                Some(cap) => {
                    let rest = &text[cap.letter.len()..];
                    let narrowed = width - cap.width_px - DROP_CAP_GAP_PX;
                    let cap_lines = cap.lines;
                    wrap_words(rest, measurer, &style, true, |line| {
                        if line < cap_lines {
                            narrowed
                        } else {
                            width
                        }
                    })
                }
                None => wrap_words(text, measurer, &style, true, |line| {
                    if line == 0 {
                        width - indent
                    } else {
                        width
                    }
                }),
            };
            out.push(WrappedParagraph {
                index,
                lines: wrapped,
                drop_cap,
            });
        }
        out
    }

    fn make_drop_cap(&self, text: &str, lines: usize) -> Option<DropCap> {
        // Leading quotes travel with the letter; a paragraph that is only
        // punctuation gets no drop cap.
        let mut end = 0usize;
        let mut found_letter = false;
        for (idx, ch) in text.char_indices() {
            end = idx + ch.len_utf8();
            if ch.is_alphanumeric() {
                found_letter = true;
                break;
            }
            if !matches!(ch, '"' | '\'' | '\u{201C}' | '\u{2018}' | '(' | '[') {
                return None;
            }
        }
        if !found_letter || end >= text.len() {
            return None;
        }
        let letter = text[..end].to_string();
        let style = self.drop_cap_style(lines);
        let width_px = self.measurer.measure_text_px(&letter, &style);
        if width_px + DROP_CAP_GAP_PX >= self.dims.content_width() / 2.0 {
            return None;
        }
        Some(DropCap {
            followed_by_space: text[end..].starts_with(char::is_whitespace),
            letter,
            lines,
            size_px: style.size_px,
            width_px,
        })
    }

    fn slice_height(&self, paragraph: &WrappedParagraph, lines: &Range<usize>) -> f32 {
        paragraph.slice_rows(lines) as f32 * self.dims.line_height_px
    }

    fn pack(&self, paragraphs: &[WrappedParagraph], flags: StoryLayoutFlags) -> Vec<TextPageLayout> {
        let lh = self.dims.line_height_px;
        let spacing = self.dims.paragraph_spacing_px;
        let full_page = self.dims.content_height();

        let mut pages: Vec<TextPageLayout> = Vec::new();
        let mut slices: Vec<ParagraphSlice> = Vec::new();
        let mut used = 0.0f32;
        let capacity = |page_count: usize| {
            if page_count == 0 {
                self.dims.first_page_content_height(flags.reserve_title)
            } else {
                full_page
            }
        };
        let close_page = |pages: &mut Vec<TextPageLayout>, slices: &mut Vec<ParagraphSlice>| {
            let page_within_story = pages.len() + 1;
            pages.push(TextPageLayout {
                page_within_story,
                slices: core::mem::take(slices),
                has_title: page_within_story == 1 && flags.reserve_title,
            });
        };

        for paragraph in paragraphs {
            let total = paragraph.lines.len();
            let whole = 0..total;
            let height = self.slice_height(paragraph, &whole);
            let gap = if slices.is_empty() { 0.0 } else { spacing };

            if used + gap + height <= capacity(pages.len()) + FIT_EPSILON_PX {
                used += gap + height;
                slices.push(ParagraphSlice {
                    paragraph: paragraph.index,
                    lines: whole,
                });
                continue;
            }

            let oversized = height > full_page + FIT_EPSILON_PX;
            if !slices.is_empty() {
                close_page(&mut pages, &mut slices);
                used = 0.0;
                if !oversized {
                    used = height;
                    slices.push(ParagraphSlice {
                        paragraph: paragraph.index,
                        lines: whole,
                    });
                    continue;
                }
            }

            // Empty page: split at line boundaries until the paragraph is placed.
            let mut start = 0usize;
            loop {
                let available = capacity(pages.len()) - used;
                let mut take = ((available / lh) + FIT_EPSILON_PX).floor().max(1.0) as usize;
                take = take.min(total - start);
                let end = start + take;
                let slice = start..end;
                used += self.slice_height(paragraph, &slice);
                slices.push(ParagraphSlice {
                    paragraph: paragraph.index,
                    lines: slice,
                });
                start = end;
                if start >= total {
                    break;
                }
                close_page(&mut pages, &mut slices);
                used = 0.0;
            }
        }

        if !slices.is_empty() || pages.is_empty() {
            close_page(&mut pages, &mut slices);
        }
        pages
    }
}
