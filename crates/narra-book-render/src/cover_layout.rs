//! Cover title/author placement.
//!
//! Shared by the canvas cover renderer and the cover page of the book so both
//! place text with the same math.

use core::ops::RangeInclusive;

use narra_book::{CoverData, CoverLayoutMode, AUTHOR_SIZE_RANGE, TITLE_SIZE_RANGE};

use crate::render_ir::{FontFace, TextAlign, TextRole, TextStyle};
use crate::render_layout::{line_baseline_offset, wrap_text, TextMeasurer};

/// Multiplier range the user size control maps onto.
pub const SIZE_MULTIPLIER_RANGE: RangeInclusive<f32> = 0.85..=1.15;
/// Line height as a multiple of the font size.
pub const COVER_LINE_HEIGHT_RATIO: f32 = 1.2;
/// Fraction of the width title lines may use.
pub const TITLE_MAX_WIDTH_RATIO: f32 = 0.8;
/// Bottom band the author line must stay above.
pub const BOTTOM_MARGIN_RATIO: f32 = 0.05;

/// Map a UI size value from `range` linearly onto [`SIZE_MULTIPLIER_RANGE`].
///
/// Out-of-range values are clamped first.
pub fn size_multiplier(value: f32, range: RangeInclusive<f32>) -> f32 {
    let (lo, hi) = (*range.start(), *range.end());
    let (m_lo, m_hi) = (*SIZE_MULTIPLIER_RANGE.start(), *SIZE_MULTIPLIER_RANGE.end());
    if hi <= lo || !value.is_finite() {
        return 1.0;
    }
    let t = (value.clamp(lo, hi) - lo) / (hi - lo);
    m_lo + (m_hi - m_lo) * t
}

/// Title and author font sizes for a `width` x `height` device canvas.
pub fn cover_font_sizes(cover: &CoverData, width: f32, height: f32) -> (f32, f32) {
    let title_base = (width * 0.10).min(height * 0.065);
    let author_base = (width * 0.055).min(height * 0.035);
    (
        title_base * size_multiplier(cover.title_size, TITLE_SIZE_RANGE),
        author_base * size_multiplier(cover.author_size, AUTHOR_SIZE_RANGE),
    )
}

/// Top of the title block for `layout` before centering adjustments.
fn title_anchor(layout: CoverLayoutMode, height: f32, block_height: f32) -> f32 {
    match layout {
        CoverLayoutMode::Top => height * 0.18,
        CoverLayoutMode::Centered => height * 0.40 - block_height / 2.0,
        CoverLayoutMode::Bottom => height * 0.62,
    }
}

/// One centered line of cover text.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionedLine {
    pub text: String,
    /// Left edge after centering.
    pub x: f32,
    /// Top of the line box.
    pub top: f32,
    pub baseline_y: f32,
    /// Measured text width.
    pub width: f32,
}

/// Placed cover text in device pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct CoverTextLayout {
    /// Device width (`width * scale`).
    pub width: f32,
    /// Device height (`height * scale`).
    pub height: f32,
    pub title_style: TextStyle,
    pub author_style: TextStyle,
    pub title_lines: Vec<PositionedLine>,
    pub author: Option<PositionedLine>,
}

impl CoverTextLayout {
    pub fn title_line_height(&self) -> f32 {
        self.title_style.line_height_px
    }
}

/// Place the cover title and author on a `width` x `height` canvas drawn at
/// `scale` device pixels per unit.
pub fn layout_cover_text(
    cover: &CoverData,
    width: f32,
    height: f32,
    scale: f32,
    measurer: &dyn TextMeasurer,
) -> CoverTextLayout {
    let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
    let w = width * scale;
    let h = height * scale;
    let (title_px, author_px) = cover_font_sizes(cover, w, h);

    let title_style = TextStyle {
        face: FontFace::Bold,
        size_px: title_px,
        line_height_px: title_px * COVER_LINE_HEIGHT_RATIO,
        color: cover.title_color,
        role: TextRole::CoverTitle,
        align: TextAlign::Center,
    };
    let author_style = TextStyle {
        face: FontFace::Italic,
        size_px: author_px,
        line_height_px: author_px * COVER_LINE_HEIGHT_RATIO,
        color: cover.author_color,
        role: TextRole::CoverAuthor,
        align: TextAlign::Center,
    };

    let wrapped = wrap_text(
        &cover.title_text,
        w * TITLE_MAX_WIDTH_RATIO,
        measurer,
        &title_style,
    );
    let title_lh = title_style.line_height_px;
    let block_top = title_anchor(cover.layout, h, wrapped.len() as f32 * title_lh);
    let title_lines: Vec<PositionedLine> = wrapped
        .into_iter()
        .enumerate()
        .map(|(idx, text)| {
            let top = block_top + idx as f32 * title_lh;
            centered_line(text, top, w, &title_style, measurer)
        })
        .collect();

    let author_text = cover.author_text.trim();
    let author = if author_text.is_empty() {
        None
    } else {
        let author_lh = author_style.line_height_px;
        let natural_top = match title_lines.last() {
            // One blank title line between the title block and the author.
            Some(last) => last.top + title_lh + title_lh,
            None => block_top,
        };
        let max_top = h - h * BOTTOM_MARGIN_RATIO - author_lh;
        let top = natural_top.min(max_top).max(0.0);
        Some(centered_line(
            author_text.to_string(),
            top,
            w,
            &author_style,
            measurer,
        ))
    };

    CoverTextLayout {
        width: w,
        height: h,
        title_style,
        author_style,
        title_lines,
        author,
    }
}

fn centered_line(
    text: String,
    top: f32,
    canvas_width: f32,
    style: &TextStyle,
    measurer: &dyn TextMeasurer,
) -> PositionedLine {
    let width = measurer.measure_text_px(&text, style);
    PositionedLine {
        x: (canvas_width - width) / 2.0,
        top,
        baseline_y: top + line_baseline_offset(style.size_px, style.line_height_px),
        width,
        text,
    }
}
