//! Shared page geometry.
//!
//! One layout px is one PDF point (1/72 in). The HTML preview uses the same
//! numbers as CSS px, so every back-end sees identical page boxes.

use serde::{Deserialize, Serialize};

use crate::error::BookError;

/// Layout units per physical inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Fixed page geometry and body font metrics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageDimensions {
    /// Page width.
    pub width_px: f32,
    /// Page height.
    pub height_px: f32,
    /// Margin applied on all four sides.
    pub margin_px: f32,
    /// Body font size.
    pub font_size_px: f32,
    /// Body line height.
    pub line_height_px: f32,
    /// Space below the top margin kept for the running header.
    pub header_reserve_px: f32,
    /// Space above the bottom margin kept for the page-number footer.
    pub footer_reserve_px: f32,
    /// Extra space on the first page of a story for its title header.
    pub title_reserve_px: f32,
    /// First-line indent for body paragraphs.
    pub first_line_indent_px: f32,
    /// Vertical gap between paragraphs on the same page.
    pub paragraph_spacing_px: f32,
    /// Number of body lines spanned by the opening drop cap.
    pub drop_cap_lines: u8,
}

impl PageDimensions {
    /// The 5x8 inch print page: 0.5 in margins, 11pt serif at 1.5x leading.
    pub const fn book_5x8() -> Self {
        Self {
            width_px: 5.0 * POINTS_PER_INCH,
            height_px: 8.0 * POINTS_PER_INCH,
            margin_px: 0.5 * POINTS_PER_INCH,
            font_size_px: 11.0,
            line_height_px: 16.5,
            header_reserve_px: 22.0,
            footer_reserve_px: 22.0,
            title_reserve_px: 56.0,
            first_line_indent_px: 18.0,
            paragraph_spacing_px: 0.0,
            drop_cap_lines: 3,
        }
    }

    /// Build geometry from physical inches, keeping the default body font.
    pub fn from_inches(width_in: f32, height_in: f32, margin_in: f32) -> Self {
        Self {
            width_px: width_in * POINTS_PER_INCH,
            height_px: height_in * POINTS_PER_INCH,
            margin_px: margin_in * POINTS_PER_INCH,
            ..Self::book_5x8()
        }
    }

    pub fn content_left(&self) -> f32 {
        self.margin_px
    }

    pub fn content_width(&self) -> f32 {
        self.width_px - self.margin_px * 2.0
    }

    /// Top of the body text box (below the header reserve).
    pub fn content_top(&self) -> f32 {
        self.margin_px + self.header_reserve_px
    }

    /// Bottom of the body text box (above the footer reserve).
    pub fn content_bottom(&self) -> f32 {
        self.height_px - self.margin_px - self.footer_reserve_px
    }

    /// Height available for body text on a regular page.
    pub fn content_height(&self) -> f32 {
        self.content_bottom() - self.content_top()
    }

    /// Height available for body text on the first page of a story.
    pub fn first_page_content_height(&self, reserve_title: bool) -> f32 {
        if reserve_title {
            self.content_height() - self.title_reserve_px
        } else {
            self.content_height()
        }
    }

    /// Whole body lines that fit on a regular page.
    pub fn lines_per_page(&self) -> usize {
        (self.content_height() / self.line_height_px).floor().max(0.0) as usize
    }

    /// Horizontal center of the page.
    pub fn center_x(&self) -> f32 {
        self.width_px / 2.0
    }

    /// Baseline for the running header inside the top reserve.
    pub fn header_baseline(&self) -> f32 {
        self.margin_px + self.font_size_px * 0.8
    }

    /// Baseline for the footer inside the bottom reserve.
    pub fn footer_baseline(&self) -> f32 {
        self.height_px - self.margin_px
    }

    /// Check that the geometry is usable by the paginator.
    pub fn validate(&self) -> Result<(), BookError> {
        let fields = [
            ("width_px", self.width_px),
            ("height_px", self.height_px),
            ("font_size_px", self.font_size_px),
            ("line_height_px", self.line_height_px),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(BookError::InvalidDimensions(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        let reserves = [
            ("margin_px", self.margin_px),
            ("header_reserve_px", self.header_reserve_px),
            ("footer_reserve_px", self.footer_reserve_px),
            ("title_reserve_px", self.title_reserve_px),
            ("first_line_indent_px", self.first_line_indent_px),
            ("paragraph_spacing_px", self.paragraph_spacing_px),
        ];
        for (name, value) in reserves {
            if !value.is_finite() || value < 0.0 {
                return Err(BookError::InvalidDimensions(format!(
                    "{name} must be zero or positive, got {value}"
                )));
            }
        }
        if self.line_height_px < self.font_size_px {
            return Err(BookError::InvalidDimensions(format!(
                "line height {} is smaller than font size {}",
                self.line_height_px, self.font_size_px
            )));
        }
        if self.content_width() <= self.first_line_indent_px + self.font_size_px {
            return Err(BookError::InvalidDimensions(format!(
                "content width {} is too narrow",
                self.content_width()
            )));
        }
        if self.first_page_content_height(true) < self.line_height_px {
            return Err(BookError::InvalidDimensions(format!(
                "content box height {} cannot hold one {}px line after the title reserve",
                self.first_page_content_height(true),
                self.line_height_px
            )));
        }
        Ok(())
    }

    /// Stable byte form used for pagination fingerprints.
    pub fn fingerprint_bytes(&self) -> Vec<u8> {
        let values = [
            self.width_px,
            self.height_px,
            self.margin_px,
            self.font_size_px,
            self.line_height_px,
            self.header_reserve_px,
            self.footer_reserve_px,
            self.title_reserve_px,
            self.first_line_indent_px,
            self.paragraph_spacing_px,
        ];
        let mut out = Vec::with_capacity(values.len() * 4 + 1);
        for value in values {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.push(self.drop_cap_lines);
        out
    }
}

impl Default for PageDimensions {
    fn default() -> Self {
        Self::book_5x8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_five_by_eight_inches_in_points() {
        let dims = PageDimensions::default();
        assert_eq!(dims.width_px, 360.0);
        assert_eq!(dims.height_px, 576.0);
        assert_eq!(dims.margin_px, 36.0);
        assert_eq!(dims.line_height_px, dims.font_size_px * 1.5);
        assert!(dims.validate().is_ok());
    }

    #[test]
    fn content_box_excludes_margins_and_chrome_reserves() {
        let dims = PageDimensions::default();
        assert_eq!(dims.content_width(), 288.0);
        assert_eq!(dims.content_top(), 58.0);
        assert_eq!(dims.content_bottom(), 518.0);
        assert_eq!(dims.content_height(), 460.0);
        assert_eq!(dims.lines_per_page(), 27);
    }

    #[test]
    fn validate_rejects_degenerate_geometry() {
        let tiny = PageDimensions {
            height_px: 120.0,
            ..PageDimensions::default()
        };
        assert!(tiny.validate().is_err());

        let tight_leading = PageDimensions {
            line_height_px: 9.0,
            ..PageDimensions::default()
        };
        assert!(tight_leading.validate().is_err());

        let negative_margin = PageDimensions {
            margin_px: -1.0,
            ..PageDimensions::default()
        };
        assert!(negative_margin.validate().is_err());
    }

    #[test]
    fn fingerprint_changes_with_font_metrics() {
        let a = PageDimensions::default();
        let b = PageDimensions {
            font_size_px: 12.0,
            line_height_px: 18.0,
            ..a
        };
        assert_ne!(a.fingerprint_bytes(), b.fingerprint_bytes());
        assert_eq!(a.fingerprint_bytes(), PageDimensions::default().fingerprint_bytes());
    }
}
