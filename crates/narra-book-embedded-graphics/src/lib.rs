//! embedded-graphics renderer for Narra covers.
//!
//! Draws the book cover onto any `DrawTarget<Color = Rgb888>`. Text uses the
//! built-in mono fonts, bucketed by size and magnified past the largest
//! bucket, and [`EgTextMeasurer`] exposes the same metrics to layout so
//! wrapping and centering match what gets drawn.

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

mod canvas;
mod cover;

use std::borrow::Cow;
use std::convert::Infallible;
use std::sync::Arc;

use embedded_graphics::{
    mono_font::{
        ascii::{
            FONT_10X20, FONT_6X13_BOLD, FONT_6X13_ITALIC, FONT_6X9, FONT_7X13_ITALIC, FONT_7X14,
            FONT_7X14_BOLD, FONT_8X13, FONT_8X13_BOLD, FONT_8X13_ITALIC, FONT_9X18,
            FONT_9X18_BOLD,
        },
        MonoFont, MonoTextStyle,
    },
    pixelcolor::{BinaryColor, Rgb888},
    prelude::*,
    primitives::Rectangle,
    text::{Baseline, Text},
};
use narra_book::Color;
use narra_book_render::{ImageFit, TextMeasurer, TextStyle};

pub use canvas::RgbCanvas;
pub use cover::{decode_background, CoverCanvas, CoverCanvasConfig, CoverRenderReport};
pub use image::RgbImage;

/// Backend-local font identifier.
///
/// Bits 0-1 hold the variant, bits 2-3 the size bucket and the high byte the
/// glyph magnification in eighths (8 = native size).
pub type FontId = u16;

/// Advance and baseline for a font id, in device pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontMetrics {
    pub char_width: f32,
    pub space_width: f32,
    /// Distance from the top of the glyph cell to the baseline.
    pub baseline: f32,
}

/// Font abstraction used by the cover text paths.
pub trait FontBackend {
    fn resolve_font(&self, style: &TextStyle) -> FontId;
    fn metrics(&self, font_id: FontId) -> FontMetrics;
    /// Draw `text` with its baseline at `origin`. Returns the advance width.
    fn draw_text_run<D>(
        &self,
        display: &mut D,
        font_id: FontId,
        text: &str,
        origin: Point,
        color: Rgb888,
    ) -> Result<i32, D::Error>
    where
        D: DrawTarget<Color = Rgb888>;
}

/// `TextMeasurer` adapter backed by a [`FontBackend`].
#[derive(Clone, Debug)]
pub struct EgTextMeasurer<B = MonoFontBackend> {
    backend: B,
}

impl EgTextMeasurer<MonoFontBackend> {
    pub fn new() -> Self {
        Self {
            backend: MonoFontBackend,
        }
    }

    /// Shared measurer for layout wiring.
    pub fn shared() -> Arc<dyn TextMeasurer> {
        Arc::new(Self::new())
    }
}

impl Default for EgTextMeasurer<MonoFontBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> EgTextMeasurer<B>
where
    B: FontBackend,
{
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B> TextMeasurer for EgTextMeasurer<B>
where
    B: FontBackend + Send + Sync,
{
    fn measure_text_px(&self, text: &str, style: &TextStyle) -> f32 {
        let metrics = self.backend.metrics(self.backend.resolve_font(style));
        let normalized = normalize_text_for_mono(text);
        let (mut chars, mut spaces) = (0u32, 0u32);
        for ch in normalized.chars() {
            if ch == ' ' {
                spaces += 1;
            } else {
                chars += 1;
            }
        }
        (chars as f32 * metrics.char_width + spaces as f32 * metrics.space_width).max(0.0)
    }
}

/// Mono-font backend.
///
/// Sizes of 24px and up use the largest fonts, magnified so the glyph cell
/// height tracks the requested size.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonoFontBackend;

impl MonoFontBackend {
    const SIZE_SMALL: FontId = 0;
    const SIZE_MEDIUM: FontId = 1;
    const SIZE_LARGE: FontId = 2;
    const SIZE_XL: FontId = 3;

    const VARIANT_REGULAR: FontId = 0;
    const VARIANT_ITALIC: FontId = 1;
    const VARIANT_BOLD: FontId = 2;
    const VARIANT_BOLD_ITALIC: FontId = 3;

    const NATIVE_EIGHTHS: FontId = 8;
    const MAX_EIGHTHS: FontId = 0xff;

    fn encode_font_id(size_bucket: FontId, variant: FontId, eighths: FontId) -> FontId {
        (eighths.clamp(Self::NATIVE_EIGHTHS, Self::MAX_EIGHTHS) << 8)
            | ((size_bucket & 0x03) << 2)
            | (variant & 0x03)
    }

    fn decode_font_id(font_id: FontId) -> (FontId, FontId, FontId) {
        (
            (font_id >> 2) & 0x03,
            font_id & 0x03,
            (font_id >> 8).max(Self::NATIVE_EIGHTHS),
        )
    }

    fn magnification(font_id: FontId) -> f32 {
        let (_, _, eighths) = Self::decode_font_id(font_id);
        f32::from(eighths) / 8.0
    }

    fn size_bucket_for(size_px: f32) -> FontId {
        if size_px >= 24.0 {
            Self::SIZE_XL
        } else if size_px >= 20.0 {
            Self::SIZE_LARGE
        } else if size_px >= 16.0 {
            Self::SIZE_MEDIUM
        } else {
            Self::SIZE_SMALL
        }
    }

    fn variant_for(style: &TextStyle) -> FontId {
        match (style.face.is_bold(), style.face.is_italic()) {
            (true, true) => Self::VARIANT_BOLD_ITALIC,
            (true, false) => Self::VARIANT_BOLD,
            (false, true) => Self::VARIANT_ITALIC,
            (false, false) => Self::VARIANT_REGULAR,
        }
    }

    fn font_for(font_id: FontId) -> &'static MonoFont<'static> {
        let (size_bucket, variant, _) = Self::decode_font_id(font_id);
        match (size_bucket, variant) {
            (Self::SIZE_SMALL, Self::VARIANT_REGULAR) => &FONT_6X9,
            (Self::SIZE_SMALL, Self::VARIANT_ITALIC) => &FONT_6X13_ITALIC,
            (Self::SIZE_SMALL, _) => &FONT_6X13_BOLD,
            (Self::SIZE_MEDIUM, Self::VARIANT_REGULAR) => &FONT_7X14,
            (Self::SIZE_MEDIUM, Self::VARIANT_ITALIC) => &FONT_7X13_ITALIC,
            (Self::SIZE_MEDIUM, _) => &FONT_7X14_BOLD,
            (Self::SIZE_LARGE, Self::VARIANT_REGULAR) => &FONT_8X13,
            (Self::SIZE_LARGE, Self::VARIANT_ITALIC) => &FONT_8X13_ITALIC,
            (Self::SIZE_LARGE, _) => &FONT_8X13_BOLD,
            (Self::SIZE_XL, Self::VARIANT_REGULAR) => &FONT_10X20,
            (Self::SIZE_XL, Self::VARIANT_ITALIC) => &FONT_9X18,
            (Self::SIZE_XL, _) => &FONT_9X18_BOLD,
            _ => &FONT_8X13,
        }
    }

    fn advance(font: &MonoFont<'_>) -> u32 {
        font.character_size.width + font.character_spacing
    }

    /// Draw a magnified run: rasterize at native size into a mask, then
    /// paint each set cell as a block of device pixels.
    fn draw_magnified<D>(
        font: &'static MonoFont<'static>,
        magnification: f32,
        text: &str,
        origin: Point,
        color: Rgb888,
        display: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let cells = text.chars().count() as u32;
        let mut mask = GlyphMask::new(Size::new(
            cells * Self::advance(font),
            font.character_size.height,
        ));
        let style = MonoTextStyle::new(font, BinaryColor::On);
        match Text::with_baseline(text, Point::zero(), style, Baseline::Top).draw(&mut mask) {
            Ok(_) => {}
            Err(never) => match never {},
        }

        let top = origin.y - (font.baseline as f32 * magnification).round() as i32;
        let edge = |cell: u32| (cell as f32 * magnification).floor() as i32;
        for (x, y) in mask.set_cells() {
            let x0 = edge(x);
            let y0 = edge(y);
            let block = Rectangle::new(
                Point::new(origin.x + x0, top + y0),
                Size::new((edge(x + 1) - x0) as u32, (edge(y + 1) - y0) as u32),
            );
            display.fill_solid(&block, color)?;
        }
        Ok(())
    }
}

impl FontBackend for MonoFontBackend {
    fn resolve_font(&self, style: &TextStyle) -> FontId {
        let bucket = Self::size_bucket_for(style.size_px);
        let variant = Self::variant_for(style);
        let eighths = if bucket == Self::SIZE_XL {
            let native = Self::font_for(Self::encode_font_id(bucket, variant, 0));
            let ratio = style.size_px / native.character_size.height as f32;
            (ratio * 8.0).round().clamp(0.0, f32::from(Self::MAX_EIGHTHS)) as FontId
        } else {
            Self::NATIVE_EIGHTHS
        };
        Self::encode_font_id(bucket, variant, eighths)
    }

    fn metrics(&self, font_id: FontId) -> FontMetrics {
        let font = Self::font_for(font_id);
        let magnification = Self::magnification(font_id);
        let width = Self::advance(font) as f32 * magnification;
        FontMetrics {
            char_width: width,
            space_width: width,
            baseline: font.baseline as f32 * magnification,
        }
    }

    fn draw_text_run<D>(
        &self,
        display: &mut D,
        font_id: FontId,
        text: &str,
        origin: Point,
        color: Rgb888,
    ) -> Result<i32, D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let font = Self::font_for(font_id);
        let normalized = normalize_text_for_mono(text);
        let magnification = Self::magnification(font_id);
        if magnification <= 1.0 {
            let style = MonoTextStyle::new(font, color);
            let end = Text::with_baseline(normalized.as_ref(), origin, style, Baseline::Alphabetic)
                .draw(display)?;
            return Ok(end.x - origin.x);
        }
        Self::draw_magnified(font, magnification, normalized.as_ref(), origin, color, display)?;
        let cells = normalized.chars().count() as f32;
        Ok((cells * Self::advance(font) as f32 * magnification).round() as i32)
    }
}

/// One-bit scratch target for rasterizing a run at native size.
struct GlyphMask {
    size: Size,
    bits: Vec<bool>,
}

impl GlyphMask {
    fn new(size: Size) -> Self {
        Self {
            size,
            bits: vec![false; size.width as usize * size.height as usize],
        }
    }

    fn set_cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.size.width.max(1) as usize;
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .map(move |(idx, _)| ((idx % width) as u32, (idx / width) as u32))
    }
}

impl OriginDimensions for GlyphMask {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for GlyphMask {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = (self.size.width as i32, self.size.height as i32);
        for Pixel(point, color) in pixels {
            if color.is_on() && (0..width).contains(&point.x) && (0..height).contains(&point.y) {
                self.bits[(point.y * width + point.x) as usize] = true;
            }
        }
        Ok(())
    }
}

/// Fold typographic punctuation onto the ASCII glyphs the mono fonts carry.
fn normalize_text_for_mono(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{00A0}' => out.push(' '),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            c if c.is_ascii() => out.push(c),
            _ => out.push('?'),
        }
    }
    Cow::Owned(out)
}

pub(crate) fn to_rgb888(color: Color) -> Rgb888 {
    Rgb888::new(color.r, color.g, color.b)
}

/// Nearest-neighbour blit of `image` into `area` with contain or cover fit.
pub(crate) fn blit_image<D>(
    display: &mut D,
    image: &RgbImage,
    area: Rectangle,
    fit: ImageFit,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let (iw, ih) = (image.width() as f32, image.height() as f32);
    let (tw, th) = (area.size.width as f32, area.size.height as f32);
    if iw < 1.0 || ih < 1.0 || tw < 1.0 || th < 1.0 {
        return Ok(());
    }
    let scale = match fit {
        ImageFit::Contain => (tw / iw).min(th / ih),
        ImageFit::Cover => (tw / iw).max(th / ih),
    };
    let draw_w = (iw * scale).round().clamp(1.0, tw) as u32;
    let draw_h = (ih * scale).round().clamp(1.0, th) as u32;
    let origin_x = area.top_left.x + ((tw as u32 - draw_w) / 2) as i32;
    let origin_y = area.top_left.y + ((th as u32 - draw_h) / 2) as i32;
    // Source offset of the visible window; zero unless cover-cropping.
    let src_x0 = ((iw - draw_w as f32 / scale) / 2.0).max(0.0);
    let src_y0 = ((ih - draw_h as f32 / scale) / 2.0).max(0.0);
    let max_x = image.width() - 1;
    let max_y = image.height() - 1;

    for dy in 0..draw_h {
        let sy = ((src_y0 + (dy as f32 + 0.5) / scale) as u32).min(max_y);
        let y = origin_y + dy as i32;
        display.draw_iter((0..draw_w).map(|dx| {
            let sx = ((src_x0 + (dx as f32 + 0.5) / scale) as u32).min(max_x);
            let [r, g, b] = image.get_pixel(sx, sy).0;
            Pixel(Point::new(origin_x + dx as i32, y), Rgb888::new(r, g, b))
        }))?;
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::mock_display::MockDisplay;
    use image::Rgb;
    use narra_book_render::FontFace;

    const INK: Rgb888 = Rgb888::new(200, 0, 0);

    fn ink_rows(canvas: &RgbCanvas) -> Vec<u32> {
        let (w, h) = canvas.image().dimensions();
        (0..h)
            .filter(|&y| (0..w).any(|x| canvas.pixel(x, y) == Some(INK)))
            .collect()
    }

    #[test]
    fn measurer_uses_mono_cell_widths() {
        let measurer = EgTextMeasurer::new();
        let body = TextStyle::body(11.0, 16.5);
        assert_eq!(measurer.measure_text_px("abc", &body), 18.0);
        // 10x20 magnified 1.5x.
        let large = TextStyle::body(30.0, 36.0);
        assert_eq!(measurer.measure_text_px("ab", &large), 30.0);
        // 9x18 bold magnified 13/8.
        let bold = large.with_face(FontFace::Bold);
        assert_eq!(measurer.measure_text_px("ab", &bold), 29.25);
        // Typographic quotes measure like their ASCII stand-ins.
        assert_eq!(
            measurer.measure_text_px("\u{201C}a\u{201D}", &body),
            measurer.measure_text_px("\"a\"", &body)
        );
    }

    #[test]
    fn size_buckets_pick_larger_fonts_for_larger_text() {
        let backend = MonoFontBackend;
        let small = backend.metrics(backend.resolve_font(&TextStyle::body(9.0, 12.0)));
        let xl = backend.metrics(backend.resolve_font(&TextStyle::body(40.0, 48.0)));
        let xxl = backend.metrics(backend.resolve_font(&TextStyle::body(80.0, 96.0)));
        assert!(xl.char_width > small.char_width);
        assert!(xxl.char_width > xl.char_width);
        assert!(xxl.baseline > xl.baseline);
    }

    #[test]
    fn native_size_runs_draw_in_style_color() {
        let mut display: MockDisplay<Rgb888> = MockDisplay::new();
        display.set_allow_overdraw(true);
        let backend = MonoFontBackend;
        let font = backend.resolve_font(&TextStyle::body(11.0, 16.5));
        let advance = backend
            .draw_text_run(&mut display, font, "Hi", Point::new(2, 20), INK)
            .unwrap();
        assert_eq!(advance, 12);
        let drawn = display
            .affected_area()
            .points()
            .filter(|p| display.get_pixel(*p) == Some(INK))
            .count();
        assert!(drawn > 0);
    }

    #[test]
    fn magnified_glyphs_grow_and_sit_on_the_baseline() {
        let backend = MonoFontBackend;
        let mut heights = Vec::new();
        for size in [24.0, 48.0, 72.0] {
            let mut canvas = RgbCanvas::new(240, 160);
            let font = backend.resolve_font(&TextStyle::body(size, size * 1.2));
            backend
                .draw_text_run(&mut canvas, font, "H", Point::new(10, 120), INK)
                .unwrap();
            let rows = ink_rows(&canvas);
            let (first, last) = (rows[0], rows[rows.len() - 1]);
            assert!(last < 122 && last > 110, "size {size}: glyph ends at row {last}");
            heights.push(last - first + 1);
        }
        assert!(heights[0] < heights[1] && heights[1] < heights[2], "{heights:?}");
        // Magnified 10x20 'H' at 48px is a little over twice its native height.
        assert!(heights[1] >= 2 * heights[0] - 4);
    }

    #[test]
    fn magnified_advance_matches_measurement() {
        let measurer = EgTextMeasurer::new();
        let style = TextStyle::body(48.0, 56.0);
        let font = measurer.backend().resolve_font(&style);
        let mut canvas = RgbCanvas::new(200, 80);
        let advance = measurer
            .backend()
            .draw_text_run(&mut canvas, font, "Hi there", Point::new(0, 60), INK)
            .unwrap();
        let measured = measurer.measure_text_px("Hi there", &style);
        assert!((advance as f32 - measured).abs() <= 1.0);
    }

    #[test]
    fn contained_image_is_centered() {
        let mut display: MockDisplay<Rgb888> = MockDisplay::new();
        let image = RgbImage::from_pixel(2, 1, Rgb([0, 255, 0]));
        let area = Rectangle::new(Point::zero(), Size::new(40, 40));
        blit_image(&mut display, &image, area, ImageFit::Contain).unwrap();
        // 2:1 image in a 40x40 box: 40x20 band starting at y=10.
        assert_eq!(display.get_pixel(Point::new(0, 10)), Some(Rgb888::new(0, 255, 0)));
        assert_eq!(display.get_pixel(Point::new(39, 29)), Some(Rgb888::new(0, 255, 0)));
        assert_eq!(display.get_pixel(Point::new(0, 9)), None);
        assert_eq!(display.get_pixel(Point::new(0, 30)), None);
    }
}
