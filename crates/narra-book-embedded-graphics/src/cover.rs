//! Canvas cover rendering.

use embedded_graphics::{pixelcolor::Rgb888, prelude::*, primitives::Rectangle};
use image::RgbImage;
use narra_book::CoverData;
use narra_book_render::{layout_cover_text, CoverTextLayout, ImageFit, PositionedLine, TextStyle};

use crate::{blit_image, to_rgb888, EgTextMeasurer, FontBackend, MonoFontBackend};

/// Canvas size in layout units and the device pixels drawn per unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoverCanvasConfig {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl Default for CoverCanvasConfig {
    fn default() -> Self {
        Self {
            width: 360.0,
            height: 576.0,
            scale: 1.0,
        }
    }
}

impl CoverCanvasConfig {
    /// Device pixel size, rounded.
    pub fn device_size(&self) -> Size {
        let scale = if self.scale.is_finite() && self.scale > 0.0 {
            self.scale
        } else {
            1.0
        };
        Size::new(
            (self.width * scale).round().max(1.0) as u32,
            (self.height * scale).round().max(1.0) as u32,
        )
    }
}

/// What a cover render drew.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoverRenderReport {
    pub background_image_drawn: bool,
    pub title_lines: usize,
    pub author_drawn: bool,
}

/// Draws a [`CoverData`] onto an RGB target.
#[derive(Clone, Debug)]
pub struct CoverCanvas<B = MonoFontBackend> {
    config: CoverCanvasConfig,
    measurer: EgTextMeasurer<B>,
}

impl CoverCanvas<MonoFontBackend> {
    pub fn new(config: CoverCanvasConfig) -> Self {
        Self {
            config,
            measurer: EgTextMeasurer::new(),
        }
    }
}

impl<B> CoverCanvas<B>
where
    B: FontBackend + Clone + Send + Sync,
{
    pub fn with_backend(config: CoverCanvasConfig, backend: B) -> Self {
        Self {
            config,
            measurer: EgTextMeasurer::with_backend(backend),
        }
    }

    pub fn config(&self) -> CoverCanvasConfig {
        self.config
    }

    /// Text placement in device pixels, measured with the drawing fonts.
    pub fn text_layout(&self, cover: &CoverData) -> CoverTextLayout {
        layout_cover_text(
            cover,
            self.config.width,
            self.config.height,
            self.config.scale,
            &self.measurer,
        )
    }

    /// Paint background color, optional background image and cover text.
    ///
    /// `background` is the already-decoded cover image. Passing `None` (for
    /// example after a failed fetch) leaves the background color showing.
    pub fn render<D>(
        &self,
        cover: &CoverData,
        background: Option<&RgbImage>,
        display: &mut D,
    ) -> Result<CoverRenderReport, D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let area = Rectangle::new(Point::zero(), self.config.device_size());
        display.fill_solid(&area, to_rgb888(cover.background_color))?;

        let mut report = CoverRenderReport::default();
        if let Some(image) = background {
            blit_image(display, image, area, ImageFit::Cover)?;
            report.background_image_drawn = true;
        }

        let layout = self.text_layout(cover);
        for line in &layout.title_lines {
            self.draw_line(display, line, &layout.title_style)?;
        }
        report.title_lines = layout.title_lines.len();
        if let Some(author) = &layout.author {
            self.draw_line(display, author, &layout.author_style)?;
            report.author_drawn = true;
        }
        log::debug!(
            "cover rendered: {}x{} title_lines={} author={} image={}",
            area.size.width,
            area.size.height,
            report.title_lines,
            report.author_drawn,
            report.background_image_drawn
        );
        Ok(report)
    }

    fn draw_line<D>(
        &self,
        display: &mut D,
        line: &PositionedLine,
        style: &TextStyle,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let backend = self.measurer.backend();
        backend.draw_text_run(
            display,
            backend.resolve_font(style),
            &line.text,
            Point::new(line.x.round() as i32, line.baseline_y.round() as i32),
            to_rgb888(style.color),
        )?;
        Ok(())
    }
}

/// Decode cover background bytes. Failures are logged and yield `None` so the
/// caller falls back to the background color.
pub fn decode_background(bytes: &[u8]) -> Option<RgbImage> {
    match image::load_from_memory(bytes) {
        Ok(decoded) => Some(decoded.to_rgb8()),
        Err(err) => {
            log::warn!("cover background could not be decoded: {err}; using background color");
            None
        }
    }
}
