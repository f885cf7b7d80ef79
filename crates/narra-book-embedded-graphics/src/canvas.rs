use std::io::Cursor;
use std::path::Path;

use embedded_graphics::{pixelcolor::Rgb888, prelude::*};
use image::{ImageFormat, ImageResult, Rgb, RgbImage};

/// In-memory RGB framebuffer backed by [`image::RgbImage`].
///
/// Pixels outside the image are dropped.
#[derive(Clone)]
pub struct RgbCanvas {
    image: RgbImage,
}

impl core::fmt::Debug for RgbCanvas {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RgbCanvas")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish_non_exhaustive()
    }
}

impl RgbCanvas {
    /// White canvas of `width` x `height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, Rgb([255, 255, 255])),
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        if x >= self.image.width() || y >= self.image.height() {
            return None;
        }
        let [r, g, b] = self.image.get_pixel(x, y).0;
        Some(Rgb888::new(r, g, b))
    }

    pub fn encode_png(&self) -> ImageResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.image.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> ImageResult<()> {
        self.image.save_with_format(path, ImageFormat::Png)
    }
}

impl OriginDimensions for RgbCanvas {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

impl DrawTarget for RgbCanvas {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = (self.image.width() as i32, self.image.height() as i32);
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 || point.x >= width || point.y >= height {
                continue;
            }
            self.image.put_pixel(
                point.x as u32,
                point.y as u32,
                Rgb([color.r(), color.g(), color.b()]),
            );
        }
        Ok(())
    }
}
