//! Image loading for PDF export.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use image::{ColorType, ImageFormat, ImageReader};

use crate::error::AssetError;

/// Source of image bytes for media pages and cover backgrounds.
#[allow(async_fn_in_trait)]
pub trait AssetFetcher {
    /// Fetch the raw bytes behind `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError>;
}

/// Reads assets from a local directory.
///
/// Relative paths and `file://` URLs resolve under `root`. Paths that climb
/// out of the root are refused.
#[derive(Clone, Debug)]
pub struct FileAssetFetcher {
    root: PathBuf,
}

impl FileAssetFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, AssetError> {
        if is_remote(url) {
            return Err(AssetError::Fetch {
                url: url.to_string(),
                reason: "remote urls are not served from disk".to_string(),
            });
        }
        let raw = url.strip_prefix("file://").unwrap_or(url);
        let relative = Path::new(raw.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(AssetError::Fetch {
                url: url.to_string(),
                reason: "path escapes the asset root".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl AssetFetcher for FileAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.resolve(url)?;
        tokio::fs::read(&path).await.map_err(|err| AssetError::Fetch {
            url: url.to_string(),
            reason: format!("{}: {err}", path.display()),
        })
    }
}

/// Fetches `http(s)://` assets with `reqwest`.
#[cfg(feature = "http")]
#[derive(Clone, Debug, Default)]
pub struct HttpAssetFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpAssetFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http")]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        let fail = |reason: String| AssetError::Fetch {
            url: url.to_string(),
            reason,
        };
        if !is_remote(url) {
            return Err(fail("not an http(s) url".to_string()));
        }
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| fail(err.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|err| fail(err.to_string()))?;
        let bytes = response.bytes().await.map_err(|err| fail(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

fn is_remote(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Decode an inline `data:<mime>;base64,<payload>` URL.
///
/// Returns `None` when `url` is not a data URL.
pub fn decode_data_url(url: &str) -> Option<Result<Vec<u8>, AssetError>> {
    let rest = url.strip_prefix("data:")?;
    let fail = |reason: &str| AssetError::Fetch {
        url: truncate_url(url),
        reason: reason.to_string(),
    };
    let Some((header, payload)) = rest.split_once(',') else {
        return Some(Err(fail("data url has no payload")));
    };
    if !header.ends_with(";base64") {
        return Some(Err(fail("only base64 data urls are supported")));
    }
    Some(
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|err| fail(&err.to_string())),
    )
}

fn truncate_url(url: &str) -> String {
    match url.char_indices().nth(64) {
        Some((idx, _)) => format!("{}...", &url[..idx]),
        None => url.to_string(),
    }
}

/// Pixel payload ready to embed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageData {
    /// Original baseline RGB JPEG bytes, embedded with `DCTDecode`.
    Jpeg(Vec<u8>),
    /// Raw 8-bit RGB samples, row-major.
    Rgb(Vec<u8>),
}

/// A decoded image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub data: ImageData,
}

/// Decode image bytes. Transparent pixels are flattened onto white.
pub fn decode_image(url: &str, bytes: Vec<u8>) -> Result<DecodedImage, AssetError> {
    let fail = |reason: String| AssetError::Decode {
        url: truncate_url(url),
        reason,
    };
    let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|err| fail(err.to_string()))?;
    let format = reader.format();
    let decoded = reader.decode().map_err(|err| fail(err.to_string()))?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(fail("image has no pixels".to_string()));
    }
    if format == Some(ImageFormat::Jpeg)
        && decoded.color() == ColorType::Rgb8
        && jpeg_component_count(&bytes) == Some(3)
    {
        return Ok(DecodedImage {
            width,
            height,
            data: ImageData::Jpeg(bytes),
        });
    }
    let rgb = if decoded.color().has_alpha() {
        decoded
            .to_rgba8()
            .pixels()
            .flat_map(|p| {
                let [r, g, b, a] = p.0;
                [over_white(r, a), over_white(g, a), over_white(b, a)]
            })
            .collect()
    } else {
        decoded.to_rgb8().into_raw()
    };
    Ok(DecodedImage {
        width,
        height,
        data: ImageData::Rgb(rgb),
    })
}

/// Number of colour components declared in a JPEG frame header.
///
/// The decoder converts CMYK and YCCK JPEGs to RGB on the way in, so only the
/// header tells a four-component file apart. `None` when no frame header is
/// found before the scan data.
fn jpeg_component_count(bytes: &[u8]) -> Option<u8> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2usize;
    loop {
        if *bytes.get(pos)? != 0xFF {
            return None;
        }
        let marker = *bytes.get(pos + 1)?;
        match marker {
            // fill byte
            0xFF => pos += 1,
            0x01 | 0xD0..=0xD7 => pos += 2,
            0xD9 | 0xDA => return None,
            // SOF0..SOF15 minus DHT, JPG and DAC
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                return bytes.get(pos + 9).copied();
            }
            _ => {
                let len = u16::from_be_bytes([*bytes.get(pos + 2)?, *bytes.get(pos + 3)?]);
                pos += 2 + usize::from(len);
            }
        }
    }
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    let c = u16::from(channel);
    let a = u16::from(alpha);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

/// Fetch and decode `url`, bounding the fetch by `timeout`.
pub async fn load_image<F: AssetFetcher>(
    fetcher: &F,
    url: &str,
    timeout: Duration,
) -> Result<DecodedImage, AssetError> {
    let bytes = match decode_data_url(url) {
        Some(inline) => inline?,
        None => match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
            Ok(fetched) => fetched?,
            Err(_) => {
                return Err(AssetError::Timeout {
                    url: url.to_string(),
                    timeout,
                })
            }
        },
    };
    decode_image(url, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn png_bytes(img: image::DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    struct SlowFetcher;

    impl AssetFetcher for SlowFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, AssetError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    #[test]
    fn png_decodes_to_rgb() {
        let img = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        let decoded = decode_image("a.png", png_bytes(img.into())).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        match decoded.data {
            ImageData::Rgb(data) => {
                assert_eq!(data.len(), 18);
                assert_eq!(&data[..3], &[10, 20, 30]);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn rgb_jpeg_is_embedded_as_is() {
        let img = RgbImage::from_pixel(8, 8, Rgb([200, 120, 40]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::from(img)
            .write_to(&mut out, ImageFormat::Jpeg)
            .unwrap();
        let bytes = out.into_inner();
        let decoded = decode_image("a.jpg", bytes.clone()).unwrap();
        assert_eq!((decoded.width, decoded.height), (8, 8));
        assert_eq!(decoded.data, ImageData::Jpeg(bytes));
    }

    /// SOI, an APP0 stub and a baseline frame header declaring `components`.
    fn jpeg_header(components: u8) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x4A, 0x46];
        let len = 8 + 3 * u16::from(components);
        bytes.extend_from_slice(&[0xFF, 0xC0]);
        bytes.extend_from_slice(&len.to_be_bytes());
        bytes.extend_from_slice(&[8, 0, 16, 0, 16, components]);
        for id in 1..=components {
            bytes.extend_from_slice(&[id, 0x11, 0]);
        }
        bytes.extend_from_slice(&[0xFF, 0xDA]);
        bytes
    }

    #[test]
    fn frame_header_component_count_is_read() {
        assert_eq!(jpeg_component_count(&jpeg_header(3)), Some(3));
        assert_eq!(jpeg_component_count(&jpeg_header(4)), Some(4));
        assert_eq!(jpeg_component_count(&jpeg_header(1)), Some(1));
        assert_eq!(jpeg_component_count(b"\x89PNG"), None);
        // Truncated before any frame header.
        assert_eq!(jpeg_component_count(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), None);
    }

    /// Flat 8x8 four-component baseline JPEG with an Adobe marker declaring
    /// untransformed CMYK. Every block is a zero DC diff followed by EOB.
    fn cmyk_jpeg() -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8];
        bytes.extend_from_slice(&[0xFF, 0xEE, 0x00, 0x0E]);
        bytes.extend_from_slice(b"Adobe");
        bytes.extend_from_slice(&[0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x43, 0x00]);
        bytes.extend_from_slice(&[1; 64]);
        bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x14, 8, 0, 8, 0, 8, 4]);
        for id in 1..=4 {
            bytes.extend_from_slice(&[id, 0x11, 0]);
        }
        // One-symbol DC and AC tables: code '0' for category 0 and for EOB.
        for class in [0x00, 0x10] {
            bytes.extend_from_slice(&[0xFF, 0xC4, 0x00, 0x14, class, 1]);
            bytes.extend_from_slice(&[0; 15]);
            bytes.push(0x00);
        }
        bytes.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x0E, 4]);
        for id in 1..=4 {
            bytes.extend_from_slice(&[id, 0x00]);
        }
        bytes.extend_from_slice(&[0, 63, 0]);
        bytes.push(0x00);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    #[test]
    fn cmyk_jpeg_is_reencoded_as_rgb() {
        let bytes = cmyk_jpeg();
        assert_eq!(jpeg_component_count(&bytes), Some(4));
        let decoded = decode_image("cmyk.jpg", bytes).unwrap();
        assert_eq!((decoded.width, decoded.height), (8, 8));
        match decoded.data {
            ImageData::Rgb(data) => assert_eq!(data.len(), 8 * 8 * 3),
            other => panic!("CMYK bytes must not be embedded as DeviceRGB: {other:?}"),
        }
    }

    #[test]
    fn grayscale_jpeg_is_reencoded_as_rgb() {
        let img = image::GrayImage::from_pixel(4, 4, image::Luma([90]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::from(img)
            .write_to(&mut out, ImageFormat::Jpeg)
            .unwrap();
        let decoded = decode_image("g.jpg", out.into_inner()).unwrap();
        match decoded.data {
            ImageData::Rgb(data) => assert_eq!(data.len(), 4 * 4 * 3),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn transparent_pixels_flatten_to_white() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        let decoded = decode_image("a.png", png_bytes(img.into())).unwrap();
        assert_eq!(decoded.data, ImageData::Rgb(vec![255, 255, 255]));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_image("x.png", b"not an image".to_vec()).unwrap_err();
        assert!(matches!(err, AssetError::Decode { .. }));
    }

    #[test]
    fn data_urls_decode_inline() {
        assert!(decode_data_url("photos/a.png").is_none());
        let bytes = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap().unwrap();
        assert_eq!(bytes, b"hello");
        assert!(decode_data_url("data:text/plain,hello").unwrap().is_err());
    }

    #[test]
    fn file_fetcher_refuses_parent_dirs_and_remote_urls() {
        let fetcher = FileAssetFetcher::new("/srv/assets");
        assert!(fetcher.resolve("../secret.png").is_err());
        assert!(fetcher.resolve("https://cdn.example.com/a.png").is_err());
        assert_eq!(
            fetcher.resolve("file:///photos/a.png").unwrap(),
            PathBuf::from("/srv/assets/photos/a.png")
        );
    }

    #[tokio::test]
    async fn file_fetcher_reports_missing_files() {
        let fetcher = FileAssetFetcher::new(std::env::temp_dir());
        let err = fetcher.fetch("narra-missing-asset-7f3a.png").await.unwrap_err();
        assert!(matches!(err, AssetError::Fetch { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_times_out() {
        let err = load_image(&SlowFetcher, "a.png", Duration::from_secs(8))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AssetError::Timeout {
                url: "a.png".to_string(),
                timeout: Duration::from_secs(8),
            }
        );
    }
}
