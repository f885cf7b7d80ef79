//! Typed cover settings.
//!
//! The profile editor stores cover settings as loose JSON: sizes may arrive as
//! numbers or strings, and colors and layout names are free text.
//! [`CoverData::from_json`] is the single place that JSON becomes a typed
//! value. Everything downstream trusts it.

use core::fmt;
use core::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::BookError;

/// UI range of the title size control, in points.
pub const TITLE_SIZE_RANGE: RangeInclusive<f32> = 18.0..=24.0;
/// UI range of the author size control, in points.
pub const AUTHOR_SIZE_RANGE: RangeInclusive<f32> = 12.0..=18.0;

/// 24-bit RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb` (the leading `#` is optional).
    pub fn parse_hex(input: &str) -> Option<Self> {
        let hex = input.trim().trim_start_matches('#');
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let mut channels = hex.chars().map(|c| {
                    let nibble = c.to_digit(16).unwrap_or(0) as u8;
                    nibble * 17
                });
                Some(Self::rgb(
                    channels.next()?,
                    channels.next()?,
                    channels.next()?,
                ))
            }
            6 => Some(Self::rgb(
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            )),
            _ => None,
        }
    }

    /// Channels scaled to `0.0..=1.0`, the form PDF color operators take.
    pub fn to_unit_rgb(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hex(&value).ok_or_else(|| format!("not a hex color: {value:?}"))
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

/// Vertical anchor of the cover title block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverLayoutMode {
    #[default]
    Centered,
    Top,
    Bottom,
}

impl CoverLayoutMode {
    /// Lenient parse. Unknown names fall back to `Centered`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "top" => Self::Top,
            "bottom" => Self::Bottom,
            "centered" | "center" | "middle" => Self::Centered,
            other => {
                log::warn!("unknown cover layout {other:?}; using centered");
                Self::Centered
            }
        }
    }
}

/// Fully typed cover settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverData {
    pub background_color: Color,
    pub background_image: Option<String>,
    pub title_text: String,
    pub title_color: Color,
    /// Always within [`TITLE_SIZE_RANGE`].
    pub title_size: f32,
    pub author_text: String,
    pub author_color: Color,
    /// Always within [`AUTHOR_SIZE_RANGE`].
    pub author_size: f32,
    pub layout: CoverLayoutMode,
}

impl Default for CoverData {
    fn default() -> Self {
        Self {
            background_color: Color::rgb(0xf5, 0xf0, 0xe6),
            background_image: None,
            title_text: String::new(),
            title_color: Color::rgb(0x2c, 0x24, 0x16),
            title_size: 21.0,
            author_text: String::new(),
            author_color: Color::rgb(0x5c, 0x4a, 0x32),
            author_size: 15.0,
            layout: CoverLayoutMode::Centered,
        }
    }
}

impl CoverData {
    /// Parse the stored cover JSON into a typed value.
    pub fn from_json(input: &str) -> Result<Self, BookError> {
        let wire: CoverWire = serde_json::from_str(input)?;
        wire.into_cover()
    }

    /// Same as [`CoverData::from_json`] for an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, BookError> {
        let wire: CoverWire = serde_json::from_value(value)?;
        wire.into_cover()
    }

    /// Fill blank title/author text from the book metadata.
    pub fn with_fallback_text(mut self, title: &str, author: &str) -> Self {
        if self.title_text.trim().is_empty() {
            self.title_text = title.trim().to_string();
        }
        if self.author_text.trim().is_empty() {
            self.author_text = author.trim().to_string();
        }
        self
    }
}

/// A size field as the editor may store it: `22`, `22.5` or `"22"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Number(f64),
    Text(String),
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CoverWire {
    background_color: Option<String>,
    background_image: Option<String>,
    title_text: Option<String>,
    title_color: Option<String>,
    title_size: Option<SizeValue>,
    author_text: Option<String>,
    author_color: Option<String>,
    author_size: Option<SizeValue>,
    layout: Option<String>,
}

impl CoverWire {
    fn into_cover(self) -> Result<CoverData, BookError> {
        let defaults = CoverData::default();
        Ok(CoverData {
            background_color: color_field(
                "backgroundColor",
                self.background_color,
                defaults.background_color,
            )?,
            background_image: self
                .background_image
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            title_text: self.title_text.unwrap_or_default().trim().to_string(),
            title_color: color_field("titleColor", self.title_color, defaults.title_color)?,
            title_size: size_field(
                "titleSize",
                self.title_size,
                defaults.title_size,
                TITLE_SIZE_RANGE,
            )?,
            author_text: self.author_text.unwrap_or_default().trim().to_string(),
            author_color: color_field("authorColor", self.author_color, defaults.author_color)?,
            author_size: size_field(
                "authorSize",
                self.author_size,
                defaults.author_size,
                AUTHOR_SIZE_RANGE,
            )?,
            layout: self
                .layout
                .as_deref()
                .map(CoverLayoutMode::from_name)
                .unwrap_or_default(),
        })
    }
}

fn color_field(
    field: &'static str,
    value: Option<String>,
    default: Color,
) -> Result<Color, BookError> {
    match value {
        None => Ok(default),
        Some(text) if text.trim().is_empty() => Ok(default),
        Some(text) => Color::parse_hex(&text).ok_or_else(|| BookError::InvalidCover {
            field,
            reason: format!("expected #rgb or #rrggbb, got {text:?}"),
        }),
    }
}

fn size_field(
    field: &'static str,
    value: Option<SizeValue>,
    default: f32,
    range: RangeInclusive<f32>,
) -> Result<f32, BookError> {
    let raw = match value {
        None => return Ok(default),
        Some(SizeValue::Number(number)) => number,
        Some(SizeValue::Text(text)) => {
            let trimmed = text.trim().trim_end_matches("px").trim_end_matches("pt");
            if trimmed.is_empty() {
                return Ok(default);
            }
            trimmed.parse::<f64>().map_err(|_| BookError::InvalidCover {
                field,
                reason: format!("expected a number, got {text:?}"),
            })?
        }
    };
    if !raw.is_finite() {
        return Err(BookError::InvalidCover {
            field,
            reason: "size must be finite".to_string(),
        });
    }
    Ok((raw as f32).clamp(*range.start(), *range.end()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_hex() {
        assert_eq!(Color::parse_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse_hex("1a2B3c"), Some(Color::rgb(0x1a, 0x2b, 0x3c)));
        assert_eq!(Color::parse_hex("#12345"), None);
        assert_eq!(Color::parse_hex("#ggg"), None);
        assert_eq!(Color::rgb(1, 2, 255).to_string(), "#0102ff");
    }

    #[test]
    fn empty_object_yields_defaults() {
        let cover = CoverData::from_json("{}").unwrap();
        assert_eq!(cover, CoverData::default());
    }

    #[test]
    fn sizes_accept_strings_and_are_clamped() {
        let cover =
            CoverData::from_json(r##"{"titleSize": "30", "authorSize": 10, "titleColor": "#000"}"##)
                .unwrap();
        assert_eq!(cover.title_size, 24.0);
        assert_eq!(cover.author_size, 12.0);
        assert_eq!(cover.title_color, Color::BLACK);
    }

    #[test]
    fn unknown_layout_falls_back_to_centered() {
        let cover = CoverData::from_json(r#"{"layout": "diagonal"}"#).unwrap();
        assert_eq!(cover.layout, CoverLayoutMode::Centered);
        let cover = CoverData::from_json(r#"{"layout": "Bottom"}"#).unwrap();
        assert_eq!(cover.layout, CoverLayoutMode::Bottom);
    }

    #[test]
    fn bad_color_is_rejected_with_field_name() {
        let err = CoverData::from_json(r#"{"backgroundColor": "blue"}"#).unwrap_err();
        match err {
            BookError::InvalidCover { field, .. } => assert_eq!(field, "backgroundColor"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_background_image_is_none() {
        let cover = CoverData::from_json(r#"{"backgroundImage": "  "}"#).unwrap();
        assert!(cover.background_image.is_none());
    }

    #[test]
    fn typed_cover_round_trips_through_serde() {
        let cover = CoverData {
            title_text: "Our Family".to_string(),
            layout: CoverLayoutMode::Top,
            ..CoverData::default()
        };
        let json = serde_json::to_string(&cover).unwrap();
        assert!(json.contains("\"backgroundColor\":\"#f5f0e6\""));
        let back: CoverData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cover);
    }
}
