//! Stories, media and the immutable book snapshot handed to renderers.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cover::CoverData;
use crate::error::BookError;

/// Story identifier as stored by the data layer.
pub type StoryId = String;
/// Media identifier as stored by the data layer.
pub type MediaId = String;

/// One memoir story: a title and raw multi-paragraph text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: StoryId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl Story {
    pub fn new(id: impl Into<StoryId>, title: Option<&str>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.map(str::to_string),
            content: content.into(),
            created_at: DateTime::<Utc>::default(),
        }
    }

    /// Title shown in headers and the table of contents.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title,
            _ => "Untitled Story",
        }
    }

    /// Non-empty trimmed paragraphs in source order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.content
            .split('\n')
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty())
    }
}

/// Media classes a book page can show.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a MIME type. Parameters (`; charset=...`) are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if essence.starts_with("image/") {
            Some(Self::Image)
        } else if essence.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// A photo or video attached to a story. Each one fills exactly one page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: MediaId,
    #[serde(alias = "story_id")]
    pub story_id: StoryId,
    #[serde(alias = "file_path")]
    pub file_path: String,
    #[serde(alias = "content_type")]
    pub content_type: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default, alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl MediaItem {
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_content_type(&self.content_type)
    }

    /// Caption text, if present and not blank.
    pub fn caption_text(&self) -> Option<&str> {
        self.caption
            .as_deref()
            .map(str::trim)
            .filter(|caption| !caption.is_empty())
    }

    /// Resolve `file_path` to something an asset fetcher can load.
    ///
    /// Absolute `http(s)://` and `data:` URLs pass through untouched. Other
    /// paths are joined onto `base` when one is configured.
    pub fn resolve_url(&self, base: Option<&str>) -> String {
        let path = self.file_path.trim();
        if is_absolute_url(path) {
            return path.to_string();
        }
        match base.map(str::trim).filter(|base| !base.is_empty()) {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path.to_string(),
        }
    }
}

fn is_absolute_url(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:")
}

/// Immutable input for one render pass.
///
/// Media lists are grouped per story and sorted by creation time (ties by id)
/// once, here, so every renderer sees the same order.
#[derive(Clone, Debug, PartialEq)]
pub struct BookSnapshot {
    pub title: String,
    pub author: String,
    pub stories: Vec<Story>,
    pub media: HashMap<StoryId, Vec<MediaItem>>,
    pub cover: CoverData,
}

impl BookSnapshot {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        stories: Vec<Story>,
        media: impl IntoIterator<Item = MediaItem>,
        cover: CoverData,
    ) -> Self {
        let mut grouped: HashMap<StoryId, Vec<MediaItem>> = HashMap::new();
        for item in media {
            grouped.entry(item.story_id.clone()).or_default().push(item);
        }
        for items in grouped.values_mut() {
            items.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        Self {
            title: title.into(),
            author: author.into(),
            stories,
            media: grouped,
            cover,
        }
    }

    /// Ordered media for a story; empty when it has none.
    pub fn media_for(&self, story_id: &str) -> &[MediaItem] {
        self.media.get(story_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn story(&self, story_id: &str) -> Option<&Story> {
        self.stories.iter().find(|story| story.id == story_id)
    }

    /// Parse a book document: `{ title, author, stories, media, cover }`.
    ///
    /// `cover` is the loosely typed JSON stored by the profile editor. When it
    /// is missing, the cover text defaults to the book title and author.
    pub fn from_json_str(input: &str) -> Result<Self, BookError> {
        let file: BookFile = serde_json::from_str(input)?;
        let cover = match file.cover {
            Some(value) => CoverData::from_value(value)?,
            None => CoverData::default(),
        }
        .with_fallback_text(&file.title, &file.author);
        log::debug!(
            "loaded book {:?}: {} stories, {} media items",
            file.title,
            file.stories.len(),
            file.media.len()
        );
        Ok(Self::new(
            file.title,
            file.author,
            file.stories,
            file.media,
            cover,
        ))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BookError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| BookError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&input)
    }
}

#[derive(Deserialize)]
struct BookFile {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    stories: Vec<Story>,
    #[serde(default)]
    media: Vec<MediaItem>,
    #[serde(default)]
    cover: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn media(id: &str, story: &str, content_type: &str, minute: u32) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            story_id: story.to_string(),
            file_path: format!("{id}.jpg"),
            content_type: content_type.to_string(),
            caption: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap(),
        }
    }

    #[test]
    fn paragraphs_are_trimmed_and_empty_ones_dropped() {
        let story = Story::new("s1", None, "  Hello world.\n\n   \nThis is page two.  \n");
        let paragraphs: Vec<&str> = story.paragraphs().collect();
        assert_eq!(paragraphs, vec!["Hello world.", "This is page two."]);
    }

    #[test]
    fn blank_title_displays_placeholder() {
        assert_eq!(Story::new("s", Some("  "), "").display_title(), "Untitled Story");
        assert_eq!(Story::new("s", Some("Summer"), "").display_title(), "Summer");
    }

    #[test]
    fn media_kind_follows_mime_prefix() {
        assert_eq!(MediaKind::from_content_type("image/jpeg"), Some(MediaKind::Image));
        assert_eq!(
            MediaKind::from_content_type("Video/MP4; codecs=avc1"),
            Some(MediaKind::Video)
        );
        assert_eq!(MediaKind::from_content_type("audio/mpeg"), None);
    }

    #[test]
    fn resolve_url_joins_relative_paths_only() {
        let mut item = media("m1", "s1", "image/png", 0);
        item.file_path = "/profiles/p1/m1.png".to_string();
        assert_eq!(
            item.resolve_url(Some("https://cdn.example.com/media/")),
            "https://cdn.example.com/media/profiles/p1/m1.png"
        );
        assert_eq!(item.resolve_url(None), "/profiles/p1/m1.png");

        item.file_path = "https://other.example.com/x.png".to_string();
        assert_eq!(
            item.resolve_url(Some("https://cdn.example.com")),
            "https://other.example.com/x.png"
        );
    }

    #[test]
    fn snapshot_sorts_media_by_creation_then_id() {
        let stories = vec![Story::new("s1", Some("One"), "text")];
        let snapshot = BookSnapshot::new(
            "Book",
            "Ada",
            stories,
            vec![
                media("m3", "s1", "image/png", 5),
                media("m2", "s1", "image/png", 1),
                media("m1", "s1", "image/png", 1),
            ],
            CoverData::default(),
        );
        let ids: Vec<&str> = snapshot
            .media_for("s1")
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        assert!(snapshot.media_for("missing").is_empty());
    }

    #[test]
    fn book_json_accepts_camel_and_snake_case() {
        let json = r#"{
            "title": "Grandma's Book",
            "author": "Rose",
            "stories": [
                {"id": "s1", "title": "The Farm", "content": "We had cows.", "createdAt": "2024-01-02T03:04:05Z"}
            ],
            "media": [
                {"id": "m1", "story_id": "s1", "file_path": "a.jpg", "content_type": "image/jpeg", "caption": "Barn"}
            ],
            "cover": {"titleSize": "22", "layout": "top"}
        }"#;
        let snapshot = BookSnapshot::from_json_str(json).unwrap();
        assert_eq!(snapshot.stories.len(), 1);
        assert_eq!(snapshot.media_for("s1").len(), 1);
        assert_eq!(snapshot.cover.title_text, "Grandma's Book");
        assert_eq!(snapshot.cover.author_text, "Rose");
        assert_eq!(snapshot.cover.title_size, 22.0);
    }

    #[test]
    fn malformed_book_json_is_an_error() {
        assert!(matches!(
            BookSnapshot::from_json_str("{\"stories\": 3}"),
            Err(BookError::Json(_))
        ));
    }
}
