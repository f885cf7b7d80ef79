use narra_book::Color;
use serde::{Deserialize, Serialize};

type LayerCommandIter<'a> =
    core::iter::Chain<core::slice::Iter<'a, DrawCommand>, core::slice::Iter<'a, DrawCommand>>;

/// Page represented as backend-agnostic draw commands.
///
/// Coordinates are layout px with the origin at the top-left corner and y
/// growing downward. Text commands carry baselines.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPage {
    /// 1-based page number.
    pub page_number: usize,
    /// Page width.
    pub width: f32,
    /// Page height.
    pub height: f32,
    /// Content-layer draw commands (body text, media, cover art).
    pub content_commands: Vec<DrawCommand>,
    /// Chrome-layer draw commands (running header, footer).
    pub chrome_commands: Vec<DrawCommand>,
    /// Per-page metrics for navigation/progress consumers.
    pub metrics: PageMetrics,
}

impl RenderPage {
    const INITIAL_CONTENT_COMMAND_CAPACITY: usize = 16;
    const INITIAL_CHROME_COMMAND_CAPACITY: usize = 4;

    /// Create an empty page.
    pub fn new(page_number: usize, width: f32, height: f32) -> Self {
        Self {
            page_number,
            width,
            height,
            content_commands: Vec::with_capacity(0),
            chrome_commands: Vec::with_capacity(0),
            metrics: PageMetrics {
                global_page_index: page_number.saturating_sub(1),
                ..PageMetrics::default()
            },
        }
    }

    /// Push a content-layer command.
    pub fn push_content_command(&mut self, cmd: DrawCommand) {
        if self.content_commands.capacity() == 0 {
            self.content_commands
                .reserve(Self::INITIAL_CONTENT_COMMAND_CAPACITY);
        }
        self.content_commands.push(cmd);
    }

    /// Push a chrome-layer command.
    pub fn push_chrome_command(&mut self, cmd: DrawCommand) {
        if self.chrome_commands.capacity() == 0 {
            self.chrome_commands
                .reserve(Self::INITIAL_CHROME_COMMAND_CAPACITY);
        }
        self.chrome_commands.push(cmd);
    }

    /// Number of commands across both layers.
    pub fn merged_commands_len(&self) -> usize {
        self.content_commands.len() + self.chrome_commands.len()
    }

    /// Iterate content then chrome commands without allocating.
    pub fn merged_commands_iter(&self) -> LayerCommandIter<'_> {
        self.content_commands
            .iter()
            .chain(self.chrome_commands.iter())
    }

    /// Text commands in draw order.
    pub fn text_commands(&self) -> impl Iterator<Item = &TextCommand> + '_ {
        self.merged_commands_iter().filter_map(|cmd| match cmd {
            DrawCommand::Text(text) => Some(text),
            _ => None,
        })
    }

    /// Texts drawn with `role`, in draw order.
    pub fn texts_with_role(&self, role: TextRole) -> Vec<&str> {
        self.text_commands()
            .filter(|cmd| cmd.style.role == role)
            .map(|cmd| cmd.text.as_str())
            .collect()
    }
}

/// Structured page metrics for progress and navigation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PageMetrics {
    /// Global page index (0-based).
    pub global_page_index: usize,
    /// Total pages in the book.
    pub global_page_count: usize,
    /// Story position in the book, for story pages.
    pub story_index: Option<usize>,
    /// 1-based page position inside the story, for story pages.
    pub page_within_story: Option<usize>,
    /// Book progress in range `[0.0, 1.0]`.
    pub progress_book: f32,
}

/// Stable pagination profile id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaginationProfileId(pub [u8; 32]);

impl PaginationProfileId {
    /// Build a deterministic profile id from arbitrary payload bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        fn fnv64(seed: u64, payload: &[u8]) -> u64 {
            let mut hash = seed;
            for b in payload {
                hash ^= *b as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            hash
        }
        let mut out = [0u8; 32];
        let h0 = fnv64(0xcbf29ce484222325, bytes).to_le_bytes();
        let h1 = fnv64(0x9e3779b97f4a7c15, bytes).to_le_bytes();
        let h2 = fnv64(0xd6e8feb86659fd93, bytes).to_le_bytes();
        let h3 = fnv64(0xa0761d6478bd642f, bytes).to_le_bytes();
        out[0..8].copy_from_slice(&h0);
        out[8..16].copy_from_slice(&h1);
        out[16..24].copy_from_slice(&h2);
        out[24..32].copy_from_slice(&h3);
        Self(out)
    }

    /// Lowercase hex form, for logs and cache keys.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}

/// Layout output commands.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// Draw text.
    Text(TextCommand),
    /// Draw a line rule.
    Rule(RuleCommand),
    /// Draw an image box.
    ImageObject(ImageObjectCommand),
    /// Draw rectangle.
    Rect(RectCommand),
    /// Draw page metadata/chrome.
    PageChrome(PageChromeCommand),
}

/// Face of the serif family a text run uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFace {
    #[default]
    Regular,
    Italic,
    Bold,
    BoldItalic,
}

impl FontFace {
    pub fn is_bold(self) -> bool {
        matches!(self, Self::Bold | Self::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, Self::Italic | Self::BoldItalic)
    }
}

/// Semantic role of a text run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextRole {
    #[default]
    Body,
    DropCap,
    StoryTitle,
    RunningHeader,
    PageNumber,
    Caption,
    ContentsHeading,
    ContentsEntry,
    Placeholder,
    CoverTitle,
    CoverAuthor,
    MediaLabel,
}

/// Horizontal alignment the layout used to compute `x`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Resolved style passed to renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    /// Serif face.
    pub face: FontFace,
    /// Size in px.
    pub size_px: f32,
    /// Line box height in px.
    pub line_height_px: f32,
    /// Fill color.
    pub color: Color,
    /// Semantic role.
    pub role: TextRole,
    /// Alignment within the measured box.
    pub align: TextAlign,
}

impl TextStyle {
    /// Regular body style at `size_px`.
    pub fn body(size_px: f32, line_height_px: f32) -> Self {
        Self {
            face: FontFace::Regular,
            size_px,
            line_height_px,
            color: Color::BLACK,
            role: TextRole::Body,
            align: TextAlign::Left,
        }
    }

    pub fn with_face(mut self, face: FontFace) -> Self {
        self.face = face;
        self
    }

    pub fn with_role(mut self, role: TextRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }
}

/// Text draw command.
#[derive(Clone, Debug, PartialEq)]
pub struct TextCommand {
    /// Left x of the measured text box.
    pub x: f32,
    /// Baseline y.
    pub baseline_y: f32,
    /// Measured advance width of `text`.
    pub width: f32,
    /// Content.
    pub text: String,
    /// Resolved style.
    pub style: TextStyle,
}

/// Rule draw command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RuleCommand {
    /// Start x.
    pub x: f32,
    /// Start y.
    pub y: f32,
    /// Length.
    pub length: f32,
    /// Thickness.
    pub thickness: f32,
    /// Horizontal if true; vertical if false.
    pub horizontal: bool,
    /// Stroke color.
    pub color: Color,
}

/// Rectangle command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectCommand {
    /// Left x.
    pub x: f32,
    /// Top y.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
    /// Fill rectangle when true; stroke 1px outline otherwise.
    pub fill: bool,
    /// Fill or stroke color.
    pub color: Color,
}

/// How an image is scaled into its box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFit {
    /// Scale to fit inside the box, centered, preserving aspect ratio.
    #[default]
    Contain,
    /// Scale to fill the box, centered, cropping overflow.
    Cover,
}

/// What a backend draws when the image cannot be fetched or decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageFallback {
    /// Leave whatever is beneath (the page or cover background).
    BackgroundOnly,
    /// Draw this centered italic text inside the box.
    Placeholder(String),
}

/// Image box command.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageObjectCommand {
    /// Resolved fetchable URL.
    pub src: String,
    /// Alt/caption text.
    pub alt: String,
    /// Left x.
    pub x: f32,
    /// Top y.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
    /// Scaling policy.
    pub fit: ImageFit,
    /// Failure policy.
    pub fallback: ImageFallback,
}

/// Page-level metadata/chrome marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageChromeCommand {
    /// Semantic chrome kind.
    pub kind: PageChromeKind,
    /// Optional text payload (e.g. footer text).
    pub text: Option<String>,
    /// Optional current value (e.g. for progress).
    pub current: Option<usize>,
    /// Optional total value (e.g. for progress).
    pub total: Option<usize>,
}

/// Kind of page-level metadata/chrome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageChromeKind {
    /// Running header marker.
    Header,
    /// Footer marker.
    Footer,
}
