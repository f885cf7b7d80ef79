//! Draw-command to `pdf-writer` translation.

use std::sync::Arc;

use narra_book::Color;
use narra_book_render::{
    DrawCommand, FontFace, ImageFallback, ImageFit, ImageObjectCommand, RectCommand, RenderPage,
    RuleCommand, TextCommand, TextMeasurer, TextRole, TextStyle,
};
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::assets::{DecodedImage, ImageData};
use crate::encoding::to_winansi_bytes;

const FONT_NAMES: [(&[u8], &[u8]); 4] = [
    (b"F1", b"Times-Roman"),
    (b"F2", b"Times-Italic"),
    (b"F3", b"Times-Bold"),
    (b"F4", b"Times-BoldItalic"),
];
const PLACEHOLDER_COLOR: Color = Color::rgb(0x77, 0x77, 0x77);
const PLACEHOLDER_FILL: Color = Color::rgb(0xf2, 0xf2, 0xf2);

fn font_slot(face: FontFace) -> usize {
    match face {
        FontFace::Regular => 0,
        FontFace::Italic => 1,
        FontFace::Bold => 2,
        FontFace::BoldItalic => 3,
    }
}

/// An embedded image XObject.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedImage {
    pub name: String,
    pub id: Ref,
    pub width: u32,
    pub height: u32,
}

/// Incrementally assembled PDF document.
///
/// Layout px map 1:1 onto PDF points; the y axis is flipped per page.
pub struct PdfDocument {
    pdf: Pdf,
    next_id: i32,
    catalog_id: Ref,
    pages_id: Ref,
    font_ids: [Ref; 4],
    page_ids: Vec<Ref>,
    image_count: usize,
    compress: bool,
    measurer: Arc<dyn TextMeasurer>,
}

impl core::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("pages", &self.page_ids.len())
            .field("images", &self.image_count)
            .field("compress", &self.compress)
            .finish_non_exhaustive()
    }
}

impl PdfDocument {
    pub fn new(title: &str, author: &str, compress: bool, measurer: Arc<dyn TextMeasurer>) -> Self {
        let mut pdf = Pdf::new();
        let mut next_id = 1;
        let mut alloc = || {
            let id = Ref::new(next_id);
            next_id += 1;
            id
        };
        let catalog_id = alloc();
        let pages_id = alloc();
        let info_id = alloc();
        let font_ids = [alloc(), alloc(), alloc(), alloc()];

        for (id, (_, base)) in font_ids.iter().zip(FONT_NAMES) {
            pdf.type1_font(*id)
                .base_font(Name(base))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }
        {
            let mut info = pdf.document_info(info_id);
            if !title.trim().is_empty() {
                info.title(TextStr(title.trim()));
            }
            if !author.trim().is_empty() {
                info.author(TextStr(author.trim()));
            }
            info.creator(TextStr("narra-book"));
        }

        Self {
            pdf,
            next_id,
            catalog_id,
            pages_id,
            font_ids,
            page_ids: Vec::new(),
            image_count: 0,
            compress,
            measurer,
        }
    }

    fn alloc(&mut self) -> Ref {
        let id = Ref::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Embed `image` as an XObject and return its handle.
    pub fn add_image(&mut self, image: &DecodedImage) -> PlacedImage {
        let id = self.alloc();
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);
        let (width, height) = (image.width, image.height);
        match &image.data {
            ImageData::Jpeg(data) => {
                let mut xobj = self.pdf.image_xobject(id, data);
                xobj.filter(Filter::DctDecode);
                xobj.width(width as i32);
                xobj.height(height as i32);
                xobj.color_space().device_rgb();
                xobj.bits_per_component(8);
            }
            ImageData::Rgb(raw) => {
                let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw, 6);
                let mut xobj = self.pdf.image_xobject(id, &compressed);
                xobj.filter(Filter::FlateDecode);
                xobj.width(width as i32);
                xobj.height(height as i32);
                xobj.color_space().device_rgb();
                xobj.bits_per_component(8);
            }
        }
        PlacedImage {
            name,
            id,
            width,
            height,
        }
    }

    /// Append one page. `resolve` maps image sources to embedded images;
    /// sources it cannot resolve get the command's fallback.
    pub fn write_page<'a, R>(&mut self, page: &RenderPage, resolve: R)
    where
        R: Fn(&str) -> Option<&'a PlacedImage>,
    {
        let mut painter = PagePainter {
            content: Content::new(),
            page_height: page.height,
            measurer: self.measurer.as_ref(),
            used_images: Vec::new(),
        };
        for cmd in page.merged_commands_iter() {
            match cmd {
                DrawCommand::Text(text) => painter.text(text),
                DrawCommand::Rule(rule) => painter.rule(rule),
                DrawCommand::Rect(rect) => painter.rect(rect),
                DrawCommand::ImageObject(image) => match resolve(&image.src) {
                    Some(placed) => painter.image(image, placed),
                    None => painter.image_fallback(image),
                },
                DrawCommand::PageChrome(_) => {}
            }
        }
        let PagePainter {
            content,
            used_images,
            ..
        } = painter;

        let raw = content.finish();
        let content_id = self.alloc();
        if self.compress {
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
            self.pdf
                .stream(content_id, &compressed)
                .filter(Filter::FlateDecode);
        } else {
            self.pdf.stream(content_id, raw.as_slice());
        }

        let page_id = self.alloc();
        self.page_ids.push(page_id);
        let mut pdf_page = self.pdf.page(page_id);
        pdf_page
            .media_box(Rect::new(0.0, 0.0, page.width, page.height))
            .parent(self.pages_id)
            .contents(content_id);
        let mut resources = pdf_page.resources();
        {
            let mut fonts = resources.fonts();
            for (id, (name, _)) in self.font_ids.iter().zip(FONT_NAMES) {
                fonts.pair(Name(name), *id);
            }
        }
        if !used_images.is_empty() {
            let mut xobjects = resources.x_objects();
            for placed in &used_images {
                xobjects.pair(Name(placed.name.as_bytes()), placed.id);
            }
        }
    }

    /// Close the page tree and serialize.
    pub fn finish(mut self) -> Vec<u8> {
        let count = self.page_ids.len() as i32;
        self.pdf.catalog(self.catalog_id).pages(self.pages_id);
        self.pdf
            .pages(self.pages_id)
            .kids(self.page_ids.iter().copied())
            .count(count);
        self.pdf.finish()
    }
}

struct PagePainter<'m> {
    content: Content,
    page_height: f32,
    measurer: &'m dyn TextMeasurer,
    used_images: Vec<PlacedImage>,
}

impl PagePainter<'_> {
    fn flip(&self, y: f32) -> f32 {
        self.page_height - y
    }

    fn text(&mut self, text: &TextCommand) {
        if text.text.is_empty() {
            return;
        }
        let [r, g, b] = text.style.color.to_unit_rgb();
        let bytes = to_winansi_bytes(&text.text);
        let font = FONT_NAMES[font_slot(text.style.face)].0;
        let y = self.flip(text.baseline_y);
        self.content.set_fill_rgb(r, g, b);
        self.content
            .begin_text()
            .set_font(Name(font), text.style.size_px)
            .next_line(text.x, y)
            .show(Str(&bytes))
            .end_text();
    }

    fn rule(&mut self, rule: &RuleCommand) {
        let [r, g, b] = rule.color.to_unit_rgb();
        let (x0, y0) = (rule.x, self.flip(rule.y));
        let (x1, y1) = if rule.horizontal {
            (rule.x + rule.length, y0)
        } else {
            (rule.x, self.flip(rule.y + rule.length))
        };
        self.content.save_state();
        self.content.set_stroke_rgb(r, g, b);
        self.content.set_line_width(rule.thickness);
        self.content.move_to(x0, y0);
        self.content.line_to(x1, y1);
        self.content.stroke();
        self.content.restore_state();
    }

    fn rect(&mut self, rect: &RectCommand) {
        let [r, g, b] = rect.color.to_unit_rgb();
        let y = self.flip(rect.y + rect.height);
        self.content.save_state();
        if rect.fill {
            self.content.set_fill_rgb(r, g, b);
            self.content.rect(rect.x, y, rect.width, rect.height);
            self.content.fill_nonzero();
        } else {
            self.content.set_stroke_rgb(r, g, b);
            self.content.set_line_width(0.75);
            self.content.rect(rect.x, y, rect.width, rect.height);
            self.content.stroke();
        }
        self.content.restore_state();
    }

    fn image(&mut self, cmd: &ImageObjectCommand, placed: &PlacedImage) {
        let (iw, ih) = (placed.width as f32, placed.height as f32);
        let sx = cmd.width / iw;
        let sy = cmd.height / ih;
        let scale = match cmd.fit {
            ImageFit::Contain => sx.min(sy),
            ImageFit::Cover => sx.max(sy),
        };
        let (dw, dh) = (iw * scale, ih * scale);
        let dx = cmd.x + (cmd.width - dw) / 2.0;
        let dy = cmd.y + (cmd.height - dh) / 2.0;

        self.content.save_state();
        if cmd.fit == ImageFit::Cover {
            self.content
                .rect(cmd.x, self.flip(cmd.y + cmd.height), cmd.width, cmd.height);
            self.content.clip_nonzero();
            self.content.end_path();
        }
        self.content
            .transform([dw, 0.0, 0.0, dh, dx, self.flip(dy + dh)]);
        self.content.x_object(Name(placed.name.as_bytes()));
        self.content.restore_state();

        if !self.used_images.iter().any(|used| used.id == placed.id) {
            self.used_images.push(placed.clone());
        }
    }

    fn image_fallback(&mut self, cmd: &ImageObjectCommand) {
        let ImageFallback::Placeholder(label) = &cmd.fallback else {
            return;
        };
        self.rect(&RectCommand {
            x: cmd.x,
            y: cmd.y,
            width: cmd.width,
            height: cmd.height,
            fill: true,
            color: PLACEHOLDER_FILL,
        });
        let style = TextStyle::body(11.0, 16.5)
            .with_face(FontFace::Italic)
            .with_role(TextRole::Placeholder)
            .with_color(PLACEHOLDER_COLOR);
        let width = self.measurer.measure_text_px(label, &style);
        self.text(&TextCommand {
            x: cmd.x + (cmd.width - width) / 2.0,
            baseline_y: cmd.y + cmd.height / 2.0,
            width,
            text: label.clone(),
            style,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narra_book_render::{StandardFontMeasurer, TextAlign};

    fn doc(compress: bool) -> PdfDocument {
        PdfDocument::new("Family Book", "Rose", compress, StandardFontMeasurer::shared())
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn text_page() -> RenderPage {
        let mut page = RenderPage::new(1, 360.0, 576.0);
        page.push_content_command(DrawCommand::Text(TextCommand {
            x: 36.0,
            baseline_y: 100.0,
            width: 50.0,
            text: "Spring (1962)".to_string(),
            style: TextStyle::body(11.0, 16.5).with_align(TextAlign::Left),
        }));
        page
    }

    #[test]
    fn writes_pages_with_standard_fonts() {
        let mut doc = doc(false);
        doc.write_page(&text_page(), |_| None);
        doc.write_page(&RenderPage::new(2, 360.0, 576.0), |_| None);
        assert_eq!(doc.page_count(), 2);
        let bytes = doc.finish();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(contains(&bytes, b"/Times-Roman"));
        assert!(contains(&bytes, b"/Times-BoldItalic"));
        assert!(contains(&bytes, b"/WinAnsiEncoding"));
        assert!(contains(&bytes, b"/MediaBox [0 0 360 576]"));
        // y flipped: 576 - 100
        assert!(contains(&bytes, b"476 Td"));
        assert!(contains(&bytes, b"(Spring \\(1962\\)) Tj"));
    }

    #[test]
    fn compressed_streams_hide_text() {
        let mut doc = doc(true);
        doc.write_page(&text_page(), |_| None);
        let bytes = doc.finish();
        assert!(contains(&bytes, b"/FlateDecode"));
        assert!(!contains(&bytes, b"Spring"));
    }

    #[test]
    fn unresolved_image_draws_placeholder_label() {
        let mut page = RenderPage::new(1, 360.0, 576.0);
        page.push_content_command(DrawCommand::ImageObject(ImageObjectCommand {
            src: "missing.png".to_string(),
            alt: String::new(),
            x: 36.0,
            y: 58.0,
            width: 288.0,
            height: 400.0,
            fit: ImageFit::Contain,
            fallback: ImageFallback::Placeholder("[Could not load media]".to_string()),
        }));
        let mut doc = doc(false);
        doc.write_page(&page, |_| None);
        let bytes = doc.finish();
        assert!(contains(&bytes, b"([Could not load media]) Tj"));
        assert!(!contains(&bytes, b"/XObject"));
    }

    #[test]
    fn resolved_image_is_referenced_from_page_resources() {
        let mut doc = doc(false);
        let placed = doc.add_image(&DecodedImage {
            width: 2,
            height: 1,
            data: ImageData::Rgb(vec![0, 0, 0, 255, 255, 255]),
        });
        let mut page = RenderPage::new(1, 360.0, 576.0);
        page.push_content_command(DrawCommand::ImageObject(ImageObjectCommand {
            src: "a.png".to_string(),
            alt: String::new(),
            x: 0.0,
            y: 0.0,
            width: 360.0,
            height: 576.0,
            fit: ImageFit::Cover,
            fallback: ImageFallback::BackgroundOnly,
        }));
        doc.write_page(&page, |src| (src == "a.png").then_some(&placed));
        let bytes = doc.finish();
        assert!(contains(&bytes, b"/Subtype /Image"));
        assert!(contains(&bytes, b"/Im1"));
        assert!(contains(&bytes, b"/Im1 Do"));
    }
}
