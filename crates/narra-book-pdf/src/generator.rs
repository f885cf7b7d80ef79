use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use narra_book::{BookConfig, BookSnapshot, LayoutOptions, StoryId};
use narra_book_render::{BookLayout, BookRenderer, DrawCommand, LayoutError};

use crate::assets::{load_image, AssetFetcher};
use crate::error::{AssetError, PdfError};
use crate::options::PdfOptions;
use crate::writer::{PdfDocument, PlacedImage};

/// Prefix of the returned data URI.
pub const PDF_DATA_URI_PREFIX: &str = "data:application/pdf;base64,";

/// Recoverable events from one generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PdfDiagnostic {
    /// A story failed layout and is not in the document.
    StorySkipped { story_id: StoryId, error: LayoutError },
    /// An image could not be loaded; the page shows its fallback instead.
    AssetFallback { page_index: usize, error: AssetError },
}

/// A finished PDF.
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedPdf {
    bytes: Vec<u8>,
    page_count: usize,
    diagnostics: Vec<PdfDiagnostic>,
}

impl core::fmt::Debug for GeneratedPdf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GeneratedPdf")
            .field("len", &self.bytes.len())
            .field("page_count", &self.page_count)
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

impl GeneratedPdf {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn diagnostics(&self) -> &[PdfDiagnostic] {
        &self.diagnostics
    }

    /// `data:application/pdf;base64,...`
    pub fn data_uri(&self) -> String {
        let mut out = String::from(PDF_DATA_URI_PREFIX);
        base64::engine::general_purpose::STANDARD.encode_string(&self.bytes, &mut out);
        out
    }
}

/// Lay out `snapshot` and render it to PDF.
///
/// The document always follows the print sequence (cover, contents, then a
/// title page, text pages and media pages per story). `config.layout` is
/// replaced by [`LayoutOptions::print`]; dimensions and limits are kept.
///
/// The whole generation is bounded by `options.generation_timeout()`; each
/// asset fetch by `options.asset_timeout()`. A failed asset degrades its page
/// and is reported in [`GeneratedPdf::diagnostics`].
pub async fn generate_pdf<F: AssetFetcher>(
    snapshot: Arc<BookSnapshot>,
    config: &BookConfig,
    fetcher: &F,
    options: &PdfOptions,
) -> Result<GeneratedPdf, PdfError> {
    options.validate()?;
    let budget = options.generation_timeout();
    match tokio::time::timeout(budget, render_document(snapshot, config, fetcher, options)).await {
        Ok(result) => result,
        Err(_) => {
            log::warn!("pdf generation exceeded {budget:?}; aborting");
            Err(PdfError::GenerationTimeout(budget))
        }
    }
}

async fn render_document<F: AssetFetcher>(
    snapshot: Arc<BookSnapshot>,
    config: &BookConfig,
    fetcher: &F,
    options: &PdfOptions,
) -> Result<GeneratedPdf, PdfError> {
    let started = Instant::now();
    let config = BookConfig {
        layout: LayoutOptions::print(),
        ..config.clone()
    };
    let layout = Arc::new(BookLayout::build(Arc::clone(&snapshot), &config)?);
    let renderer = BookRenderer::new(Arc::clone(&layout));
    let mut diagnostics: Vec<PdfDiagnostic> = layout
        .skipped_stories()
        .map(|(story_id, error)| PdfDiagnostic::StorySkipped {
            story_id: story_id.to_string(),
            error: error.clone(),
        })
        .collect();

    let mut doc = PdfDocument::new(
        &snapshot.title,
        &snapshot.author,
        options.compress,
        Arc::clone(layout.measurer()),
    );
    let mut images: HashMap<String, Option<PlacedImage>> = HashMap::new();
    let mut fetched = 0usize;

    for (page_index, page) in renderer.pages().enumerate() {
        for cmd in page.merged_commands_iter() {
            let DrawCommand::ImageObject(image) = cmd else {
                continue;
            };
            if images.contains_key(&image.src) {
                continue;
            }
            let placed = match load_image(fetcher, &image.src, options.asset_timeout()).await {
                Ok(decoded) => Some(doc.add_image(&decoded)),
                Err(error) => {
                    log::warn!("page {}: using image fallback: {error}", page_index + 1);
                    diagnostics.push(PdfDiagnostic::AssetFallback { page_index, error });
                    None
                }
            };
            fetched += 1;
            images.insert(image.src.clone(), placed);
            tokio::task::yield_now().await;
        }

        doc.write_page(&page, |src| images.get(src).and_then(Option::as_ref));

        if (page_index + 1) % options.yield_every_pages == 0 {
            tokio::task::yield_now().await;
        }
    }

    let page_count = doc.page_count();
    let bytes = doc.finish();
    log::info!(
        "generated pdf: pages={} assets={} fallbacks={} bytes={} elapsed={:.1}ms",
        page_count,
        fetched,
        diagnostics
            .iter()
            .filter(|d| matches!(d, PdfDiagnostic::AssetFallback { .. }))
            .count(),
        bytes.len(),
        started.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(GeneratedPdf {
        bytes,
        page_count,
        diagnostics,
    })
}
