//! Async PDF export for Narra books.
//!
//! [`generate_pdf`] lays a [`narra_book::BookSnapshot`] out with the shared
//! page index, renders every page through the draw-command IR and returns the
//! document as a `data:application/pdf;base64,` URI. Images come from an
//! [`AssetFetcher`]; a failed fetch degrades only its own page.
//!
//! ```no_run
//! # async fn demo(snapshot: std::sync::Arc<narra_book::BookSnapshot>) -> Result<(), narra_book_pdf::PdfError> {
//! use narra_book::BookConfig;
//! use narra_book_pdf::{generate_pdf, FileAssetFetcher, PdfOptions};
//!
//! let fetcher = FileAssetFetcher::new("assets");
//! let pdf = generate_pdf(snapshot, &BookConfig::print(), &fetcher, &PdfOptions::default()).await?;
//! assert!(pdf.data_uri().starts_with("data:application/pdf;base64,"));
//! # Ok(())
//! # }
//! ```

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

mod assets;
mod encoding;
mod error;
mod generator;
mod options;
mod writer;

#[cfg(feature = "http")]
pub use assets::HttpAssetFetcher;
pub use assets::{
    decode_data_url, decode_image, load_image, AssetFetcher, DecodedImage, FileAssetFetcher,
    ImageData,
};
pub use encoding::to_winansi_bytes;
pub use error::{AssetError, PdfError};
pub use generator::{generate_pdf, GeneratedPdf, PdfDiagnostic, PDF_DATA_URI_PREFIX};
pub use options::PdfOptions;
pub use writer::{PdfDocument, PlacedImage};
