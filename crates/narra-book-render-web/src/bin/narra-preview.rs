use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use narra_book::{BookConfig, BookSnapshot};
use narra_book_embedded_graphics::{decode_background, CoverCanvas, CoverCanvasConfig, RgbCanvas};
use narra_book_pdf::{decode_data_url, generate_pdf, AssetFetcher, FileAssetFetcher, PdfOptions};
use narra_book_render::{BookLayout, BookRenderer};
use narra_book_render_web::{render_book_html, HtmlOptions};

/// Render a Narra book file to an HTML preview, a print PDF and/or a cover PNG.
#[derive(Debug, Parser)]
#[command(name = "narra-preview")]
#[command(about = "Preview and export Narra books")]
struct Args {
    /// Book JSON: `{ title, author, stories, media, cover }`.
    #[arg(long)]
    book: PathBuf,

    /// Optional `BookConfig` JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the HTML preview here.
    #[arg(long)]
    html: Option<PathBuf>,

    /// Write the print PDF here.
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// Write the rendered cover as PNG here.
    #[arg(long)]
    cover_png: Option<PathBuf>,

    /// Directory relative media paths resolve against. Defaults to the book
    /// file's directory.
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Device pixels per layout unit for `--cover-png`.
    #[arg(long, default_value = "2")]
    cover_scale: f32,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    if args.html.is_none() && args.pdf.is_none() && args.cover_png.is_none() {
        return Err("nothing to do: pass --html, --pdf and/or --cover-png".to_string());
    }
    let snapshot = Arc::new(BookSnapshot::from_path(&args.book).map_err(|e| e.to_string())?);
    let config = match &args.config {
        Some(path) => BookConfig::from_path(path).map_err(|e| e.to_string())?,
        None => BookConfig::default(),
    };
    let assets_dir = args.assets_dir.clone().unwrap_or_else(|| {
        args.book
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let fetcher = FileAssetFetcher::new(assets_dir);

    if let Some(out) = &args.html {
        write_html(Arc::clone(&snapshot), &config, out)?;
    }
    if args.pdf.is_some() || args.cover_png.is_some() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| e.to_string())?;
        if let Some(out) = &args.pdf {
            runtime.block_on(write_pdf(Arc::clone(&snapshot), &config, &fetcher, out))?;
        }
        if let Some(out) = &args.cover_png {
            runtime.block_on(write_cover_png(&snapshot, &fetcher, args.cover_scale, out))?;
        }
    }
    Ok(())
}

fn write_html(snapshot: Arc<BookSnapshot>, config: &BookConfig, out: &Path) -> Result<(), String> {
    let started = Instant::now();
    let layout = BookLayout::build(snapshot, config).map_err(|e| e.to_string())?;
    let skipped = layout.skipped_stories().count();
    let renderer = BookRenderer::new(Arc::new(layout));
    let html = render_book_html(&renderer, &HtmlOptions::default());
    create_parent_dir(out)?;
    std::fs::write(out, html).map_err(|e| e.to_string())?;
    println!(
        "wrote html preview to {} (pages={}, skipped_stories={}, elapsed={:.1}ms)",
        out.display(),
        renderer.page_count(),
        skipped,
        started.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

async fn write_pdf<F: AssetFetcher>(
    snapshot: Arc<BookSnapshot>,
    config: &BookConfig,
    fetcher: &F,
    out: &Path,
) -> Result<(), String> {
    let pdf = generate_pdf(snapshot, config, fetcher, &PdfOptions::default())
        .await
        .map_err(|e| e.to_string())?;
    create_parent_dir(out)?;
    std::fs::write(out, pdf.bytes()).map_err(|e| e.to_string())?;
    println!(
        "wrote pdf to {} (pages={}, fallbacks={})",
        out.display(),
        pdf.page_count(),
        pdf.diagnostics().len()
    );
    Ok(())
}

async fn write_cover_png<F: AssetFetcher>(
    snapshot: &BookSnapshot,
    fetcher: &F,
    scale: f32,
    out: &Path,
) -> Result<(), String> {
    let config = CoverCanvasConfig {
        scale,
        ..CoverCanvasConfig::default()
    };
    let background = match snapshot.cover.background_image.as_deref() {
        Some(url) => fetch_cover_background(fetcher, url).await,
        None => None,
    };
    let size = config.device_size();
    let mut canvas = RgbCanvas::new(size.width, size.height);
    let report = match CoverCanvas::new(config).render(
        &snapshot.cover,
        background.as_ref(),
        &mut canvas,
    ) {
        Ok(report) => report,
        Err(never) => match never {},
    };
    create_parent_dir(out)?;
    canvas.save_png(out).map_err(|e| e.to_string())?;
    println!(
        "wrote cover to {} ({}x{}, background_image={})",
        out.display(),
        size.width,
        size.height,
        report.background_image_drawn
    );
    Ok(())
}

async fn fetch_cover_background<F: AssetFetcher>(
    fetcher: &F,
    url: &str,
) -> Option<narra_book_embedded_graphics::RgbImage> {
    let bytes = match decode_data_url(url) {
        Some(inline) => inline,
        None => {
            let timeout = PdfOptions::default().asset_timeout();
            match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
                Ok(fetched) => fetched,
                Err(_) => {
                    log::warn!("cover background {url} timed out after {timeout:?}");
                    return None;
                }
            }
        }
    };
    match bytes {
        Ok(bytes) => decode_background(&bytes),
        Err(err) => {
            log::warn!("cover background unavailable: {err}; using background color");
            None
        }
    }
}

fn create_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}
