mod cell;
mod config;
mod error;
mod fonts;
mod geometry;
mod html;
mod layout;
mod model;
mod pdf;
mod qr;
mod request;
mod service;
mod store;

pub use config::{
    DEFAULT_MAX_PAGES, ENV_BASE_URL, ENV_GRID, ENV_MAX_PAGES, ENV_QR_EC, FontConfig, LabelConfig,
    LabelStyle,
};
pub use error::Error;
pub use geometry::{GridGeometry, POINTS_PER_INCH};
pub use layout::{LabelLayout, MISSING_LOCATION, expand_labels, package_url, page_count, place};
pub use model::{
    Cell, Label, PackageRecord, PlacedLabel, Placement, PreviewData, QrEncoding,
    RenderedDocument, Sheet,
};
pub use qr::{EcLevel, QrCodeImage, QrOptions, generate as generate_qr};
pub use request::{DEFAULT_COPIES, DEFAULT_OFFSET, LabelRequest, ValidatedRequest};
pub use service::{
    DEFAULT_QR_PX, HTML_CONTENT_TYPE, JSON_CONTENT_TYPE, LabelService, OutputMode,
    PDF_CONTENT_TYPE, QrFormat, QrImage, Response,
};
pub use store::{JsonFileStore, MemoryStore, PackageStore};

use std::path::Path;
use std::time::Instant;

/// Render the labels for `request` to a PDF file at `output`.
pub fn write_label_pdf<S: PackageStore>(
    service: &LabelService<S>,
    request: &LabelRequest,
    output: &Path,
) -> Result<RenderedDocument, Error> {
    let t0 = Instant::now();

    let doc = service.render_pdf(request)?;
    let t_render = t0.elapsed();

    std::fs::write(output, &doc.bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_render.as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        doc.bytes.len(),
    );

    Ok(doc)
}

/// Render the labels for `request` as a print-ready HTML page at `output`.
pub fn write_label_html<S: PackageStore>(
    service: &LabelService<S>,
    request: &LabelRequest,
    auto_print: bool,
    output: &Path,
) -> Result<RenderedDocument, Error> {
    let t0 = Instant::now();

    let doc = service.render_print_html(request, auto_print)?;
    std::fs::write(output, &doc.bytes).map_err(Error::Io)?;

    log::info!(
        "Timing: total={:.1}ms (output {} bytes)",
        t0.elapsed().as_secs_f64() * 1000.0,
        doc.bytes.len(),
    );

    Ok(doc)
}
