mod draw;

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, TextStr};

use crate::cell::{ELLIPSIS, layout_cell, qr_edge};
use crate::config::LabelConfig;
use crate::error::Error;
use crate::fonts::{FontRole, register_font};
use crate::layout::LabelLayout;
use crate::model::{Cell, QrEncoding, RenderedDocument};
use crate::qr::{QrBatch, QrCodeImage};

use draw::{QrArt, draw_label, draw_outline};

/// Resolution QR rasters are generated at when embedded as images.
const RASTER_DPI: f32 = 300.0;

/// Flate-compressed DeviceGray image XObject holding one QR raster.
fn embed_qr_image(pdf: &mut Pdf, xobj_ref: Ref, code: &QrCodeImage, edge_pt: f32) {
    let target_px = (edge_pt / 72.0 * RASTER_DPI).ceil() as u32;
    let img = code.to_luma(code.module_px_for(target_px));
    let (w, h) = (img.width(), img.height());
    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(img.as_raw(), 6);
    let mut xobj = pdf.image_xobject(xobj_ref, &compressed);
    xobj.filter(Filter::FlateDecode);
    xobj.width(w as i32);
    xobj.height(h as i32);
    xobj.color_space().device_gray();
    xobj.bits_per_component(8);
}

/// Draw every sheet of `layout` into a PDF.
///
/// Nothing is written until every QR code for the request exists, and the
/// finished bytes are returned only if the document is complete.
pub(crate) fn render(layout: &LabelLayout, config: &LabelConfig) -> Result<RenderedDocument, Error> {
    let t0 = Instant::now();
    let deadline = config.start_deadline();
    let geometry = &layout.geometry;
    let style = &config.style;

    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();

    // Phase 1: fonts, subset to the characters the labels use
    let mut bold_chars: HashSet<char> = [' ', ELLIPSIS].into_iter().collect();
    let mut regular_chars = bold_chars.clone();
    for placed in &layout.labels {
        bold_chars.extend(placed.label.display_text.chars());
        regular_chars.extend(placed.label.location_text.chars());
    }
    let bold = register_font(
        &mut pdf,
        FontRole::Bold,
        "F1".to_string(),
        config.fonts.bold.as_deref(),
        &bold_chars,
        &mut alloc,
    );
    let regular = register_font(
        &mut pdf,
        FontRole::Regular,
        "F2".to_string(),
        config.fonts.regular.as_deref(),
        &regular_chars,
        &mut alloc,
    );

    let t_fonts = t0.elapsed();

    // Phase 2: QR codes for every distinct URL, all finished before any page is drawn
    let batch = QrBatch::generate(
        layout.labels.iter().map(|p| p.label.target_url.as_str()),
        &config.qr,
    );
    deadline.check()?;

    let mut qr_xobject_names: HashMap<&str, String> = HashMap::new();
    let mut image_xobjects: Vec<(String, Ref)> = Vec::new();
    if config.qr_encoding == QrEncoding::Raster {
        let edge = qr_edge(geometry, style);
        for placed in &layout.labels {
            let url = placed.label.target_url.as_str();
            if qr_xobject_names.contains_key(url) {
                continue;
            }
            if let Some(code) = batch.get(url) {
                let xobj_ref = alloc();
                let name = format!("Im{}", image_xobjects.len() + 1);
                embed_qr_image(&mut pdf, xobj_ref, code, edge);
                image_xobjects.push((name.clone(), xobj_ref));
                qr_xobject_names.insert(url, name);
            }
        }
    }

    let t_qr = t0.elapsed();

    // Phase 3: one content stream per sheet
    let sheets = layout.sheets();
    let mut all_contents: Vec<Content> = Vec::with_capacity(sheets.len());
    let mut labels_drawn = 0usize;
    for sheet in &sheets {
        let mut content = Content::new();
        for cell in &sheet.cells {
            deadline.check()?;
            match cell {
                Cell::Placeholder(placement) => {
                    if style.outline_cells {
                        draw_outline(&mut content, placement, geometry);
                    }
                }
                Cell::Label(placed) => {
                    let url = placed.label.target_url.as_str();
                    let art = match (qr_xobject_names.get(url), batch.get(url)) {
                        (Some(name), _) => QrArt::Image(name),
                        (None, Some(code)) => QrArt::Vector(code, config.qr.color),
                        (None, None) => QrArt::Missing,
                    };
                    let cell_layout = layout_cell(
                        &placed.label,
                        &placed.placement,
                        geometry,
                        style,
                        &bold.metrics,
                        &regular.metrics,
                    );
                    if style.outline_cells {
                        draw_outline(&mut content, &placed.placement, geometry);
                    }
                    draw_label(
                        &mut content,
                        &cell_layout,
                        &art,
                        &bold,
                        &regular,
                        style.text_color,
                        geometry.page_height,
                    );
                    labels_drawn += 1;
                }
            }
        }
        log::debug!("sheet {}: {} cells", sheet.index + 1, sheet.cells.len());
        all_contents.push(content);
    }

    let t_layout = t0.elapsed();

    // Phase 4: allocate page and content IDs now that page count is known
    let n = all_contents.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    for (i, c) in all_contents.into_iter().enumerate() {
        let raw = c.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);
    pdf.document_info(info_id)
        .title(TextStr("Package labels"))
        .creator(TextStr(concat!("labelsheet ", env!("CARGO_PKG_VERSION"))));

    let font_pairs = [
        (bold.pdf_name.as_str(), bold.font_ref),
        (regular.pdf_name.as_str(), regular.font_ref),
    ];

    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, geometry.page_width, geometry.page_height))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut fonts = resources.fonts();
            for (name, font_ref) in &font_pairs {
                fonts.pair(Name(name.as_bytes()), *font_ref);
            }
        }
        if !image_xobjects.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in &image_xobjects {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }

    let bytes = pdf.finish();
    if bytes.is_empty() {
        return Err(Error::EmptyDocument);
    }
    let t_assembly = t0.elapsed();

    log::info!(
        "Render phases: fonts={:.1}ms, qr={:.1}ms, layout={:.1}ms, assembly={:.1}ms ({} labels, {} pages, {} bytes)",
        t_fonts.as_secs_f64() * 1000.0,
        (t_qr - t_fonts).as_secs_f64() * 1000.0,
        (t_layout - t_qr).as_secs_f64() * 1000.0,
        (t_assembly - t_layout).as_secs_f64() * 1000.0,
        labels_drawn,
        n,
        bytes.len(),
    );

    Ok(RenderedDocument {
        bytes,
        page_count: n,
        labels_drawn,
        skipped_qr: batch.skipped,
    })
}
