//! Print-ready HTML rendition of a [`LabelLayout`].
//!
//! Each sheet is a fixed-size `.sheet` box with one absolutely positioned
//! cell per label, in points, so the browser's print path lands on the same
//! grid as the PDF. Text is pre-fitted with the Helvetica metrics the PDF
//! uses, so both backends break and truncate lines identically.

use std::fmt::Write as _;

use crate::cell::{CellLayout, PlacedLine, layout_cell};
use crate::config::LabelConfig;
use crate::error::Error;
use crate::fonts::{FontMetrics, FontRole};
use crate::geometry::GridGeometry;
use crate::layout::LabelLayout;
use crate::model::{Cell, RenderedDocument};
use crate::qr::QrBatch;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn css_color([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn stylesheet(geometry: &GridGeometry, config: &LabelConfig) -> String {
    let outline = if config.style.outline_cells {
        "outline: 0.25pt solid #bfbfbf;"
    } else {
        ""
    };
    format!(
        "@page {{ size: {w}pt {h}pt; margin: 0; }}\n\
         * {{ box-sizing: border-box; }}\n\
         html, body {{ margin: 0; padding: 0; }}\n\
         body {{ font-family: Helvetica, Arial, sans-serif; color: {color}; \
         -webkit-print-color-adjust: exact; print-color-adjust: exact; }}\n\
         .sheet {{ position: relative; width: {w}pt; height: {h}pt; overflow: hidden; \
         break-after: page; page-break-after: always; }}\n\
         .sheet:last-child {{ break-after: auto; page-break-after: auto; }}\n\
         .cell {{ position: absolute; width: {lw}pt; height: {lh}pt; {outline} }}\n\
         .qr {{ position: absolute; display: block; }}\n\
         .line {{ position: absolute; white-space: pre; overflow: hidden; line-height: 1; }}\n\
         .id {{ font-weight: bold; }}\n\
         @media screen {{ body {{ background: #e5e5e5; }} \
         .sheet {{ background: #fff; margin: 12pt auto; }} }}\n",
        w = geometry.page_width,
        h = geometry.page_height,
        lw = geometry.label_width,
        lh = geometry.label_height,
        color = css_color(config.style.text_color),
    )
}

/// One text line positioned relative to its cell. `top` is set so the line
/// box starts where the PDF line box starts.
fn write_line(out: &mut String, line: &PlacedLine, cell: &CellLayout, class: &str) {
    let _ = write!(
        out,
        "<div class=\"line {class}\" style=\"left:{:.2}pt;top:{:.2}pt;width:{:.2}pt;font-size:{}pt\">{}</div>",
        line.x - cell.cell.x,
        line.top - cell.cell.y,
        cell.text_width,
        line.font_size,
        escape(&line.text),
    );
}

/// Render `layout` as a standalone HTML document. With `auto_print` the page
/// opens the print dialog once loaded.
pub(crate) fn render(
    layout: &LabelLayout,
    config: &LabelConfig,
    auto_print: bool,
) -> Result<RenderedDocument, Error> {
    let geometry = &layout.geometry;
    let style = &config.style;
    let bold = FontMetrics::standard(FontRole::Bold);
    let regular = FontMetrics::standard(FontRole::Regular);
    let deadline = config.start_deadline();

    let batch = QrBatch::generate(
        layout.labels.iter().map(|p| p.label.target_url.as_str()),
        &config.qr,
    );
    deadline.check()?;

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>Package labels</title>\n<style>\n");
    out.push_str(&stylesheet(geometry, config));
    out.push_str("</style>\n</head>\n<body>\n");

    let sheets = layout.sheets();
    let mut labels_drawn = 0usize;
    for sheet in &sheets {
        let _ = writeln!(out, "<section class=\"sheet\" data-sheet=\"{}\">", sheet.index + 1);
        for cell in &sheet.cells {
            deadline.check()?;
            let placement = cell.placement();
            let _ = write!(
                out,
                "<div class=\"cell\" style=\"left:{:.2}pt;top:{:.2}pt\"",
                placement.x, placement.y
            );
            let placed = match cell {
                Cell::Placeholder(_) => {
                    out.push_str(" data-placeholder></div>\n");
                    continue;
                }
                Cell::Label(placed) => placed,
            };
            let _ = write!(out, " data-package=\"{}\">", escape(&placed.label.source_id));

            let cl = layout_cell(&placed.label, placement, geometry, style, &bold, &regular);
            let url = placed.label.target_url.as_str();
            if let Some(code) = batch.get(url) {
                let _ = write!(
                    out,
                    "<div class=\"qr\" style=\"left:{:.2}pt;top:{:.2}pt;width:{w:.2}pt;height:{w:.2}pt\" title=\"{}\">{}</div>",
                    cl.qr.x - cl.cell.x,
                    cl.qr.y - cl.cell.y,
                    escape(url),
                    code.svg_markup("100%", config.qr.color),
                    w = cl.qr.width,
                );
            }
            if let Some(id_line) = &cl.id_line {
                write_line(&mut out, id_line, &cl, "id");
            }
            for line in cl.location_lines.iter().filter(|l| !l.text.is_empty()) {
                write_line(&mut out, line, &cl, "location");
            }
            out.push_str("</div>\n");
            labels_drawn += 1;
        }
        out.push_str("</section>\n");
    }

    if auto_print {
        out.push_str("<script>window.addEventListener('load', () => window.print());</script>\n");
    }
    out.push_str("</body>\n</html>\n");

    log::info!(
        "HTML sheets: {} labels on {} sheets, {} bytes",
        labels_drawn,
        sheets.len(),
        out.len()
    );

    Ok(RenderedDocument {
        bytes: out.into_bytes(),
        page_count: sheets.len(),
        labels_drawn,
        skipped_qr: batch.skipped,
    })
}
