//! Geometry of one label cell: where the QR square goes, how the ID and
//! location lines are fitted, and where their baselines fall.
//!
//! Coordinates are points from the page's top-left corner, y growing
//! downwards. Backends flip to their own origin.

use crate::config::LabelStyle;
use crate::fonts::FontMetrics;
use crate::geometry::GridGeometry;
use crate::model::{Label, Placement};

pub(crate) const ELLIPSIS: char = '\u{2026}';

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Frame {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) width: f32,
    pub(crate) height: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PlacedLine {
    pub(crate) text: String,
    pub(crate) x: f32,
    /// Top of the line box.
    pub(crate) top: f32,
    pub(crate) baseline: f32,
    pub(crate) font_size: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CellLayout {
    pub(crate) cell: Frame,
    /// Square reserved for the QR code, quiet zone included.
    pub(crate) qr: Frame,
    pub(crate) text_width: f32,
    pub(crate) id_line: Option<PlacedLine>,
    pub(crate) location_lines: Vec<PlacedLine>,
}

/// Outline of a cell with nothing in it.
pub(crate) fn cell_frame(placement: &Placement, geometry: &GridGeometry) -> Frame {
    Frame {
        x: placement.x,
        y: placement.y,
        width: geometry.label_width,
        height: geometry.label_height,
    }
}

/// Edge of the QR square: a share of the padded content height, capped by the content width.
pub(crate) fn qr_edge(geometry: &GridGeometry, style: &LabelStyle) -> f32 {
    let content_w = geometry.label_width - 2.0 * style.padding;
    let content_h = geometry.label_height - 2.0 * style.padding;
    (content_h * style.qr_scale).min(content_w)
}

pub(crate) fn layout_cell(
    label: &Label,
    placement: &Placement,
    geometry: &GridGeometry,
    style: &LabelStyle,
    bold: &FontMetrics,
    regular: &FontMetrics,
) -> CellLayout {
    let cell = cell_frame(placement, geometry);
    let content_x = cell.x + style.padding;
    let content_y = cell.y + style.padding;
    let content_w = cell.width - 2.0 * style.padding;
    let content_h = cell.height - 2.0 * style.padding;

    // Square, left-aligned, vertically centred.
    let qr_size = qr_edge(geometry, style);
    let qr = Frame {
        x: content_x,
        y: content_y + (content_h - qr_size) / 2.0,
        width: qr_size,
        height: qr_size,
    };

    let text_x = qr.x + qr_size + style.padding;
    let text_width = (content_w - qr_size - style.padding).max(0.0);

    let id_text = fit_single_line(&label.display_text, text_width, bold, style.id_font_size);
    let id_h = if id_text.is_empty() {
        0.0
    } else {
        bold.line_height(style.id_font_size)
    };

    let loc_lh = regular.line_height(style.location_font_size);
    let available = (content_h - id_h - style.line_gap).max(0.0);
    let max_lines = ((available / loc_lh).floor() as usize).max(1);
    let mut lines = wrap_text(&label.location_text, text_width, regular, style.location_font_size);
    if lines.len() > max_lines {
        log::debug!(
            "location for {} wraps to {} lines, keeping {max_lines}",
            label.source_id,
            lines.len()
        );
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            *last = with_ellipsis(last, text_width, regular, style.location_font_size);
        }
    }

    let loc_h = lines.len() as f32 * loc_lh;
    let total = id_h + style.line_gap + loc_h;
    let text_top = content_y + (content_h - total) / 2.0;

    let id_line = (!id_text.is_empty()).then(|| PlacedLine {
        text: id_text,
        x: text_x,
        top: text_top,
        baseline: text_top + bold.ascent(style.id_font_size),
        font_size: style.id_font_size,
    });

    let first_loc_top = text_top + id_h + style.line_gap;
    let location_lines = lines
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let top = first_loc_top + i as f32 * loc_lh;
            PlacedLine {
                text,
                x: text_x,
                top,
                baseline: top + regular.ascent(style.location_font_size),
                font_size: style.location_font_size,
            }
        })
        .collect();

    CellLayout {
        cell,
        qr,
        text_width,
        id_line,
        location_lines,
    }
}

/// `text` on one line, cut with an ellipsis when wider than `max_width`.
pub(crate) fn fit_single_line(text: &str, max_width: f32, metrics: &FontMetrics, font_size: f32) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if metrics.text_width(&text, font_size) <= max_width {
        return text;
    }
    with_ellipsis(&text, max_width, metrics, font_size)
}

/// Drop trailing chars from `text` until `text…` fits.
fn with_ellipsis(text: &str, max_width: f32, metrics: &FontMetrics, font_size: f32) -> String {
    let ellipsis_w = metrics.char_width_1000(ELLIPSIS) * font_size / 1000.0;
    if ellipsis_w > max_width {
        return String::new();
    }
    let mut kept = String::new();
    let mut width = ellipsis_w;
    for ch in text.chars() {
        let w = metrics.char_width_1000(ch) * font_size / 1000.0;
        if width + w > max_width {
            break;
        }
        width += w;
        kept.push(ch);
    }
    let mut out = kept.trim_end().to_string();
    out.push(ELLIPSIS);
    out
}

/// Greedy word wrap. Explicit newlines start a new line; a word wider than
/// the line is split between characters.
pub(crate) fn wrap_text(text: &str, max_width: f32, metrics: &FontMetrics, font_size: f32) -> Vec<String> {
    let space_w = metrics.text_width(" ", font_size);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_w = 0.0f32;
        for word in paragraph.split_whitespace() {
            let word_w = metrics.text_width(word, font_size);
            let needed = if current.is_empty() { word_w } else { current_w + space_w + word_w };
            if needed <= max_width {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                current_w = needed;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_w = 0.0;
            }
            if word_w <= max_width {
                current.push_str(word);
                current_w = word_w;
                continue;
            }
            for ch in word.chars() {
                let w = metrics.char_width_1000(ch) * font_size / 1000.0;
                if !current.is_empty() && current_w + w > max_width {
                    lines.push(std::mem::take(&mut current));
                    current_w = 0.0;
                }
                current.push(ch);
                current_w += w;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
