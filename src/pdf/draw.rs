use pdf_writer::{Content, Name, Str};

use crate::cell::{CellLayout, Frame, PlacedLine, cell_frame};
use crate::fonts::FontEntry;
use crate::geometry::GridGeometry;
use crate::model::Placement;
use crate::qr::QrCodeImage;

pub(super) enum QrArt<'a> {
    /// Drawn as filled module rectangles in the given RGB colour.
    Vector(&'a QrCodeImage, [u8; 3]),
    /// Pre-rasterized image XObject, by resource name.
    Image(&'a str),
    /// Encoding failed; the square is left blank with a hairline border.
    Missing,
}

fn set_fill(content: &mut Content, [r, g, b]: [u8; 3]) {
    content.set_fill_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
}

/// Stroke a cell boundary. Used for placeholders and alignment test prints.
pub(super) fn draw_outline(content: &mut Content, placement: &Placement, geometry: &GridGeometry) {
    let f = cell_frame(placement, geometry);
    content.save_state();
    content.set_stroke_gray(0.75);
    content.set_line_width(0.25);
    content.rect(f.x, geometry.page_height - f.y - f.height, f.width, f.height);
    content.stroke();
    content.restore_state();
}

fn draw_qr_vector(content: &mut Content, code: &QrCodeImage, frame: &Frame, color: [u8; 3], page_h: f32) {
    let module = frame.width / code.dimension() as f32;
    content.save_state();
    set_fill(content, color);
    for (row, col, len) in code.dark_runs() {
        let x = frame.x + col as f32 * module;
        let top = frame.y + row as f32 * module;
        content.rect(x, page_h - top - module, len as f32 * module, module);
    }
    content.fill_nonzero();
    content.restore_state();
}

fn draw_missing_qr(content: &mut Content, frame: &Frame, page_h: f32) {
    content.save_state();
    content.set_stroke_gray(0.6);
    content.set_line_width(0.5);
    content.rect(frame.x, page_h - frame.y - frame.height, frame.width, frame.height);
    content.stroke();
    content.restore_state();
}

fn draw_lines(content: &mut Content, lines: &[PlacedLine], font: &FontEntry, page_h: f32) {
    if lines.iter().all(|l| l.text.is_empty()) {
        return;
    }
    content.begin_text();
    let mut cur_font_size = -1.0f32;
    let mut td_x = 0.0f32;
    let mut td_y = 0.0f32;
    for line in lines.iter().filter(|l| !l.text.is_empty()) {
        if cur_font_size != line.font_size {
            content.set_font(Name(font.pdf_name.as_bytes()), line.font_size);
            cur_font_size = line.font_size;
        }
        let y = page_h - line.baseline;
        content.next_line(line.x - td_x, y - td_y);
        td_x = line.x;
        td_y = y;
        content.show(Str(&font.encode(&line.text)));
    }
    content.end_text();
}

/// Draw one label: QR square on the left, ID and location lines beside it.
pub(super) fn draw_label(
    content: &mut Content,
    cell: &CellLayout,
    art: &QrArt<'_>,
    bold: &FontEntry,
    regular: &FontEntry,
    text_color: [u8; 3],
    page_h: f32,
) {
    let qr = &cell.qr;
    match art {
        QrArt::Vector(code, color) => draw_qr_vector(content, code, qr, *color, page_h),
        QrArt::Image(name) => {
            content.save_state();
            content.transform([qr.width, 0.0, 0.0, qr.height, qr.x, page_h - qr.y - qr.height]);
            content.x_object(Name(name.as_bytes()));
            content.restore_state();
        }
        QrArt::Missing => draw_missing_qr(content, qr, page_h),
    }

    content.save_state();
    set_fill(content, text_color);
    if let Some(id_line) = &cell.id_line {
        draw_lines(content, std::slice::from_ref(id_line), bold, page_h);
    }
    draw_lines(content, &cell.location_lines, regular, page_h);
    content.restore_state();
}
