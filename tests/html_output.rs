mod common;

use std::time::Duration;

use labelsheet::{
    Error, HTML_CONTENT_TYPE, JSON_CONTENT_TYPE, LabelConfig, LabelRequest, OutputMode,
};

fn render(ids: &[&str], copies: usize, offset: usize, auto_print: bool) -> String {
    let doc = common::service()
        .render_print_html(&LabelRequest::new(ids, copies, offset), auto_print)
        .unwrap();
    String::from_utf8(doc.bytes).unwrap()
}

#[test]
fn one_section_per_sheet() {
    let html = render(&["a1"], 31, 0, false);
    std::fs::write(common::output_dir("html").join("labels.html"), &html).ok();
    assert_eq!(html.matches("<section class=\"sheet\"").count(), 2);
    assert!(html.contains("@page { size: 612pt 792pt; margin: 0; }"));
    assert!(html.contains("break-after: page"));
    assert_eq!(html.matches("data-package=\"a1\"").count(), 31);
}

#[test]
fn offset_cells_are_empty_placeholders() {
    let html = render(&["c3"], 1, 4, false);
    assert_eq!(html.matches("data-placeholder></div>").count(), 4);
    let first_label = html.find("data-package=").unwrap();
    let last_placeholder = html.rfind("data-placeholder").unwrap();
    assert!(last_placeholder < first_label);
}

#[test]
fn labels_carry_inline_svg_and_escaped_text() {
    let html = render(&["a1", "b2"], 1, 0, false);
    assert_eq!(html.matches("<svg xmlns=").count(), 2);
    assert!(html.contains(">PKG-0001</div>"));
    assert!(html.contains(">Garage, shelf 2</div>"));
    assert!(html.contains(">N/A</div>"));
    assert!(html.contains("title=\"http://localhost:3000/packages/a1\""));
    assert!(!html.contains("window.print()"));
}

#[test]
fn auto_print_adds_the_dialog_hook() {
    let html = render(&["a1"], 1, 0, true);
    assert!(html.contains("window.print()"));
}

#[test]
fn label_cells_sit_on_the_pdf_grid() {
    let html = render(&["a1"], 4, 0, false);
    // Avery 5160: 13.5pt left margin, 198pt column pitch, 36pt top margin, 72pt rows.
    assert!(html.contains("left:13.50pt;top:36.00pt"));
    assert!(html.contains("left:211.50pt;top:36.00pt"));
    assert!(html.contains("left:409.50pt;top:36.00pt"));
    assert!(html.contains("left:13.50pt;top:108.00pt"));
}

#[test]
fn preview_response_is_json() {
    let response = common::service().respond(
        OutputMode::Preview,
        &LabelRequest::from_query("packageIds=b2,a1&copies=3&offset=2"),
    );
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, JSON_CONTENT_TYPE);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["copies"], 3);
    assert_eq!(body["offset"], 2);
    assert_eq!(body["baseUrl"], "http://localhost:3000");
    assert_eq!(body["packages"][0]["display_id"], "PKG-0002");
    assert_eq!(body["packages"][1]["id"], "a1");
}

#[test]
fn print_mode_response_is_html() {
    let response = common::service().respond(
        OutputMode::PrintHtml { auto_print: true },
        &LabelRequest::new(&["c3"], 1, 0),
    );
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, HTML_CONTENT_TYPE);
    assert!(response.body.starts_with(b"<!DOCTYPE html>"));
}

#[test]
fn missing_ids_are_a_validation_error() {
    let response = common::service().respond(OutputMode::Preview, &LabelRequest::from_query("copies=2"));
    assert_eq!(response.status, 400);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("packageIds"));
}

#[test]
fn failed_qr_keeps_the_label_text() {
    let oversized = common::oversized_id();
    let doc = common::service()
        .render_print_html(&LabelRequest::new(&["a1", oversized.as_str(), "c3"], 1, 0), false)
        .unwrap();
    assert_eq!(doc.labels_drawn, 3);
    assert_eq!(doc.skipped_qr.len(), 1);

    let html = String::from_utf8(doc.bytes).unwrap();
    assert_eq!(html.matches("<svg xmlns=").count(), 2);
    assert_eq!(html.matches("<div class=\"qr\"").count(), 2);

    let start = html.find(&format!("data-package=\"{oversized}\"")).unwrap();
    let end = start + html[start..].find("data-package=\"c3\"").unwrap();
    let failed_cell = &html[start..end];
    assert!(!failed_cell.contains("<svg"));
    assert!(failed_cell.contains(">PKG-9999</div>"));
    assert!(failed_cell.contains(">Basement</div>"));
}

#[test]
fn oversized_offset_is_rejected_before_layout() {
    let response = common::service().respond(
        OutputMode::PrintHtml { auto_print: false },
        &LabelRequest::from_query("packageIds=a1&offset=3000000"),
    );
    assert_eq!(response.status, 400);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("sheets"));
}

#[test]
fn html_render_honours_the_timeout() {
    let mut config = LabelConfig::default();
    config.render_timeout = Some(Duration::ZERO);
    let err = common::service_with(config)
        .render_print_html(&LabelRequest::new(&["a1"], 1, 60), false)
        .unwrap_err();
    assert!(matches!(err, Error::Rendering(_)));
}
