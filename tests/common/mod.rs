#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use labelsheet::{LabelConfig, LabelService, MemoryStore, PackageRecord};

/// Three packages: one with a multi-word location, one without a location,
/// and one whose ID is too long to fit any QR symbol.
pub fn store() -> MemoryStore {
    MemoryStore::new([
        PackageRecord::new("a1", "PKG-0001", "Garage, shelf 2"),
        PackageRecord::new("b2", "PKG-0002", ""),
        PackageRecord::new("c3", "PKG-0003", "Attic"),
        PackageRecord::new(oversized_id(), "PKG-9999", "Basement"),
    ])
}

/// An ID whose package URL exceeds QR capacity at every error-correction level.
pub fn oversized_id() -> String {
    "x".repeat(3000)
}

pub fn service() -> LabelService<MemoryStore> {
    service_with(LabelConfig::default())
}

pub fn service_with(config: LabelConfig) -> LabelService<MemoryStore> {
    let _ = env_logger::try_init();
    LabelService::new(store(), config).expect("default config is valid")
}

/// Output directory: tests/output/<case>/
pub fn output_dir(case: &str) -> PathBuf {
    let dir = PathBuf::from("tests/output").join(case);
    fs::create_dir_all(&dir).ok();
    dir
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// `/Count` of the page tree root.
pub fn page_count(pdf: &[u8]) -> Option<usize> {
    let at = find(pdf, b"/Count ", 0)? + b"/Count ".len();
    let digits: String = pdf[at..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .map(|&b| b as char)
        .collect();
    digits.parse().ok()
}

/// Every `/MediaBox [..]` as `(width, height)`.
pub fn media_boxes(pdf: &[u8]) -> Vec<(f32, f32)> {
    let mut boxes = Vec::new();
    let mut pos = 0;
    while let Some(start) = find(pdf, b"/MediaBox [", pos) {
        let open = start + b"/MediaBox [".len();
        let Some(close) = find(pdf, b"]", open) else { break };
        let nums: Vec<f32> = String::from_utf8_lossy(&pdf[open..close])
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        if nums.len() == 4 {
            boxes.push((nums[2] - nums[0], nums[3] - nums[1]));
        }
        pos = close;
    }
    boxes
}

/// Raw bodies of all streams, inflated when they are zlib-compressed.
pub fn inflated_streams(pdf: &[u8]) -> Vec<Vec<u8>> {
    let mut streams = Vec::new();
    let mut pos = 0;
    while let Some(kw) = find(pdf, b"stream\n", pos) {
        if kw >= 3 && &pdf[kw - 3..kw] == b"end" {
            pos = kw + 1;
            continue;
        }
        let start = kw + b"stream\n".len();
        let Some(end) = find(pdf, b"\nendstream", start) else { break };
        let raw = &pdf[start..end];
        streams.push(miniz_oxide::inflate::decompress_to_vec_zlib(raw).unwrap_or_else(|_| raw.to_vec()));
        pos = end + b"\nendstream".len();
    }
    streams
}

/// Page content streams: the streams that contain text or path operators.
pub fn content_streams(pdf: &[u8]) -> Vec<String> {
    inflated_streams(pdf)
        .into_iter()
        .map(|s| String::from_utf8_lossy(&s).into_owned())
        .filter(|s| s.contains(" re") || s.contains("BT") || s.contains(" Do"))
        .collect()
}

/// Strings shown with `Tj`, in stream order.
pub fn shown_text(content: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if let Some(body) = line.strip_suffix(" Tj") {
            if let Some(text) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
                out.push(text.replace("\\(", "(").replace("\\)", ")").replace("\\\\", "\\"));
            }
        }
    }
    out
}

/// Number of rectangles in a content stream.
pub fn rect_count(content: &str) -> usize {
    content.lines().filter(|l| l.trim_end().ends_with(" re")).count()
}
