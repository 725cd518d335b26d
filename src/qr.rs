//! QR code generation.
//!
//! The `qrcode` encoder produces the module matrix; everything drawn from it
//! (SVG markup, PDF rectangles, grayscale rasters) reads the same
//! [`QrCodeImage`] so every output form carries identical bits.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use image::{GrayImage, Luma};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Error-correction level. `M` is used for print labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EcLevel {
    L,
    #[default]
    M,
    Q,
    H,
}

impl From<EcLevel> for qrcode::EcLevel {
    fn from(level: EcLevel) -> Self {
        match level {
            EcLevel::L => qrcode::EcLevel::L,
            EcLevel::M => qrcode::EcLevel::M,
            EcLevel::Q => qrcode::EcLevel::Q,
            EcLevel::H => qrcode::EcLevel::H,
        }
    }
}

impl FromStr for EcLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(EcLevel::L),
            "M" => Ok(EcLevel::M),
            "Q" => Ok(EcLevel::Q),
            "H" => Ok(EcLevel::H),
            other => Err(Error::Config(format!(
                "unknown error-correction level '{other}' (expected L, M, Q or H)"
            ))),
        }
    }
}

impl fmt::Display for EcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EcLevel::L => "L",
            EcLevel::M => "M",
            EcLevel::Q => "Q",
            EcLevel::H => "H",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrOptions {
    /// Edge length of the drawn code, quiet zone included.
    pub size_points: f32,
    /// Quiet zone width in modules.
    pub margin_modules: u32,
    pub ec_level: EcLevel,
    /// RGB colour of dark modules.
    pub color: [u8; 3],
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            size_points: 80.0,
            margin_modules: 1,
            ec_level: EcLevel::M,
            color: [0, 0, 0],
        }
    }
}

/// Encoded module matrix plus its quiet zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrCodeImage {
    width: usize,
    margin: usize,
    modules: Vec<bool>,
}

/// Encode `url` as a QR code.
pub fn generate(url: &str, options: &QrOptions) -> Result<QrCodeImage, Error> {
    if url.is_empty() {
        return Err(Error::Encoding("cannot encode an empty URL".into()));
    }
    let code = qrcode::QrCode::with_error_correction_level(url.as_bytes(), options.ec_level.into())
        .map_err(|e| {
            Error::Encoding(format!(
                "{e} ({} bytes at level {})",
                url.len(),
                options.ec_level
            ))
        })?;
    let modules = code
        .to_colors()
        .into_iter()
        .map(|c| c == qrcode::Color::Dark)
        .collect();
    Ok(QrCodeImage {
        width: code.width(),
        margin: options.margin_modules as usize,
        modules,
    })
}

/// QR codes for a whole request, keyed by URL.
pub(crate) struct QrBatch {
    codes: HashMap<String, QrCodeImage>,
    /// URLs that failed to encode, in first-seen order.
    pub(crate) skipped: Vec<String>,
}

impl QrBatch {
    /// Encode every distinct URL once. Encoding runs in parallel; results are
    /// matched back to URLs in submission order, so completion order never
    /// leaks into the document.
    pub(crate) fn generate<'a>(urls: impl IntoIterator<Item = &'a str>, options: &QrOptions) -> Self {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = urls.into_iter().filter(|u| seen.insert(*u)).collect();
        let results: Vec<Result<QrCodeImage, Error>> =
            unique.par_iter().map(|url| generate(url, options)).collect();

        let mut codes = HashMap::with_capacity(unique.len());
        let mut skipped = Vec::new();
        for (url, result) in unique.into_iter().zip(results) {
            match result {
                Ok(code) => {
                    codes.insert(url.to_string(), code);
                }
                Err(e) => {
                    log::warn!("Skipping QR code for {url}: {e}");
                    skipped.push(url.to_string());
                }
            }
        }
        Self { codes, skipped }
    }

    pub(crate) fn get(&self, url: &str) -> Option<&QrCodeImage> {
        self.codes.get(url)
    }
}

impl QrCodeImage {
    /// Symbol width in modules, quiet zone excluded.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Edge length in modules including the quiet zone on both sides.
    pub fn dimension(&self) -> usize {
        self.width + 2 * self.margin
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.modules[y * self.width + x]
    }

    /// Horizontal runs of dark modules as `(row, start_col, len)`, in
    /// quiet-zone-inclusive coordinates. Rows top to bottom.
    pub fn dark_runs(&self) -> Vec<(usize, usize, usize)> {
        let mut runs = Vec::new();
        for y in 0..self.width {
            let mut x = 0;
            while x < self.width {
                if !self.is_dark(x, y) {
                    x += 1;
                    continue;
                }
                let start = x;
                while x < self.width && self.is_dark(x, y) {
                    x += 1;
                }
                runs.push((y + self.margin, start + self.margin, x - start));
            }
        }
        runs
    }

    /// Standalone SVG document, `size` user units square.
    pub fn to_svg(&self, size: f32, color: [u8; 3]) -> String {
        self.svg_markup(&size.to_string(), color)
    }

    /// SVG whose `width`/`height` attributes are `extent` verbatim (e.g. `100%`).
    pub(crate) fn svg_markup(&self, extent: &str, color: [u8; 3]) -> String {
        let dim = self.dimension();
        let mut path = String::new();
        for (row, col, len) in self.dark_runs() {
            path.push_str(&format!("M{col} {row}h{len}v1h-{len}z"));
        }
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{extent}\" height=\"{extent}\" \
             viewBox=\"0 0 {dim} {dim}\" shape-rendering=\"crispEdges\">\
             <rect width=\"{dim}\" height=\"{dim}\" fill=\"#ffffff\"/>\
             <path fill=\"#{:02x}{:02x}{:02x}\" d=\"{path}\"/></svg>",
            color[0], color[1], color[2]
        )
    }

    /// Grayscale raster, `module_px` pixels per module.
    pub fn to_luma(&self, module_px: u32) -> GrayImage {
        let module_px = module_px.max(1);
        let side = self.dimension() as u32 * module_px;
        let margin = self.margin as u32;
        GrayImage::from_fn(side, side, |px, py| {
            let mx = (px / module_px).checked_sub(margin);
            let my = (py / module_px).checked_sub(margin);
            match (mx, my) {
                (Some(mx), Some(my)) if self.is_dark(mx as usize, my as usize) => Luma([0u8]),
                _ => Luma([255u8]),
            }
        })
    }

    /// Pixels per module so the raster comes out close to `target_px` wide.
    pub fn module_px_for(&self, target_px: u32) -> u32 {
        (target_px / self.dimension() as u32).max(1)
    }

    pub fn to_png(&self, module_px: u32) -> Result<Vec<u8>, Error> {
        let img = self.to_luma(module_px);
        let mut png_bytes = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut png_bytes), image::ImageFormat::Png)
            .map_err(|e| Error::Encoding(format!("PNG encoding: {e}")))?;
        Ok(png_bytes)
    }
}
