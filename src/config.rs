use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::geometry::GridGeometry;
use crate::model::QrEncoding;
use crate::qr::QrOptions;

pub const ENV_BASE_URL: &str = "LABELSHEET_BASE_URL";
pub const ENV_GRID: &str = "LABELSHEET_GRID";
pub const ENV_QR_EC: &str = "LABELSHEET_QR_EC";
pub const ENV_MAX_PAGES: &str = "LABELSHEET_MAX_PAGES";

/// Sheets one request may produce, placeholder-only sheets included.
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Typography and spacing inside one label cell, in points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    /// Inset applied to every side of every cell.
    pub padding: f32,
    pub id_font_size: f32,
    pub location_font_size: f32,
    /// Gap between the ID line and the first location line.
    pub line_gap: f32,
    /// QR edge as a fraction of the padded content height.
    pub qr_scale: f32,
    pub text_color: [u8; 3],
    /// Stroke every cell boundary, placeholders included. Alignment aid for test prints.
    pub outline_cells: bool,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            padding: 5.0,
            id_font_size: 14.0,
            location_font_size: 10.0,
            line_gap: 2.0,
            qr_scale: 0.9,
            text_color: [0, 0, 0],
            outline_cells: false,
        }
    }
}

impl LabelStyle {
    pub fn validate(&self, geometry: &GridGeometry) -> Result<(), Error> {
        if !(self.padding.is_finite()
            && self.padding >= 0.0
            && 2.0 * self.padding < geometry.label_height
            && 2.0 * self.padding < geometry.label_width)
        {
            return Err(Error::Config(format!(
                "padding {}pt leaves no content area in a {}x{}pt cell",
                self.padding, geometry.label_width, geometry.label_height
            )));
        }
        for (name, value) in [
            ("id_font_size", self.id_font_size),
            ("location_font_size", self.location_font_size),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!("{name} must be positive, got {value}")));
            }
        }
        if !(self.line_gap.is_finite() && self.line_gap >= 0.0) {
            return Err(Error::Config(format!(
                "line_gap must not be negative, got {}",
                self.line_gap
            )));
        }
        if !(self.qr_scale > 0.0 && self.qr_scale <= 1.0) {
            return Err(Error::Config(format!(
                "qr_scale must be in (0, 1], got {}",
                self.qr_scale
            )));
        }
        Ok(())
    }
}

/// Optional TrueType files replacing Helvetica in PDF output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub regular: Option<PathBuf>,
    pub bold: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LabelConfig {
    /// Site root; QR codes encode `<base_url>/packages/<id>`.
    pub base_url: String,
    pub geometry: GridGeometry,
    pub style: LabelStyle,
    pub qr: QrOptions,
    pub qr_encoding: QrEncoding,
    pub fonts: FontConfig,
    /// Upper bound on one PDF or HTML render.
    pub render_timeout: Option<Duration>,
    /// Requests needing more sheets than this are rejected before layout.
    pub max_pages: usize,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            geometry: GridGeometry::default(),
            style: LabelStyle::default(),
            qr: QrOptions::default(),
            qr_encoding: QrEncoding::Vector,
            fonts: FontConfig::default(),
            render_timeout: Some(Duration::from_secs(30)),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Start time of one render, checked against `render_timeout` as it proceeds.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub(crate) fn check(&self) -> Result<(), Error> {
        match self.limit {
            Some(limit) if self.started.elapsed() > limit => Err(Error::Rendering(format!(
                "label sheet render exceeded {:.1}s",
                limit.as_secs_f64()
            ))),
            _ => Ok(()),
        }
    }
}

impl LabelConfig {
    pub(crate) fn start_deadline(&self) -> Deadline {
        Deadline {
            started: Instant::now(),
            limit: self.render_timeout,
        }
    }

    /// Defaults overlaid with `LABELSHEET_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }
        if let Ok(path) = std::env::var(ENV_GRID) {
            let json = std::fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("{ENV_GRID}={path}: {e}")))?;
            config.geometry = GridGeometry::from_json(&json)?;
        }
        if let Ok(level) = std::env::var(ENV_QR_EC) {
            config.qr.ec_level = level.parse()?;
        }
        if let Ok(pages) = std::env::var(ENV_MAX_PAGES) {
            config.max_pages = pages
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("{ENV_MAX_PAGES}={pages}: {e}")))?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base_url must not be empty".into()));
        }
        if self.max_pages == 0 {
            return Err(Error::Config("max_pages must be at least 1".into()));
        }
        if !(self.qr.size_points.is_finite() && self.qr.size_points > 0.0) {
            return Err(Error::Config(format!(
                "qr size_points must be positive, got {}",
                self.qr.size_points
            )));
        }
        self.geometry.validate()?;
        self.style.validate(&self.geometry)
    }
}
