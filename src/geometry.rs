use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const POINTS_PER_INCH: f32 = 72.0;

/// Physical layout of a label sheet, all lengths in points.
///
/// Defaults describe Avery 5160 on US Letter: three columns of ten
/// 2.625" × 1" labels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub label_width: f32,
    pub label_height: f32,
    pub margin_top: f32,
    pub margin_left: f32,
    pub horizontal_gutter: f32,
    pub vertical_gutter: f32,
    pub labels_per_row: usize,
    pub labels_per_column: usize,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self::avery_5160()
    }
}

impl GridGeometry {
    pub fn avery_5160() -> Self {
        Self {
            page_width: 8.5 * POINTS_PER_INCH,
            page_height: 11.0 * POINTS_PER_INCH,
            label_width: 2.625 * POINTS_PER_INCH,
            label_height: 1.0 * POINTS_PER_INCH,
            margin_top: 0.5 * POINTS_PER_INCH,
            margin_left: 0.1875 * POINTS_PER_INCH,
            horizontal_gutter: 0.125 * POINTS_PER_INCH,
            vertical_gutter: 0.0,
            labels_per_row: 3,
            labels_per_column: 10,
        }
    }

    pub fn labels_per_page(&self) -> usize {
        self.labels_per_row * self.labels_per_column
    }

    /// Top-left corner of the cell at `(row, col)`.
    pub fn cell_origin(&self, row: usize, col: usize) -> (f32, f32) {
        let x = self.margin_left + col as f32 * (self.label_width + self.horizontal_gutter);
        let y = self.margin_top + row as f32 * (self.label_height + self.vertical_gutter);
        (x, y)
    }

    /// Width and height the grid occupies, margins excluded.
    pub fn grid_extent(&self) -> (f32, f32) {
        let cols = self.labels_per_row as f32;
        let rows = self.labels_per_column as f32;
        (
            cols * self.label_width + (cols - 1.0).max(0.0) * self.horizontal_gutter,
            rows * self.label_height + (rows - 1.0).max(0.0) * self.vertical_gutter,
        )
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.labels_per_row == 0 || self.labels_per_column == 0 {
            return Err(Error::Config(format!(
                "grid must have at least one row and column (got {}x{})",
                self.labels_per_row, self.labels_per_column
            )));
        }
        let lengths = [
            ("page_width", self.page_width),
            ("page_height", self.page_height),
            ("label_width", self.label_width),
            ("label_height", self.label_height),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!("{name} must be positive, got {value}")));
            }
        }
        let offsets = [
            ("margin_top", self.margin_top),
            ("margin_left", self.margin_left),
            ("horizontal_gutter", self.horizontal_gutter),
            ("vertical_gutter", self.vertical_gutter),
        ];
        for (name, value) in offsets {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!("{name} must not be negative, got {value}")));
            }
        }

        // Half a point of slack for inch → point rounding in hand-written sheets.
        let (grid_w, grid_h) = self.grid_extent();
        if self.margin_left + grid_w > self.page_width + 0.5 {
            return Err(Error::Config(format!(
                "{} columns of {}pt need {:.1}pt but the sheet is {}pt wide",
                self.labels_per_row,
                self.label_width,
                self.margin_left + grid_w,
                self.page_width
            )));
        }
        if self.margin_top + grid_h > self.page_height + 0.5 {
            return Err(Error::Config(format!(
                "{} rows of {}pt need {:.1}pt but the sheet is {}pt tall",
                self.labels_per_column,
                self.label_height,
                self.margin_top + grid_h,
                self.page_height
            )));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("grid geometry: {e}")))
    }
}
