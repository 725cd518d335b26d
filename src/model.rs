use serde::{Deserialize, Serialize};

/// A storage box as held by the package store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub id: String,
    pub display_id: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

impl PackageRecord {
    pub fn new(id: impl Into<String>, display_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_id: display_id.into(),
            location: location.into(),
            created: None,
            updated: None,
        }
    }
}

/// One printable unit: a QR code plus two lines of text for one package copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub source_id: String,
    pub display_text: String,
    pub location_text: String,
    pub target_url: String,
    pub copy_index: usize,
}

/// Where a label lands. `x`/`y` are the cell's top-left corner in points,
/// measured from the page's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub effective_index: usize,
    pub page_index: usize,
    pub row: usize,
    pub col: usize,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlacedLabel {
    pub label: Label,
    pub placement: Placement,
}

/// A cell on a materialized sheet.
#[derive(Clone, Copy, Debug)]
pub enum Cell<'a> {
    /// Reserved by the offset: already used on the physical sheet.
    Placeholder(Placement),
    Label(&'a PlacedLabel),
}

impl Cell<'_> {
    pub fn placement(&self) -> &Placement {
        match self {
            Cell::Placeholder(p) => p,
            Cell::Label(l) => &l.placement,
        }
    }
}

#[derive(Debug)]
pub struct Sheet<'a> {
    pub index: usize,
    pub cells: Vec<Cell<'a>>,
}

/// Which QR form a PDF embeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrEncoding {
    #[default]
    Vector,
    Raster,
}

/// Preview payload handed to client-side renderers.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewData {
    pub packages: Vec<PackageRecord>,
    pub copies: usize,
    pub offset: usize,
    pub base_url: String,
}

/// Outcome of a document render.
#[derive(Debug)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub labels_drawn: usize,
    /// Target URLs whose QR code could not be encoded; their cells carry text only.
    pub skipped_qr: Vec<String>,
}
