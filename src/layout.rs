//! Label expansion and sheet placement.
//!
//! Everything here is a pure function of the ordered input, the offset and the
//! grid geometry. Both the PDF and the HTML backends consume [`LabelLayout`],
//! so there is exactly one implementation of the page/row/column arithmetic.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::geometry::GridGeometry;
use crate::model::{Cell, Label, PackageRecord, PlacedLabel, Placement, Sheet};

/// Location text used when a package has none recorded.
pub const MISSING_LOCATION: &str = "N/A";

/// Bytes escaped in a single path segment: the URL path set plus `/` and `%`.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// URL a package's QR code points at: `<base>/packages/<id>`, with the ID
/// escaped as one path segment.
pub fn package_url(base_url: &str, package_id: &str) -> String {
    format!(
        "{}/packages/{}",
        base_url.trim_end_matches('/'),
        utf8_percent_encode(package_id, PATH_SEGMENT)
    )
}

/// Repeat every record `copies` times, keeping all copies of record N ahead of record N+1.
pub fn expand_labels<'a>(
    entries: impl IntoIterator<Item = (&'a PackageRecord, usize)>,
    base_url: &str,
) -> Vec<Label> {
    let mut labels = Vec::new();
    for (record, copies) in entries {
        let location = if record.location.trim().is_empty() {
            MISSING_LOCATION.to_string()
        } else {
            record.location.clone()
        };
        let target_url = package_url(base_url, &record.id);
        for copy_index in 0..copies.max(1) {
            labels.push(Label {
                source_id: record.id.clone(),
                display_text: record.display_id.clone(),
                location_text: location.clone(),
                target_url: target_url.clone(),
                copy_index,
            });
        }
    }
    labels
}

/// Placement of the cell at `effective_index` (label ordinal + offset).
pub fn place(effective_index: usize, geometry: &GridGeometry) -> Placement {
    let per_page = geometry.labels_per_page();
    let page_index = effective_index / per_page;
    let index_on_page = effective_index % per_page;
    let row = index_on_page / geometry.labels_per_row;
    let col = index_on_page % geometry.labels_per_row;
    let (x, y) = geometry.cell_origin(row, col);
    Placement {
        effective_index,
        page_index,
        row,
        col,
        x,
        y,
    }
}

/// Number of sheets needed for `label_count` labels after `offset` used cells.
pub fn page_count(offset: usize, label_count: usize, geometry: &GridGeometry) -> usize {
    if label_count == 0 {
        return 0;
    }
    offset.saturating_add(label_count).div_ceil(geometry.labels_per_page())
}

#[derive(Debug)]
pub struct LabelLayout {
    pub labels: Vec<PlacedLabel>,
    pub offset: usize,
    pub geometry: GridGeometry,
}

impl LabelLayout {
    /// Place `labels` in order, skipping the first `offset` cells.
    /// `geometry` must already be validated.
    pub fn new(labels: Vec<Label>, offset: usize, geometry: &GridGeometry) -> Self {
        let labels = labels
            .into_iter()
            .enumerate()
            .map(|(ordinal, label)| PlacedLabel {
                label,
                placement: place(ordinal + offset, geometry),
            })
            .collect();
        Self {
            labels,
            offset,
            geometry: geometry.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn page_count(&self) -> usize {
        page_count(self.offset, self.labels.len(), &self.geometry)
    }

    /// Materialize sheets in order. A sheet is opened the first time a cell's
    /// page index passes the last opened one; sheets consumed entirely by the
    /// offset come out holding only placeholders.
    pub fn sheets(&self) -> Vec<Sheet<'_>> {
        let mut sheets: Vec<Sheet<'_>> = Vec::new();
        let placeholders = (0..self.offset).map(|i| Cell::Placeholder(place(i, &self.geometry)));
        let labels = self.labels.iter().map(Cell::Label);

        for cell in placeholders.chain(labels) {
            let page_index = cell.placement().page_index;
            while sheets.len() <= page_index {
                sheets.push(Sheet {
                    index: sheets.len(),
                    cells: Vec::new(),
                });
            }
            sheets[page_index].cells.push(cell);
        }
        if self.labels.is_empty() {
            sheets.clear();
        }
        sheets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> PackageRecord {
        PackageRecord::new(id, format!("PKG-{id}"), "Garage shelf 2")
    }

    #[test]
    fn copies_stay_together() {
        let a = record("A");
        let b = record("B");
        let labels = expand_labels([(&a, 2), (&b, 2)], "http://host");
        let order: Vec<(&str, usize)> = labels
            .iter()
            .map(|l| (l.source_id.as_str(), l.copy_index))
            .collect();
        assert_eq!(order, vec![("A", 0), ("A", 1), ("B", 0), ("B", 1)]);
        assert_eq!(labels[0].target_url, "http://host/packages/A");
    }

    #[test]
    fn missing_location_reads_na() {
        let mut r = record("A");
        r.location = "  ".into();
        let labels = expand_labels([(&r, 1)], "http://host/");
        assert_eq!(labels[0].location_text, MISSING_LOCATION);
        assert_eq!(labels[0].target_url, "http://host/packages/A");
    }

    #[test]
    fn ids_are_escaped_as_one_path_segment() {
        assert_eq!(
            package_url("http://host/", "a b/c?d#e%f"),
            "http://host/packages/a%20b%2Fc%3Fd%23e%25f"
        );
        assert_eq!(package_url("http://host", "0b7f-1c2e_x.y~z"), "http://host/packages/0b7f-1c2e_x.y~z");
        assert_eq!(package_url("http://host", "caf\u{e9}"), "http://host/packages/caf%C3%A9");
    }

    #[test]
    fn placement_wraps_rows_and_pages() {
        let g = GridGeometry::avery_5160();
        let p = place(29, &g);
        assert_eq!((p.page_index, p.row, p.col), (0, 9, 2));
        let p = place(30, &g);
        assert_eq!((p.page_index, p.row, p.col), (1, 0, 0));
        assert_eq!((p.x, p.y), (g.margin_left, g.margin_top));
    }

    #[test]
    fn page_count_matches_ceiling() {
        let g = GridGeometry::avery_5160();
        assert_eq!(page_count(0, 0, &g), 0);
        assert_eq!(page_count(0, 1, &g), 1);
        assert_eq!(page_count(0, 30, &g), 1);
        assert_eq!(page_count(29, 2, &g), 2);
        assert_eq!(page_count(65, 1, &g), 3);
    }

    #[test]
    fn offset_past_first_sheet_emits_blank_sheets() {
        let g = GridGeometry::avery_5160();
        let a = record("A");
        let layout = LabelLayout::new(expand_labels([(&a, 1)], "http://h"), 31, &g);
        let sheets = layout.sheets();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].cells.len(), 30);
        assert!(sheets[0].cells.iter().all(|c| matches!(c, Cell::Placeholder(_))));
        assert_eq!(sheets[1].cells.len(), 2);
        assert!(matches!(sheets[1].cells[1], Cell::Label(_)));
    }

    #[test]
    fn empty_layout_has_no_sheets() {
        let layout = LabelLayout::new(Vec::new(), 4, &GridGeometry::avery_5160());
        assert!(layout.is_empty());
        assert_eq!(layout.page_count(), 0);
        assert!(layout.sheets().is_empty());
    }
}
