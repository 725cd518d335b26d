//! Request orchestration: validate, resolve, expand, place, render.

use crate::config::LabelConfig;
use crate::error::Error;
use crate::layout::{LabelLayout, expand_labels, package_url, page_count};
use crate::model::{PackageRecord, PreviewData, RenderedDocument};
use crate::qr;
use crate::request::{LabelRequest, ValidatedRequest};
use crate::store::PackageStore;
use crate::{html, pdf};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Edge length of a single-package QR PNG.
pub const DEFAULT_QR_PX: u32 = 250;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QrFormat {
    Svg,
    Png,
}

/// Output of a single-package QR lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct QrImage {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// A complete label response, or the structured error the caller reports.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    fn error(e: &Error) -> Self {
        Self {
            status: e.status(),
            content_type: JSON_CONTENT_TYPE,
            body: e.payload().to_string().into_bytes(),
        }
    }
}

/// How a label request is answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Pdf,
    PrintHtml { auto_print: bool },
    Preview,
}

pub struct LabelService<S> {
    store: S,
    config: LabelConfig,
}

impl<S: PackageStore> LabelService<S> {
    pub fn new(store: S, config: LabelConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolved records in request order. Unknown IDs are dropped; if none
    /// resolve the request fails with [`Error::NoValidPackages`].
    pub fn resolve(&self, request: &ValidatedRequest) -> Result<Vec<PackageRecord>, Error> {
        let found = self.store.resolve_packages(&request.package_ids)?;
        let mut records = Vec::with_capacity(found.len());
        for (id, record) in request.package_ids.iter().zip(found) {
            match record {
                Some(record) => records.push(record),
                None => log::warn!("Package {id} not found, skipping its labels"),
            }
        }
        if records.is_empty() {
            return Err(Error::NoValidPackages);
        }
        Ok(records)
    }

    /// Reject requests whose labels plus offset need more than `max_pages`
    /// sheets. Runs before any label or placeholder cell is built.
    fn check_page_limit(&self, request: &ValidatedRequest, packages: usize) -> Result<(), Error> {
        let labels = packages.saturating_mul(request.copies);
        let pages = page_count(request.offset, labels, &self.config.geometry);
        if pages > self.config.max_pages {
            return Err(Error::Validation(format!(
                "{labels} labels after offset {} need {pages} sheets, the limit is {}",
                request.offset, self.config.max_pages
            )));
        }
        Ok(())
    }

    /// Placed labels for `request`, ready for either backend.
    pub fn layout(&self, request: &LabelRequest) -> Result<LabelLayout, Error> {
        let request = request.validate()?;
        let records = self.resolve(&request)?;
        self.check_page_limit(&request, records.len())?;
        let labels = expand_labels(
            records.iter().map(|r| (r, request.copies)),
            &self.config.base_url,
        );
        log::debug!(
            "{} packages x {} copies = {} labels, offset {}",
            records.len(),
            request.copies,
            labels.len(),
            request.offset
        );
        Ok(LabelLayout::new(labels, request.offset, &self.config.geometry))
    }

    /// Data for client-side rendering: the resolved packages plus the
    /// coerced request parameters.
    pub fn preview(&self, request: &LabelRequest) -> Result<PreviewData, Error> {
        let request = request.validate()?;
        let packages = self.resolve(&request)?;
        self.check_page_limit(&request, packages.len())?;
        Ok(PreviewData {
            packages,
            copies: request.copies,
            offset: request.offset,
            base_url: self.config.base_url.clone(),
        })
    }

    pub fn render_pdf(&self, request: &LabelRequest) -> Result<RenderedDocument, Error> {
        let layout = self.layout(request)?;
        pdf::render(&layout, &self.config)
    }

    pub fn render_print_html(
        &self,
        request: &LabelRequest,
        auto_print: bool,
    ) -> Result<RenderedDocument, Error> {
        let layout = self.layout(request)?;
        html::render(&layout, &self.config, auto_print)
    }

    /// QR code for one package's detail page. `size_px` only applies to PNG.
    pub fn package_qr(&self, id: &str, format: QrFormat, size_px: u32) -> Result<QrImage, Error> {
        let record = self
            .store
            .get_package(id)?
            .ok_or_else(|| Error::PackageNotFound(id.to_string()))?;
        let url = package_url(&self.config.base_url, &record.id);
        let code = qr::generate(&url, &self.config.qr)?;
        Ok(match format {
            QrFormat::Svg => QrImage {
                content_type: "image/svg+xml",
                bytes: code.to_svg(self.config.qr.size_points, self.config.qr.color).into_bytes(),
            },
            QrFormat::Png => QrImage {
                content_type: "image/png",
                bytes: code.to_png(code.module_px_for(size_px))?,
            },
        })
    }

    /// Answer a label request in `mode`. Failures become a JSON error body
    /// with the matching status; no partial document is ever returned.
    pub fn respond(&self, mode: OutputMode, request: &LabelRequest) -> Response {
        let result = match mode {
            OutputMode::Pdf => self
                .render_pdf(request)
                .map(|doc| (PDF_CONTENT_TYPE, doc.bytes)),
            OutputMode::PrintHtml { auto_print } => self
                .render_print_html(request, auto_print)
                .map(|doc| (HTML_CONTENT_TYPE, doc.bytes)),
            OutputMode::Preview => self.preview(request).and_then(|data| {
                serde_json::to_vec(&data)
                    .map(|body| (JSON_CONTENT_TYPE, body))
                    .map_err(|e| Error::Rendering(e.to_string()))
            }),
        };
        match result {
            Ok((content_type, body)) => Response {
                status: 200,
                content_type,
                body,
            },
            Err(e) => {
                log::error!("Label request failed: {e}");
                Response::error(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> LabelService<MemoryStore> {
        let store = MemoryStore::new([
            PackageRecord::new("a", "PKG-0001", "Attic"),
            PackageRecord::new("b", "PKG-0002", ""),
        ]);
        LabelService::new(store, LabelConfig::default()).unwrap()
    }

    #[test]
    fn unresolved_ids_are_dropped_in_order() {
        let layout = service()
            .layout(&LabelRequest::new(&["b", "missing", "a"], 1, 0))
            .unwrap();
        let ids: Vec<&str> = layout.labels.iter().map(|p| p.label.source_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(layout.labels[0].label.location_text, "N/A");
    }

    #[test]
    fn nothing_resolved_is_no_valid_packages() {
        let err = service()
            .layout(&LabelRequest::new(&["x", "y"], 1, 0))
            .unwrap_err();
        assert!(matches!(err, Error::NoValidPackages));
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn preview_echoes_coerced_parameters() {
        let data = service()
            .preview(&LabelRequest::from_query("packageIds=a&copies=-2&offset=x"))
            .unwrap();
        assert_eq!((data.copies, data.offset), (1, 0));
        assert_eq!(data.base_url, "http://localhost:3000");
        assert_eq!(data.packages.len(), 1);
    }

    #[test]
    fn unknown_package_qr_is_not_found() {
        let err = service().package_qr("zzz", QrFormat::Svg, DEFAULT_QR_PX).unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut config = LabelConfig::default();
        config.geometry.labels_per_row = 0;
        assert!(matches!(
            LabelService::new(MemoryStore::default(), config),
            Err(Error::Config(_))
        ));
    }
}
