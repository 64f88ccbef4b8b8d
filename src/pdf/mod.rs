//! Export of a rendered invoice as a paginated PDF.
//!
//! The document is first captured as a raster image, then the image is laid
//! onto fixed-width A4 pages, slicing it when it is taller than one page.

mod typst;

pub use self::typst::TypstBackend;

use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::error::Result;
use crate::render::RenderedDocument;

/// Capture resolution relative to the 72 dpi base
pub const CAPTURE_SCALE: f64 = 2.0;
pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;

/// A raster snapshot of a rendered document
#[derive(Debug, Clone)]
pub struct Capture {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// How a capture is spread over pages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    /// Height of the whole capture once scaled to the page width
    pub image_height_mm: f64,
    pub pages: usize,
}

impl PageLayout {
    pub fn for_capture(width_px: u32, height_px: u32) -> Self {
        let image_height_mm = if width_px == 0 {
            0.0
        } else {
            f64::from(height_px) * PAGE_WIDTH_MM / f64::from(width_px)
        };
        // half a millimetre of slack so rounding never spills a blank page
        let pages = ((image_height_mm - 0.5) / PAGE_HEIGHT_MM).ceil().max(1.0) as usize;

        Self {
            page_width_mm: PAGE_WIDTH_MM,
            page_height_mm: PAGE_HEIGHT_MM,
            image_height_mm,
            pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportMode {
    /// Keep the PDF at this path
    Download(PathBuf),
    /// Write a transient PDF and hand it to the system viewer for printing
    Print,
}

/// Rasterizer and page packager
pub trait ExportBackend {
    fn capture(&self, doc: &RenderedDocument, scale: f64) -> Result<Capture>;
    fn package(&self, capture: &Capture, layout: &PageLayout, output: &Path) -> Result<()>;
    fn open(&self, path: &Path) -> Result<()>;
}

/// Progress signal shown while an export runs
pub trait BusyIndicator {
    fn start(&self);
    fn finish(&self);
}

struct BusyGuard<'a>(&'a dyn BusyIndicator);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Default file name for a downloaded invoice
pub fn download_file_name(invoice_id: &str) -> String {
    format!("Invoice_{invoice_id}.pdf")
}

/// Export `doc`, returning where the PDF was written.
///
/// Without a rendered document this does nothing and the busy indicator is
/// never started. Once started, it is finished on every path.
pub fn export(
    doc: Option<&RenderedDocument>,
    mode: &ExportMode,
    backend: &dyn ExportBackend,
    busy: &dyn BusyIndicator,
) -> Result<Option<PathBuf>> {
    let Some(doc) = doc else {
        debug!("no rendered document, export skipped");
        return Ok(None);
    };

    busy.start();
    let _guard = BusyGuard(busy);

    match run_export(doc, mode, backend) {
        Ok(path) => {
            info!(invoice = %doc.invoice_id, path = %path.display(), "export finished");
            Ok(Some(path))
        }
        Err(e) => {
            error!(invoice = %doc.invoice_id, error = %e, "export failed");
            Err(e)
        }
    }
}

fn run_export(doc: &RenderedDocument, mode: &ExportMode, backend: &dyn ExportBackend) -> Result<PathBuf> {
    let printable = doc.for_export();
    let capture = backend.capture(&printable, CAPTURE_SCALE)?;
    let layout = PageLayout::for_capture(capture.width, capture.height);
    debug!(?layout, width = capture.width, height = capture.height, "captured document");

    match mode {
        ExportMode::Download(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            backend.package(&capture, &layout, path)?;
            Ok(path.clone())
        }
        ExportMode::Print => {
            let dir = std::env::temp_dir().join("invoice-desk");
            std::fs::create_dir_all(&dir)?;
            let path = dir.join(format!("print-{}", download_file_name(&doc.invoice_id)));
            backend.package(&capture, &layout, &path)?;
            backend.open(&path)?;
            Ok(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{InvoicePayload, Participant};
    use crate::error::InvoiceError;
    use crate::invoice::{DocumentOptions, InvoiceDocument, InvoiceView};
    use crate::render::{render, BankPanel};
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct Busy {
        started: Cell<usize>,
        finished: Cell<usize>,
    }

    impl BusyIndicator for Busy {
        fn start(&self) {
            self.started.set(self.started.get() + 1);
        }
        fn finish(&self) {
            self.finished.set(self.finished.get() + 1);
        }
    }

    #[derive(Default)]
    struct FakeBackend {
        fail_capture: bool,
        captured: RefCell<Vec<RenderedDocument>>,
        packaged: RefCell<Vec<(PageLayout, PathBuf)>>,
        opened: RefCell<Vec<PathBuf>>,
    }

    impl ExportBackend for FakeBackend {
        fn capture(&self, doc: &RenderedDocument, scale: f64) -> Result<Capture> {
            assert_eq!(scale, CAPTURE_SCALE);
            if self.fail_capture {
                return Err(InvoiceError::PdfGeneration("capture failed".to_string()));
            }
            self.captured.borrow_mut().push(doc.clone());
            Ok(Capture {
                path: PathBuf::from("capture.png"),
                width: 1190,
                height: 3000,
            })
        }

        fn package(&self, _: &Capture, layout: &PageLayout, output: &Path) -> Result<()> {
            self.packaged.borrow_mut().push((*layout, output.to_path_buf()));
            Ok(())
        }

        fn open(&self, path: &Path) -> Result<()> {
            self.opened.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    fn rendered() -> RenderedDocument {
        let payload = InvoicePayload {
            template_id: Some("3".to_string()),
            invoice_items: vec![vec![Participant {
                name: "Solo".to_string(),
                ..Default::default()
            }]],
            ..Default::default()
        };
        let options = DocumentOptions::default();
        let view = InvoiceView::from_payload("3", "Retainer", &payload, &options);
        render(&InvoiceDocument::new(view, options), &BankPanel::NoneSelected, false)
    }

    #[test]
    fn test_export_without_document_is_noop() {
        let busy = Busy::default();
        let backend = FakeBackend::default();

        let result = export(None, &ExportMode::Print, &backend, &busy).unwrap();

        assert!(result.is_none());
        assert_eq!(busy.started.get(), 0);
        assert_eq!(busy.finished.get(), 0);
    }

    #[test]
    fn test_failed_capture_clears_busy_indicator() {
        let busy = Busy::default();
        let backend = FakeBackend {
            fail_capture: true,
            ..Default::default()
        };
        let doc = rendered();

        let result = export(Some(&doc), &ExportMode::Print, &backend, &busy);

        assert!(result.is_err());
        assert_eq!(busy.started.get(), 1);
        assert_eq!(busy.finished.get(), 1);
        assert!(backend.opened.borrow().is_empty());
    }

    #[test]
    fn test_download_packages_to_requested_path() {
        let busy = Busy::default();
        let backend = FakeBackend::default();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(download_file_name("INV-3"));

        let path = export(
            Some(&rendered()),
            &ExportMode::Download(target.clone()),
            &backend,
            &busy,
        )
        .unwrap();

        assert_eq!(path, Some(target.clone()));
        assert_eq!(busy.finished.get(), 1);
        let packaged = backend.packaged.borrow();
        assert_eq!(packaged[0].1, target);
        assert_eq!(packaged[0].0.pages, 2);
        assert!(backend.opened.borrow().is_empty());
    }

    #[test]
    fn test_print_opens_transient_file() {
        let busy = Busy::default();
        let backend = FakeBackend::default();

        let path = export(Some(&rendered()), &ExportMode::Print, &backend, &busy)
            .unwrap()
            .unwrap();

        assert!(path.ends_with("print-Invoice_INV-3.pdf"));
        assert_eq!(backend.opened.borrow().as_slice(), &[path]);
    }

    #[test]
    fn test_page_layout_keeps_width_and_scales_height() {
        let layout = PageLayout::for_capture(2000, 1000);
        assert_eq!(layout.page_width_mm, 210.0);
        assert_eq!(layout.image_height_mm, 105.0);
        assert_eq!(layout.pages, 1);

        let layout = PageLayout::for_capture(1000, 1414);
        assert_eq!(layout.pages, 1);

        let layout = PageLayout::for_capture(1000, 3000);
        assert_eq!(layout.image_height_mm, 630.0);
        assert_eq!(layout.pages, 3);

        assert_eq!(PageLayout::for_capture(0, 0).pages, 1);
    }
}
