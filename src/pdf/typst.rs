use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use super::{Capture, ExportBackend, PageLayout};
use crate::error::{InvoiceError, Result};
use crate::render::RenderedDocument;

/// Single tall page holding the whole document. Data comes from a JSON file
/// whose path replaces the placeholder.
const DOCUMENT_TEMPLATE: &str = r##"#let data = json("DATA_JSON_PATH")
#let theme = data.palette
#let accent = rgb(theme.accent)
#let header = rgb(theme.header)
#let secondary = rgb(theme.secondary)

#set page(width: 210mm, height: auto, margin: 0pt)
#set text(font: "Helvetica", size: 9pt, fill: rgb("#1e293b"))

#let field-label(body) = text(size: 7.5pt, fill: secondary, tracking: 0.8pt)[#upper(body)]

#let party(heading, p) = [
  #field-label(heading) \
  #text(size: 11pt, weight: "bold", fill: header)[#p.name]
  #for entry in (p.address, p.email, p.mobile).filter(l => l != "") [
    \ #entry
  ]
]

#block(width: 100%, inset: (x: 14mm, y: 6mm), fill: gradient.linear(accent.lighten(88%), white), below: 0pt)[
  #text(size: 15pt, weight: "bold", fill: header)[#data.title]
  #h(1fr)
  #text(weight: "bold", fill: accent)[#data.invoice_id]
]

#block(width: 100%, inset: (x: 14mm, y: 6mm), fill: rgb(theme.bg), below: 0pt)[
  #grid(
    columns: (1fr, 1fr),
    gutter: 10mm,
    party("From", data.from),
    party("Billed To", data.to),
  )
  #v(5mm)
  #grid(
    columns: (1fr, 1fr, 1.4fr),
    gutter: 10mm,
    [#field-label("Invoice Date") \ #data.invoice_date],
    [#field-label("Due Date") \ #data.due_date],
    [#field-label("Bank") \ #data.bank.lines.join(linebreak())],
  )
]

#block(width: 100%, inset: (x: 14mm, y: 6mm), below: 0pt)[
  #table(
    columns: (auto, 1fr, auto, auto, auto, auto, auto),
    align: (center, left, center, center, right, center, right),
    stroke: (x, y) => if y == 0 { (bottom: 1pt + header) } else { (bottom: 0.5pt + luma(225)) },
    inset: 6pt,
    fill: (x, y) => if y == 0 { rgb(theme.bg) } else { none },

    [*\#*], [*Description*], [*Rate Mode*], [*Duration*], [*Rate*], [*Currency*], [*Total*],

    ..data.rows.map(row => {
      let name = [
        #text(weight: "bold")[#row.name]
        #if row.thru.len() > 0 [ \ #text(size: 7.5pt, fill: secondary)[thru #row.thru.join(" / ")] ]
        #if row.description != "" [ \ #text(size: 7.5pt, fill: secondary)[#row.description] ]
      ]
      let main = (
        text(weight: "bold", fill: secondary)[#row.number],
        name,
        row.rate_mode,
        row.duration,
        row.rate,
        row.currency,
        text(weight: "bold", fill: accent)[#row.total],
      )
      let extras = row.expenses.map(e => (
        [],
        [
          #h(8pt)#e.label
          #if e.description != "" [ \ #h(8pt)#text(size: 7.5pt, fill: secondary)[#e.description] ]
        ],
        e.rate_mode,
        e.duration,
        e.amount,
        e.currency,
        text(fill: accent)[#e.total],
      ))
      main + extras.flatten()
    }).flatten()
  )
]

#block(width: 100%, inset: (x: 14mm, top: 2mm, bottom: 10mm))[
  #grid(
    columns: (1.3fr, 1fr),
    gutter: 10mm,
    block(width: 100%, fill: rgb(theme.notice), inset: 8pt, radius: 4pt)[
      #text(weight: "bold", fill: header)[Notice] \
      #data.notice
    ],
    table(
      columns: (1fr, auto),
      stroke: none,
      inset: 4pt,
      align: (left, right),
      text(fill: secondary)[Subtotal], [#data.totals.subtotal],
      text(fill: secondary)[Tax %], [#data.totals.tax_percent],
      text(fill: secondary)[Tax Amount], [#data.totals.tax_amount],
      table.hline(stroke: 1pt + header),
      text(weight: "bold", fill: header)[Grand Total],
      text(size: 12pt, weight: "bold", fill: accent)[#data.totals.grand_total],
    ),
  )
]
"##;

/// A4 pages showing successive slices of the captured image
const PAGES_TEMPLATE: &str = r##"#set page(width: PAGE_WIDTHmm, height: PAGE_HEIGHTmm, margin: 0pt)

#for i in range(PAGE_COUNT) {
  if i > 0 { pagebreak() }
  box(width: PAGE_WIDTHmm, height: PAGE_HEIGHTmm, clip: true)[
    #place(top + left, dy: -PAGE_HEIGHTmm * i)[#image("IMAGE_PATH", width: PAGE_WIDTHmm)]
  ]
}
"##;

/// Capture and packaging through the `typst` CLI
#[derive(Debug, Clone)]
pub struct TypstBackend {
    work_dir: PathBuf,
}

impl Default for TypstBackend {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join(format!("invoice-desk-{}", std::process::id())),
        }
    }
}

impl TypstBackend {
    pub fn new() -> Result<Self> {
        if Command::new("typst").arg("--version").output().is_err() {
            return Err(InvoiceError::TypstNotFound);
        }
        Ok(Self::default())
    }

    fn compile(&self, source: &Path, output: &Path, extra: &[&str]) -> Result<()> {
        debug!(source = %source.display(), output = %output.display(), "running typst");
        let result = Command::new("typst")
            .arg("compile")
            .arg("--root")
            .arg(&self.work_dir)
            .args(extra)
            .arg(source)
            .arg(output)
            .output()?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(InvoiceError::PdfGeneration(stderr.to_string()));
        }
        Ok(())
    }
}

impl ExportBackend for TypstBackend {
    fn capture(&self, doc: &RenderedDocument, scale: f64) -> Result<Capture> {
        std::fs::create_dir_all(&self.work_dir)?;

        let json = serde_json::to_string(doc).map_err(|e| InvoiceError::PdfGeneration(e.to_string()))?;
        let json_path = self.work_dir.join("document.json");
        std::fs::write(&json_path, json)?;

        let source = self.work_dir.join("document.typ");
        std::fs::write(&source, DOCUMENT_TEMPLATE.replace("DATA_JSON_PATH", "document.json"))?;

        let png = self.work_dir.join("capture.png");
        let ppi = format!("{}", (72.0 * scale).round());
        let compiled = self.compile(&source, &png, &["--format", "png", "--ppi", &ppi]);

        let _ = std::fs::remove_file(&source);
        let _ = std::fs::remove_file(&json_path);
        compiled?;

        let (width, height) = png_dimensions(&std::fs::read(&png)?)?;
        Ok(Capture {
            path: png,
            width,
            height,
        })
    }

    fn package(&self, capture: &Capture, layout: &PageLayout, output: &Path) -> Result<()> {
        let image = capture
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| InvoiceError::PdfGeneration("capture has no file name".to_string()))?;

        let source = self.work_dir.join("pages.typ");
        let content = PAGES_TEMPLATE
            .replace("PAGE_WIDTH", &layout.page_width_mm.to_string())
            .replace("PAGE_HEIGHT", &layout.page_height_mm.to_string())
            .replace("PAGE_COUNT", &layout.pages.to_string())
            .replace("IMAGE_PATH", image);
        std::fs::write(&source, content)?;

        let compiled = self.compile(&source, output, &[]);

        let _ = std::fs::remove_file(&source);
        let _ = std::fs::remove_file(&capture.path);
        compiled
    }

    fn open(&self, path: &Path) -> Result<()> {
        open_path(path)
    }
}

/// Width and height from a PNG header
pub(crate) fn png_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    if bytes.len() < 24 || bytes[..8] != SIGNATURE || &bytes[12..16] != b"IHDR" {
        return Err(InvoiceError::PdfGeneration(
            "capture is not a PNG image".to_string(),
        ));
    }
    let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    Ok((width, height))
}

/// Open a file with the system default viewer
pub fn open_path(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg(path).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        Command::new("xdg-open").arg(path).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        Command::new("cmd")
            .args(["/C", "start", ""])
            .arg(path)
            .spawn()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_dimensions_reads_header() {
        let mut bytes = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&1190u32.to_be_bytes());
        bytes.extend_from_slice(&2400u32.to_be_bytes());

        assert_eq!(png_dimensions(&bytes).unwrap(), (1190, 2400));
    }

    #[test]
    fn test_png_dimensions_rejects_other_data() {
        assert!(png_dimensions(b"%PDF-1.7").is_err());
        assert!(png_dimensions(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_pages_template_substitution() {
        let content = PAGES_TEMPLATE
            .replace("PAGE_WIDTH", "210")
            .replace("PAGE_HEIGHT", "297")
            .replace("PAGE_COUNT", "3")
            .replace("IMAGE_PATH", "capture.png");

        assert!(content.contains("width: 210mm, height: 297mm"));
        assert!(content.contains("range(3)"));
        assert!(content.contains("dy: -297mm * i"));
        assert!(content.contains(r#"image("capture.png", width: 210mm)"#));
    }
}
