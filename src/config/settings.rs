use serde::{Deserialize, Serialize};

use crate::invoice::DocumentOptions;

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub invoice: InvoiceSettings,
    #[serde(default)]
    pub appearance: AppearanceSettings,
    #[serde(default)]
    pub pdf: PdfSettings,
}

impl Config {
    pub fn document_options(&self) -> DocumentOptions {
        DocumentOptions {
            default_currency: self.invoice.default_currency.clone(),
            default_tax_percent: self.invoice.default_tax_percent,
            count_pending_draft: self.invoice.count_pending_draft,
            notice: self.invoice.notice.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as the `Cookie` header so the backend sees a logged-in session
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cookie: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout() -> u64 {
    3
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct InvoiceSettings {
    pub default_currency: String,
    pub default_tax_percent: f64,
    /// Count an unconfirmed expense draft toward the line total
    pub count_pending_draft: bool,
    pub notice: String,
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        let defaults = DocumentOptions::default();
        Self {
            default_currency: defaults.default_currency,
            default_tax_percent: defaults.default_tax_percent,
            count_pending_draft: defaults.count_pending_draft,
            notice: defaults.notice,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AppearanceSettings {
    /// Palette for newly loaded invoices, by name or 1-based index
    pub theme: String,
    pub dark: bool,
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            theme: "Professional Blue".to_string(),
            dark: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PdfSettings {
    pub output_dir: String,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
        }
    }
}
