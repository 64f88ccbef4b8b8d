use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("Config directory not found at {0}. Run 'invoice-desk init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("{context}: {message}")]
    Api { context: String, message: String },

    #[error("Failed to read invoice payload {path}: {source}")]
    PayloadParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Session file {path} is corrupt: {source}")]
    SessionParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invoice for template '{0}' is not loaded. Run 'invoice-desk load {0}' first.")]
    SessionNotFound(String),

    #[error("Row {row} does not exist (invoice has {count} line item(s))")]
    InvalidRow { row: usize, count: usize },

    #[error("Expense {index} does not exist on row {row} ({count} saved expense(s))")]
    InvalidExpense {
        row: usize,
        index: usize,
        count: usize,
    },

    #[error("Invoice is not in editing mode. Run 'invoice-desk edit <template>' first.")]
    NotEditing,

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Unknown theme '{0}'. Use an index (1-4) or a theme name.")]
    UnknownTheme(String),

    #[error("Typst not found. Install it from https://typst.app/ or run: cargo install typst-cli")]
    TypstNotFound,

    #[error("Failed to generate PDF: {0}")]
    PdfGeneration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InvoiceError>;
