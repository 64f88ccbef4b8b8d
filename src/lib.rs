pub mod api;
pub mod config;
pub mod error;
pub mod invoice;
pub mod pdf;
pub mod render;

pub use config::{Config, SessionStore};
pub use error::{InvoiceError, Result};
pub use invoice::{InvoiceDocument, InvoiceView};
pub use render::{render, render_text, RenderedDocument};
