mod client;
mod types;

pub use client::{error_message, ApiClient, BankDirectory, InvoiceSource};
pub use types::{Bank, InvoicePayload, Participant, Project, ProjectSummary, Template};
