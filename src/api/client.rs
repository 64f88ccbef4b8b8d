use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

use super::types::{Bank, InvoicePayload, Template};
use crate::config::ApiSettings;
use crate::error::{InvoiceError, Result};

/// Source of templates and hierarchical invoice payloads
pub trait InvoiceSource {
    fn templates(&self) -> Result<BTreeMap<String, Template>>;
    fn print_view(&self, template_id: &str) -> Result<InvoicePayload>;
}

/// Source of bank records for the bank panel
pub trait BankDirectory {
    fn bank(&self, bank_id: &str) -> Result<Bank>;
    fn banks(&self) -> Result<Vec<Bank>>;
}

/// Blocking JSON client for the dashboard backend
pub struct ApiClient {
    agent: Agent,
    base_url: String,
    cookie: Option<String>,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            cookie: settings.cookie.clone(),
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        context: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "GET");

        let mut request = self.agent.get(&url);
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        if let Some(cookie) = &self.cookie {
            request = request.header("Cookie", cookie.as_str());
        }

        let api_error = |message: String| InvoiceError::Api {
            context: context.to_string(),
            message,
        };

        let mut response = request.call().map_err(|e| api_error(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| api_error(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(api_error(error_message(status, &body, "An error occurred")));
        }

        serde_json::from_str(&body).map_err(|e| api_error(format!("invalid response: {e}")))
    }
}

impl InvoiceSource for ApiClient {
    fn templates(&self) -> Result<BTreeMap<String, Template>> {
        self.get_json("/templates", &[], "Failed to fetch templates")
    }

    fn print_view(&self, template_id: &str) -> Result<InvoicePayload> {
        self.get_json(
            "/invoice/print-view",
            &[("template_id", template_id), ("hierarchy", "true")],
            "Failed to fetch invoice",
        )
    }
}

impl BankDirectory for ApiClient {
    fn bank(&self, bank_id: &str) -> Result<Bank> {
        self.get_json("/bank", &[("bank_id", bank_id)], "Failed to fetch bank")
    }

    fn banks(&self) -> Result<Vec<Bank>> {
        self.get_json("/banks", &[], "Failed to fetch banks")
    }
}

/// Pull a human-readable message out of an error response body.
///
/// Looks at `detail` (string, list, or object carrying `message`/`error`),
/// then top-level `message` and `error`. Falls back to a status text when
/// the body is not JSON.
pub fn error_message(status: u16, body: &str, default: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return match status {
            404 => "Resource not found",
            409 => "Conflict: Resource already exists",
            500 => "Internal Server Error",
            401 => "Unauthorized",
            403 => "Forbidden",
            _ => default,
        }
        .to_string();
    };

    if let Some(detail) = json.get("detail") {
        if let Some(nested) = detail.get("message").or_else(|| detail.get("error")) {
            if let Some(text) = message_text(nested) {
                return text;
            }
        }
        if let Some(text) = message_text(detail) {
            return text;
        }
    }

    json.get("message")
        .or_else(|| json.get("error"))
        .and_then(message_text)
        .unwrap_or_else(|| default.to_string())
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => format!("• {s}"),
                    other => format!("• {other}"),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    }
}
