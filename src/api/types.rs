use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::invoice::RateMode;

/// Commercial terms under which a participant is billed
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Project {
    #[serde(default)]
    pub rate_mode: RateMode,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rate_amount: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub currency: String,
}

/// A client, company, vendor, consultant or developer record.
///
/// `given_to` lists the participants this one passes work through; a
/// participant with an empty `given_to` is a billable leaf.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Participant {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub address: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default, rename = "type1")]
    pub role: Option<String>,
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(default, deserialize_with = "null_default")]
    pub given_to: Vec<Participant>,
}

impl Participant {
    /// `"name, address"` as shown on a thru chain
    pub fn describe(&self) -> String {
        format!("{}, {}", self.name, self.address)
    }
}

/// Raw payload of `GET /invoice/print-view`
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct InvoicePayload {
    #[serde(default, deserialize_with = "null_default")]
    pub client: Participant,
    #[serde(default, deserialize_with = "null_default")]
    pub company: Participant,
    #[serde(default, deserialize_with = "lenient_id")]
    pub template_id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub invoice_date: String,
    #[serde(default, deserialize_with = "null_default")]
    pub due_date: String,
    /// Root-first participant chains, one per billing relationship
    #[serde(default, deserialize_with = "null_default")]
    pub invoice_items: Vec<Vec<Participant>>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub bank_id: Option<String>,
    #[serde(default)]
    pub notice: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub subtotal: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub tax: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProjectSummary {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default)]
    pub rate_mode: RateMode,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rate_amount: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub currency: String,
}

/// Saved invoice configuration from `GET /templates`
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Template {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_ids")]
    pub project_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub bank_id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub projects: Vec<ProjectSummary>,
}

impl Template {
    /// Case-insensitive match on name or description
    pub fn matches(&self, search: &str) -> bool {
        let needle = search.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

/// Settlement details. Backends disagree on the id field name, so all three
/// spellings are accepted and [`Bank::key`] picks the first present.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Bank {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub bank_id: Option<String>,
    #[serde(
        default,
        rename = "_id",
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub object_id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub country: String,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub ifsc: Option<String>,
    #[serde(default)]
    pub swift: Option<String>,
    #[serde(default)]
    pub iban: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

impl Bank {
    pub fn key(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.bank_id.as_deref())
            .or(self.object_id.as_deref())
    }

    /// Labelled settlement lines that are present on this record
    pub fn details(&self) -> Vec<(&'static str, &str)> {
        [
            ("Account Name", &self.account_name),
            ("Account No.", &self.account_number),
            ("IFSC", &self.ifsc),
            ("SWIFT", &self.swift),
            ("IBAN", &self.iban),
            ("Branch", &self.branch),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_deref().map(|v| (label, v)))
        .collect()
    }
}

fn null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn id_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(id_from_value))
}

fn lenient_ids<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values.into_iter().filter_map(id_from_value).collect())
}

fn number_from_value(value: Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_number(deserializer)?.unwrap_or(0.0))
}

fn lenient_optional_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(number_from_value))
}
