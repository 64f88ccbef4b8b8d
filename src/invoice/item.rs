use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Billing cadence of a line item or expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum RateMode {
    #[default]
    Unspecified,
    Flat,
    Daily,
    Monthly,
    Hourly,
}

impl RateMode {
    pub const ALL: [RateMode; 4] = [
        RateMode::Flat,
        RateMode::Daily,
        RateMode::Monthly,
        RateMode::Hourly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RateMode::Unspecified => "",
            RateMode::Flat => "Flat",
            RateMode::Daily => "Daily",
            RateMode::Monthly => "Monthly",
            RateMode::Hourly => "Hourly",
        }
    }
}

impl fmt::Display for RateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RateMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown rate mode '{s}' (use Flat, Daily, Monthly or Hourly)"))
    }
}

impl From<Option<String>> for RateMode {
    fn from(value: Option<String>) -> Self {
        value
            .and_then(|s| s.parse().ok())
            .unwrap_or(RateMode::Unspecified)
    }
}

impl From<RateMode> for String {
    fn from(mode: RateMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Clamp a numeric value to a usable non-negative amount.
///
/// NaN, infinities and negatives become zero.
pub fn coerce(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Parse raw user input as an amount, degrading to zero
pub fn coerce_input(raw: &str) -> f64 {
    raw.trim().parse::<f64>().map(coerce).unwrap_or(0.0)
}

/// One billable leaf of a flattened participant hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Option<String>,
    pub name: String,
    pub location: String,
    /// Intermediaries between payer and this leaf, nearest first
    pub thru: Vec<String>,
    pub rate_mode: RateMode,
    pub duration: f64,
    pub rate_amount: f64,
    pub currency: String,
    #[serde(default)]
    pub description: String,
}

impl LineItem {
    pub fn display_name(&self) -> String {
        if self.location.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.location)
        }
    }
}

/// An additional charge attached to a line item.
///
/// `amount` holds the raw input so that an untouched draft ("") can be told
/// apart from an explicit zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseEntry {
    pub label: String,
    pub amount: String,
    pub duration: f64,
    pub currency: String,
    pub description: String,
    pub rate_mode: RateMode,
}

impl ExpenseEntry {
    /// Empty entry for the draft slot of a line item
    pub fn draft_for(item: &LineItem, default_currency: &str) -> Self {
        let currency = if item.currency.is_empty() {
            default_currency.to_string()
        } else {
            item.currency.clone()
        };
        let rate_mode = match item.rate_mode {
            RateMode::Unspecified => RateMode::Flat,
            mode => mode,
        };

        Self {
            label: String::new(),
            amount: String::new(),
            duration: 0.0,
            currency,
            description: String::new(),
            rate_mode,
        }
    }

    /// True while neither a label nor an amount has been entered
    pub fn is_blank(&self) -> bool {
        self.label.trim().is_empty() && self.amount.trim().is_empty()
    }

    pub fn amount_value(&self) -> f64 {
        coerce_input(&self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_mode_parse_is_case_insensitive() {
        assert_eq!("daily".parse::<RateMode>().unwrap(), RateMode::Daily);
        assert_eq!(" HOURLY ".parse::<RateMode>().unwrap(), RateMode::Hourly);
        assert!("weekly".parse::<RateMode>().is_err());
    }

    #[test]
    fn test_rate_mode_unknown_or_null_deserializes_unspecified() {
        let mode: RateMode = serde_json::from_str("null").unwrap();
        assert_eq!(mode, RateMode::Unspecified);
        let mode: RateMode = serde_json::from_str("\"Fortnightly\"").unwrap();
        assert_eq!(mode, RateMode::Unspecified);
        let mode: RateMode = serde_json::from_str("\"Monthly\"").unwrap();
        assert_eq!(mode, RateMode::Monthly);
    }

    #[test]
    fn test_coerce_input_degrades_to_zero() {
        assert_eq!(coerce_input("12.5"), 12.5);
        assert_eq!(coerce_input("-4"), 0.0);
        assert_eq!(coerce_input("abc"), 0.0);
        assert_eq!(coerce_input(""), 0.0);
        assert_eq!(coerce_input("NaN"), 0.0);
        assert_eq!(coerce(f64::INFINITY), 0.0);
    }
}
