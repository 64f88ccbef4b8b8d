use serde::{Deserialize, Serialize};

use super::item::coerce;

/// Which line items are visible and counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scope", content = "row", rename_all = "lowercase")]
pub enum ViewScope {
    #[default]
    Full,
    /// A single line item, by zero-based index
    Individual(usize),
}

impl ViewScope {
    pub fn includes(&self, index: usize) -> bool {
        match self {
            ViewScope::Full => true,
            ViewScope::Individual(selected) => *selected == index,
        }
    }
}

/// Derived totals for the active view scope
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TotalsSnapshot {
    pub subtotal: f64,
    pub tax_percent: f64,
    pub tax_amount: f64,
    pub grand_total: f64,
}

/// Sum the in-scope line totals and apply tax.
///
/// `line_totals` is indexed like the document's line items; an individual
/// scope pointing past the end contributes nothing.
pub fn compute_totals(line_totals: &[f64], scope: ViewScope, tax_percent: f64) -> TotalsSnapshot {
    let subtotal: f64 = line_totals
        .iter()
        .enumerate()
        .filter(|(i, _)| scope.includes(*i))
        .map(|(_, total)| *total)
        .sum();

    let tax_percent = coerce(tax_percent);
    let tax_amount = subtotal * tax_percent / 100.0;

    TotalsSnapshot {
        subtotal,
        tax_percent,
        tax_amount,
        grand_total: subtotal + tax_amount,
    }
}

/// Tax percent implied by previously computed totals, or `fallback` when
/// they are missing or the ratio is undefined.
pub fn initial_tax_percent(existing_tax: Option<f64>, existing_subtotal: Option<f64>, fallback: f64) -> f64 {
    match (existing_tax, existing_subtotal) {
        (Some(tax), Some(subtotal)) => {
            let percent = tax / subtotal * 100.0;
            if percent.is_finite() && percent != 0.0 {
                percent
            } else {
                fallback
            }
        }
        _ => fallback,
    }
}
