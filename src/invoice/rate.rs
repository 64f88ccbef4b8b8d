use serde::Serialize;

use super::item::{coerce, ExpenseEntry, LineItem};

/// Breakdown of one line item's charges
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LineCharges {
    pub base: f64,
    pub expenses: f64,
    pub pending: f64,
}

impl LineCharges {
    pub fn total(&self) -> f64 {
        self.base + self.expenses + self.pending
    }
}

/// Rate times duration, or the bare rate when no duration is set
pub fn base_amount(item: &LineItem) -> f64 {
    multiply(coerce(item.rate_amount), item.duration)
}

/// Amount of a confirmed expense, multiplied by its duration when set
pub fn expense_amount(expense: &ExpenseEntry) -> f64 {
    multiply(expense.amount_value(), expense.duration)
}

/// Charge carried by a draft that has not been confirmed yet
pub fn pending_amount(draft: &ExpenseEntry) -> f64 {
    if draft.is_blank() {
        0.0
    } else {
        draft.amount_value()
    }
}

fn multiply(amount: f64, duration: f64) -> f64 {
    let duration = coerce(duration);
    if duration > 0.0 {
        amount * duration
    } else {
        amount
    }
}

/// Compute the charges of one line item.
///
/// `draft` is the item's draft slot; it only contributes when
/// `count_pending_draft` is set.
pub fn line_charges(
    item: &LineItem,
    saved: &[ExpenseEntry],
    draft: &ExpenseEntry,
    count_pending_draft: bool,
) -> LineCharges {
    LineCharges {
        base: base_amount(item),
        expenses: saved.iter().map(expense_amount).sum(),
        pending: if count_pending_draft {
            pending_amount(draft)
        } else {
            0.0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::RateMode;

    fn item(rate: f64, duration: f64) -> LineItem {
        LineItem {
            id: Some("1".to_string()),
            name: "Consultant A".to_string(),
            location: "Pune".to_string(),
            thru: vec![],
            rate_mode: RateMode::Daily,
            duration,
            rate_amount: rate,
            currency: "INR".to_string(),
            description: String::new(),
        }
    }

    fn expense(label: &str, amount: &str, duration: f64) -> ExpenseEntry {
        ExpenseEntry {
            label: label.to_string(),
            amount: amount.to_string(),
            duration,
            currency: "INR".to_string(),
            description: String::new(),
            rate_mode: RateMode::Flat,
        }
    }

    fn blank() -> ExpenseEntry {
        expense("", "", 0.0)
    }

    #[test]
    fn test_zero_duration_charges_flat_rate() {
        let charges = line_charges(&item(30000.0, 0.0), &[], &blank(), true);
        assert_eq!(charges.total(), 30000.0);
    }

    #[test]
    fn test_duration_multiplies_rate_and_adds_expenses() {
        let saved = vec![expense("Travel", "500", 0.0), expense("Lodging", "200", 3.0)];
        let draft = expense("Food", "75", 2.0);

        let charges = line_charges(&item(1000.0, 4.0), &saved, &draft, true);

        assert_eq!(charges.base, 4000.0);
        assert_eq!(charges.expenses, 1100.0);
        // pending drafts are not multiplied by their duration
        assert_eq!(charges.pending, 75.0);
        assert_eq!(charges.total(), 5175.0);
    }

    #[test]
    fn test_draft_with_label_only_counts_as_zero() {
        let draft = expense("Travel", "", 0.0);
        assert_eq!(pending_amount(&draft), 0.0);

        let draft = expense("", "120", 0.0);
        assert_eq!(pending_amount(&draft), 120.0);
    }

    #[test]
    fn test_pending_draft_can_be_excluded() {
        let draft = expense("Food", "75", 0.0);
        let charges = line_charges(&item(100.0, 0.0), &[], &draft, false);
        assert_eq!(charges.total(), 100.0);
    }

    #[test]
    fn test_malformed_numbers_coerce_to_zero() {
        let saved = vec![expense("Travel", "abc", 2.0), expense("Food", "-40", 0.0)];
        let charges = line_charges(&item(-10.0, -3.0), &saved, &expense("x", "oops", 0.0), true);
        assert_eq!(charges.total(), 0.0);

        let charges = line_charges(&item(250.0, f64::NAN), &[], &blank(), true);
        assert_eq!(charges.total(), 250.0);
    }
}
