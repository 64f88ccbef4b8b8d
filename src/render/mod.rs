//! Presentation model of an invoice document.
//!
//! [`RenderedDocument`] is built from an [`InvoiceDocument`] and is what both
//! the terminal view and the PDF export draw. Parts that only make sense
//! while interacting (draft expense rows, the bank picker, the editing
//! banner) are flagged so that exports can drop them.

mod format;
mod text;
pub mod theme;

pub use format::{format_amount, format_number};
pub use text::render_text;
pub use theme::{palette, Palette, THEMES};

use serde::Serialize;
use tracing::warn;

use crate::api::{Bank, BankDirectory, Participant};
use crate::invoice::{expense_amount, ExpenseEntry, InvoiceDocument, Mode, ViewScope};

/// What the bank panel shows
#[derive(Debug, Clone, PartialEq)]
pub enum BankPanel {
    NoneSelected,
    Selected(Bank),
    /// Editing: every available bank plus the bound id
    Choices {
        banks: Vec<Bank>,
        selected: Option<String>,
    },
}

/// Fetch what the bank panel needs.
///
/// While editing the full list is fetched; otherwise only the bound bank.
/// Fetch failures degrade to an empty list or "no bank selected".
pub fn resolve_bank_panel(doc: &InvoiceDocument, directory: &dyn BankDirectory) -> BankPanel {
    if doc.is_editing() {
        let banks = directory.banks().unwrap_or_else(|e| {
            warn!(error = %e, "could not fetch available banks");
            Vec::new()
        });
        return BankPanel::Choices {
            banks,
            selected: doc.bank_id().map(str::to_string),
        };
    }

    match doc.bank_id() {
        None => BankPanel::NoneSelected,
        Some(id) => match directory.bank(id) {
            Ok(bank) => BankPanel::Selected(bank),
            Err(e) => {
                warn!(bank_id = id, error = %e, "could not fetch bank");
                BankPanel::NoneSelected
            }
        },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PartyBlock {
    pub name: String,
    pub address: String,
    pub email: String,
    pub mobile: String,
}

impl From<&Participant> for PartyBlock {
    fn from(p: &Participant) -> Self {
        Self {
            name: p.name.clone(),
            address: p.address.clone(),
            email: p.email.clone().unwrap_or_default(),
            mobile: p.mobile.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BankBlock {
    pub lines: Vec<String>,
    /// Picker entries, only shown while editing
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseRow {
    pub label: String,
    pub description: String,
    pub rate_mode: String,
    pub duration: String,
    pub amount: String,
    pub currency: String,
    pub total: String,
    pub draft: bool,
    pub export_ignore: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemRow {
    pub number: String,
    pub name: String,
    pub thru: Vec<String>,
    pub description: String,
    pub rate_mode: String,
    pub duration: String,
    pub rate: String,
    pub currency: String,
    pub total: String,
    pub expanded: bool,
    pub expenses: Vec<ExpenseRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalsBlock {
    pub subtotal: String,
    pub tax_percent: String,
    pub tax_amount: String,
    pub grand_total: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedDocument {
    pub invoice_id: String,
    pub title: String,
    pub palette: Palette,
    pub banner: Option<String>,
    pub scope: String,
    pub from: PartyBlock,
    pub to: PartyBlock,
    pub invoice_date: String,
    pub due_date: String,
    pub bank: BankBlock,
    pub rows: Vec<ItemRow>,
    pub notice: String,
    pub totals: TotalsBlock,
}

impl RenderedDocument {
    /// Copy without the parts marked as interactive-only
    pub fn for_export(&self) -> RenderedDocument {
        let mut doc = self.clone();
        doc.banner = None;
        doc.bank.options.clear();
        for row in &mut doc.rows {
            row.expenses.retain(|e| !e.export_ignore);
        }
        doc
    }
}

/// Lay out the current state of `doc`
pub fn render(doc: &InvoiceDocument, bank: &BankPanel, dark: bool) -> RenderedDocument {
    let view = doc.baseline();
    let editing = doc.mode() == Mode::Editing;
    let totals = doc.totals();

    let (invoice_date, due_date) = if editing {
        let (inv, due) = doc.edit_dates();
        (inv.to_string(), due.to_string())
    } else {
        (doc.invoice_date().to_string(), doc.due_date().to_string())
    };

    let rows = doc
        .visible_rows()
        .into_iter()
        .map(|row| item_row(doc, row, editing))
        .collect();

    let scope = match doc.scope() {
        ViewScope::Full => "Full Invoice".to_string(),
        ViewScope::Individual(row) => format!(
            "Individual: {}",
            doc.items()
                .get(row)
                .map(|i| i.name.clone())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("Row {}", row + 1))
        ),
    };

    RenderedDocument {
        invoice_id: view.invoice_id.clone(),
        title: if view.template_name.is_empty() {
            "Invoice".to_string()
        } else {
            view.template_name.clone()
        },
        palette: palette(doc.theme(), dark),
        banner: editing.then(|| "EDITING".to_string()),
        scope,
        from: PartyBlock::from(&view.from),
        to: PartyBlock::from(&view.to),
        invoice_date,
        due_date,
        bank: bank_block(bank),
        rows,
        notice: view.notice.clone(),
        totals: TotalsBlock {
            subtotal: format_amount(totals.subtotal),
            tax_percent: format_number(totals.tax_percent),
            tax_amount: format_amount(totals.tax_amount),
            grand_total: format_amount(totals.grand_total),
        },
    }
}

fn item_row(doc: &InvoiceDocument, row: usize, editing: bool) -> ItemRow {
    let item = &doc.items()[row];
    let expanded = doc.is_expanded(row);

    let mut expenses = Vec::new();
    if expanded {
        expenses.extend(doc.saved_expenses(row).iter().map(saved_row));
        if editing {
            if let Some(draft) = doc.draft(row) {
                expenses.push(draft_row(draft));
            }
        }
    }

    ItemRow {
        number: format!("{:02}", row + 1),
        name: item.display_name(),
        thru: item.thru.clone(),
        description: item.description.clone(),
        rate_mode: item.rate_mode.to_string(),
        duration: duration_text(item.duration),
        rate: format_amount(item.rate_amount),
        currency: item.currency.clone(),
        total: format_amount(doc.line_charges(row).total()),
        expanded,
        expenses,
    }
}

fn duration_text(duration: f64) -> String {
    if duration > 0.0 {
        format_number(duration)
    } else {
        "-".to_string()
    }
}

fn saved_row(expense: &ExpenseEntry) -> ExpenseRow {
    ExpenseRow {
        label: if expense.label.is_empty() {
            "Expense".to_string()
        } else {
            expense.label.clone()
        },
        description: expense.description.clone(),
        rate_mode: expense.rate_mode.to_string(),
        duration: format_number(expense.duration),
        amount: format_number(expense.amount_value()),
        currency: expense.currency.clone(),
        total: format_amount(expense_amount(expense)),
        draft: false,
        export_ignore: false,
    }
}

fn draft_row(draft: &ExpenseEntry) -> ExpenseRow {
    ExpenseRow {
        label: draft.label.clone(),
        description: draft.description.clone(),
        rate_mode: draft.rate_mode.to_string(),
        duration: format_number(draft.duration),
        amount: draft.amount.clone(),
        currency: draft.currency.clone(),
        total: String::new(),
        draft: true,
        export_ignore: true,
    }
}

fn bank_line(bank: &Bank) -> String {
    format!("{}, {}", bank.name, bank.country)
}

fn bank_block(panel: &BankPanel) -> BankBlock {
    match panel {
        BankPanel::NoneSelected => BankBlock {
            lines: vec!["No Bank Selected".to_string()],
            options: Vec::new(),
        },
        BankPanel::Selected(bank) => BankBlock {
            lines: std::iter::once(bank_line(bank))
                .chain(
                    bank.details()
                        .into_iter()
                        .map(|(label, value)| format!("{label}: {value}")),
                )
                .collect(),
            options: Vec::new(),
        },
        BankPanel::Choices { banks, selected } => {
            let chosen = selected
                .as_deref()
                .and_then(|id| banks.iter().find(|b| b.key() == Some(id)));
            let lines = match (chosen, selected) {
                (Some(bank), _) => vec![bank_line(bank)],
                (None, Some(id)) => vec![format!("Bank {id}")],
                (None, None) => vec!["No Bank Selected".to_string()],
            };

            let mut options = vec![format!(
                "[{}] none",
                if selected.is_none() { "x" } else { " " }
            )];
            if banks.is_empty() {
                options.push("No banks available".to_string());
            }
            options.extend(banks.iter().map(|b| {
                let key = b.key().unwrap_or("?");
                let mark = if Some(key) == selected.as_deref() { "x" } else { " " };
                format!("[{mark}] {key}: {} - {}", b.name, b.country)
            }));

            BankBlock { lines, options }
        }
    }
}
