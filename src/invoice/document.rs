use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::dates::{display_to_iso, iso_to_display};
use super::flatten::flatten;
use super::item::{coerce_input, ExpenseEntry, LineItem, RateMode};
use super::rate::{line_charges, LineCharges};
use super::totals::{compute_totals, initial_tax_percent, TotalsSnapshot, ViewScope};
use crate::api::{InvoicePayload, Participant};
use crate::error::{InvoiceError, Result};

/// The invoice exactly as it was last fetched. Resets return here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceView {
    pub invoice_id: String,
    pub template_id: String,
    pub template_name: String,
    pub from: Participant,
    pub to: Participant,
    pub invoice_date: String,
    pub due_date: String,
    pub items: Vec<LineItem>,
    pub notice: String,
    pub bank_id: Option<String>,
    pub tax_percent: f64,
}

impl InvoiceView {
    pub fn from_payload(
        template_id: &str,
        template_name: &str,
        payload: &InvoicePayload,
        options: &DocumentOptions,
    ) -> Self {
        let template_id = payload
            .template_id
            .clone()
            .unwrap_or_else(|| template_id.to_string());
        let items = flatten(&payload.invoice_items);
        debug!(count = items.len(), "flattened invoice items");

        Self {
            invoice_id: format!("INV-{template_id}"),
            template_id,
            template_name: template_name.to_string(),
            from: payload.client.clone(),
            to: payload.company.clone(),
            invoice_date: payload.invoice_date.clone(),
            due_date: payload.due_date.clone(),
            items,
            notice: payload
                .notice
                .clone()
                .unwrap_or_else(|| options.notice.clone()),
            bank_id: payload.bank_id.clone(),
            tax_percent: initial_tax_percent(
                payload.tax,
                payload.subtotal,
                options.default_tax_percent,
            ),
        }
    }
}

/// Settings that shape computation but are not part of the document
#[derive(Debug, Clone)]
pub struct DocumentOptions {
    pub default_currency: String,
    pub default_tax_percent: f64,
    pub count_pending_draft: bool,
    pub notice: String,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            default_currency: "INR".to_string(),
            default_tax_percent: 10.0,
            count_pending_draft: true,
            notice: "A finance charge of 1.5% will be made on unpaid balances after 30 days."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Viewing,
    Editing,
}

/// Partial update of a line item; numeric fields take raw input
#[derive(Debug, Default, Clone)]
pub struct ItemEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rate_mode: Option<RateMode>,
    pub duration: Option<String>,
    pub rate_amount: Option<String>,
    pub currency: Option<String>,
}

/// Partial update of an expense entry
#[derive(Debug, Default, Clone)]
pub struct ExpenseEdit {
    pub label: Option<String>,
    pub amount: Option<String>,
    pub duration: Option<String>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub rate_mode: Option<RateMode>,
}

impl ExpenseEdit {
    fn apply(&self, entry: &mut ExpenseEntry) {
        if let Some(label) = &self.label {
            entry.label = label.clone();
        }
        if let Some(amount) = &self.amount {
            entry.amount = amount.trim().to_string();
        }
        if let Some(duration) = &self.duration {
            entry.duration = coerce_input(duration);
        }
        if let Some(currency) = &self.currency {
            entry.currency = currency.clone();
        }
        if let Some(description) = &self.description {
            entry.description = description.clone();
        }
        if let Some(mode) = self.rate_mode {
            entry.rate_mode = mode;
        }
    }
}

/// What gets handed to the persistence side effect when editing ends
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceChanges {
    pub invoice_id: String,
    pub invoice_date: String,
    pub due_date: String,
    pub items: Vec<LineItem>,
    pub saved_expenses: Vec<Vec<ExpenseEntry>>,
    pub tax_percent: f64,
    pub bank_id: Option<String>,
    pub totals: TotalsSnapshot,
}

/// Receiver of edits when the document leaves editing mode
pub trait ChangeSink {
    fn save(&mut self, changes: &InvoiceChanges) -> Result<()>;
}

/// Working state of one invoice document.
///
/// Every mutation leaves the document consistent; totals are never stored
/// and are derived on demand by [`InvoiceDocument::totals`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDocument {
    baseline: InvoiceView,
    items: Vec<LineItem>,
    saved: Vec<Vec<ExpenseEntry>>,
    drafts: Vec<ExpenseEntry>,
    tax_percent: f64,
    mode: Mode,
    invoice_date: String,
    due_date: String,
    edit_invoice_date: String,
    edit_due_date: String,
    scope: ViewScope,
    expanded: BTreeSet<usize>,
    bank_id: Option<String>,
    theme: usize,
    #[serde(skip)]
    options: DocumentOptions,
}

impl InvoiceDocument {
    pub fn new(baseline: InvoiceView, options: DocumentOptions) -> Self {
        let mut doc = Self {
            items: Vec::new(),
            saved: Vec::new(),
            drafts: Vec::new(),
            tax_percent: baseline.tax_percent,
            mode: Mode::Viewing,
            invoice_date: String::new(),
            due_date: String::new(),
            edit_invoice_date: String::new(),
            edit_due_date: String::new(),
            scope: ViewScope::Full,
            expanded: BTreeSet::new(),
            bank_id: baseline.bank_id.clone(),
            theme: 0,
            options,
            baseline,
        };
        doc.reset();
        doc
    }

    /// Reattach options after the document was read back from storage.
    ///
    /// Per-item lists that do not line up with the items are rebuilt so that
    /// every row has exactly one draft slot and one saved list.
    pub fn with_options(mut self, options: DocumentOptions) -> Self {
        self.options = options;
        self.repair();
        self
    }

    fn repair(&mut self) {
        let count = self.items.len();
        if self.saved.len() != count || self.drafts.len() != count {
            warn!(
                items = count,
                saved = self.saved.len(),
                drafts = self.drafts.len(),
                "rebuilding expense slots of stored document"
            );
        }

        self.saved.resize_with(count, Vec::new);
        self.drafts.truncate(count);
        let default_currency = &self.options.default_currency;
        let missing: Vec<ExpenseEntry> = self.items[self.drafts.len()..]
            .iter()
            .map(|item| ExpenseEntry::draft_for(item, default_currency))
            .collect();
        self.drafts.extend(missing);

        self.expanded.retain(|row| *row < count);
        if let ViewScope::Individual(row) = self.scope {
            if row >= count {
                self.scope = ViewScope::Full;
            }
        }
    }

    pub fn baseline(&self) -> &InvoiceView {
        &self.baseline
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn saved_expenses(&self, row: usize) -> &[ExpenseEntry] {
        self.saved.get(row).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn draft(&self, row: usize) -> Option<&ExpenseEntry> {
        self.drafts.get(row)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_editing(&self) -> bool {
        self.mode == Mode::Editing
    }

    pub fn tax_percent(&self) -> f64 {
        self.tax_percent
    }

    pub fn invoice_date(&self) -> &str {
        &self.invoice_date
    }

    pub fn due_date(&self) -> &str {
        &self.due_date
    }

    /// ISO dates being edited; only meaningful while editing
    pub fn edit_dates(&self) -> (&str, &str) {
        (&self.edit_invoice_date, &self.edit_due_date)
    }

    pub fn scope(&self) -> ViewScope {
        self.scope
    }

    pub fn is_expanded(&self, row: usize) -> bool {
        self.expanded.contains(&row)
    }

    pub fn bank_id(&self) -> Option<&str> {
        self.bank_id.as_deref()
    }

    pub fn theme(&self) -> usize {
        self.theme
    }

    /// Indices of the line items in the current view scope
    pub fn visible_rows(&self) -> Vec<usize> {
        (0..self.items.len())
            .filter(|i| self.scope.includes(*i))
            .collect()
    }

    pub fn line_charges(&self, row: usize) -> LineCharges {
        match (self.items.get(row), self.drafts.get(row)) {
            (Some(item), Some(draft)) => line_charges(
                item,
                self.saved_expenses(row),
                draft,
                self.options.count_pending_draft,
            ),
            _ => LineCharges::default(),
        }
    }

    pub fn line_totals(&self) -> Vec<f64> {
        (0..self.items.len())
            .map(|row| self.line_charges(row).total())
            .collect()
    }

    pub fn totals(&self) -> TotalsSnapshot {
        compute_totals(&self.line_totals(), self.scope, self.tax_percent)
    }

    pub fn changes(&self) -> InvoiceChanges {
        InvoiceChanges {
            invoice_id: self.baseline.invoice_id.clone(),
            invoice_date: self.invoice_date.clone(),
            due_date: self.due_date.clone(),
            items: self.items.clone(),
            saved_expenses: self.saved.clone(),
            tax_percent: self.tax_percent,
            bank_id: self.bank_id.clone(),
            totals: self.totals(),
        }
    }

    /// Switch between viewing and editing.
    ///
    /// Entering editing converts the display dates to ISO; leaving converts
    /// them back and hands the changes to `sink`.
    pub fn toggle_editing(&mut self, sink: &mut dyn ChangeSink) -> Result<Mode> {
        match self.mode {
            Mode::Viewing => {
                self.edit_invoice_date = display_to_iso(&self.invoice_date);
                self.edit_due_date = display_to_iso(&self.due_date);
                self.mode = Mode::Editing;
            }
            Mode::Editing => {
                let invoice_date = leave_edit_date(&self.edit_invoice_date, &self.invoice_date);
                let due_date = leave_edit_date(&self.edit_due_date, &self.due_date);
                let changes = InvoiceChanges {
                    invoice_date: invoice_date.clone(),
                    due_date: due_date.clone(),
                    ..self.changes()
                };
                // still editing if the save fails
                sink.save(&changes)?;

                self.invoice_date = invoice_date;
                self.due_date = due_date;
                self.mode = Mode::Viewing;
                info!(invoice = %self.baseline.invoice_id, "saved invoice changes");
            }
        }
        Ok(self.mode)
    }

    /// Discard every local edit and return to the last fetched state
    pub fn reset(&mut self) {
        let baseline = &self.baseline;
        self.items = baseline.items.clone();
        self.saved = vec![Vec::new(); self.items.len()];
        self.drafts = self
            .items
            .iter()
            .map(|item| ExpenseEntry::draft_for(item, &self.options.default_currency))
            .collect();
        self.tax_percent = baseline.tax_percent;
        self.invoice_date = baseline.invoice_date.clone();
        self.due_date = baseline.due_date.clone();
        self.edit_invoice_date = display_to_iso(&self.invoice_date);
        self.edit_due_date = display_to_iso(&self.due_date);
        self.expanded.clear();
        if let ViewScope::Individual(row) = self.scope {
            if row >= self.items.len() {
                self.scope = ViewScope::Full;
            }
        }
    }

    pub fn set_scope(&mut self, scope: ViewScope) -> Result<()> {
        if let ViewScope::Individual(row) = scope {
            self.check_row(row)?;
        }
        self.scope = scope;
        Ok(())
    }

    /// Flip the expense detail visibility of a row, returning the new state
    pub fn toggle_expand(&mut self, row: usize) -> Result<bool> {
        self.check_row(row)?;
        if self.expanded.remove(&row) {
            Ok(false)
        } else {
            self.expanded.insert(row);
            Ok(true)
        }
    }

    pub fn set_theme(&mut self, theme: usize) {
        self.theme = theme;
    }

    pub fn edit_item(&mut self, row: usize, edit: &ItemEdit) -> Result<()> {
        self.require_editing()?;
        self.check_row(row)?;
        let item = &mut self.items[row];

        if let Some(name) = &edit.name {
            item.name = name.clone();
        }
        if let Some(description) = &edit.description {
            item.description = description.clone();
        }
        if let Some(mode) = edit.rate_mode {
            item.rate_mode = mode;
        }
        if let Some(duration) = &edit.duration {
            item.duration = coerce_input(duration);
        }
        if let Some(rate) = &edit.rate_amount {
            item.rate_amount = coerce_input(rate);
        }
        if let Some(currency) = &edit.currency {
            item.currency = currency.clone();
        }
        Ok(())
    }

    /// Set the ISO edit dates; an empty string clears the date
    pub fn set_dates(&mut self, invoice_date: Option<&str>, due_date: Option<&str>) -> Result<()> {
        self.require_editing()?;
        let invoice_date = invoice_date.map(validate_iso).transpose()?;
        let due_date = due_date.map(validate_iso).transpose()?;

        if let Some(date) = invoice_date {
            self.edit_invoice_date = date;
        }
        if let Some(date) = due_date {
            self.edit_due_date = date;
        }
        Ok(())
    }

    pub fn set_tax_percent(&mut self, raw: &str) -> Result<()> {
        self.require_editing()?;
        self.tax_percent = coerce_input(raw);
        Ok(())
    }

    pub fn edit_draft(&mut self, row: usize, edit: &ExpenseEdit) -> Result<()> {
        self.require_editing()?;
        self.check_row(row)?;
        edit.apply(&mut self.drafts[row]);
        Ok(())
    }

    /// Promote the draft of `row` to the saved list and start a fresh draft.
    ///
    /// A blank draft is left alone and `false` is returned.
    pub fn confirm_draft(&mut self, row: usize) -> Result<bool> {
        self.require_editing()?;
        self.check_row(row)?;
        if self.drafts[row].is_blank() {
            return Ok(false);
        }

        let fresh = ExpenseEntry {
            rate_mode: RateMode::Flat,
            ..ExpenseEntry::draft_for(&self.items[row], &self.options.default_currency)
        };
        let confirmed = std::mem::replace(&mut self.drafts[row], fresh);
        self.saved[row].push(confirmed);
        Ok(true)
    }

    pub fn edit_expense(&mut self, row: usize, index: usize, edit: &ExpenseEdit) -> Result<()> {
        self.require_editing()?;
        self.check_expense(row, index)?;
        edit.apply(&mut self.saved[row][index]);
        Ok(())
    }

    pub fn remove_expense(&mut self, row: usize, index: usize) -> Result<ExpenseEntry> {
        self.require_editing()?;
        self.check_expense(row, index)?;
        Ok(self.saved[row].remove(index))
    }

    /// Bind a bank record by id, or unbind with `None`
    pub fn select_bank(&mut self, bank_id: Option<String>) -> Result<()> {
        self.require_editing()?;
        self.bank_id = bank_id.filter(|id| !id.is_empty());
        Ok(())
    }

    fn require_editing(&self) -> Result<()> {
        if self.is_editing() {
            Ok(())
        } else {
            Err(InvoiceError::NotEditing)
        }
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row < self.items.len() {
            Ok(())
        } else {
            Err(InvoiceError::InvalidRow {
                row: row + 1,
                count: self.items.len(),
            })
        }
    }

    fn check_expense(&self, row: usize, index: usize) -> Result<()> {
        self.check_row(row)?;
        let count = self.saved[row].len();
        if index < count {
            Ok(())
        } else {
            Err(InvoiceError::InvalidExpense {
                row: row + 1,
                index: index + 1,
                count,
            })
        }
    }
}

fn validate_iso(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() || iso_to_display(raw).is_some() {
        Ok(raw.to_string())
    } else {
        Err(InvoiceError::InvalidDate(raw.to_string()))
    }
}

fn leave_edit_date(edited: &str, previous: &str) -> String {
    if edited.is_empty() {
        return String::new();
    }
    match iso_to_display(edited) {
        Some(display) => display,
        None => {
            warn!(edited, "keeping previous date, edited value is not a date");
            previous.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Project;

    #[derive(Default)]
    struct RecordingSink {
        saved: Vec<InvoiceChanges>,
    }

    impl ChangeSink for RecordingSink {
        fn save(&mut self, changes: &InvoiceChanges) -> Result<()> {
            self.saved.push(changes.clone());
            Ok(())
        }
    }

    fn leaf(id: &str, name: &str, rate: f64, mode: RateMode) -> Participant {
        Participant {
            id: Some(id.to_string()),
            name: name.to_string(),
            address: "Pune".to_string(),
            project: Some(Project {
                rate_mode: mode,
                rate_amount: rate,
                currency: "INR".to_string(),
            }),
            ..Default::default()
        }
    }

    fn payload() -> InvoicePayload {
        let vendor = Participant {
            id: Some("9".to_string()),
            name: "VendorB".to_string(),
            address: "Mumbai".to_string(),
            given_to: vec![
                leaf("1", "ConsultantA", 30000.0, RateMode::Daily),
                leaf("2", "DeveloperE", 1200.0, RateMode::Hourly),
            ],
            ..Default::default()
        };
        InvoicePayload {
            template_id: Some("7".to_string()),
            invoice_date: "5, Mar 2026".to_string(),
            due_date: "4, Apr 2026".to_string(),
            invoice_items: vec![vec![vendor]],
            ..Default::default()
        }
    }

    fn document() -> InvoiceDocument {
        let options = DocumentOptions::default();
        let view = InvoiceView::from_payload("7", "Retainer", &payload(), &options);
        InvoiceDocument::new(view, options)
    }

    fn editing() -> (InvoiceDocument, RecordingSink) {
        let mut doc = document();
        let mut sink = RecordingSink::default();
        doc.toggle_editing(&mut sink).unwrap();
        (doc, sink)
    }

    fn amount(value: &str) -> ExpenseEdit {
        ExpenseEdit {
            label: Some("Travel".to_string()),
            amount: Some(value.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_document_from_payload() {
        let doc = document();

        assert_eq!(doc.baseline().invoice_id, "INV-7");
        assert_eq!(doc.items().len(), 2);
        assert_eq!(doc.tax_percent(), 10.0);
        assert_eq!(doc.mode(), Mode::Viewing);
        assert_eq!(doc.draft(0).unwrap().currency, "INR");
        assert_eq!(doc.totals().subtotal, 31200.0);
    }

    #[test]
    fn test_edits_require_editing_mode() {
        let mut doc = document();
        let err = doc.set_tax_percent("5").unwrap_err();
        assert!(matches!(err, InvoiceError::NotEditing));
        assert!(doc.edit_draft(0, &amount("10")).is_err());
    }

    #[test]
    fn test_editing_round_trip_converts_dates_and_saves() {
        let (mut doc, mut sink) = editing();
        assert_eq!(doc.edit_dates(), ("2026-03-05", "2026-04-04"));

        doc.set_dates(Some("2026-03-10"), None).unwrap();
        doc.toggle_editing(&mut sink).unwrap();

        assert_eq!(doc.mode(), Mode::Viewing);
        assert_eq!(doc.invoice_date(), "10, Mar 2026");
        assert_eq!(doc.due_date(), "4, Apr 2026");
        assert_eq!(sink.saved.len(), 1);
        assert_eq!(sink.saved[0].invoice_date, "10, Mar 2026");
    }

    #[test]
    fn test_invalid_edit_date_is_rejected() {
        let (mut doc, _) = editing();
        assert!(matches!(
            doc.set_dates(Some("03/10/2026"), None),
            Err(InvoiceError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_duration_multiplies_rate() {
        let (mut doc, _) = editing();
        let edit = ItemEdit {
            duration: Some("3".to_string()),
            ..Default::default()
        };
        doc.edit_item(0, &edit).unwrap();

        assert_eq!(doc.line_charges(0).total(), 90000.0);
    }

    #[test]
    fn test_confirming_draft_keeps_line_total() {
        let (mut doc, _) = editing();
        doc.edit_draft(0, &amount("500")).unwrap();
        let before = doc.line_charges(0).total();
        assert_eq!(before, 30500.0);

        assert!(doc.confirm_draft(0).unwrap());

        assert_eq!(doc.line_charges(0).total(), before);
        assert_eq!(doc.saved_expenses(0).len(), 1);
        assert_eq!(doc.saved_expenses(0)[0].rate_mode, RateMode::Daily);
        let draft = doc.draft(0).unwrap();
        assert!(draft.is_blank());
        assert_eq!(draft.duration, 0.0);
        assert_eq!(draft.rate_mode, RateMode::Flat);
        assert_eq!(draft.currency, "INR");
    }

    #[test]
    fn test_blank_draft_is_not_confirmed() {
        let (mut doc, _) = editing();
        assert!(!doc.confirm_draft(1).unwrap());
        assert!(doc.saved_expenses(1).is_empty());
    }

    #[test]
    fn test_individual_scope_totals_selected_row_only() {
        let mut doc = document();
        doc.set_scope(ViewScope::Individual(1)).unwrap();

        let totals = doc.totals();
        assert_eq!(totals.subtotal, doc.line_charges(1).total());
        assert_eq!(totals.subtotal, 1200.0);
        assert_eq!(doc.visible_rows(), vec![1]);

        assert!(doc.set_scope(ViewScope::Individual(2)).is_err());
    }

    #[test]
    fn test_reset_restores_fetched_state() {
        let (mut doc, _) = editing();
        let fresh = document();

        doc.edit_item(
            0,
            &ItemEdit {
                rate_amount: Some("1".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        doc.edit_draft(0, &amount("50")).unwrap();
        doc.confirm_draft(0).unwrap();
        doc.edit_draft(1, &amount("75")).unwrap();
        doc.set_tax_percent("18").unwrap();
        doc.toggle_expand(0).unwrap();

        doc.reset();

        assert_eq!(doc.items(), fresh.items());
        assert!(doc.saved_expenses(0).is_empty());
        assert_eq!(doc.draft(1), fresh.draft(1));
        assert_eq!(doc.tax_percent(), 10.0);
        assert!(!doc.is_expanded(0));
        assert_eq!(doc.totals(), fresh.totals());
    }

    #[test]
    fn test_expand_is_presentation_only() {
        let mut doc = document();
        let before = doc.totals();
        assert!(doc.toggle_expand(1).unwrap());
        assert_eq!(doc.totals(), before);
        assert!(!doc.toggle_expand(1).unwrap());
    }

    #[test]
    fn test_remove_and_edit_saved_expense() {
        let (mut doc, _) = editing();
        doc.edit_draft(0, &amount("100")).unwrap();
        doc.confirm_draft(0).unwrap();

        let edit = ExpenseEdit {
            duration: Some("2".to_string()),
            ..Default::default()
        };
        doc.edit_expense(0, 0, &edit).unwrap();
        assert_eq!(doc.line_charges(0).expenses, 200.0);

        let removed = doc.remove_expense(0, 0).unwrap();
        assert_eq!(removed.amount, "100");
        assert!(matches!(
            doc.remove_expense(0, 0),
            Err(InvoiceError::InvalidExpense { .. })
        ));
    }

    #[test]
    fn test_session_round_trip_keeps_state() {
        let (mut doc, _) = editing();
        doc.edit_draft(0, &amount("42")).unwrap();

        let json = serde_json::to_string(&doc).unwrap();
        let restored: InvoiceDocument = serde_json::from_str(&json).unwrap();
        let restored = restored.with_options(DocumentOptions::default());

        assert_eq!(restored.totals(), doc.totals());
        assert!(restored.is_editing());
    }

    #[test]
    fn test_stored_document_with_missing_slots_is_rebuilt() {
        let (mut doc, _) = editing();
        doc.toggle_expand(1).unwrap();
        doc.set_scope(ViewScope::Individual(1)).unwrap();

        let mut json: serde_json::Value = serde_json::to_value(&doc).unwrap();
        json["drafts"] = serde_json::json!([]);
        json["saved"] = serde_json::json!([[]]);
        let restored: InvoiceDocument = serde_json::from_value(json).unwrap();
        let mut restored = restored.with_options(DocumentOptions::default());

        assert_eq!(restored.draft(1).unwrap().rate_mode, RateMode::Hourly);
        restored.edit_draft(1, &amount("20")).unwrap();
        assert!(restored.confirm_draft(1).unwrap());
        assert_eq!(restored.saved_expenses(1).len(), 1);
        assert_eq!(restored.line_charges(1).total(), 1220.0);
        assert!(restored.is_expanded(1));
        assert_eq!(restored.scope(), ViewScope::Individual(1));
    }

    #[test]
    fn test_stored_document_drops_slots_past_last_item() {
        let doc = document();
        let mut json: serde_json::Value = serde_json::to_value(&doc).unwrap();
        json["items"] = serde_json::json!([json["items"][0].clone()]);
        json["expanded"] = serde_json::json!([1]);
        json["scope"] = serde_json::json!({"scope": "individual", "row": 1});
        let restored: InvoiceDocument = serde_json::from_value(json).unwrap();
        let restored = restored.with_options(DocumentOptions::default());

        assert_eq!(restored.items().len(), 1);
        assert!(restored.draft(1).is_none());
        assert!(restored.saved_expenses(1).is_empty());
        assert!(!restored.is_expanded(1));
        assert_eq!(restored.scope(), ViewScope::Full);
        assert_eq!(restored.totals().subtotal, 30000.0);
    }

    struct FailingSink;

    impl ChangeSink for FailingSink {
        fn save(&mut self, _: &InvoiceChanges) -> Result<()> {
            Err(InvoiceError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    #[test]
    fn test_failed_save_stays_in_editing() {
        let (mut doc, mut sink) = editing();
        doc.set_dates(Some("2026-03-10"), None).unwrap();

        assert!(doc.toggle_editing(&mut FailingSink).is_err());
        assert!(doc.is_editing());
        assert_eq!(doc.invoice_date(), "5, Mar 2026");
        assert_eq!(doc.edit_dates().0, "2026-03-10");

        assert_eq!(doc.toggle_editing(&mut sink).unwrap(), Mode::Viewing);
        assert_eq!(doc.invoice_date(), "10, Mar 2026");
        assert_eq!(sink.saved[0].invoice_date, "10, Mar 2026");
    }
}
