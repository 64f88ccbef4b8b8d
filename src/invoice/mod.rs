mod dates;
mod document;
mod flatten;
mod item;
mod rate;
mod totals;

pub use dates::{display_to_iso, iso_to_display, parse_date, to_display};
pub use document::{
    ChangeSink, DocumentOptions, ExpenseEdit, InvoiceChanges, InvoiceDocument, InvoiceView,
    ItemEdit, Mode,
};
pub use flatten::{flatten, LineItems};
pub use item::{coerce, coerce_input, ExpenseEntry, LineItem, RateMode};
pub use rate::{base_amount, expense_amount, line_charges, pending_amount, LineCharges};
pub use totals::{compute_totals, initial_tax_percent, TotalsSnapshot, ViewScope};
