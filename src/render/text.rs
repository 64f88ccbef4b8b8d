use std::fmt::Write;
use tabled::{settings::Style, Table, Tabled};

use super::{ExpenseRow, ItemRow, PartyBlock, RenderedDocument};

#[derive(Tabled)]
struct LineRow {
    #[tabled(rename = "#")]
    number: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "RATE MODE")]
    rate_mode: String,
    #[tabled(rename = "DURATION")]
    duration: String,
    #[tabled(rename = "RATE")]
    rate: String,
    #[tabled(rename = "CURRENCY")]
    currency: String,
    #[tabled(rename = "TOTAL")]
    total: String,
}

impl From<&ItemRow> for LineRow {
    fn from(row: &ItemRow) -> Self {
        let mut description = row.name.clone();
        if !row.thru.is_empty() {
            description.push_str(&format!("\nthru {}", row.thru.join(" / ")));
        }
        if !row.description.is_empty() {
            description.push('\n');
            description.push_str(&row.description);
        }

        Self {
            number: format!("{}{}", row.number, if row.expanded { "-" } else { "+" }),
            description,
            rate_mode: row.rate_mode.clone(),
            duration: row.duration.clone(),
            rate: row.rate.clone(),
            currency: row.currency.clone(),
            total: row.total.clone(),
        }
    }
}

impl From<&ExpenseRow> for LineRow {
    fn from(exp: &ExpenseRow) -> Self {
        let marker = if exp.draft { "draft" } else { "+" };
        let label: &str = if exp.label.is_empty() { "(no label)" } else { &exp.label };
        let mut description = format!("  {marker} {label}");
        if !exp.description.is_empty() {
            description.push_str(&format!("\n    {}", exp.description));
        }

        Self {
            number: String::new(),
            description,
            rate_mode: exp.rate_mode.clone(),
            duration: exp.duration.clone(),
            rate: exp.amount.clone(),
            currency: exp.currency.clone(),
            total: exp.total.clone(),
        }
    }
}

fn party_lines(heading: &str, party: &PartyBlock) -> Vec<String> {
    let mut lines = vec![heading.to_string(), party.name.clone()];
    lines.extend(
        [&party.address, &party.email, &party.mobile]
            .into_iter()
            .filter(|s| !s.is_empty())
            .cloned(),
    );
    lines
}

/// Render the document for a terminal
pub fn render_text(doc: &RenderedDocument) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}  ({})", doc.title, doc.invoice_id);
    let _ = writeln!(out, "Theme: {}   View: {}", doc.palette.name, doc.scope);
    if let Some(banner) = &doc.banner {
        let _ = writeln!(out, "** {} **", banner);
    }
    let _ = writeln!(out, "{}", "-".repeat(60));

    let from = party_lines("FROM", &doc.from);
    let to = party_lines("BILLED TO", &doc.to);
    for i in 0..from.len().max(to.len()) {
        let left = from.get(i).map(String::as_str).unwrap_or("");
        let right = to.get(i).map(String::as_str).unwrap_or("");
        let _ = writeln!(out, "{:<32}{}", left, right);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Invoice Date: {}", blank_dash(&doc.invoice_date));
    let _ = writeln!(out, "Due Date:     {}", blank_dash(&doc.due_date));
    let _ = writeln!(out, "Bank:         {}", doc.bank.lines.join("\n              "));
    for option in &doc.bank.options {
        let _ = writeln!(out, "              {}", option);
    }
    let _ = writeln!(out);

    if doc.rows.is_empty() {
        let _ = writeln!(out, "No line items.");
    } else {
        let mut rows: Vec<LineRow> = Vec::new();
        for row in &doc.rows {
            rows.push(LineRow::from(row));
            rows.extend(row.expenses.iter().map(LineRow::from));
        }
        let table = Table::new(rows).with(Style::rounded()).to_string();
        let _ = writeln!(out, "{table}");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Notice: {}", doc.notice);
    let _ = writeln!(out);
    let _ = writeln!(out, "{:>14} {:>16}", "Subtotal:", doc.totals.subtotal);
    let _ = writeln!(out, "{:>14} {:>16}", "Tax %:", doc.totals.tax_percent);
    let _ = writeln!(out, "{:>14} {:>16}", "Tax Amount:", doc.totals.tax_amount);
    let _ = writeln!(out, "{:>14} {:>16}", "Grand Total:", doc.totals.grand_total);

    out
}

fn blank_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
