use chrono::NaiveDate;

/// How invoice dates are shown on the document, e.g. `5, Mar 2026`
pub const DISPLAY_FORMAT: &str = "%-d, %b %Y";

/// Editing format
pub const ISO_FORMAT: &str = "%Y-%m-%d";

/// Parse a date as delivered by the backend or typed by a user.
///
/// Accepts the display form (with or without the comma), `5 March 2026`
/// and ISO dates.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, ISO_FORMAT) {
        return Some(date);
    }

    let cleaned = text.replace(',', " ");
    let parts: Vec<&str> = cleaned.split_whitespace().collect();
    let normalized = parts.join(" ");
    ["%d %b %Y", "%d %B %Y", "%b %d %Y", "%B %d %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&normalized, fmt).ok())
}

pub fn to_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

/// Display date to the editable ISO form; empty when unparseable
pub fn display_to_iso(display: &str) -> String {
    parse_date(display)
        .map(|d| d.format(ISO_FORMAT).to_string())
        .unwrap_or_default()
}

/// ISO edit date back to display form. `None` when the input is not a date.
pub fn iso_to_display(iso: &str) -> Option<String> {
    NaiveDate::parse_from_str(iso.trim(), ISO_FORMAT)
        .ok()
        .map(to_display)
}
