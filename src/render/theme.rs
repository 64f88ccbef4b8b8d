use serde::Serialize;

use crate::error::{InvoiceError, Result};

/// Document colour scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub name: &'static str,
    pub accent: &'static str,
    pub header: &'static str,
    pub bg: &'static str,
    pub notice: &'static str,
    pub secondary: &'static str,
}

pub const THEMES: [Palette; 4] = [
    Palette {
        name: "Professional Blue",
        accent: "#2563eb",
        header: "#1e293b",
        bg: "#f8fafc",
        notice: "#dbeafe",
        secondary: "#64748b",
    },
    Palette {
        name: "Elegant Purple",
        accent: "#7c3aed",
        header: "#1e1b4b",
        bg: "#faf5ff",
        notice: "#ede9fe",
        secondary: "#7c3aed",
    },
    Palette {
        name: "Modern Green",
        accent: "#059669",
        header: "#064e3b",
        bg: "#f0fdf4",
        notice: "#d1fae5",
        secondary: "#10b981",
    },
    Palette {
        name: "Warm Orange",
        accent: "#ea580c",
        header: "#9a3412",
        bg: "#fff7ed",
        notice: "#fed7aa",
        secondary: "#f97316",
    },
];

/// Palette at `index`, adjusted for dark mode. Unknown indices fall back to
/// the first palette.
pub fn palette(index: usize, dark: bool) -> Palette {
    let base = THEMES.get(index).copied().unwrap_or(THEMES[0]);
    if !dark {
        return base;
    }

    Palette {
        bg: if base.bg.starts_with("#f") {
            "#1e1e1e"
        } else {
            base.bg
        },
        notice: "#1e3a8a33",
        header: "#ffffff",
        secondary: "#94a3b8",
        ..base
    }
}

/// Resolve a theme given as a 1-based index or a case-insensitive name
pub fn resolve(choice: &str) -> Result<usize> {
    let choice = choice.trim();
    if let Ok(n) = choice.parse::<usize>() {
        if (1..=THEMES.len()).contains(&n) {
            return Ok(n - 1);
        }
    }

    THEMES
        .iter()
        .position(|t| t.name.eq_ignore_ascii_case(choice))
        .ok_or_else(|| InvoiceError::UnknownTheme(choice.to_string()))
}
