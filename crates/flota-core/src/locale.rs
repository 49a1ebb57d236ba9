//! Spanish locale conventions for numbers, dates and free text
//!
//! Source documents use `.` as the thousands separator and `,` as the decimal
//! separator (`1.234,56`). Unparseable tokens are reported as `None` so callers
//! can drop the row instead of aborting the whole file.

use chrono::{Datelike, NaiveDate};

/// Date layouts tried in order; the first successful parse wins
const DATE_FORMATS: [&str; 5] = [
    "%d/%m/%Y", // 31/12/2025
    "%d-%m-%Y", // 31-12-2025
    "%Y-%m-%d", // 2025-12-31
    "%d/%m/%y", // 31/12/25
    "%d-%m-%y", // 31-12-25
];

const MONTHS_ES: [&str; 12] = [
    "ENERO",
    "FEBRERO",
    "MARZO",
    "ABRIL",
    "MAYO",
    "JUNIO",
    "JULIO",
    "AGOSTO",
    "SEPTIEMBRE",
    "OCTUBRE",
    "NOVIEMBRE",
    "DICIEMBRE",
];

/// Parse a Spanish-formatted number (`1.234,56`, `-4,69`, `200,00 €`)
pub fn parse_es_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€')
        .collect();

    if cleaned.is_empty() || matches!(cleaned.to_lowercase().as_str(), "nan" | "none" | "-") {
        return None;
    }

    let normalized = cleaned.replace('.', "").replace(',', ".");
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a number that may use either convention (`1.928,8` or `1928.8`)
///
/// A comma always means Spanish formatting. Without a comma, several dots or a
/// single dot followed by exactly three digits are read as thousands
/// separators; any other single dot is a decimal point.
pub fn parse_loose_number(s: &str) -> Option<f64> {
    let cleaned = s.trim().trim_end_matches('%').trim();
    if cleaned.contains(',') {
        return parse_es_number(cleaned);
    }

    let dots = cleaned.matches('.').count();
    let thousands = match cleaned.rsplit_once('.') {
        Some((_, frac)) => dots > 1 || frac.len() == 3,
        None => false,
    };

    let normalized = if thousands {
        cleaned.replace('.', "")
    } else {
        cleaned.to_string()
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Format a number the Spanish way with a fixed number of decimals
pub fn format_es_number(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut out = String::with_capacity(formatted.len() + int_part.len() / 3 + 1);
    let is_zero = formatted.chars().all(|c| c == '0' || c == '.');
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}

/// Format a euro amount for display (`-1.234,56 €`)
pub fn format_eur(value: f64) -> String {
    format!("{} €", format_es_number(value, 2))
}

/// Parse a date trying each supported layout in order
///
/// Four-digit-year layouts reject short years so that `01/12/25` falls through
/// to the two-digit layouts instead of becoming year 25.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("none") {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            if fmt.contains("%Y") && date.year() < 1000 {
                continue;
            }
            return Some(date);
        }
    }

    None
}

/// Build a full date from a day-month token and the invoice date
///
/// Lines dated after the invoice month belong to the previous year
/// (a January invoice listing December refuels).
pub fn infer_line_date(day: u32, month: u32, invoice_date: Option<NaiveDate>) -> Option<NaiveDate> {
    let anchor = invoice_date?;
    let year = if month > anchor.month() {
        anchor.year() - 1
    } else {
        anchor.year()
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Round to euro cents
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Month number for a Spanish month name (`enero` → 1)
pub fn month_from_name(name: &str) -> Option<u32> {
    let upper = normalize_text(name);
    MONTHS_ES
        .iter()
        .position(|m| *m == upper)
        .map(|i| i as u32 + 1)
}

/// All Spanish month names, upper-cased
pub fn month_names() -> &'static [&'static str] {
    &MONTHS_ES
}

/// Replace accented Latin letters with their base letter
pub fn strip_diacritics(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            'Á' | 'À' | 'Ä' | 'Â' => 'A',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'Ñ' => 'N',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Diacritic-free, upper-cased, trimmed text for comparisons
pub fn normalize_text(s: &str) -> String {
    strip_diacritics(s).to_uppercase().trim().to_string()
}
