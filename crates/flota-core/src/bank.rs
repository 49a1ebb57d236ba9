//! Bank statement CSV parser
//!
//! Statements are `;`-delimited exports with a free-form preamble above the
//! header row. Columns are located through a synonym table so that exports
//! from different channels (web, app, branch) parse the same way.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::locale::{normalize_text, parse_date, parse_es_number};
use crate::models::NewMovement;

/// How many lines of preamble are searched for the header row
const HEADER_SCAN_LINES: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Date,
    Description,
    Amount,
    Reference,
}

impl Field {
    fn name(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Description => "description",
            Self::Amount => "amount",
            Self::Reference => "reference",
        }
    }
}

/// Normalized header → field. For each field the first listed synonym present wins.
const COLUMN_SYNONYMS: [(&str, Field); 15] = [
    ("F. VALOR", Field::Date),
    ("F.VALOR", Field::Date),
    ("FECHA VALOR", Field::Date),
    ("FECHA", Field::Date),
    ("F. OPERACION", Field::Date),
    ("F.OPERACION", Field::Date),
    ("FECHA OPERACION", Field::Date),
    ("DESCRIPCION", Field::Description),
    ("CONCEPTO", Field::Description),
    ("MOVIMIENTO", Field::Description),
    ("IMPORTE", Field::Amount),
    ("CANTIDAD", Field::Amount),
    ("MONTO", Field::Amount),
    ("REFERENCIA", Field::Reference),
    ("REF", Field::Reference),
];

/// A parsed statement row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankRow {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub reference: Option<String>,
}

/// A row dropped because a required value did not parse
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    /// 1-based record number below the header
    pub record: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BankStatement {
    /// Sorted by date, newest first
    pub rows: Vec<BankRow>,
    pub skipped: Vec<SkippedRow>,
    /// Normalized header names as found in the file
    pub columns: Vec<String>,
    /// 0-based line index of the header row
    pub header_line: usize,
}

/// Decode raw bytes as UTF-8 (with or without BOM), Latin-1 or Windows-1252
pub fn decode_bytes(bytes: &[u8]) -> Result<String> {
    if bytes.contains(&0) {
        return Err(Error::Decode("binary content (NUL bytes)".to_string()));
    }

    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        if let Ok(text) = std::str::from_utf8(rest) {
            return Ok(text.to_string());
        }
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }

    // ISO-8859-1 has no printable characters in 0x80..=0x9F
    if !bytes.iter().any(|b| (0x80..=0x9F).contains(b)) {
        debug!("Decoded statement as Latin-1");
        return Ok(bytes.iter().map(|&b| b as char).collect());
    }

    let (text, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
    if had_errors {
        return Err(Error::Decode(
            "not valid UTF-8, Latin-1 or Windows-1252".to_string(),
        ));
    }
    debug!("Decoded statement as Windows-1252");
    Ok(text.into_owned())
}

/// Index of the header row, skipping any preamble
fn find_header_line(text: &str) -> usize {
    text.lines()
        .take(HEADER_SCAN_LINES)
        .position(|line| {
            let upper = line.to_uppercase();
            upper.contains("F. VALOR") || (upper.contains("FECHA") && upper.contains("IMPORTE"))
        })
        .unwrap_or(0)
}

/// Column index for each field, following synonym priority
fn map_columns(headers: &[String]) -> BTreeMap<&'static str, usize> {
    let mut mapping = BTreeMap::new();
    for (synonym, field) in COLUMN_SYNONYMS {
        if mapping.contains_key(field.name()) {
            continue;
        }
        if let Some(idx) = headers.iter().position(|h| h == synonym) {
            mapping.insert(field.name(), idx);
        }
    }
    mapping
}

/// Parse a statement from raw bytes
pub fn parse_statement(bytes: &[u8]) -> Result<BankStatement> {
    let text = decode_bytes(bytes)?;
    parse_statement_text(&text)
}

/// Parse an already decoded statement
pub fn parse_statement_text(text: &str) -> Result<BankStatement> {
    let header_line = find_header_line(text);
    let body: String = text
        .lines()
        .skip(header_line)
        .collect::<Vec<_>>()
        .join("\n");
    debug!("Statement header found at line {}", header_line);

    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let columns: Vec<String> = rdr.headers()?.iter().map(normalize_text).collect();
    let mapping = map_columns(&columns);

    for required in [Field::Date, Field::Description, Field::Amount] {
        if !mapping.contains_key(required.name()) {
            return Err(Error::MissingColumn {
                field: required.name().to_string(),
                observed: columns.clone(),
            });
        }
    }

    let date_idx = mapping[Field::Date.name()];
    let desc_idx = mapping[Field::Description.name()];
    let amount_idx = mapping[Field::Amount.name()];
    let ref_idx = mapping.get(Field::Reference.name()).copied();

    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let record_no = i + 1;

        let date = record.get(date_idx).and_then(parse_date);
        let amount = record.get(amount_idx).and_then(parse_es_number);
        let description = record.get(desc_idx).map(str::trim).unwrap_or_default();

        let (date, amount) = match (date, amount) {
            (Some(date), Some(amount)) if !description.is_empty() => (date, amount),
            (None, _) => {
                skipped.push(SkippedRow {
                    record: record_no,
                    reason: format!("unparseable date: {:?}", record.get(date_idx)),
                });
                continue;
            }
            (_, None) => {
                skipped.push(SkippedRow {
                    record: record_no,
                    reason: format!("unparseable amount: {:?}", record.get(amount_idx)),
                });
                continue;
            }
            _ => {
                skipped.push(SkippedRow {
                    record: record_no,
                    reason: "empty description".to_string(),
                });
                continue;
            }
        };

        let reference = ref_idx
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan"))
            .map(String::from);

        rows.push(BankRow {
            date,
            description: description.to_string(),
            amount,
            reference,
        });
    }

    if !skipped.is_empty() {
        warn!("Dropped {} statement rows that did not parse", skipped.len());
    }

    rows.sort_by(|a, b| b.date.cmp(&a.date));
    debug!("Parsed {} statement rows", rows.len());

    Ok(BankStatement {
        rows,
        skipped,
        columns,
        header_line,
    })
}

/// Most frequent YYYY-MM among the dates; ties go to the earliest month
pub fn dominant_month<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Option<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for date in dates {
        *counts.entry(date.format("%Y-%m").to_string()).or_default() += 1;
    }

    let max = counts.values().copied().max()?;
    counts
        .into_iter()
        .find(|(_, count)| *count == max)
        .map(|(month, _)| month)
}

/// Pre-commit validation summary for a categorized statement
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatementSummary {
    pub total_rows: usize,
    pub income_count: usize,
    pub expense_count: usize,
    pub income_total: f64,
    pub expense_total: f64,
    pub needs_review: usize,
    pub period_from: Option<NaiveDate>,
    pub period_to: Option<NaiveDate>,
    pub warnings: Vec<String>,
}

impl StatementSummary {
    pub fn from_movements(movements: &[NewMovement]) -> Self {
        let mut summary = StatementSummary {
            total_rows: movements.len(),
            ..Default::default()
        };

        for m in movements {
            if m.amount > 0.0 {
                summary.income_count += 1;
                summary.income_total += m.amount;
            } else if m.amount < 0.0 {
                summary.expense_count += 1;
                summary.expense_total += m.amount;
            }
            if m.needs_review {
                summary.needs_review += 1;
            }
        }

        summary.period_from = movements.iter().map(|m| m.date).min();
        summary.period_to = movements.iter().map(|m| m.date).max();

        if summary.needs_review > 0 {
            summary.warnings.push(format!(
                "{} movements need manual review",
                summary.needs_review
            ));
        }
        if let (Some(from), Some(to)) = (summary.period_from, summary.period_to) {
            if from == to {
                summary
                    .warnings
                    .push("All movements share the same date".to_string());
            }
        }

        summary
    }
}
