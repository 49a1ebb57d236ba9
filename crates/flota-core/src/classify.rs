//! Document type classification
//!
//! A file is routed to exactly one parser. The container format comes from
//! the extension (or the `%PDF` magic); PDFs are then told apart by file name
//! markers and by their extracted text.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::invoice::classify_invoice;
use crate::models::DocumentType;
use crate::patterns::static_regex;
use crate::route_sheet::looks_like_route_sheet;

// COST as a word of its own: COST_202512, cost-202511, COST_nomina; not COSTA
static_regex!(payroll_marker_re, r"(?:^|[^A-Z0-9])COST(?:[^A-Z]|$)");

/// Container format of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceFormat {
    Csv,
    Pdf,
}

pub fn detect_format(file_name: &str, bytes: &[u8]) -> Result<SourceFormat> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("csv") => Ok(SourceFormat::Csv),
        Some("pdf") => Ok(SourceFormat::Pdf),
        _ if bytes.starts_with(b"%PDF") => Ok(SourceFormat::Pdf),
        _ => Err(Error::UnsupportedFormat(format!(
            "{}: only CSV and PDF files are supported",
            file_name
        ))),
    }
}

/// Payroll summaries are only recognizable by their `COST` file name
pub fn is_payroll_file_name(file_name: &str) -> bool {
    payroll_marker_re().is_match(&file_name.to_uppercase())
}

fn is_route_sheet_file_name(file_name: &str) -> bool {
    let upper = file_name.to_uppercase();
    upper.contains("HOJA") && upper.contains("RUTA")
}

/// Resolve the document type of a PDF from its name and extracted text
pub fn classify_pdf(file_name: &str, text: &str) -> Result<DocumentType> {
    let doc_type = if is_payroll_file_name(file_name) {
        DocumentType::Payroll
    } else if looks_like_route_sheet(text) || is_route_sheet_file_name(file_name) {
        DocumentType::RouteSheet
    } else {
        classify_invoice(text)?.document_type()
    };

    debug!("{} classified as {}", file_name, doc_type);
    Ok(doc_type)
}
