//! PDF text layer extraction

use tracing::debug;

use crate::error::{Error, Result};

/// Turns raw document bytes into text
///
/// The importer only ever sees this trait, so tests and alternative
/// backends can feed text without real PDF files.
pub trait TextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String>;
}

/// Default extractor backed by `pdf-extract`
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String> {
        let text =
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| Error::Pdf(e.to_string()))?;

        // Scanned documents come back with no text layer
        if text.trim().is_empty() {
            return Err(Error::Pdf("no extractable text (scanned PDF?)".to_string()));
        }

        debug!("Extracted {} chars from PDF", text.len());
        Ok(text)
    }
}
