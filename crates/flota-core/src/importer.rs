//! Import orchestration
//!
//! One file goes through three steps:
//! 1. `analyze` hashes the bytes, classifies and parses the document, and
//!    collects duplicate signals (same content, same file name, movements
//!    already in the ledger)
//! 2. The caller inspects the analysis
//! 3. `commit` writes it through the [`LedgerSink`] in one transaction
//!
//! Duplicate signals never skip silently: an analysis carrying any of them
//! is only committed when the caller confirms. `import_batch` runs every file
//! independently so one failure never aborts the rest.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::bank::{dominant_month, parse_statement, StatementSummary};
use crate::categorize::RuleEngine;
use crate::classify::{classify_pdf, detect_format, SourceFormat};
use crate::config::FleetConfig;
use crate::dedup::flag_duplicates;
use crate::error::{Error, Result};
use crate::invoice::{parse_invoice_as, InvoiceKind, InvoiceParseResult};
use crate::models::{CategorizationRule, DocumentType, NewImport, NewMovement};
use crate::payroll::{parse_payroll, PayrollReport, WorkerTable};
use crate::pdf::TextExtractor;
use crate::route_sheet::{parse_route_sheet, RouteSheet};
use crate::sink::{ImportRecords, LedgerSink};
use crate::vehicles::VehicleRegistry;

/// SHA-256 of the raw file bytes, hex encoded
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// A file read into memory
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its file name
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// Reference data the parsers need
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub rules: RuleEngine,
    pub vehicles: VehicleRegistry,
    pub workers: WorkerTable,
}

impl ReferenceData {
    /// Use `rules` when given (typically the ledger's active rules), else
    /// the rules listed in the config
    pub fn new(config: &FleetConfig, rules: Option<Vec<CategorizationRule>>) -> Self {
        let rules = rules
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| config.rules());
        Self {
            rules: RuleEngine::new(rules, &config.categories()),
            vehicles: config.vehicle_registry(),
            workers: config.worker_table(),
        }
    }
}

/// Parsed content of one file
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportPayload {
    Bank {
        movements: Vec<NewMovement>,
        /// Parallel to `movements`: fingerprint already in the ledger
        duplicate_flags: Vec<bool>,
        summary: StatementSummary,
        skipped_rows: usize,
    },
    Invoice {
        invoice: InvoiceParseResult,
        movements: Vec<NewMovement>,
        duplicate_flags: Vec<bool>,
    },
    Payroll(PayrollReport),
    RouteSheet(RouteSheet),
}

impl ImportPayload {
    pub fn records(&self) -> ImportRecords<'_> {
        match self {
            Self::Bank { movements, .. } | Self::Invoice { movements, .. } => {
                ImportRecords::Movements(movements.as_slice())
            }
            Self::Payroll(report) => ImportRecords::Payroll(report),
            Self::RouteSheet(sheet) => ImportRecords::RouteSheet(sheet),
        }
    }

    pub fn movements(&self) -> &[NewMovement] {
        match self {
            Self::Bank { movements, .. } | Self::Invoice { movements, .. } => movements.as_slice(),
            _ => &[],
        }
    }

    /// Number of movements already present in the ledger
    pub fn duplicate_count(&self) -> usize {
        match self {
            Self::Bank {
                duplicate_flags, ..
            }
            | Self::Invoice {
                duplicate_flags, ..
            } => duplicate_flags.iter().filter(|f| **f).count(),
            _ => 0,
        }
    }

    fn period(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        let dates = || self.movements().iter().map(|m| m.date);
        (dates().min(), dates().max())
    }
}

/// Everything known about a file before it is committed
#[derive(Debug, Clone, Serialize)]
pub struct FileAnalysis {
    pub file_name: String,
    pub content_hash: String,
    pub document_type: DocumentType,
    /// YYYY-MM the document refers to
    pub reference_month: Option<String>,
    pub payload: ImportPayload,
    /// Reasons this file may already be in the ledger
    pub duplicate_reasons: Vec<String>,
    /// Non-fatal parse errors (skipped lines and rows)
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl FileAnalysis {
    pub fn is_duplicate(&self) -> bool {
        !self.duplicate_reasons.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.payload.records().len()
    }

    fn new_import(&self) -> NewImport {
        let (period_from, period_to) = self.payload.period();
        NewImport {
            file_name: self.file_name.clone(),
            content_hash: self.content_hash.clone(),
            declared_type: self.document_type,
            reference_month: self.reference_month.clone(),
            item_count: self.item_count() as i64,
            period_from,
            period_to,
        }
    }
}

/// How a file ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Imported {
        import_id: i64,
        inserted: usize,
        ignored: usize,
    },
    /// Not committed: needs explicit confirmation
    Duplicate { reason: String },
    Error { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file_name: String,
    pub document_type: Option<DocumentType>,
    pub reference_month: Option<String>,
    pub outcome: FileOutcome,
    pub warnings: Vec<String>,
}

impl FileReport {
    pub fn error(file_name: &str, reason: impl Into<String>) -> Self {
        Self {
            file_name: file_name.to_string(),
            document_type: None,
            reference_month: None,
            outcome: FileOutcome::Error {
                reason: reason.into(),
            },
            warnings: Vec::new(),
        }
    }
}

/// Per-file outcomes of a batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn push(&mut self, report: FileReport) {
        self.files.push(report);
    }

    pub fn imported(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Imported { .. }))
    }

    pub fn duplicates(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Duplicate { .. }))
    }

    pub fn errors(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Error { .. }))
    }

    /// Movements inserted across the batch
    pub fn inserted(&self) -> usize {
        self.files
            .iter()
            .map(|f| match f.outcome {
                FileOutcome::Imported { inserted, .. } => inserted,
                _ => 0,
            })
            .sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }
}

/// Drives classification, parsing, duplicate checks and persistence
pub struct Importer<'a, S: LedgerSink + ?Sized, E: TextExtractor> {
    sink: &'a S,
    extractor: E,
    reference: ReferenceData,
}

impl<'a, S: LedgerSink + ?Sized, E: TextExtractor> Importer<'a, S, E> {
    pub fn new(sink: &'a S, extractor: E, reference: ReferenceData) -> Self {
        Self {
            sink,
            extractor,
            reference,
        }
    }

    /// Classify, parse and check one file without writing anything
    pub fn analyze(&self, file_name: &str, bytes: &[u8]) -> Result<FileAnalysis> {
        let content_hash = content_hash(bytes);

        let (document_type, payload, errors, warnings) = match detect_format(file_name, bytes)? {
            SourceFormat::Csv => self.analyze_statement(bytes)?,
            SourceFormat::Pdf => {
                let text = self.extractor.extract_text(bytes)?;
                let document_type = classify_pdf(file_name, &text)?;
                self.analyze_pdf(file_name, document_type, &text)?
            }
        };

        let reference_month = match &payload {
            ImportPayload::Bank { movements, .. } => {
                dominant_month(movements.iter().map(|m| m.date))
            }
            ImportPayload::Invoice { invoice, .. } => invoice.reference_month(),
            ImportPayload::Payroll(report) => Some(report.month.clone()),
            ImportPayload::RouteSheet(sheet) => Some(sheet.month.clone()),
        };

        let mut duplicate_reasons = Vec::new();
        if let Some(previous) = self.sink.find_import_by_hash(&content_hash)? {
            duplicate_reasons.push(format!(
                "identical content already imported as {} (import {})",
                previous.file_name, previous.id
            ));
        }
        if let Some(previous) = self.sink.find_import_by_name(file_name)? {
            if previous.content_hash != content_hash {
                duplicate_reasons.push(format!(
                    "a file with this name was already imported (import {})",
                    previous.id
                ));
            }
        }
        let already_in_ledger = payload.duplicate_count();
        if already_in_ledger > 0 {
            duplicate_reasons.push(format!(
                "{} of {} movements already in the ledger",
                already_in_ledger,
                payload.movements().len()
            ));
        }

        if !duplicate_reasons.is_empty() {
            warn!("{}: {}", file_name, duplicate_reasons.join("; "));
        }

        Ok(FileAnalysis {
            file_name: file_name.to_string(),
            content_hash,
            document_type,
            reference_month,
            payload,
            duplicate_reasons,
            errors,
            warnings,
        })
    }

    fn analyze_statement(
        &self,
        bytes: &[u8],
    ) -> Result<(DocumentType, ImportPayload, Vec<String>, Vec<String>)> {
        let statement = parse_statement(bytes)?;
        if statement.rows.is_empty() {
            return Err(Error::Import("no valid movements in statement".to_string()));
        }

        let movements = self.reference.rules.categorize_rows(&statement.rows);
        let duplicate_flags = flag_duplicates(self.sink, &movements)?;
        let summary = StatementSummary::from_movements(&movements);

        let errors = statement
            .skipped
            .iter()
            .map(|s| format!("row {}: {}", s.record, s.reason))
            .collect();
        let warnings = summary.warnings.clone();

        Ok((
            DocumentType::BankStatement,
            ImportPayload::Bank {
                movements,
                duplicate_flags,
                summary,
                skipped_rows: statement.skipped.len(),
            },
            errors,
            warnings,
        ))
    }

    fn analyze_pdf(
        &self,
        file_name: &str,
        document_type: DocumentType,
        text: &str,
    ) -> Result<(DocumentType, ImportPayload, Vec<String>, Vec<String>)> {
        match document_type {
            DocumentType::Payroll => {
                let report = parse_payroll(file_name, text, &self.reference.workers)?;
                if report.rows.is_empty() {
                    return Err(Error::Import("no payroll rows found".to_string()));
                }
                let errors = report.skipped.clone();
                let warnings = report.warnings.clone();
                Ok((document_type, ImportPayload::Payroll(report), errors, warnings))
            }
            DocumentType::RouteSheet => {
                let sheet = parse_route_sheet(file_name, text, &self.reference.vehicles)?;
                let warnings = sheet.warnings.clone();
                Ok((document_type, ImportPayload::RouteSheet(sheet), Vec::new(), warnings))
            }
            other => {
                let kind = InvoiceKind::from_document_type(other).ok_or_else(|| {
                    Error::UnsupportedFormat(format!("{} is not a PDF document type", other))
                })?;
                let invoice = parse_invoice_as(kind, text, &self.reference.vehicles);
                let movements = invoice.to_movements();
                if movements.is_empty() {
                    return Err(Error::Import(format!(
                        "no billable vehicle totals in invoice ({})",
                        invoice.errors.join("; ")
                    )));
                }
                let duplicate_flags = flag_duplicates(self.sink, &movements)?;
                let errors = invoice.errors.clone();
                let warnings = invoice.warnings.clone();
                Ok((
                    document_type,
                    ImportPayload::Invoice {
                        invoice,
                        movements,
                        duplicate_flags,
                    },
                    errors,
                    warnings,
                ))
            }
        }
    }

    /// Persist an analysis; duplicates need `confirm_duplicates`
    pub fn commit(&self, analysis: &FileAnalysis, confirm_duplicates: bool) -> Result<FileOutcome> {
        if analysis.is_duplicate() && !confirm_duplicates {
            return Ok(FileOutcome::Duplicate {
                reason: analysis.duplicate_reasons.join("; "),
            });
        }

        let outcome = self
            .sink
            .commit_import(&analysis.new_import(), analysis.payload.records())?;

        info!(
            "Imported {} ({}): {} inserted, {} ignored",
            analysis.file_name, analysis.document_type, outcome.inserted, outcome.ignored
        );
        Ok(FileOutcome::Imported {
            import_id: outcome.import_id,
            inserted: outcome.inserted,
            ignored: outcome.ignored,
        })
    }

    /// Analyze and commit one file; failures become an error outcome
    pub fn import_file(&self, file_name: &str, bytes: &[u8], confirm_duplicates: bool) -> FileReport {
        let analysis = match self.analyze(file_name, bytes) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("{}: {}", file_name, e);
                return FileReport::error(file_name, e.to_string());
            }
        };

        let outcome = match self.commit(&analysis, confirm_duplicates) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("{}: commit failed: {}", file_name, e);
                FileOutcome::Error {
                    reason: e.to_string(),
                }
            }
        };

        let mut warnings = analysis.warnings;
        warnings.extend(analysis.errors);
        FileReport {
            file_name: analysis.file_name,
            document_type: Some(analysis.document_type),
            reference_month: analysis.reference_month,
            outcome,
            warnings,
        }
    }

    /// Import files one after another
    pub fn import_batch(&self, files: &[SourceFile], confirm_duplicates: bool) -> BatchReport {
        let mut report = BatchReport::default();
        for file in files {
            report.push(self.import_file(&file.name, &file.bytes, confirm_duplicates));
        }

        info!(
            "Batch: {} imported, {} duplicate, {} failed",
            report.imported(),
            report.duplicates(),
            report.errors()
        );
        report
    }
}
