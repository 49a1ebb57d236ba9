//! Flota Core Library
//!
//! Ingestion engine for a small trucking fleet's financial documents:
//! - Bank statement CSV parsing and rule-based categorization
//! - Fuel and toll invoice parsers (StarOil, Solred/Waylet, Valcarce)
//!   with per-vehicle aggregation and discount proration
//! - Payroll cost and route sheet PDF parsers
//! - Document classification and import orchestration
//! - Duplicate detection and idempotent SQLite persistence
//! - Monthly document checklist

pub mod bank;
pub mod categorize;
pub mod checklist;
pub mod classify;
pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod importer;
pub mod invoice;
pub mod locale;
pub mod models;
mod patterns;
pub mod payroll;
pub mod pdf;
pub mod route_sheet;
pub mod sink;
pub mod vehicles;

pub use categorize::{Assignment, RuleEngine};
pub use checklist::{Checklist, ChecklistItem, ItemStatus, MonthlyChecklist};
pub use config::FleetConfig;
pub use db::Database;
pub use error::{Error, Result};
pub use importer::{
    BatchReport, FileAnalysis, FileOutcome, FileReport, ImportPayload, Importer, ReferenceData,
    SourceFile,
};
pub use invoice::{InvoiceKind, InvoiceParseResult};
pub use pdf::{PdfTextExtractor, TextExtractor};
pub use sink::{CommitOutcome, ImportRecords, LedgerSink};
pub use vehicles::VehicleRegistry;
