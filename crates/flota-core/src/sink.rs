//! Ledger sink abstraction
//!
//! The import orchestrator only needs a handful of ledger operations; they
//! are collected here so the orchestrator does not depend on SQLite.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::models::{ImportRecord, NewImport, NewMovement};
use crate::payroll::PayrollReport;
use crate::route_sheet::RouteSheet;

/// What a single file contributes to the ledger
#[derive(Debug, Clone, Copy)]
pub enum ImportRecords<'a> {
    Movements(&'a [NewMovement]),
    Payroll(&'a PayrollReport),
    RouteSheet(&'a RouteSheet),
}

impl ImportRecords<'_> {
    pub fn len(&self) -> usize {
        match self {
            Self::Movements(movements) => movements.len(),
            Self::Payroll(report) => report.rows.len(),
            Self::RouteSheet(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of committing one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommitOutcome {
    pub import_id: i64,
    /// Records written
    pub inserted: usize,
    /// Records already present and left untouched
    pub ignored: usize,
}

pub trait LedgerSink {
    /// (date, description, amount) of every persisted movement in the range
    fn movement_keys_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, String, f64)>>;

    fn find_import_by_hash(&self, content_hash: &str) -> Result<Option<ImportRecord>>;

    fn find_import_by_name(&self, file_name: &str) -> Result<Option<ImportRecord>>;

    /// Record the import and its records atomically
    fn commit_import(&self, import: &NewImport, records: ImportRecords<'_>)
        -> Result<CommitOutcome>;
}
