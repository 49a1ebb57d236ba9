//! Import history operations and the ledger sink implementation

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::info;

use super::movements::{insert_movements, movement_keys_between};
use super::payroll::upsert_payroll;
use super::route_sheets::upsert_route_sheet;
use super::{parse_date_column, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{DocumentType, ImportRecord, NewImport};
use crate::sink::{CommitOutcome, ImportRecords, LedgerSink};

const IMPORT_COLUMNS: &str = "id, file_name, content_hash, declared_type, reference_month, \
     item_count, period_from, period_to, created_at";

/// What a deleted import took with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeletedImport {
    pub movements: usize,
    /// Movements handed to a later import of the same content
    pub reassigned: usize,
    pub payroll_rows: usize,
    pub route_sheets: usize,
}

impl Database {
    /// List imports, newest first
    pub fn list_imports(&self, limit: i64) -> Result<Vec<ImportRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM imports ORDER BY created_at DESC, id DESC LIMIT ?",
            IMPORT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let imports = stmt
            .query_map(params![limit], row_to_import)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(imports)
    }

    pub fn get_import(&self, id: i64) -> Result<Option<ImportRecord>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM imports WHERE id = ?", IMPORT_COLUMNS);
        let import = conn.query_row(&sql, params![id], row_to_import).optional()?;
        Ok(import)
    }

    /// Imports of a given type whose reference month is `month`
    pub fn imports_for_month(
        &self,
        month: &str,
        declared_type: DocumentType,
    ) -> Result<Vec<ImportRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM imports WHERE reference_month = ? AND declared_type = ? ORDER BY id",
            IMPORT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let imports = stmt
            .query_map(params![month, declared_type.as_str()], row_to_import)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(imports)
    }

    /// Delete an import together with everything it wrote
    pub fn delete_import(&self, id: i64) -> Result<DeletedImport> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row("SELECT id FROM imports WHERE id = ?", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Err(Error::NotFound(format!("import {}", id)));
        }

        // A confirmed re-import of the same bytes inserted nothing: its rows
        // were ignored as already present and still point at this import
        let successor: Option<i64> = tx
            .query_row(
                r#"
                SELECT id FROM imports
                WHERE content_hash = (SELECT content_hash FROM imports WHERE id = ?1)
                  AND id > ?1
                ORDER BY id LIMIT 1
                "#,
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let reassigned = match successor {
            Some(next) => tx.execute(
                "UPDATE movements SET import_id = ? WHERE import_id = ?",
                params![next, id],
            )?,
            None => 0,
        };

        let movements = tx.execute("DELETE FROM movements WHERE import_id = ?", params![id])?;
        let payroll_rows =
            tx.execute("DELETE FROM payroll_costs WHERE import_id = ?", params![id])?;
        let route_sheets =
            tx.execute("DELETE FROM route_sheets WHERE import_id = ?", params![id])?;
        tx.execute("DELETE FROM imports WHERE id = ?", params![id])?;
        tx.commit()?;

        info!(
            "Deleted import {} ({} movements, {} reassigned, {} payroll rows, {} route sheets)",
            id, movements, reassigned, payroll_rows, route_sheets
        );
        Ok(DeletedImport {
            movements,
            reassigned,
            payroll_rows,
            route_sheets,
        })
    }
}

fn find_import(conn: &Connection, column: &str, value: &str) -> Result<Option<ImportRecord>> {
    let sql = format!(
        "SELECT {} FROM imports WHERE {} = ? ORDER BY id DESC LIMIT 1",
        IMPORT_COLUMNS, column
    );
    let import = conn.query_row(&sql, params![value], row_to_import).optional()?;
    Ok(import)
}

/// Column order: id, file_name, content_hash, declared_type, reference_month,
///               item_count, period_from, period_to, created_at
fn row_to_import(row: &rusqlite::Row) -> rusqlite::Result<ImportRecord> {
    let declared_type: String = row.get(3)?;
    let period_from: Option<String> = row.get(6)?;
    let period_to: Option<String> = row.get(7)?;
    let created_at_str: String = row.get(8)?;

    let declared_type = declared_type.parse::<DocumentType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            Box::new(Error::InvalidData(e)),
        )
    })?;

    Ok(ImportRecord {
        id: row.get(0)?,
        file_name: row.get(1)?,
        content_hash: row.get(2)?,
        declared_type,
        reference_month: row.get(4)?,
        item_count: row.get(5)?,
        period_from: period_from
            .map(|s| parse_date_column(6, &s))
            .transpose()?,
        period_to: period_to.map(|s| parse_date_column(7, &s)).transpose()?,
        created_at: parse_datetime(8, &created_at_str)?,
    })
}

impl LedgerSink for Database {
    fn movement_keys_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, String, f64)>> {
        let conn = self.conn()?;
        movement_keys_between(&conn, from, to)
    }

    fn find_import_by_hash(&self, content_hash: &str) -> Result<Option<ImportRecord>> {
        let conn = self.conn()?;
        find_import(&conn, "content_hash", content_hash)
    }

    fn find_import_by_name(&self, file_name: &str) -> Result<Option<ImportRecord>> {
        let conn = self.conn()?;
        find_import(&conn, "file_name", file_name)
    }

    fn commit_import(
        &self,
        import: &NewImport,
        records: ImportRecords<'_>,
    ) -> Result<CommitOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO imports (file_name, content_hash, declared_type, reference_month, item_count, period_from, period_to)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                import.file_name,
                import.content_hash,
                import.declared_type.as_str(),
                import.reference_month,
                import.item_count,
                import.period_from.map(|d| d.to_string()),
                import.period_to.map(|d| d.to_string()),
            ],
        )?;
        let import_id = tx.last_insert_rowid();

        let (inserted, ignored) = match records {
            ImportRecords::Movements(movements) => {
                insert_movements(&tx, Some(import_id), movements)?
            }
            ImportRecords::Payroll(report) => (upsert_payroll(&tx, import_id, report)?, 0),
            ImportRecords::RouteSheet(sheet) => {
                upsert_route_sheet(&tx, import_id, sheet)?;
                (1, 0)
            }
        };

        tx.commit()?;

        info!(
            "Committed {} as import {}: {} inserted, {} ignored",
            import.file_name, import_id, inserted, ignored
        );
        Ok(CommitOutcome {
            import_id,
            inserted,
            ignored,
        })
    }
}
