//! Movement operations

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use super::{create_movement_key_index, index_exists, parse_date_column, parse_datetime, Database};
use crate::error::Result;
use crate::locale::round2;
use crate::models::{Movement, MovementFilter, NewMovement};

const MOVEMENT_COLUMNS: &str = "id, date, description, amount, category_id, vehicle_id, reference, \
     needs_review, import_id, created_at";

/// Outcome of a duplicate purge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PurgeResult {
    /// Rows deleted
    pub removed: usize,
    /// Whether the unique key index exists afterwards
    pub index_present: bool,
}

/// Insert movements for one import, skipping keys already in the ledger
///
/// Returns (inserted, ignored). With the unique index in place this is a
/// plain `INSERT OR IGNORE`; without it every row is checked first.
pub(super) fn insert_movements(
    conn: &Connection,
    import_id: Option<i64>,
    movements: &[NewMovement],
) -> Result<(usize, usize)> {
    let use_index = index_exists(conn)?;
    if !use_index {
        debug!("Movement key index missing, checking rows one by one");
    }

    let mut inserted = 0;
    let mut ignored = 0;

    for m in movements {
        let date = m.date.to_string();
        let amount = round2(m.amount);

        if !use_index {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT id FROM movements WHERE date = ? AND description = ? AND amount = ? LIMIT 1",
                    params![date, m.description, amount],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_some() {
                ignored += 1;
                continue;
            }
        }

        let changed = conn.execute(
            r#"
            INSERT OR IGNORE INTO movements (date, description, amount, category_id, vehicle_id, reference, needs_review, import_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                date,
                m.description,
                amount,
                m.category_id,
                m.vehicle_id,
                m.reference,
                m.needs_review,
                import_id,
            ],
        )?;

        if changed == 1 {
            inserted += 1;
        } else {
            ignored += 1;
        }
    }

    Ok((inserted, ignored))
}

pub(super) fn movement_keys_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<(NaiveDate, String, f64)>> {
    let mut stmt = conn
        .prepare("SELECT date, description, amount FROM movements WHERE date BETWEEN ? AND ?")?;
    let keys = stmt
        .query_map(params![from.to_string(), to.to_string()], |row| {
            let date: String = row.get(0)?;
            Ok((parse_date_column(0, &date)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(keys)
}

impl Database {
    /// Insert movements outside of any import (manual entries, tests)
    pub fn insert_movements(&self, movements: &[NewMovement]) -> Result<(usize, usize)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let counts = insert_movements(&tx, None, movements)?;
        tx.commit()?;
        Ok(counts)
    }

    /// List movements, newest first
    pub fn list_movements(&self, filter: &MovementFilter) -> Result<Vec<Movement>> {
        let conn = self.conn()?;

        let mut conditions: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(from) = filter.from {
            conditions.push("date >= ?");
            params.push(Box::new(from.to_string()));
        }
        if let Some(to) = filter.to {
            conditions.push("date <= ?");
            params.push(Box::new(to.to_string()));
        }
        if let Some(ref vehicle) = filter.vehicle_id {
            conditions.push("vehicle_id = ?");
            params.push(Box::new(vehicle.clone()));
        }
        if let Some(ref category) = filter.category_id {
            conditions.push("category_id = ?");
            params.push(Box::new(category.clone()));
        }
        if let Some(needs_review) = filter.needs_review {
            conditions.push("needs_review = ?");
            params.push(Box::new(needs_review));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {} FROM movements {} ORDER BY date DESC, id DESC LIMIT ?",
            MOVEMENT_COLUMNS, where_clause
        );
        params.push(Box::new(filter.limit.unwrap_or(-1)));

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let movements = stmt
            .query_map(params_refs.as_slice(), Self::row_to_movement)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(movements)
    }

    /// Count all movements
    pub fn count_movements(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM movements", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Count movements of a category within a YYYY-MM month
    pub fn count_movements_in_month(&self, month: &str, category_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM movements WHERE strftime('%Y-%m', date) = ? AND category_id = ?",
            params![month, category_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete duplicate movements, keeping the lowest id per key, then
    /// retry creating the unique index
    pub fn purge_duplicate_movements(&self) -> Result<PurgeResult> {
        let conn = self.conn()?;

        let removed = conn.execute(
            r#"
            DELETE FROM movements
            WHERE id NOT IN (
                SELECT MIN(id) FROM movements GROUP BY date, description, amount
            )
            "#,
            [],
        )?;

        let index_present = create_movement_key_index(&conn) && index_exists(&conn)?;

        info!(
            "Purged {} duplicate movements (unique index present: {})",
            removed, index_present
        );
        Ok(PurgeResult {
            removed,
            index_present,
        })
    }

    /// Helper to convert a row to Movement
    /// Column order: id, date, description, amount, category_id, vehicle_id,
    ///               reference, needs_review, import_id, created_at
    fn row_to_movement(row: &rusqlite::Row) -> rusqlite::Result<Movement> {
        let date_str: String = row.get(1)?;
        let created_at_str: String = row.get(9)?;
        Ok(Movement {
            id: row.get(0)?,
            date: parse_date_column(1, &date_str)?,
            description: row.get(2)?,
            amount: row.get(3)?,
            category_id: row.get(4)?,
            vehicle_id: row.get(5)?,
            reference: row.get(6)?,
            needs_review: row.get(7)?,
            import_id: row.get(8)?,
            created_at: parse_datetime(9, &created_at_str)?,
        })
    }
}
