//! Payroll cost operations

use rusqlite::{params, Connection};
use serde::Serialize;

use super::Database;
use crate::error::Result;
use crate::payroll::PayrollReport;

/// A stored payroll row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayrollCost {
    pub id: i64,
    pub month: String,
    pub worker_id: u32,
    pub worker_name: String,
    pub vehicle_id: String,
    pub gross: f64,
    pub employee_ss: f64,
    pub withholding: f64,
    pub net: f64,
    pub employer_ss: f64,
    pub total_cost: f64,
    pub import_id: Option<i64>,
}

/// Store every row of a payroll report; a worker already present for the
/// month is replaced
pub(super) fn upsert_payroll(
    conn: &Connection,
    import_id: i64,
    report: &PayrollReport,
) -> Result<usize> {
    let mut written = 0;
    for row in &report.rows {
        written += conn.execute(
            r#"
            INSERT INTO payroll_costs (month, worker_id, worker_name, vehicle_id, gross, employee_ss,
                                       withholding, net, employer_ss, total_cost, import_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(month, worker_id) DO UPDATE SET
                worker_name = excluded.worker_name,
                vehicle_id = excluded.vehicle_id,
                gross = excluded.gross,
                employee_ss = excluded.employee_ss,
                withholding = excluded.withholding,
                net = excluded.net,
                employer_ss = excluded.employer_ss,
                total_cost = excluded.total_cost,
                import_id = excluded.import_id
            "#,
            params![
                report.month,
                row.worker_id,
                row.worker_name,
                row.vehicle_id,
                row.gross,
                row.employee_ss,
                row.withholding,
                row.net,
                row.employer_ss,
                row.total_cost,
                import_id,
            ],
        )?;
    }
    Ok(written)
}

impl Database {
    /// Payroll rows for a YYYY-MM month, by worker id
    pub fn list_payroll(&self, month: &str) -> Result<Vec<PayrollCost>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, month, worker_id, worker_name, vehicle_id, gross, employee_ss,
                   withholding, net, employer_ss, total_cost, import_id
            FROM payroll_costs
            WHERE month = ?
            ORDER BY worker_id
            "#,
        )?;

        let rows = stmt
            .query_map(params![month], |row| {
                Ok(PayrollCost {
                    id: row.get(0)?,
                    month: row.get(1)?,
                    worker_id: row.get(2)?,
                    worker_name: row.get(3)?,
                    vehicle_id: row.get(4)?,
                    gross: row.get(5)?,
                    employee_ss: row.get(6)?,
                    withholding: row.get(7)?,
                    net: row.get(8)?,
                    employer_ss: row.get(9)?,
                    total_cost: row.get(10)?,
                    import_id: row.get(11)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn count_payroll(&self, month: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM payroll_costs WHERE month = ?",
            params![month],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
