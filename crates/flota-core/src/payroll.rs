//! Labour cost PDF parser
//!
//! The month is only printed in the file name (`COST_202512_Emp_65.pdf`),
//! never on the pages, so a file name without it is rejected up front.
//! Rows are matched by a single-digit worker id and read positionally.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::locale::{parse_es_number, round2};
use crate::patterns::{number_tokens, static_regex};

/// Amounts a row must carry: gross, employee SS, withholding, net,
/// employer SS, total cost
pub const PAYROLL_FIELDS: usize = 6;

/// Tolerance for the gross/net and gross/total consistency checks
pub const CONSISTENCY_TOLERANCE: f64 = 0.02;

static_regex!(period_re, r"COST[\s_-]+(\d{6})");
static_regex!(row_re, r"^(\d)\s+(.+)");

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Worker {
    pub name: String,
    pub vehicle_id: String,
}

/// Worker id → worker, as configured
#[derive(Debug, Clone, Default)]
pub struct WorkerTable {
    workers: BTreeMap<u32, Worker>,
}

impl WorkerTable {
    pub fn new(workers: BTreeMap<u32, Worker>) -> Self {
        Self { workers }
    }

    pub fn get(&self, id: u32) -> Option<&Worker> {
        self.workers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// One worker's monthly cost
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayrollRow {
    pub worker_id: u32,
    pub worker_name: String,
    pub vehicle_id: String,
    pub gross: f64,
    pub employee_ss: f64,
    pub withholding: f64,
    pub net: f64,
    pub employer_ss: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayrollReport {
    /// YYYY-MM
    pub month: String,
    pub rows: Vec<PayrollRow>,
    /// Known workers whose row lacked amounts
    pub skipped: Vec<String>,
    pub warnings: Vec<String>,
}

impl PayrollReport {
    pub fn total_cost(&self) -> f64 {
        round2(self.rows.iter().map(|r| r.total_cost).sum())
    }

    pub fn cost_by_vehicle(&self) -> BTreeMap<String, f64> {
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for row in &self.rows {
            *totals.entry(row.vehicle_id.clone()).or_default() += row.total_cost;
        }
        for total in totals.values_mut() {
            *total = round2(*total);
        }
        totals
    }
}

/// Extract the YYYY-MM month from a `COST_YYYYMM` file name
pub fn month_from_filename(file_name: &str) -> Result<String> {
    let upper = file_name.to_uppercase();
    let caps = period_re()
        .captures(&upper)
        .ok_or_else(|| Error::MissingPeriod(file_name.to_string()))?;

    let digits = &caps[1];
    let month: u32 = digits[4..].parse().unwrap_or(0);
    if !(1..=12).contains(&month) {
        return Err(Error::MissingPeriod(format!(
            "{}: invalid month {}",
            file_name, digits
        )));
    }
    Ok(format!("{}-{}", &digits[..4], &digits[4..]))
}

/// Parse payroll text, month taken from the file name
pub fn parse_payroll(file_name: &str, text: &str, workers: &WorkerTable) -> Result<PayrollReport> {
    let month = month_from_filename(file_name)?;

    let mut report = PayrollReport {
        month,
        rows: Vec::new(),
        skipped: Vec::new(),
        warnings: Vec::new(),
    };

    for raw in text.lines() {
        let line = raw.trim();
        let Some(caps) = row_re().captures(line) else {
            continue;
        };

        let worker_id: u32 = caps[1].parse().unwrap_or(0);
        let Some(worker) = workers.get(worker_id) else {
            continue;
        };

        let amounts: Vec<f64> = number_tokens(&caps[2])
            .into_iter()
            .filter_map(parse_es_number)
            .filter(|v| *v > 0.0)
            .collect();

        if amounts.len() < PAYROLL_FIELDS {
            debug!(
                "Payroll row for worker {} has {} amounts, skipped",
                worker_id,
                amounts.len()
            );
            report.skipped.push(format!(
                "worker {} ({}): {} amounts, expected {}",
                worker_id,
                worker.name,
                amounts.len(),
                PAYROLL_FIELDS
            ));
            continue;
        }

        let row = PayrollRow {
            worker_id,
            worker_name: worker.name.clone(),
            vehicle_id: worker.vehicle_id.clone(),
            gross: amounts[0],
            employee_ss: amounts[1],
            withholding: amounts[2],
            net: amounts[3],
            employer_ss: amounts[4],
            total_cost: amounts[5],
        };
        check_consistency(&row, &mut report.warnings);
        report.rows.push(row);
    }

    info!(
        "Payroll {}: {} workers, {} skipped",
        report.month,
        report.rows.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Flag rows whose amounts do not add up in the assumed column order
fn check_consistency(row: &PayrollRow, warnings: &mut Vec<String>) {
    let expected_net = row.gross - row.employee_ss - row.withholding;
    if (expected_net - row.net).abs() > CONSISTENCY_TOLERANCE {
        warn!("Payroll worker {}: net does not match", row.worker_id);
        warnings.push(format!(
            "Worker {} ({}): gross - SS - withholding = {:.2} but net is {:.2}",
            row.worker_id, row.worker_name, expected_net, row.net
        ));
    }

    let expected_total = row.gross + row.employer_ss;
    if (expected_total - row.total_cost).abs() > CONSISTENCY_TOLERANCE {
        warnings.push(format!(
            "Worker {} ({}): gross + employer SS = {:.2} but total cost is {:.2}",
            row.worker_id, row.worker_name, expected_total, row.total_cost
        ));
    }
}
