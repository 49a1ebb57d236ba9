//! Content-level duplicate detection
//!
//! Candidates are fingerprinted as (date, first 50 characters of the
//! description, amount in cents) and compared against movements already in the
//! ledger for the same date range. A hit is a warning for the user to confirm;
//! the hard guarantee lives in the sink's unique index.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::NewMovement;
use crate::sink::LedgerSink;

/// Description prefix length used in fingerprints
const DESCRIPTION_PREFIX: usize = 50;

/// Amount in integer cents, so keys hash and compare exactly
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Fingerprint {
    pub date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
}

impl Fingerprint {
    pub fn new(date: NaiveDate, description: &str, amount: f64) -> Self {
        Self {
            date,
            description: description.chars().take(DESCRIPTION_PREFIX).collect(),
            amount_cents: to_cents(amount),
        }
    }
}

impl From<&NewMovement> for Fingerprint {
    fn from(m: &NewMovement) -> Self {
        Fingerprint::new(m.date, &m.description, m.amount)
    }
}

/// Flag each candidate whose fingerprint already exists in the ledger
///
/// The returned vector is parallel to `candidates`.
pub fn flag_duplicates<S: LedgerSink + ?Sized>(
    sink: &S,
    candidates: &[NewMovement],
) -> Result<Vec<bool>> {
    let (Some(from), Some(to)) = (
        candidates.iter().map(|m| m.date).min(),
        candidates.iter().map(|m| m.date).max(),
    ) else {
        return Ok(Vec::new());
    };

    let existing: HashSet<Fingerprint> = sink
        .movement_keys_between(from, to)?
        .into_iter()
        .map(|(date, description, amount)| Fingerprint::new(date, &description, amount))
        .collect();

    let flags: Vec<bool> = candidates
        .iter()
        .map(|m| existing.contains(&Fingerprint::from(m)))
        .collect();

    debug!(
        "{} of {} candidates already in ledger between {} and {}",
        flags.iter().filter(|f| **f).count(),
        candidates.len(),
        from,
        to
    );
    Ok(flags)
}
