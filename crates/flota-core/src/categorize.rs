//! Rule-based categorization of bank movements
//!
//! Rules are evaluated in order and the first pattern contained in the
//! description wins. Matching ignores case and diacritics. A movement always
//! leaves this module with a category: unmatched income falls back to
//! `INGRESO`, anything else to `OTRO`, and both are flagged for review.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::bank::BankRow;
use crate::locale::normalize_text;
use crate::models::{
    CategorizationRule, Category, CategoryKind, NewMovement, INCOME_CATEGORY, OTHER_CATEGORY,
};

/// Outcome of categorizing one description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub category_id: String,
    pub vehicle_id: Option<String>,
    pub needs_review: bool,
    /// The rule pattern that matched, if any
    pub matched_pattern: Option<String>,
}

/// Ordered rule set plus the category kinds needed for review flags
#[derive(Debug, Clone)]
pub struct RuleEngine {
    /// (normalized pattern, rule) in priority order
    rules: Vec<(String, CategorizationRule)>,
    kinds: HashMap<String, CategoryKind>,
}

impl RuleEngine {
    pub fn new(rules: Vec<CategorizationRule>, categories: &[Category]) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| (normalize_text(&r.pattern), r))
            .filter(|(pattern, _)| !pattern.is_empty())
            .collect();
        let kinds = categories.iter().map(|c| (c.id.clone(), c.kind)).collect();
        Self { rules, kinds }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Categorize a description with its signed amount
    pub fn assign(&self, description: &str, amount: f64) -> Assignment {
        let haystack = normalize_text(description);

        if let Some((_, rule)) = self
            .rules
            .iter()
            .find(|(pattern, _)| haystack.contains(pattern.as_str()))
        {
            let is_expense = self
                .kinds
                .get(&rule.category_id)
                .map(|kind| *kind == CategoryKind::Expense)
                .unwrap_or(false);

            return Assignment {
                category_id: rule.category_id.clone(),
                vehicle_id: rule.vehicle_id.clone(),
                needs_review: is_expense && rule.vehicle_id.is_none(),
                matched_pattern: Some(rule.pattern.clone()),
            };
        }

        debug!("No rule matched: {}", description);
        let fallback = if amount > 0.0 {
            INCOME_CATEGORY
        } else {
            OTHER_CATEGORY
        };
        Assignment {
            category_id: fallback.to_string(),
            vehicle_id: None,
            needs_review: true,
            matched_pattern: None,
        }
    }

    /// Turn parsed statement rows into categorized movements
    pub fn categorize_rows(&self, rows: &[BankRow]) -> Vec<NewMovement> {
        rows.iter()
            .map(|row| {
                let assignment = self.assign(&row.description, row.amount);
                NewMovement {
                    date: row.date,
                    description: row.description.clone(),
                    amount: row.amount,
                    category_id: assignment.category_id,
                    vehicle_id: assignment.vehicle_id,
                    reference: row.reference.clone(),
                    needs_review: assignment.needs_review,
                }
            })
            .collect()
    }
}
