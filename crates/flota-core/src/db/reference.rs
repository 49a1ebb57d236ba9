//! Vehicles, categories and categorization rules

use rusqlite::params;
use serde::Serialize;
use tracing::info;

use super::Database;
use crate::config::FleetConfig;
use crate::error::{Error, Result};
use crate::models::{CategorizationRule, Category, CategoryKind, Rule, Vehicle};

/// Rows written by a reference seed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    pub vehicles: usize,
    pub categories: usize,
    pub rules: usize,
}

impl Database {
    /// Seed reference tables from the fleet config
    ///
    /// Existing rows are left untouched, so re-running is harmless and
    /// manual edits (disabled rules, depreciation) survive.
    pub fn seed_reference(&self, config: &FleetConfig) -> Result<SeedResult> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut result = SeedResult::default();

        for vehicle in config.vehicles() {
            result.vehicles += tx.execute(
                "INSERT OR IGNORE INTO vehicles (id, name, monthly_depreciation) VALUES (?, ?, ?)",
                params![vehicle.id, vehicle.name, vehicle.monthly_depreciation],
            )?;
        }

        for category in config.categories() {
            result.categories += tx.execute(
                "INSERT OR IGNORE INTO categories (id, name, kind, assignment) VALUES (?, ?, ?, ?)",
                params![
                    category.id,
                    category.name,
                    category.kind.as_str(),
                    category.assignment
                ],
            )?;
        }

        for (priority, rule) in config.rules().iter().enumerate() {
            result.rules += tx.execute(
                "INSERT OR IGNORE INTO rules (pattern, category_id, vehicle_id, priority) VALUES (?, ?, ?, ?)",
                params![rule.pattern, rule.category_id, rule.vehicle_id, priority as i64],
            )?;
        }

        tx.commit()?;
        info!(
            "Seeded {} vehicles, {} categories, {} rules",
            result.vehicles, result.categories, result.rules
        );
        Ok(result)
    }

    pub fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, monthly_depreciation FROM vehicles ORDER BY id")?;
        let vehicles = stmt
            .query_map([], |row| {
                Ok(Vehicle {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    monthly_depreciation: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(vehicles)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, kind, assignment FROM categories ORDER BY id")?;
        let categories = stmt
            .query_map([], |row| {
                let kind: String = row.get(2)?;
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    kind: kind.parse().unwrap_or(CategoryKind::Expense),
                    assignment: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Rules in evaluation order
    pub fn list_rules(&self, include_inactive: bool) -> Result<Vec<Rule>> {
        let conn = self.conn()?;
        let sql = if include_inactive {
            "SELECT id, pattern, category_id, vehicle_id, priority, active FROM rules ORDER BY priority, id"
        } else {
            "SELECT id, pattern, category_id, vehicle_id, priority, active FROM rules WHERE active = 1 ORDER BY priority, id"
        };
        let mut stmt = conn.prepare(sql)?;
        let rules = stmt
            .query_map([], |row| {
                Ok(Rule {
                    id: row.get(0)?,
                    rule: CategorizationRule {
                        pattern: row.get(1)?,
                        category_id: row.get(2)?,
                        vehicle_id: row.get(3)?,
                    },
                    priority: row.get(4)?,
                    active: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    /// Active rules ready for the rule engine
    pub fn active_rules(&self) -> Result<Vec<CategorizationRule>> {
        Ok(self
            .list_rules(false)?
            .into_iter()
            .map(|r| r.rule)
            .collect())
    }

    /// Append a rule; `priority` defaults to after every existing rule
    pub fn add_rule(&self, rule: &CategorizationRule, priority: Option<i64>) -> Result<i64> {
        if rule.pattern.trim().is_empty() {
            return Err(Error::InvalidData("Rule pattern cannot be empty".to_string()));
        }

        let conn = self.conn()?;
        let priority = match priority {
            Some(p) => p,
            None => conn.query_row(
                "SELECT COALESCE(MAX(priority), -1) + 1 FROM rules",
                [],
                |row| row.get(0),
            )?,
        };

        conn.execute(
            "INSERT INTO rules (pattern, category_id, vehicle_id, priority) VALUES (?, ?, ?, ?)",
            params![
                rule.pattern.to_uppercase(),
                rule.category_id,
                rule.vehicle_id,
                priority
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn set_rule_active(&self, id: i64, active: bool) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE rules SET active = ? WHERE id = ?",
            params![active, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("rule {}", id)));
        }
        Ok(())
    }

    pub fn update_depreciation(&self, vehicle_id: &str, amount: f64) -> Result<()> {
        if amount < 0.0 {
            return Err(Error::InvalidData(format!(
                "Depreciation cannot be negative: {}",
                amount
            )));
        }
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE vehicles SET monthly_depreciation = ? WHERE id = ?",
            params![amount, vehicle_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("vehicle {}", vehicle_id)));
        }
        Ok(())
    }
}
