//! Monthly document checklist
//!
//! Closing a month needs:
//! - Mandatory documents: bank statement, StarOil, Solred and Valcarce toll
//!   invoices, payroll costs
//! - Optional items detected from categorized movements: workshop, tyres,
//!   insurance, leasing
//!
//! Any item can be marked not applicable for a month; clearing the override
//! puts it back to its computed status.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::DocumentType;

/// Document types every month needs
pub const MANDATORY_DOCUMENTS: [DocumentType; 5] = [
    DocumentType::BankStatement,
    DocumentType::StarOilInvoice,
    DocumentType::SolredInvoice,
    DocumentType::ValcarceTollInvoice,
    DocumentType::Payroll,
];

/// Categories whose movements mark an optional item as present
pub const DETECTED_CATEGORIES: [&str; 4] = ["TALL", "NEUM", "SEG", "LEAS"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Imported,
    /// Movements of the category exist in the month
    Detected,
    NotApplicable,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Imported => "imported",
            Self::Detected => "detected",
            Self::NotApplicable => "not_applicable",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(Self::Pending),
            "imported" => Ok(Self::Imported),
            "detected" => Ok(Self::Detected),
            "not_applicable" | "na" | "n/a" => Ok(Self::NotApplicable),
            _ => Err(format!("Unknown checklist status: {}", s)),
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistItem {
    /// Document type (`bank_statement`) or category id (`TALL`)
    pub key: String,
    pub label: String,
    pub mandatory: bool,
    pub status: ItemStatus,
    /// Whether the status comes from a manual override
    pub overridden: bool,
    /// Matching imports or movements
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Checklist {
    pub month: String,
    pub items: Vec<ChecklistItem>,
}

impl Checklist {
    /// Every mandatory item imported or marked not applicable
    pub fn is_complete(&self) -> bool {
        self.items
            .iter()
            .filter(|i| i.mandatory)
            .all(|i| i.status.is_resolved())
    }

    pub fn pending(&self) -> Vec<&ChecklistItem> {
        self.items
            .iter()
            .filter(|i| i.status == ItemStatus::Pending)
            .collect()
    }
}

/// Validate a YYYY-MM month string
pub fn parse_month(month: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| Error::InvalidData(format!("Invalid month (expected YYYY-MM): {}", month)))
}

fn is_known_item(key: &str) -> bool {
    MANDATORY_DOCUMENTS.iter().any(|d| d.as_str() == key) || DETECTED_CATEGORIES.contains(&key)
}

/// Builds and edits monthly checklists against the ledger
pub struct MonthlyChecklist<'a> {
    db: &'a Database,
}

impl<'a> MonthlyChecklist<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn build(&self, month: &str) -> Result<Checklist> {
        parse_month(month)?;
        let overrides = self.db.checklist_overrides(month)?;
        let categories = self.db.list_categories()?;

        let mut items = Vec::new();

        for doc_type in MANDATORY_DOCUMENTS {
            let mut count = self.db.imports_for_month(month, doc_type)?.len() as i64;
            if doc_type == DocumentType::Payroll {
                count = count.max(self.db.count_payroll(month)?);
            }
            let computed = if count > 0 {
                ItemStatus::Imported
            } else {
                ItemStatus::Pending
            };
            items.push(item(
                doc_type.as_str(),
                doc_type.label(),
                true,
                computed,
                count,
                overrides.get(doc_type.as_str()),
            ));
        }

        for category_id in DETECTED_CATEGORIES {
            let count = self.db.count_movements_in_month(month, category_id)?;
            let computed = if count > 0 {
                ItemStatus::Detected
            } else {
                ItemStatus::Pending
            };
            let label = categories
                .iter()
                .find(|c| c.id == category_id)
                .map(|c| c.name.as_str())
                .unwrap_or(category_id);
            items.push(item(
                category_id,
                label,
                false,
                computed,
                count,
                overrides.get(category_id),
            ));
        }

        debug!("Checklist for {}: {} items", month, items.len());
        Ok(Checklist {
            month: month.to_string(),
            items,
        })
    }

    /// Mark an item not applicable, or restore it with `Pending`
    pub fn set_status(&self, month: &str, key: &str, status: ItemStatus) -> Result<()> {
        parse_month(month)?;
        if !is_known_item(key) {
            return Err(Error::NotFound(format!("checklist item {}", key)));
        }

        match status {
            ItemStatus::NotApplicable => {
                self.db
                    .set_checklist_override(month, key, status.as_str())?;
            }
            ItemStatus::Pending => {
                self.db.clear_checklist_override(month, key)?;
            }
            other => {
                return Err(Error::InvalidData(format!(
                    "{} is computed from the ledger and cannot be set manually",
                    other
                )));
            }
        }
        Ok(())
    }
}

fn item(
    key: &str,
    label: &str,
    mandatory: bool,
    computed: ItemStatus,
    count: i64,
    override_status: Option<&String>,
) -> ChecklistItem {
    let forced = override_status.and_then(|s| s.parse::<ItemStatus>().ok());
    ChecklistItem {
        key: key.to_string(),
        label: label.to_string(),
        mandatory,
        status: forced.unwrap_or(computed),
        overridden: forced.is_some(),
        count,
    }
}
