//! Domain models for flota

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Pseudo-vehicle for costs shared by the whole fleet
pub const COMMON_VEHICLE: &str = "COMUN";

/// Fallback category for unmatched positive movements
pub const INCOME_CATEGORY: &str = "INGRESO";

/// Fallback category for unmatched negative movements
pub const OTHER_CATEGORY: &str = "OTRO";

/// Category for fuel invoice movements
pub const FUEL_CATEGORY: &str = "COMB";

/// Category for toll invoice movements
pub const TOLL_CATEGORY: &str = "PEAJ";

/// Whether a category books costs or revenue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Expense,
    Income,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl std::str::FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expense" | "gasto" => Ok(Self::Expense),
            "income" | "ingreso" => Ok(Self::Income),
            _ => Err(format!("Unknown category kind: {}", s)),
        }
    }
}

impl std::fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An expense or income category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub kind: CategoryKind,
    /// Typical attribution (VEHICULO, COMUN, a vehicle id, MANUAL)
    pub assignment: Option<String>,
}

/// A vehicle or the shared pseudo-vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub name: String,
    pub monthly_depreciation: f64,
}

/// Substring pattern assigning a category and optionally a vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizationRule {
    pub pattern: String,
    pub category_id: String,
    pub vehicle_id: Option<String>,
}

impl CategorizationRule {
    pub fn new(pattern: &str, category_id: &str, vehicle_id: Option<&str>) -> Self {
        Self {
            pattern: pattern.to_string(),
            category_id: category_id.to_string(),
            vehicle_id: vehicle_id.map(String::from),
        }
    }
}

/// A stored rule with its priority (lower runs first)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub priority: i64,
    pub active: bool,
    #[serde(flatten)]
    pub rule: CategorizationRule,
}

/// A movement ready to be persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMovement {
    pub date: NaiveDate,
    pub description: String,
    /// Signed EUR amount, negative for expenses
    pub amount: f64,
    pub category_id: String,
    pub vehicle_id: Option<String>,
    pub reference: Option<String>,
    pub needs_review: bool,
}

/// A persisted ledger movement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub category_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub reference: Option<String>,
    pub needs_review: bool,
    pub import_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Filters for listing movements
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub vehicle_id: Option<String>,
    pub category_id: Option<String>,
    pub needs_review: Option<bool>,
    pub limit: Option<i64>,
}

/// The kind of source document, resolved once by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    BankStatement,
    StarOilInvoice,
    SolredInvoice,
    ValcarceFuelInvoice,
    ValcarceTollInvoice,
    Payroll,
    RouteSheet,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BankStatement => "bank_statement",
            Self::StarOilInvoice => "staroil_invoice",
            Self::SolredInvoice => "solred_invoice",
            Self::ValcarceFuelInvoice => "valcarce_fuel_invoice",
            Self::ValcarceTollInvoice => "valcarce_toll_invoice",
            Self::Payroll => "payroll",
            Self::RouteSheet => "route_sheet",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            Self::BankStatement => "Bank statement",
            Self::StarOilInvoice => "StarOil invoice",
            Self::SolredInvoice => "Solred/Waylet invoice",
            Self::ValcarceFuelInvoice => "Valcarce fuel invoice",
            Self::ValcarceTollInvoice => "Valcarce toll invoice",
            Self::Payroll => "Payroll costs",
            Self::RouteSheet => "Route sheet",
        }
    }

    pub fn is_invoice(&self) -> bool {
        matches!(
            self,
            Self::StarOilInvoice
                | Self::SolredInvoice
                | Self::ValcarceFuelInvoice
                | Self::ValcarceTollInvoice
        )
    }

    pub fn all() -> [DocumentType; 7] {
        [
            Self::BankStatement,
            Self::StarOilInvoice,
            Self::SolredInvoice,
            Self::ValcarceFuelInvoice,
            Self::ValcarceTollInvoice,
            Self::Payroll,
            Self::RouteSheet,
        ]
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        DocumentType::all()
            .into_iter()
            .find(|t| t.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown document type: {}", s))
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Import history entry to be written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewImport {
    pub file_name: String,
    pub content_hash: String,
    pub declared_type: DocumentType,
    /// YYYY-MM the document refers to
    pub reference_month: Option<String>,
    pub item_count: i64,
    pub period_from: Option<NaiveDate>,
    pub period_to: Option<NaiveDate>,
}

/// A recorded import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecord {
    pub id: i64,
    pub file_name: String,
    pub content_hash: String,
    pub declared_type: DocumentType,
    pub reference_month: Option<String>,
    pub item_count: i64,
    pub period_from: Option<NaiveDate>,
    pub period_to: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_round_trip() {
        for doc_type in DocumentType::all() {
            let parsed: DocumentType = doc_type.as_str().parse().unwrap();
            assert_eq!(parsed, doc_type);
        }
        assert!("invoice".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_category_kind_parse() {
        assert_eq!("GASTO".parse::<CategoryKind>(), Ok(CategoryKind::Expense));
        assert_eq!("income".parse::<CategoryKind>(), Ok(CategoryKind::Income));
        assert!("asset".parse::<CategoryKind>().is_err());
    }

    #[test]
    fn test_invoice_types() {
        assert!(DocumentType::SolredInvoice.is_invoice());
        assert!(DocumentType::ValcarceTollInvoice.is_invoice());
        assert!(!DocumentType::Payroll.is_invoice());
        assert!(!DocumentType::BankStatement.is_invoice());
    }
}
