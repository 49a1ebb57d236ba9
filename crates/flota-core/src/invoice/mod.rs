//! Fuel and toll invoice parsers
//!
//! Each provider prints a different layout, so every provider gets its own
//! line parser. The provider (and for Valcarce, fuel vs. tolls) is resolved
//! once by [`classify_invoice`]; an unknown provider is a hard error with no
//! partial output. Inside a recognized invoice, a line that fails to parse is
//! recorded in [`InvoiceParseResult::errors`] and the remaining lines are
//! still processed.

pub mod aggregate;
mod solred;
mod staroil;
mod valcarce;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::locale::round2;
use crate::models::{DocumentType, NewMovement, FUEL_CATEGORY, TOLL_CATEGORY};
use crate::patterns::static_regex;
use crate::vehicles::VehicleRegistry;

pub use aggregate::{prorate, summarize, weighted_average_price, VehicleSummary};

/// Spanish standard VAT multiplier
pub const VAT_FACTOR: f64 = 1.21;

/// Declared vs. computed totals may differ by this much before warning
pub const RECONCILIATION_TOLERANCE: f64 = 0.02;

static_regex!(valcarce_toll_marker_re, r"AT-\d*[A-Z]*\s+PEAJE");

/// Provider and layout variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InvoiceKind {
    StarOil,
    Solred,
    ValcarceFuel,
    ValcarceTolls,
}

impl InvoiceKind {
    /// Provider name as printed in movement descriptions
    pub fn provider(&self) -> &'static str {
        match self {
            Self::StarOil => "STAROIL",
            Self::Solred => "SOLRED",
            Self::ValcarceFuel | Self::ValcarceTolls => "VALCARCE",
        }
    }

    pub fn is_tolls(&self) -> bool {
        matches!(self, Self::ValcarceTolls)
    }

    pub fn document_type(&self) -> DocumentType {
        match self {
            Self::StarOil => DocumentType::StarOilInvoice,
            Self::Solred => DocumentType::SolredInvoice,
            Self::ValcarceFuel => DocumentType::ValcarceFuelInvoice,
            Self::ValcarceTolls => DocumentType::ValcarceTollInvoice,
        }
    }

    pub fn from_document_type(doc_type: DocumentType) -> Option<Self> {
        match doc_type {
            DocumentType::StarOilInvoice => Some(Self::StarOil),
            DocumentType::SolredInvoice => Some(Self::Solred),
            DocumentType::ValcarceFuelInvoice => Some(Self::ValcarceFuel),
            DocumentType::ValcarceTollInvoice => Some(Self::ValcarceTolls),
            _ => None,
        }
    }
}

/// Resolve the provider from extracted invoice text
pub fn classify_invoice(text: &str) -> Result<InvoiceKind> {
    let upper = text.to_uppercase();

    let kind = if upper.contains("STAROIL") {
        InvoiceKind::StarOil
    } else if upper.contains("SOLRED") || upper.contains("REPSOL") || upper.contains("WAYLET") {
        InvoiceKind::Solred
    } else if upper.contains("VALCARCE") {
        if valcarce_toll_marker_re().is_match(&upper) {
            InvoiceKind::ValcarceTolls
        } else {
            InvoiceKind::ValcarceFuel
        }
    } else {
        return Err(Error::ProviderUnrecognized(
            "no StarOil, Solred/Repsol/Waylet or Valcarce signature".to_string(),
        ));
    };

    debug!("Classified invoice as {:?}", kind);
    Ok(kind)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Fuel,
    AdBlue,
    Toll,
    /// Commission, insurance or membership fee
    Fee,
    /// Toll bonus, negative amount
    Rebate,
}

/// One priced line of an invoice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub vehicle_id: String,
    pub date: Option<NaiveDate>,
    pub kind: LineKind,
    /// Litres for fuel and AdBlue
    pub quantity: Option<f64>,
    /// Unit price as printed, VAT included
    pub gross_unit_price: Option<f64>,
    /// Unit price after discount
    pub unit_price: Option<f64>,
    pub gross_amount: f64,
    pub net_amount: f64,
    pub discount_amount: f64,
}

/// Everything extracted from one invoice
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceParseResult {
    pub kind: InvoiceKind,
    pub invoice_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
    /// Total as declared on the invoice
    pub declared_total: Option<f64>,
    pub items: Vec<LineItem>,
    pub summaries: Vec<VehicleSummary>,
    /// Lines that could not be parsed
    pub errors: Vec<String>,
    /// Reconciliation mismatches and other non-blocking notes
    pub warnings: Vec<String>,
}

impl InvoiceParseResult {
    fn new(kind: InvoiceKind) -> Self {
        Self {
            kind,
            invoice_date: None,
            invoice_number: None,
            declared_total: None,
            items: Vec::new(),
            summaries: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn provider(&self) -> &'static str {
        self.kind.provider()
    }

    /// YYYY-MM of the invoice date
    pub fn reference_month(&self) -> Option<String> {
        self.invoice_date.map(|d| d.format("%Y-%m").to_string())
    }

    /// Σ net over all vehicle summaries
    pub fn computed_total(&self) -> f64 {
        round2(self.summaries.iter().map(|s| s.net_total).sum())
    }

    /// One expense movement per vehicle with a positive net amount
    pub fn to_movements(&self) -> Vec<NewMovement> {
        let Some(date) = self
            .invoice_date
            .or_else(|| self.items.iter().filter_map(|i| i.date).max())
        else {
            return Vec::new();
        };
        let number = self.invoice_number.clone().unwrap_or_default();

        self.summaries
            .iter()
            .filter(|s| s.net_total > 0.0)
            .map(|s| {
                let (description, category) = if self.kind.is_tolls() {
                    (
                        format!(
                            "{} Fra.{} - Peajes ({} usos)",
                            self.provider(),
                            number,
                            s.toll_count
                        ),
                        TOLL_CATEGORY,
                    )
                } else {
                    let mut description = format!(
                        "{} Fra.{} - {:.0}L gasoil",
                        self.provider(),
                        number,
                        s.fuel_quantity
                    );
                    if s.adblue_quantity > 0.0 {
                        description.push_str(&format!(" + {:.0}L AdBlue", s.adblue_quantity));
                    }
                    description.push_str(&format!(" ({} rep.)", s.item_count));
                    (description, FUEL_CATEGORY)
                };

                NewMovement {
                    date,
                    description,
                    amount: -round2(s.net_total),
                    category_id: category.to_string(),
                    vehicle_id: Some(s.vehicle_id.clone()),
                    reference: self.invoice_number.clone(),
                    needs_review: false,
                }
            })
            .collect()
    }

    /// Compare the declared total with the computed one
    fn reconcile(&mut self) {
        let Some(declared) = self.declared_total else {
            self.warnings
                .push("Invoice total not found; totals not reconciled".to_string());
            return;
        };

        let computed = self.computed_total();
        if (declared - computed).abs() > RECONCILIATION_TOLERANCE {
            warn!(
                "{} invoice {:?}: declared {:.2} vs computed {:.2}",
                self.provider(),
                self.invoice_number,
                declared,
                computed
            );
            self.warnings.push(format!(
                "Declared total {:.2} differs from computed {:.2}",
                declared, computed
            ));
        }
    }
}

/// Classify and parse an invoice
pub fn parse_invoice(text: &str, registry: &VehicleRegistry) -> Result<InvoiceParseResult> {
    let kind = classify_invoice(text)?;
    Ok(parse_invoice_as(kind, text, registry))
}

/// Parse an invoice whose provider is already known
pub fn parse_invoice_as(
    kind: InvoiceKind,
    text: &str,
    registry: &VehicleRegistry,
) -> InvoiceParseResult {
    let mut result = InvoiceParseResult::new(kind);

    match kind {
        InvoiceKind::StarOil => staroil::parse(text, registry, &mut result),
        InvoiceKind::Solred => solred::parse(text, registry, &mut result),
        InvoiceKind::ValcarceFuel => valcarce::parse_fuel(text, registry, &mut result),
        InvoiceKind::ValcarceTolls => valcarce::parse_tolls(text, registry, &mut result),
    }

    if result.items.is_empty() {
        result
            .errors
            .push("No line items found in invoice".to_string());
    }
    result.reconcile();

    info!(
        "Parsed {} invoice {}: {} lines, {} vehicles, {} errors",
        kind.provider(),
        result.invoice_number.as_deref().unwrap_or("?"),
        result.items.len(),
        result.summaries.len(),
        result.errors.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn registry() -> VehicleRegistry {
        crate::config::FleetConfig::embedded()
            .unwrap()
            .vehicle_registry()
    }

    #[test]
    fn test_classify_providers() {
        assert_eq!(
            classify_invoice("STAROIL DISTRIBUCION").unwrap(),
            InvoiceKind::StarOil
        );
        assert_eq!(
            classify_invoice("Waylet / Repsol").unwrap(),
            InvoiceKind::Solred
        );
        assert_eq!(
            classify_invoice("VALCARCE\nGA GASOLEO \"A\" 17-12").unwrap(),
            InvoiceKind::ValcarceFuel
        );
        assert_eq!(
            classify_invoice("Valcarce\nAT-1K PEAJE 27-11 08:31").unwrap(),
            InvoiceKind::ValcarceTolls
        );
    }

    #[test]
    fn test_unknown_provider_is_fatal() {
        let err = classify_invoice("FACTURA GENERICA SL").unwrap_err();
        assert!(matches!(err, Error::ProviderUnrecognized(_)));
        assert!(parse_invoice("nothing here", &registry()).is_err());
    }

    #[test]
    fn test_kind_document_type_mapping() {
        for kind in [
            InvoiceKind::StarOil,
            InvoiceKind::Solred,
            InvoiceKind::ValcarceFuel,
            InvoiceKind::ValcarceTolls,
        ] {
            assert_eq!(InvoiceKind::from_document_type(kind.document_type()), Some(kind));
        }
        assert_eq!(InvoiceKind::from_document_type(DocumentType::Payroll), None);
    }

    #[test]
    fn test_fuel_movement_description() {
        let mut result = InvoiceParseResult::new(InvoiceKind::StarOil);
        result.invoice_date = NaiveDate::from_ymd_opt(2025, 12, 31);
        result.invoice_number = Some("2503369".to_string());
        result.items = vec![
            LineItem {
                vehicle_id: "MJC".to_string(),
                date: result.invoice_date,
                kind: LineKind::Fuel,
                quantity: Some(200.0),
                gross_unit_price: Some(1.428),
                unit_price: Some(1.263),
                gross_amount: 165.34,
                net_amount: 138.07,
                discount_amount: 27.27,
            },
            LineItem {
                vehicle_id: "MJC".to_string(),
                date: result.invoice_date,
                kind: LineKind::AdBlue,
                quantity: Some(20.0),
                gross_unit_price: Some(0.9),
                unit_price: Some(0.6),
                gross_amount: 14.88,
                net_amount: 9.92,
                discount_amount: 4.96,
            },
        ];
        result.summaries = summarize(&result.items);

        let movements = result.to_movements();
        assert_eq!(movements.len(), 1);
        assert_eq!(
            movements[0].description,
            "STAROIL Fra.2503369 - 200L gasoil + 20L AdBlue (2 rep.)"
        );
        assert_eq!(movements[0].amount, -147.99);
        assert_eq!(movements[0].category_id, FUEL_CATEGORY);
        assert_eq!(movements[0].reference.as_deref(), Some("2503369"));
        assert_eq!(movements[0].vehicle_id.as_deref(), Some("MJC"));
    }

    #[test]
    fn test_reconcile_warns_on_mismatch() {
        let mut result = InvoiceParseResult::new(InvoiceKind::Solred);
        result.declared_total = Some(100.0);
        result.summaries = vec![VehicleSummary {
            net_total: 99.5,
            ..VehicleSummary::new("MTY")
        }];
        result.reconcile();
        assert_eq!(result.warnings.len(), 1);

        let mut close = InvoiceParseResult::new(InvoiceKind::Solred);
        close.declared_total = Some(100.0);
        close.summaries = vec![VehicleSummary {
            net_total: 99.99,
            ..VehicleSummary::new("MTY")
        }];
        close.reconcile();
        assert!(close.warnings.is_empty());
    }
}
