//! Solred / Waylet fuel invoices
//!
//! Operation lines print five to eight amounts after the product name:
//! quantity, price before VAT, price with VAT, unit price, gross amount and,
//! when a discount applies, discount %, discount in cents per unit and the
//! settled amount. The settled amount is always the last token.

use tracing::debug;

use super::{summarize, InvoiceParseResult, LineItem, LineKind};
use crate::locale::{infer_line_date, parse_date, parse_es_number, round2};
use crate::patterns::{decimal_tokens, static_regex};
use crate::vehicles::VehicleRegistry;

/// Minimum amounts on an operation line
const MIN_LINE_AMOUNTS: usize = 5;

/// Discounted lines carry the cents-per-unit column
const DISCOUNTED_LINE_AMOUNTS: usize = 7;

// Matched with spaces removed: Fechadeoperación01/01/2026AL15/01/2026
static_regex!(
    period_compact_re,
    r"Fechadeoperaci[oó]n(\d{2}/\d{2}/\d{4})AL(\d{2}/\d{2}/\d{4})"
);
static_regex!(
    period_re,
    r"Fecha de operaci[oó]n\s+(\d{2}/\d{2}/\d{4})\s+AL\s+(\d{2}/\d{2}/\d{4})"
);
static_regex!(number_re, r"N[uú]m\.?\s*Factura\s+([A-Z0-9]+)");
static_regex!(number_compact_re, r"N[uú]m\.?Factura([A-Z0-9]+)");
static_regex!(
    total_re,
    r"Total Factura en Euros\s+([\d.,]+)\s+([\d.,]+)\s+([\d.,]+)"
);
// Nº de Tarjeta 7078 8378 9547 0026 Nº de Matrícula 9245-MJC Conductor
static_regex!(plate_re, r"N[º°o]\s*de\s+Matr[ií]cula\s+(\d{4}-[A-Z]{3})");
// 1189536 05/0115:33 DIESEL E+ NEOTECH (L) ...
static_regex!(operation_re, r"^(\d{6,})\s+(\d{2})/(\d{2})\s*\d{2}:\d{2}");

pub(super) fn parse(text: &str, registry: &VehicleRegistry, result: &mut InvoiceParseResult) {
    let compact = text.replace(' ', "");

    let period = period_compact_re()
        .captures(&compact)
        .or_else(|| period_re().captures(text));
    if let Some(caps) = period {
        result.invoice_date = parse_date(&caps[2]);
    }

    let number = number_re()
        .captures(text)
        .or_else(|| number_compact_re().captures(&compact));
    if let Some(caps) = number {
        result.invoice_number = Some(caps[1].to_string());
    }

    if let Some(caps) = total_re().captures(text) {
        result.declared_total = parse_es_number(&caps[3]);
    }

    let mut current_vehicle: Option<String> = None;

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();

        if let Some(caps) = plate_re().captures(line) {
            current_vehicle = registry.resolve(&caps[1]).map(String::from);
            if current_vehicle.is_none() {
                result
                    .errors
                    .push(format!("line {}: unknown plate {}", line_no + 1, &caps[1]));
            }
            continue;
        }

        let (kind, concept_pos) = match (line.find("DIESEL"), line.find("ADBLUE")) {
            (Some(pos), _) => (LineKind::Fuel, pos),
            (None, Some(pos)) => (LineKind::AdBlue, pos),
            (None, None) => continue,
        };

        let Some(caps) = operation_re().captures(line) else {
            continue;
        };

        let Some(vehicle_id) = current_vehicle.clone() else {
            result
                .errors
                .push(format!("line {}: operation without vehicle", line_no + 1));
            continue;
        };

        let tokens = decimal_tokens(&line[concept_pos..]);
        if tokens.len() < MIN_LINE_AMOUNTS {
            result.errors.push(format!(
                "line {}: expected at least {} amounts, found {}",
                line_no + 1,
                MIN_LINE_AMOUNTS,
                tokens.len()
            ));
            continue;
        }

        let amounts: Option<Vec<f64>> = tokens.iter().map(|t| parse_es_number(t)).collect();
        let Some(amounts) = amounts else {
            result
                .errors
                .push(format!("line {}: unparseable amounts", line_no + 1));
            continue;
        };

        let quantity = amounts[0];
        let price_vat = amounts[2];
        let gross = amounts[4];
        let settled = amounts[amounts.len() - 1];

        let discount_per_unit = if amounts.len() >= DISCOUNTED_LINE_AMOUNTS {
            amounts[5] / 100.0
        } else {
            0.0
        };

        let mut discount = gross - settled;
        if discount < 0.01 {
            discount = 0.0;
        }

        let day: u32 = caps[2].parse().unwrap_or(0);
        let month: u32 = caps[3].parse().unwrap_or(0);

        result.items.push(LineItem {
            vehicle_id,
            date: infer_line_date(day, month, result.invoice_date).or(result.invoice_date),
            kind,
            quantity: Some(quantity),
            gross_unit_price: Some(price_vat),
            unit_price: Some(price_vat - discount_per_unit),
            gross_amount: round2(gross),
            net_amount: round2(settled),
            discount_amount: round2(discount),
        });
    }

    debug!("Solred: {} operations", result.items.len());
    result.summaries = summarize(&result.items);
}
