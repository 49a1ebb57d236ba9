//! StarOil fuel invoices
//!
//! Lines print VAT-inclusive unit price and amount. The card discount is a
//! fixed published rate per litre, so it is applied line by line and nothing
//! needs prorating.

use tracing::debug;

use super::{summarize, InvoiceParseResult, LineItem, LineKind, VAT_FACTOR};
use crate::locale::{parse_date, parse_es_number, round2};
use crate::patterns::static_regex;
use crate::vehicles::VehicleRegistry;

/// Gasoil discount per litre, VAT included
pub const GASOIL_DISCOUNT_VAT: f64 = 0.165;

/// AdBlue discount per litre, VAT included
pub const ADBLUE_DISCOUNT_VAT: f64 = 0.30;

// 31/12/25 2503369 101217
static_regex!(header_re, r"^(\d{2}/\d{2}/\d{2})\s+(\d{6,})");
// Matrícula: 9245MJC
static_regex!(plate_re, r":\s*(\d*[A-Z]{2,3})");
// 1050227643 01/12/25 107727 Gasol A 140,06 1,428 200,00
static_regex!(
    item_re,
    r"^(\d{10})\s+(\d{2}/\d{2}/\d{2})\s+\d+\s+(Gasol\s*A|AdBlue)\s+([\d.,]+)\s+([\d.,]+)\s+([\d.,]+)"
);
// 4.178,56 21,00 877,50 5.056,06
static_regex!(total_re, r"(?m)([\d.,]+)\s+21[,.]00\s+([\d.,]+)\s+([\d.,]+)\s*$");

pub(super) fn parse(text: &str, registry: &VehicleRegistry, result: &mut InvoiceParseResult) {
    let mut current_vehicle: Option<String> = None;

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();

        if let Some(caps) = header_re().captures(line) {
            if let Some(date) = parse_date(&caps[1]) {
                result.invoice_date = Some(date);
                result.invoice_number = Some(caps[2].to_string());
            }
        }

        if line.contains("Matrícula") || line.contains("Matricula") {
            if let Some(caps) = plate_re().captures(line) {
                current_vehicle = registry.resolve(&caps[1]).map(String::from);
                if current_vehicle.is_none() {
                    result
                        .errors
                        .push(format!("line {}: unknown plate {}", line_no + 1, &caps[1]));
                }
            }
        }

        let Some(caps) = item_re().captures(line) else {
            continue;
        };

        let Some(vehicle_id) = current_vehicle.clone() else {
            result
                .errors
                .push(format!("line {}: refuel without vehicle", line_no + 1));
            continue;
        };

        let (Some(liters), Some(gross_price), Some(amount_vat)) = (
            parse_es_number(&caps[4]),
            parse_es_number(&caps[5]),
            parse_es_number(&caps[6]),
        ) else {
            result
                .errors
                .push(format!("line {}: unparseable amounts", line_no + 1));
            continue;
        };

        let (kind, discount_rate) = if caps[3].starts_with("Gasol") {
            (LineKind::Fuel, GASOIL_DISCOUNT_VAT)
        } else {
            (LineKind::AdBlue, ADBLUE_DISCOUNT_VAT)
        };

        let base = amount_vat / VAT_FACTOR;
        let discount = liters * discount_rate / VAT_FACTOR;

        result.items.push(LineItem {
            vehicle_id,
            date: parse_date(&caps[2]).or(result.invoice_date),
            kind,
            quantity: Some(liters),
            gross_unit_price: Some(gross_price),
            unit_price: Some(gross_price - discount_rate),
            gross_amount: round2(base),
            net_amount: round2(base - discount),
            discount_amount: round2(discount),
        });
    }

    if let Some(caps) = total_re().captures_iter(text).last() {
        result.declared_total = parse_es_number(&caps[1]);
    }

    debug!("StarOil: {} refuels", result.items.len());
    result.summaries = summarize(&result.items);
}
