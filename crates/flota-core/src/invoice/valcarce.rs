//! Valcarce invoices, fuel and motorway tolls
//!
//! Neither layout prints a net amount per line. The authoritative figure is
//! the per-vehicle "Total Base Imponible" closing each vehicle block.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::{prorate, summarize, InvoiceParseResult, LineItem, LineKind, VAT_FACTOR};
use crate::locale::{infer_line_date, parse_date, parse_es_number, round2};
use crate::patterns::static_regex;
use crate::vehicles::VehicleRegistry;

// 31/12/2025 462989 24034 1
static_regex!(fuel_header_re, r"^\s*(\d{2}/\d{2}/\d{4})\s+(\d{5,})\s+\d+");
// 16/01/2026 T84194 24034
static_regex!(toll_header_re, r"^\s*(\d{2}/\d{2}/\d{4})\s+([A-Z]?\d{5,})\s+\d+");
// ** Vehículo : 9245MJC
static_regex!(vehicle_re, r"Veh[ií]culo\s*:\s*(\d*[A-Z]{2,3})");
// GA GASOLEO "A" 17-12 0039627 255,01 1,1854 302,29
static_regex!(
    fuel_item_re,
    r"^GA\s+GASOLEO.*?(\d{2})-(\d{2})\s+\d+\s+([\d.,]+)\s+([\d.,]+)\s+([\d.,]+)"
);
// AT-1K PEAJE 27-11 08:31 1,00 4,690 4,69
static_regex!(
    toll_item_re,
    r"^AT-\d*[A-Z]*\s+PEAJE\s+(\d{2})-(\d{2})\s+\d{2}:\d{2}\s+[\d,]+\s+(-?[\d,]+)\s+(-?[\d,]+)"
);
static_regex!(
    fee_item_re,
    r"^AT-[A-Z]+\s+(COMISION|SEGURO|CUOTA).*?[\d,]+\s+([\d,]+)\s*$"
);
// -- Total Base Imponible 249,83 255,01
static_regex!(vehicle_base_re, r"^--\s*Total Base Imponible\s+([\d.,]+)\s+[\d.,]+");
static_regex!(fuel_total_re, r"--\s*BASE IMPONIBLE.*?([\d.,]+)\s+21");
// BASE IMPONIBLE ... %IVA ... TOTAL FACTURA \n 134,83 21 28,31 163,14
static_regex!(
    toll_total_re,
    r"(?s)BASE IMPONIBLE.*?%IVA.*?TOTAL FACTURA.*?\n\s*([\d.,]+)\s+21\s+([\d.,]+)\s+([\d.,]+)"
);

fn resolve_vehicle(
    registry: &VehicleRegistry,
    plate: &str,
    line_no: usize,
    result: &mut InvoiceParseResult,
) -> Option<String> {
    let vehicle = registry.resolve(plate).map(String::from);
    if vehicle.is_none() {
        result
            .errors
            .push(format!("line {}: unknown plate {}", line_no + 1, plate));
    }
    vehicle
}

fn day_month(caps: &regex::Captures<'_>) -> (u32, u32) {
    (caps[1].parse().unwrap_or(0), caps[2].parse().unwrap_or(0))
}

/// Set a line's net amount and derive its discount and unit price
fn apply_net(item: &mut LineItem, net: f64) {
    item.net_amount = net;
    item.discount_amount = round2(item.gross_amount - net);
    if let Some(quantity) = item.quantity.filter(|q| *q > 0.0) {
        item.unit_price = Some(net / quantity);
    }
}

pub(super) fn parse_fuel(text: &str, registry: &VehicleRegistry, result: &mut InvoiceParseResult) {
    let mut current_vehicle: Option<String> = None;
    let mut bases: HashMap<String, f64> = HashMap::new();

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();

        if let Some(caps) = fuel_header_re().captures(line) {
            if let Some(date) = parse_date(&caps[1]) {
                result.invoice_date = Some(date);
                result.invoice_number = Some(caps[2].to_string());
            }
            continue;
        }

        if let Some(caps) = vehicle_re().captures(line) {
            current_vehicle = resolve_vehicle(registry, &caps[1], line_no, result);
            continue;
        }

        if let Some(caps) = fuel_item_re().captures(line) {
            let Some(vehicle_id) = current_vehicle.clone() else {
                result
                    .errors
                    .push(format!("line {}: refuel without vehicle", line_no + 1));
                continue;
            };

            let (Some(liters), Some(price), Some(amount_vat)) = (
                parse_es_number(&caps[3]),
                parse_es_number(&caps[4]),
                parse_es_number(&caps[5]),
            ) else {
                result
                    .errors
                    .push(format!("line {}: unparseable amounts", line_no + 1));
                continue;
            };

            let (day, month) = day_month(&caps);
            result.items.push(LineItem {
                vehicle_id,
                date: infer_line_date(day, month, result.invoice_date).or(result.invoice_date),
                kind: LineKind::Fuel,
                quantity: Some(liters),
                gross_unit_price: Some(price),
                unit_price: Some(price),
                gross_amount: round2(amount_vat),
                net_amount: 0.0,
                discount_amount: 0.0,
            });
            continue;
        }

        if let Some(caps) = vehicle_base_re().captures(line) {
            if let (Some(vehicle), Some(base)) = (&current_vehicle, parse_es_number(&caps[1])) {
                bases.insert(vehicle.clone(), base);
            }
        }
    }

    let mut order: Vec<String> = Vec::new();
    for item in &result.items {
        if !order.contains(&item.vehicle_id) {
            order.push(item.vehicle_id.clone());
        }
    }

    for vehicle in &order {
        let lines: Vec<usize> = result
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| &item.vehicle_id == vehicle)
            .map(|(i, _)| i)
            .collect();

        match bases.get(vehicle) {
            Some(&base) => {
                let liters: Vec<f64> = lines
                    .iter()
                    .map(|&i| result.items[i].quantity.unwrap_or(0.0))
                    .collect();
                if lines.len() > 1 && liters.iter().sum::<f64>() <= 0.0 {
                    result.warnings.push(format!(
                        "Vehicle {}: no litres to prorate by, base split evenly across {} lines",
                        vehicle,
                        lines.len()
                    ));
                }
                for (&i, net) in lines.iter().zip(prorate(base, &liters)) {
                    apply_net(&mut result.items[i], net);
                }
            }
            None => {
                warn!("Valcarce: no Base Imponible for vehicle {}", vehicle);
                result.warnings.push(format!(
                    "Vehicle {}: Base Imponible not found, net estimated from gross",
                    vehicle
                ));
                for &i in &lines {
                    let net = round2(result.items[i].gross_amount / VAT_FACTOR);
                    apply_net(&mut result.items[i], net);
                }
            }
        }
    }

    if let Some(caps) = fuel_total_re().captures(text) {
        result.declared_total = parse_es_number(&caps[1]);
    } else if !bases.is_empty() {
        result.declared_total = Some(round2(bases.values().sum()));
    }

    debug!("Valcarce fuel: {} refuels", result.items.len());
    result.summaries = summarize(&result.items);
}

pub(super) fn parse_tolls(text: &str, registry: &VehicleRegistry, result: &mut InvoiceParseResult) {
    let mut current_vehicle: Option<String> = None;
    let mut bases: HashMap<String, f64> = HashMap::new();

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();

        if let Some(caps) = toll_header_re().captures(line) {
            if let Some(date) = parse_date(&caps[1]) {
                result.invoice_date = Some(date);
                result.invoice_number = Some(caps[2].to_string());
            }
            continue;
        }

        if let Some(caps) = vehicle_re().captures(line) {
            current_vehicle = resolve_vehicle(registry, &caps[1], line_no, result);
            continue;
        }

        if let Some(caps) = toll_item_re().captures(line) {
            let Some(vehicle_id) = current_vehicle.clone() else {
                result
                    .errors
                    .push(format!("line {}: toll without vehicle", line_no + 1));
                continue;
            };
            let Some(amount) = parse_es_number(&caps[4]) else {
                result
                    .errors
                    .push(format!("line {}: unparseable amount", line_no + 1));
                continue;
            };

            let (day, month) = day_month(&caps);
            result.items.push(LineItem {
                vehicle_id,
                date: infer_line_date(day, month, result.invoice_date).or(result.invoice_date),
                kind: if amount < 0.0 {
                    LineKind::Rebate
                } else {
                    LineKind::Toll
                },
                quantity: None,
                gross_unit_price: None,
                unit_price: None,
                gross_amount: amount,
                net_amount: amount,
                discount_amount: 0.0,
            });
            continue;
        }

        if let Some(caps) = fee_item_re().captures(line) {
            let Some(vehicle_id) = current_vehicle.clone() else {
                result
                    .errors
                    .push(format!("line {}: fee without vehicle", line_no + 1));
                continue;
            };
            let Some(amount) = parse_es_number(&caps[2]) else {
                result
                    .errors
                    .push(format!("line {}: unparseable amount", line_no + 1));
                continue;
            };

            result.items.push(LineItem {
                vehicle_id,
                date: result.invoice_date,
                kind: LineKind::Fee,
                quantity: None,
                gross_unit_price: None,
                unit_price: None,
                gross_amount: amount,
                net_amount: amount,
                discount_amount: 0.0,
            });
            continue;
        }

        if let Some(caps) = vehicle_base_re().captures(line) {
            if let (Some(vehicle), Some(base)) = (&current_vehicle, parse_es_number(&caps[1])) {
                bases.insert(vehicle.clone(), base);
            }
        }
    }

    if let Some(caps) = toll_total_re().captures(text) {
        result.declared_total = parse_es_number(&caps[1]);
    } else if !bases.is_empty() {
        result.declared_total = Some(round2(bases.values().sum()));
    }

    result.summaries = summarize(&result.items);
    for summary in &mut result.summaries {
        if let Some(base) = bases.get(&summary.vehicle_id) {
            summary.net_total = round2(*base);
        }
    }

    debug!("Valcarce tolls: {} lines", result.items.len());
}
