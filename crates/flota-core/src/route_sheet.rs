//! Monthly route sheet parser
//!
//! A route sheet reports, for one tracking device and month, trips,
//! deliveries and kilometres per delivery zone plus a block of totals.
//! Totals missing from the text are rebuilt from the zone rows.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::invoice::RECONCILIATION_TOLERANCE;
use crate::locale::{month_from_name, month_names, normalize_text, parse_loose_number, round2};
use crate::patterns::{number_tokens, static_regex};
use crate::vehicles::VehicleRegistry;

/// Delivery zones, in report order
pub const ZONES: [&str; 5] = ["Verde", "Azul", "Morado", "Naranja", "Rojo"];

// Enero 2026 - Dispositivo MJC
static_regex!(
    header_re,
    r"(?i)(ENERO|FEBRERO|MARZO|ABRIL|MAYO|JUNIO|JULIO|AGOSTO|SEPTIEMBRE|OCTUBRE|NOVIEMBRE|DICIEMBRE)\s+(\d{4})\s*[-–—]\s*Dispositivo\s+(\w+)"
);
static_regex!(year_re, r"(\d{4})");
static_regex!(signed_number_re, r"-?\d[\d.,]*");

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneStats {
    pub zone: String,
    pub trips: u32,
    pub deliveries: u32,
    pub km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSheet {
    /// YYYY-MM
    pub month: String,
    pub vehicle_id: String,
    pub device: String,
    pub zones: Vec<ZoneStats>,
    pub total_trips: u32,
    pub total_deliveries: u32,
    pub total_km: f64,
    pub mean_deliveries_per_trip: f64,
    pub days_worked: u32,
    pub warnings: Vec<String>,
}

/// Whether extracted PDF text reads like a route sheet
pub fn looks_like_route_sheet(text: &str) -> bool {
    if header_re().is_match(text) {
        return true;
    }
    let lower = text.to_lowercase();
    lower.contains("total viajes") && ZONES.iter().any(|z| lower.contains(&z.to_lowercase()))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn last_number(line: &str) -> Option<f64> {
    signed_number_re()
        .find_iter(line)
        .last()
        .and_then(|m| parse_loose_number(m.as_str()))
}

/// A whole, non-negative count; fractions and negatives are rejected
fn as_count(value: f64) -> Option<u32> {
    if value.fract() != 0.0 {
        return None;
    }
    u32::try_from(value as i64).ok()
}

/// Month and device from the `<Month> <Year> - Dispositivo <Code>` header,
/// falling back to the file name
fn identify(
    file_name: &str,
    text: &str,
    registry: &VehicleRegistry,
) -> Result<(String, String, String)> {
    if let Some(caps) = header_re().captures(text) {
        let month = month_from_name(&caps[1])
            .ok_or_else(|| Error::InvalidData(format!("unknown month {}", &caps[1])))?;
        let device = caps[3].to_uppercase();
        let vehicle = registry
            .resolve_device(&device)
            .ok_or_else(|| Error::InvalidData(format!("unknown device {}", device)))?;
        return Ok((
            format!("{}-{:02}", &caps[2], month),
            vehicle.to_string(),
            device,
        ));
    }

    let name = normalize_text(file_name);
    let month = month_names()
        .iter()
        .position(|m| name.contains(m))
        .map(|i| i as u32 + 1);
    let year = year_re().captures(&name).map(|c| c[1].to_string());
    let device = registry.find_device_in(&name);

    match (month, year, device) {
        (Some(month), Some(year), Some((device, vehicle))) => {
            debug!("Route sheet identified from file name {}", file_name);
            Ok((
                format!("{}-{:02}", year, month),
                vehicle.to_string(),
                device.to_string(),
            ))
        }
        _ => Err(Error::InvalidData(format!(
            "{}: month and device not found in header or file name",
            file_name
        ))),
    }
}

/// Zone row: first zone name on the line followed by trips, deliveries, km
fn parse_zone_line(line: &str) -> Option<ZoneStats> {
    let lower = line.to_lowercase();
    let zone = ZONES.iter().find(|z| lower.contains(&z.to_lowercase()))?;
    let needle = zone.to_lowercase();
    let pos = lower.find(&needle)?;

    let numbers: Vec<f64> = number_tokens(&lower[pos + needle.len()..])
        .into_iter()
        .filter_map(parse_loose_number)
        .collect();
    if numbers.len() < 3 {
        return None;
    }

    Some(ZoneStats {
        zone: zone.to_string(),
        trips: as_count(numbers[0])?,
        deliveries: as_count(numbers[1])?,
        km: numbers[2],
    })
}

pub fn parse_route_sheet(
    file_name: &str,
    text: &str,
    registry: &VehicleRegistry,
) -> Result<RouteSheet> {
    if text.trim().is_empty() {
        return Err(Error::InvalidData(format!("{}: no text", file_name)));
    }

    let (month, vehicle_id, device) = identify(file_name, text, registry)?;

    let mut sheet = RouteSheet {
        month,
        vehicle_id,
        device,
        zones: Vec::new(),
        total_trips: 0,
        total_deliveries: 0,
        total_km: 0.0,
        mean_deliveries_per_trip: 0.0,
        days_worked: 0,
        warnings: Vec::new(),
    };
    let mut declared_trips = None;
    let mut declared_deliveries = None;
    let mut declared_km = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(zone) = parse_zone_line(line) {
            if !sheet.zones.iter().any(|z| z.zone == zone.zone) {
                sheet.zones.push(zone);
            }
            continue;
        }

        let lower = line.to_lowercase();
        let Some(value) = last_number(line) else {
            continue;
        };

        if lower.contains("total viajes") {
            declared_trips = count_or_warn(&mut sheet.warnings, "Total trips", value);
        } else if lower.contains("total repartos") {
            declared_deliveries = count_or_warn(&mut sheet.warnings, "Total deliveries", value);
        } else if lower.contains("total kil") || lower.contains("total km") {
            if value < 0.0 {
                sheet.warnings.push(format!("Total km {} is negative, ignored", value));
            } else {
                declared_km = Some(value);
            }
        } else if lower.contains("media repartos") {
            sheet.mean_deliveries_per_trip = value;
        } else if lower.contains("as trabajad") || lower.contains("dias trabajad") {
            if let Some(days) = count_or_warn(&mut sheet.warnings, "Days worked", value) {
                sheet.days_worked = days;
            }
        }
    }

    if sheet.zones.is_empty() {
        return Err(Error::InvalidData(format!(
            "{}: no zone rows found",
            file_name
        )));
    }

    let trips: u32 = sheet.zones.iter().map(|z| z.trips).sum();
    let deliveries: u32 = sheet.zones.iter().map(|z| z.deliveries).sum();
    let km = round2(sheet.zones.iter().map(|z| z.km).sum());

    sheet.total_trips = match declared_trips {
        Some(declared) if declared != trips => {
            sheet.warnings.push(format!(
                "Total trips {} differs from zone sum {}",
                declared, trips
            ));
            declared
        }
        Some(declared) => declared,
        None => trips,
    };
    sheet.total_deliveries = match declared_deliveries {
        Some(declared) if declared != deliveries => {
            sheet.warnings.push(format!(
                "Total deliveries {} differs from zone sum {}",
                declared, deliveries
            ));
            declared
        }
        Some(declared) => declared,
        None => deliveries,
    };
    sheet.total_km = match declared_km {
        Some(declared) if (declared - km).abs() > RECONCILIATION_TOLERANCE => {
            sheet.warnings.push(format!(
                "Total km {:.2} differs from zone sum {:.2}",
                declared, km
            ));
            declared
        }
        Some(declared) => declared,
        None => km,
    };
    if sheet.mean_deliveries_per_trip == 0.0 && trips > 0 {
        sheet.mean_deliveries_per_trip = round1(deliveries as f64 / trips as f64);
    }

    info!(
        "Route sheet {} {}: {} zones, {} trips, {:.1} km",
        sheet.month,
        sheet.vehicle_id,
        sheet.zones.len(),
        sheet.total_trips,
        sheet.total_km
    );
    Ok(sheet)
}

/// Declared counts must be whole and non-negative; anything else is reported
/// and left for the zone sums to fill in
fn count_or_warn(warnings: &mut Vec<String>, label: &str, value: f64) -> Option<u32> {
    let count = as_count(value);
    if count.is_none() {
        warnings.push(format!("{} {} is not a whole count, ignored", label, value));
    }
    count
}
