//! Per-vehicle aggregation and proration of invoice lines

use serde::Serialize;

use super::{LineItem, LineKind};
use crate::locale::round2;

/// Invoice totals for one vehicle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSummary {
    pub vehicle_id: String,
    pub fuel_quantity: f64,
    pub adblue_quantity: f64,
    pub fuel_gross: f64,
    pub adblue_gross: f64,
    pub fuel_net: f64,
    pub adblue_net: f64,
    pub toll_count: usize,
    pub toll_amount: f64,
    /// Negative
    pub rebate_amount: f64,
    pub fee_amount: f64,
    pub discount_total: f64,
    pub net_total: f64,
    /// Quantity-weighted unit price after discount
    pub average_unit_price: Option<f64>,
    pub item_count: usize,
}

impl VehicleSummary {
    pub fn new(vehicle_id: &str) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            fuel_quantity: 0.0,
            adblue_quantity: 0.0,
            fuel_gross: 0.0,
            adblue_gross: 0.0,
            fuel_net: 0.0,
            adblue_net: 0.0,
            toll_count: 0,
            toll_amount: 0.0,
            rebate_amount: 0.0,
            fee_amount: 0.0,
            discount_total: 0.0,
            net_total: 0.0,
            average_unit_price: None,
            item_count: 0,
        }
    }

    pub fn total_quantity(&self) -> f64 {
        self.fuel_quantity + self.adblue_quantity
    }
}

/// Σ price·quantity / Σ quantity over lines carrying both
pub fn weighted_average_price(items: &[&LineItem]) -> Option<f64> {
    let (weighted, quantity) = items
        .iter()
        .filter_map(|item| Some((item.unit_price?, item.quantity?)))
        .fold((0.0, 0.0), |(w, q), (price, qty)| (w + price * qty, q + qty));

    (quantity > 0.0).then(|| weighted / quantity)
}

/// Roll line items up per vehicle, in order of first appearance
pub fn summarize(items: &[LineItem]) -> Vec<VehicleSummary> {
    let mut order: Vec<&str> = Vec::new();
    for item in items {
        if !order.contains(&item.vehicle_id.as_str()) {
            order.push(&item.vehicle_id);
        }
    }

    order
        .into_iter()
        .map(|vehicle_id| {
            let lines: Vec<&LineItem> = items
                .iter()
                .filter(|i| i.vehicle_id == vehicle_id)
                .collect();

            let mut summary = VehicleSummary::new(vehicle_id);
            for line in &lines {
                let quantity = line.quantity.unwrap_or(0.0);
                match line.kind {
                    LineKind::Fuel => {
                        summary.fuel_quantity += quantity;
                        summary.fuel_gross += line.gross_amount;
                        summary.fuel_net += line.net_amount;
                    }
                    LineKind::AdBlue => {
                        summary.adblue_quantity += quantity;
                        summary.adblue_gross += line.gross_amount;
                        summary.adblue_net += line.net_amount;
                    }
                    LineKind::Toll => {
                        summary.toll_count += 1;
                        summary.toll_amount += line.net_amount;
                    }
                    LineKind::Rebate => summary.rebate_amount += line.net_amount,
                    LineKind::Fee => summary.fee_amount += line.net_amount,
                }
                summary.discount_total += line.discount_amount;
                summary.net_total += line.net_amount;
            }

            summary.net_total = round2(summary.net_total);
            summary.discount_total = round2(summary.discount_total);
            summary.average_unit_price = weighted_average_price(&lines);
            summary.item_count = lines.len();
            summary
        })
        .collect()
}

/// Split `total` across `weights` proportionally, in cents
///
/// The last part absorbs the rounding remainder, so the parts always add up
/// to `total` rounded to cents. All-zero (or negative) weights split evenly.
pub fn prorate(total: f64, weights: &[f64]) -> Vec<f64> {
    if weights.is_empty() {
        return Vec::new();
    }

    let weight_sum: f64 = weights.iter().sum();
    let shares: Vec<f64> = if weight_sum > 0.0 {
        weights.iter().map(|w| w / weight_sum).collect()
    } else {
        vec![1.0 / weights.len() as f64; weights.len()]
    };

    let total = round2(total);
    let mut parts: Vec<f64> = shares.iter().map(|s| round2(total * s)).collect();
    let assigned: f64 = parts[..parts.len() - 1].iter().sum();
    if let Some(last) = parts.last_mut() {
        *last = round2(total - assigned);
    }
    parts
}
