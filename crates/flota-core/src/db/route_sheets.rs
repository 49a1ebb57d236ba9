//! Route sheet operations

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::Database;
use crate::error::Result;
use crate::route_sheet::{RouteSheet, ZoneStats};

/// A stored route sheet with its zones
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRouteSheet {
    pub id: i64,
    pub month: String,
    pub vehicle_id: String,
    pub device: String,
    pub total_trips: u32,
    pub total_deliveries: u32,
    pub total_km: f64,
    pub mean_deliveries_per_trip: f64,
    pub days_worked: u32,
    pub zones: Vec<ZoneStats>,
    pub import_id: Option<i64>,
}

/// Store a route sheet, replacing the month's sheet for the same vehicle
pub(super) fn upsert_route_sheet(conn: &Connection, import_id: i64, sheet: &RouteSheet) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO route_sheets (month, vehicle_id, device, total_trips, total_deliveries, total_km,
                                  mean_deliveries_per_trip, days_worked, import_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(month, vehicle_id) DO UPDATE SET
            device = excluded.device,
            total_trips = excluded.total_trips,
            total_deliveries = excluded.total_deliveries,
            total_km = excluded.total_km,
            mean_deliveries_per_trip = excluded.mean_deliveries_per_trip,
            days_worked = excluded.days_worked,
            import_id = excluded.import_id
        "#,
        params![
            sheet.month,
            sheet.vehicle_id,
            sheet.device,
            sheet.total_trips,
            sheet.total_deliveries,
            sheet.total_km,
            sheet.mean_deliveries_per_trip,
            sheet.days_worked,
            import_id,
        ],
    )?;

    let sheet_id: i64 = conn.query_row(
        "SELECT id FROM route_sheets WHERE month = ? AND vehicle_id = ?",
        params![sheet.month, sheet.vehicle_id],
        |row| row.get(0),
    )?;

    conn.execute(
        "DELETE FROM route_sheet_zones WHERE route_sheet_id = ?",
        params![sheet_id],
    )?;
    for zone in &sheet.zones {
        conn.execute(
            "INSERT INTO route_sheet_zones (route_sheet_id, zone, trips, deliveries, km) VALUES (?, ?, ?, ?, ?)",
            params![sheet_id, zone.zone, zone.trips, zone.deliveries, zone.km],
        )?;
    }

    Ok(sheet_id)
}

impl Database {
    pub fn get_route_sheet(&self, month: &str, vehicle_id: &str) -> Result<Option<StoredRouteSheet>> {
        let conn = self.conn()?;

        let sheet = conn
            .query_row(
                r#"
                SELECT id, month, vehicle_id, device, total_trips, total_deliveries, total_km,
                       mean_deliveries_per_trip, days_worked, import_id
                FROM route_sheets
                WHERE month = ? AND vehicle_id = ?
                "#,
                params![month, vehicle_id],
                |row| {
                    Ok(StoredRouteSheet {
                        id: row.get(0)?,
                        month: row.get(1)?,
                        vehicle_id: row.get(2)?,
                        device: row.get(3)?,
                        total_trips: row.get(4)?,
                        total_deliveries: row.get(5)?,
                        total_km: row.get(6)?,
                        mean_deliveries_per_trip: row.get(7)?,
                        days_worked: row.get(8)?,
                        zones: Vec::new(),
                        import_id: row.get(9)?,
                    })
                },
            )
            .optional()?;

        let Some(mut sheet) = sheet else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT zone, trips, deliveries, km FROM route_sheet_zones WHERE route_sheet_id = ? ORDER BY rowid",
        )?;
        sheet.zones = stmt
            .query_map(params![sheet.id], |row| {
                Ok(ZoneStats {
                    zone: row.get(0)?,
                    trips: row.get(1)?,
                    deliveries: row.get(2)?,
                    km: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Some(sheet))
    }

    /// Route sheets stored for a month
    pub fn count_route_sheets(&self, month: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM route_sheets WHERE month = ?",
            params![month],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
