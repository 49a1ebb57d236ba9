//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FleetConfig;
    use crate::payroll::{PayrollReport, PayrollRow};
    use crate::route_sheet::{RouteSheet, ZoneStats};
    use crate::sink::{ImportRecords, LedgerSink};
    use chrono::NaiveDate;
    use rusqlite::params;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn movement(d: NaiveDate, description: &str, amount: f64) -> NewMovement {
        NewMovement {
            date: d,
            description: description.to_string(),
            amount,
            category_id: OTHER_CATEGORY.to_string(),
            vehicle_id: None,
            reference: None,
            needs_review: true,
        }
    }

    fn new_import(file_name: &str, hash: &str, declared_type: DocumentType) -> NewImport {
        NewImport {
            file_name: file_name.to_string(),
            content_hash: hash.to_string(),
            declared_type,
            reference_month: Some("2025-11".to_string()),
            item_count: 0,
            period_from: None,
            period_to: None,
        }
    }

    fn payroll_report() -> PayrollReport {
        PayrollReport {
            month: "2025-11".to_string(),
            rows: vec![PayrollRow {
                worker_id: 4,
                worker_name: "PEDRO".to_string(),
                vehicle_id: "MTY".to_string(),
                gross: 2000.0,
                employee_ss: 130.0,
                withholding: 250.0,
                net: 1620.0,
                employer_ss: 640.0,
                total_cost: 2640.0,
            }],
            skipped: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn route_sheet(trips: u32) -> RouteSheet {
        RouteSheet {
            month: "2025-11".to_string(),
            vehicle_id: "LVX".to_string(),
            device: "LVX".to_string(),
            zones: vec![
                ZoneStats {
                    zone: "NORTE".to_string(),
                    trips,
                    deliveries: 40,
                    km: 812.5,
                },
                ZoneStats {
                    zone: "SUR".to_string(),
                    trips: 3,
                    deliveries: 12,
                    km: 300.0,
                },
            ],
            total_trips: trips + 3,
            total_deliveries: 52,
            total_km: 1112.5,
            mean_deliveries_per_trip: 4.0,
            days_worked: 20,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.count_movements().unwrap(), 0);
        assert!(db.list_imports(10).unwrap().is_empty());
        assert!(db.has_movement_key_index().unwrap());
    }

    #[test]
    fn test_schema_has_expected_tables() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        for table in [
            "vehicles",
            "categories",
            "rules",
            "imports",
            "movements",
            "payroll_costs",
            "route_sheets",
            "route_sheet_zones",
            "checklist_overrides",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                    params![table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }

    #[test]
    fn test_insert_movements_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let batch = vec![
            movement(date(2025, 11, 3), "GASOLEO SOLRED", -120.5),
            movement(date(2025, 11, 4), "TRANSFERENCIA CLIENTE", 900.0),
        ];

        assert_eq!(db.insert_movements(&batch).unwrap(), (2, 0));
        assert_eq!(db.insert_movements(&batch).unwrap(), (0, 2));
        assert_eq!(db.count_movements().unwrap(), 2);
    }

    #[test]
    fn test_amounts_rounded_before_key_check() {
        let db = Database::in_memory().unwrap();
        db.insert_movements(&[movement(date(2025, 11, 3), "PEAJE", -10.004)])
            .unwrap();
        let (inserted, ignored) = db
            .insert_movements(&[movement(date(2025, 11, 3), "PEAJE", -10.0)])
            .unwrap();
        assert_eq!((inserted, ignored), (0, 1));

        let stored = db.list_movements(&MovementFilter::default()).unwrap();
        assert_eq!(stored[0].amount, -10.0);
    }

    #[test]
    fn test_fallback_existence_check_without_index() {
        let db = Database::in_memory().unwrap();
        {
            let conn = db.conn().unwrap();
            conn.execute_batch(&format!("DROP INDEX {}", MOVEMENT_KEY_INDEX))
                .unwrap();
        }
        assert!(!db.has_movement_key_index().unwrap());

        let batch = vec![movement(date(2025, 11, 3), "SEGURO", -80.0)];
        assert_eq!(db.insert_movements(&batch).unwrap(), (1, 0));
        assert_eq!(db.insert_movements(&batch).unwrap(), (0, 1));
        assert_eq!(db.count_movements().unwrap(), 1);
    }

    #[test]
    fn test_purge_duplicates_recreates_index() {
        let db = Database::in_memory().unwrap();
        {
            let conn = db.conn().unwrap();
            conn.execute_batch(&format!("DROP INDEX {}", MOVEMENT_KEY_INDEX))
                .unwrap();
            for _ in 0..3 {
                conn.execute(
                    "INSERT INTO movements (date, description, amount, category_id) VALUES ('2025-11-03', 'SEGURO', -80.0, 'SEG')",
                    [],
                )
                .unwrap();
            }
            conn.execute(
                "INSERT INTO movements (date, description, amount, category_id) VALUES ('2025-11-04', 'SEGURO', -80.0, 'SEG')",
                [],
            )
            .unwrap();
        }

        let result = db.purge_duplicate_movements().unwrap();
        assert_eq!(result.removed, 2);
        assert!(result.index_present);
        assert!(db.has_movement_key_index().unwrap());

        let remaining = db.list_movements(&MovementFilter::default()).unwrap();
        assert_eq!(remaining.len(), 2);
        // Lowest id survives
        let kept = remaining
            .iter()
            .find(|m| m.date == date(2025, 11, 3))
            .unwrap();
        assert_eq!(kept.id, 1);
    }

    #[test]
    fn test_list_movements_filters() {
        let db = Database::in_memory().unwrap();
        let mut fuel = movement(date(2025, 11, 3), "SOLRED", -100.0);
        fuel.category_id = "COMB".to_string();
        fuel.vehicle_id = Some("MTY".to_string());
        let mut toll = movement(date(2025, 11, 20), "VALCARCE", -30.0);
        toll.category_id = "PEAJ".to_string();
        toll.vehicle_id = Some("LVX".to_string());
        let old = movement(date(2025, 10, 30), "COMISION", -3.0);
        db.insert_movements(&[fuel, toll, old]).unwrap();

        let november = db
            .list_movements(&MovementFilter {
                from: Some(date(2025, 11, 1)),
                to: Some(date(2025, 11, 30)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(november.len(), 2);
        assert_eq!(november[0].description, "VALCARCE");

        let mty = db
            .list_movements(&MovementFilter {
                vehicle_id: Some("MTY".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(mty.len(), 1);
        assert_eq!(mty[0].category_id.as_deref(), Some("COMB"));

        let limited = db
            .list_movements(&MovementFilter {
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 1);

        assert_eq!(db.count_movements_in_month("2025-11", "PEAJ").unwrap(), 1);
        assert_eq!(db.count_movements_in_month("2025-10", "PEAJ").unwrap(), 0);
    }

    #[test]
    fn test_commit_import_and_lookups() {
        let db = Database::in_memory().unwrap();
        let batch = vec![
            movement(date(2025, 11, 3), "GASOLEO", -120.5),
            movement(date(2025, 11, 4), "CLIENTE", 900.0),
        ];

        let outcome = db
            .commit_import(
                &new_import("extracto.csv", "abc123", DocumentType::BankStatement),
                ImportRecords::Movements(&batch),
            )
            .unwrap();
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.ignored, 0);

        let by_hash = db.find_import_by_hash("abc123").unwrap().unwrap();
        assert_eq!(by_hash.id, outcome.import_id);
        assert_eq!(by_hash.declared_type, DocumentType::BankStatement);
        assert!(db.find_import_by_name("extracto.csv").unwrap().is_some());
        assert!(db.find_import_by_hash("zzz").unwrap().is_none());

        let keys = db
            .movement_keys_between(date(2025, 11, 1), date(2025, 11, 3))
            .unwrap();
        assert_eq!(keys, vec![(date(2025, 11, 3), "GASOLEO".to_string(), -120.5)]);

        let stored = db.list_movements(&MovementFilter::default()).unwrap();
        assert!(stored
            .iter()
            .all(|m| m.import_id == Some(outcome.import_id)));
    }

    #[test]
    fn test_second_commit_of_same_movements_inserts_nothing() {
        let db = Database::in_memory().unwrap();
        let batch = vec![movement(date(2025, 11, 3), "GASOLEO", -120.5)];

        db.commit_import(
            &new_import("a.csv", "h1", DocumentType::BankStatement),
            ImportRecords::Movements(&batch),
        )
        .unwrap();
        let second = db
            .commit_import(
                &new_import("b.csv", "h1", DocumentType::BankStatement),
                ImportRecords::Movements(&batch),
            )
            .unwrap();

        assert_eq!(second.inserted, 0);
        assert_eq!(second.ignored, 1);
        assert_eq!(db.count_movements().unwrap(), 1);
        assert_eq!(db.list_imports(10).unwrap().len(), 2);
    }

    #[test]
    fn test_imports_for_month() {
        let db = Database::in_memory().unwrap();
        db.commit_import(
            &new_import("solred.pdf", "h1", DocumentType::SolredInvoice),
            ImportRecords::Movements(&[]),
        )
        .unwrap();

        assert_eq!(
            db.imports_for_month("2025-11", DocumentType::SolredInvoice)
                .unwrap()
                .len(),
            1
        );
        assert!(db
            .imports_for_month("2025-11", DocumentType::StarOilInvoice)
            .unwrap()
            .is_empty());
        assert!(db
            .imports_for_month("2025-12", DocumentType::SolredInvoice)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_delete_import_removes_its_records() {
        let db = Database::in_memory().unwrap();
        let batch = vec![movement(date(2025, 11, 3), "GASOLEO", -120.5)];
        let bank = db
            .commit_import(
                &new_import("a.csv", "h1", DocumentType::BankStatement),
                ImportRecords::Movements(&batch),
            )
            .unwrap();
        db.insert_movements(&[movement(date(2025, 11, 5), "MANUAL", -1.0)])
            .unwrap();

        let deleted = db.delete_import(bank.import_id).unwrap();
        assert_eq!(deleted.movements, 1);
        assert_eq!(db.count_movements().unwrap(), 1);
        assert!(db.get_import(bank.import_id).unwrap().is_none());

        // The same file can now be imported again
        let again = db
            .commit_import(
                &new_import("a.csv", "h1", DocumentType::BankStatement),
                ImportRecords::Movements(&batch),
            )
            .unwrap();
        assert_eq!(again.inserted, 1);
    }

    #[test]
    fn test_delete_first_of_reimported_file_keeps_movements() {
        let db = Database::in_memory().unwrap();
        let batch = vec![
            movement(date(2025, 11, 3), "GASOLEO", -120.5),
            movement(date(2025, 11, 4), "PEAJE", -9.8),
        ];
        let first = db
            .commit_import(
                &new_import("a.csv", "h1", DocumentType::BankStatement),
                ImportRecords::Movements(&batch),
            )
            .unwrap();
        let second = db
            .commit_import(
                &new_import("a_copia.csv", "h1", DocumentType::BankStatement),
                ImportRecords::Movements(&batch),
            )
            .unwrap();
        assert_eq!(second.inserted, 0);

        let deleted = db.delete_import(first.import_id).unwrap();
        assert_eq!(deleted.movements, 0);
        assert_eq!(deleted.reassigned, 2);
        assert_eq!(db.count_movements().unwrap(), 2);

        let owners: Vec<Option<i64>> = db
            .list_movements(&MovementFilter::default())
            .unwrap()
            .into_iter()
            .map(|m| m.import_id)
            .collect();
        assert_eq!(owners, vec![Some(second.import_id); 2]);

        // Deleting the surviving import now takes the rows with it
        let deleted = db.delete_import(second.import_id).unwrap();
        assert_eq!(deleted.movements, 2);
        assert_eq!(db.count_movements().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_stored_date_is_an_error() {
        let db = Database::in_memory().unwrap();
        db.conn()
            .unwrap()
            .execute(
                "INSERT INTO movements (date, description, amount) VALUES ('03/11/2025', 'X', -1.0)",
                [],
            )
            .unwrap();

        let result = db.list_movements(&MovementFilter::default());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("03/11/2025"));
    }

    #[test]
    fn test_delete_missing_import() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.delete_import(42),
            Err(crate::error::Error::NotFound(_))
        ));
    }

    #[test]
    fn test_payroll_upsert_replaces_worker_row() {
        let db = Database::in_memory().unwrap();
        let report = payroll_report();
        let first = db
            .commit_import(
                &new_import("COST_202511.pdf", "p1", DocumentType::Payroll),
                ImportRecords::Payroll(&report),
            )
            .unwrap();
        assert_eq!(first.inserted, 1);

        let mut corrected = payroll_report();
        corrected.rows[0].total_cost = 2700.0;
        let second = db
            .commit_import(
                &new_import("COST_202511_v2.pdf", "p2", DocumentType::Payroll),
                ImportRecords::Payroll(&corrected),
            )
            .unwrap();

        let rows = db.list_payroll("2025-11").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_cost, 2700.0);
        assert_eq!(rows[0].vehicle_id, "MTY");
        assert_eq!(rows[0].import_id, Some(second.import_id));
        assert_eq!(db.count_payroll("2025-11").unwrap(), 1);

        let deleted = db.delete_import(second.import_id).unwrap();
        assert_eq!(deleted.payroll_rows, 1);
        assert_eq!(db.count_payroll("2025-11").unwrap(), 0);
    }

    #[test]
    fn test_route_sheet_round_trip() {
        let db = Database::in_memory().unwrap();
        db.commit_import(
            &new_import("hoja.pdf", "r1", DocumentType::RouteSheet),
            ImportRecords::RouteSheet(&route_sheet(10)),
        )
        .unwrap();
        let second = db
            .commit_import(
                &new_import("hoja2.pdf", "r2", DocumentType::RouteSheet),
                ImportRecords::RouteSheet(&route_sheet(12)),
            )
            .unwrap();

        let stored = db.get_route_sheet("2025-11", "LVX").unwrap().unwrap();
        assert_eq!(stored.total_trips, 15);
        assert_eq!(stored.zones.len(), 2);
        assert_eq!(stored.zones[0].zone, "NORTE");
        assert_eq!(stored.zones[0].trips, 12);
        assert_eq!(stored.import_id, Some(second.import_id));
        assert_eq!(db.count_route_sheets("2025-11").unwrap(), 1);

        let deleted = db.delete_import(second.import_id).unwrap();
        assert_eq!(deleted.route_sheets, 1);
        assert!(db.get_route_sheet("2025-11", "LVX").unwrap().is_none());

        let conn = db.conn().unwrap();
        let zones: i64 = conn
            .query_row("SELECT COUNT(*) FROM route_sheet_zones", [], |row| row.get(0))
            .unwrap();
        assert_eq!(zones, 0);
    }

    #[test]
    fn test_seed_reference_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let config = FleetConfig::embedded().unwrap();

        let first = db.seed_reference(&config).unwrap();
        assert_eq!(first.vehicles, config.vehicles.len());
        assert_eq!(first.categories, config.categories.len());
        assert_eq!(first.rules, config.rules.len());

        let second = db.seed_reference(&config).unwrap();
        assert_eq!(second, SeedResult::default());

        assert_eq!(db.list_vehicles().unwrap().len(), config.vehicles.len());
        let categories = db.list_categories().unwrap();
        let income = categories.iter().find(|c| c.id == INCOME_CATEGORY).unwrap();
        assert_eq!(income.kind, CategoryKind::Income);

        // Seeded rules keep config order
        let rules = db.active_rules().unwrap();
        assert_eq!(rules, config.rules());
    }

    #[test]
    fn test_rule_add_and_disable() {
        let db = Database::in_memory().unwrap();
        let config = FleetConfig::embedded().unwrap();
        db.seed_reference(&config).unwrap();

        let id = db
            .add_rule(&CategorizationRule::new("neumaticos lopez", "NEUM", Some("MTY")), None)
            .unwrap();
        let rules = db.list_rules(false).unwrap();
        let last = rules.last().unwrap();
        assert_eq!(last.id, id);
        assert_eq!(last.rule.pattern, "NEUMATICOS LOPEZ");

        db.set_rule_active(id, false).unwrap();
        assert_eq!(db.list_rules(false).unwrap().len(), config.rules.len());
        assert_eq!(db.list_rules(true).unwrap().len(), config.rules.len() + 1);

        assert!(db.set_rule_active(9999, false).is_err());
        assert!(db
            .add_rule(&CategorizationRule::new("  ", "OTRO", None), None)
            .is_err());
    }

    #[test]
    fn test_update_depreciation() {
        let db = Database::in_memory().unwrap();
        db.seed_reference(&FleetConfig::embedded().unwrap()).unwrap();

        db.update_depreciation("MTY", 450.0).unwrap();
        let vehicles = db.list_vehicles().unwrap();
        let mty = vehicles.iter().find(|v| v.id == "MTY").unwrap();
        assert_eq!(mty.monthly_depreciation, 450.0);

        assert!(matches!(
            db.update_depreciation("XXX", 10.0),
            Err(crate::error::Error::NotFound(_))
        ));
        assert!(db.update_depreciation("MTY", -1.0).is_err());
    }

    #[test]
    fn test_checklist_overrides() {
        let db = Database::in_memory().unwrap();
        db.set_checklist_override("2025-11", "staroil_invoice", "not_applicable")
            .unwrap();
        db.set_checklist_override("2025-11", "staroil_invoice", "pending")
            .unwrap();

        let overrides = db.checklist_overrides("2025-11").unwrap();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides["staroil_invoice"], "pending");
        assert!(db.checklist_overrides("2025-12").unwrap().is_empty());

        assert!(db.clear_checklist_override("2025-11", "staroil_invoice").unwrap());
        assert!(!db.clear_checklist_override("2025-11", "staroil_invoice").unwrap());
    }
}
