//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::path::PathBuf;

use flota_core::db::Database;
use flota_core::importer::FileOutcome;
use flota_core::models::{DocumentType, MovementFilter};
use flota_core::FleetConfig;
use tempfile::TempDir;

use crate::commands::{self, truncate};

const STATEMENT: &str = "F. Operación;F. Valor;Concepto;Importe;Saldo
02/12/2025;02/12/2025;RECIBO TGSS COTIZACION;-1.234,56;10.000,00
05/12/2025;05/12/2025;TRANSFERENCIA NUTRIMENTOS;5.200,00;15.200,00
09/12/2025;09/12/2025;COMPRA VARIOS;-32,10;15.167,90
";

fn setup_test_db() -> (Database, FleetConfig) {
    let db = Database::in_memory().unwrap();
    let config = FleetConfig::embedded().unwrap();
    db.seed_reference(&config).unwrap();
    (db, config)
}

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

// ========== Import Command Tests ==========

#[test]
fn test_cmd_import_statement() {
    let (db, config) = setup_test_db();
    let dir = TempDir::new().unwrap();
    let csv = write_file(&dir, "extracto_dic.csv", STATEMENT.as_bytes());

    let report = commands::cmd_import(&db, &config, &[csv], false, false).unwrap();

    assert_eq!(report.imported(), 1);
    assert_eq!(report.inserted(), 3);
    assert_eq!(report.files[0].document_type, Some(DocumentType::BankStatement));
    assert_eq!(report.files[0].reference_month.as_deref(), Some("2025-12"));
    assert_eq!(db.count_movements().unwrap(), 3);
}

#[test]
fn test_cmd_import_same_file_twice_is_duplicate() {
    let (db, config) = setup_test_db();
    let dir = TempDir::new().unwrap();
    let csv = write_file(&dir, "extracto_dic.csv", STATEMENT.as_bytes());

    commands::cmd_import(&db, &config, &[csv.clone()], false, false).unwrap();
    let second = commands::cmd_import(&db, &config, &[csv.clone()], false, false).unwrap();

    assert_eq!(second.duplicates(), 1);
    assert!(matches!(second.files[0].outcome, FileOutcome::Duplicate { .. }));

    // Confirmed re-import adds nothing new
    let forced = commands::cmd_import(&db, &config, &[csv], true, false).unwrap();
    assert_eq!(forced.imported(), 1);
    assert_eq!(forced.inserted(), 0);
    assert_eq!(db.count_movements().unwrap(), 3);
}

#[test]
fn test_cmd_import_isolates_bad_files() {
    let (db, config) = setup_test_db();
    let dir = TempDir::new().unwrap();
    let good = write_file(&dir, "extracto.csv", STATEMENT.as_bytes());
    let bad = write_file(&dir, "notas.txt", b"not a statement");
    let missing = dir.path().join("missing.csv");

    let report = commands::cmd_import(&db, &config, &[bad, missing, good], false, false).unwrap();

    assert_eq!(report.files.len(), 3);
    assert_eq!(report.errors(), 2);
    assert_eq!(report.imported(), 1);
    assert_eq!(db.count_movements().unwrap(), 3);
}

#[test]
fn test_cmd_import_dry_run_writes_nothing() {
    let (db, config) = setup_test_db();
    let dir = TempDir::new().unwrap();
    let csv = write_file(&dir, "extracto.csv", STATEMENT.as_bytes());

    commands::cmd_import_dry_run(&db, &config, &[csv]).unwrap();

    assert_eq!(db.count_movements().unwrap(), 0);
    assert!(db.list_imports(10).unwrap().is_empty());
}

// ========== Ledger Command Tests ==========

#[test]
fn test_cmd_movements_list() {
    let (db, config) = setup_test_db();
    let dir = TempDir::new().unwrap();
    let csv = write_file(&dir, "extracto.csv", STATEMENT.as_bytes());
    commands::cmd_import(&db, &config, &[csv], false, false).unwrap();

    let filter = commands::movement_filter(None, None, None, None, false, 50);
    assert!(commands::cmd_movements_list(&db, &filter).is_ok());

    let empty = Database::in_memory().unwrap();
    assert!(commands::cmd_movements_list(&empty, &MovementFilter::default()).is_ok());
}

#[test]
fn test_movement_filter_normalizes_ids() {
    let filter = commands::movement_filter(
        None,
        None,
        Some("mty".into()),
        Some("comb".into()),
        true,
        10,
    );
    assert_eq!(filter.vehicle_id.as_deref(), Some("MTY"));
    assert_eq!(filter.category_id.as_deref(), Some("COMB"));
    assert_eq!(filter.needs_review, Some(true));
    assert_eq!(filter.limit, Some(10));

    let all = commands::movement_filter(None, None, None, None, false, 10);
    assert_eq!(all.needs_review, None);
}

#[test]
fn test_cmd_imports_list_and_delete() {
    let (db, config) = setup_test_db();
    let dir = TempDir::new().unwrap();
    let csv = write_file(&dir, "extracto.csv", STATEMENT.as_bytes());
    commands::cmd_import(&db, &config, &[csv], false, false).unwrap();

    assert!(commands::cmd_imports_list(&db, 20).is_ok());

    let import_id = db.list_imports(1).unwrap()[0].id;
    commands::cmd_imports_delete(&db, import_id).unwrap();

    assert_eq!(db.count_movements().unwrap(), 0);
    assert!(db.list_imports(20).unwrap().is_empty());
}

#[test]
fn test_cmd_imports_delete_not_found() {
    let (db, _) = setup_test_db();
    let result = commands::cmd_imports_delete(&db, 99999);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("not found"));
}

#[test]
fn test_cmd_rules_add_and_disable() {
    let (db, _) = setup_test_db();
    let before = db.list_rules(false).unwrap().len();

    commands::cmd_rules_add(&db, "taller pepe", "tall", Some("mty"), None).unwrap();

    let rules = db.list_rules(false).unwrap();
    assert_eq!(rules.len(), before + 1);
    let added = rules.last().unwrap();
    assert_eq!(added.rule.pattern, "TALLER PEPE");
    assert_eq!(added.rule.category_id, "TALL");
    assert_eq!(added.rule.vehicle_id.as_deref(), Some("MTY"));

    commands::cmd_rules_set_active(&db, added.id, false).unwrap();
    assert_eq!(db.list_rules(false).unwrap().len(), before);
    assert_eq!(db.list_rules(true).unwrap().len(), before + 1);

    assert!(commands::cmd_rules_list(&db, true).is_ok());
}

#[test]
fn test_cmd_rules_add_rejects_unknown_ids() {
    let (db, _) = setup_test_db();
    assert!(commands::cmd_rules_add(&db, "X", "NOPE", None, None).is_err());
    assert!(commands::cmd_rules_add(&db, "X", "TALL", Some("ZZZ"), None).is_err());
}

#[test]
fn test_cmd_rules_set_active_missing() {
    let (db, _) = setup_test_db();
    assert!(commands::cmd_rules_set_active(&db, 99999, true).is_err());
}

#[test]
fn test_cmd_vehicles_depreciation() {
    let (db, _) = setup_test_db();

    commands::cmd_vehicles_depreciation(&db, "mlb", 812.5).unwrap();

    let mlb = db
        .list_vehicles()
        .unwrap()
        .into_iter()
        .find(|v| v.id == "MLB")
        .unwrap();
    assert_eq!(mlb.monthly_depreciation, 812.5);

    assert!(commands::cmd_vehicles_depreciation(&db, "MLB", -1.0).is_err());
    assert!(commands::cmd_vehicles_depreciation(&db, "XYZ", 1.0).is_err());
    assert!(commands::cmd_vehicles_list(&db).is_ok());
}

// ========== Checklist / Dedupe Command Tests ==========

#[test]
fn test_cmd_checklist_overrides() {
    let (db, config) = setup_test_db();
    let dir = TempDir::new().unwrap();
    let csv = write_file(&dir, "extracto.csv", STATEMENT.as_bytes());
    commands::cmd_import(&db, &config, &[csv], false, false).unwrap();

    commands::cmd_checklist(&db, Some("2025-12"), Some("solred_invoice"), None).unwrap();
    assert_eq!(
        db.checklist_overrides("2025-12")
            .unwrap()
            .get("solred_invoice")
            .map(String::as_str),
        Some("not_applicable")
    );

    commands::cmd_checklist(&db, Some("2025-12"), None, Some("solred_invoice")).unwrap();
    assert!(db.checklist_overrides("2025-12").unwrap().is_empty());
}

#[test]
fn test_cmd_checklist_rejects_bad_input() {
    let (db, _) = setup_test_db();
    assert!(commands::cmd_checklist(&db, Some("2025-13"), None, None).is_err());
    assert!(commands::cmd_checklist(&db, Some("2025-12"), Some("nonsense"), None).is_err());
}

#[test]
fn test_current_month_format() {
    let month = commands::current_month();
    assert_eq!(month.len(), 7);
    assert_eq!(&month[4..5], "-");
}

#[test]
fn test_cmd_dedupe() {
    let (db, _) = setup_test_db();
    assert!(commands::cmd_dedupe(&db).is_ok());
    assert!(db.has_movement_key_index().unwrap());
}

#[test]
fn test_cmd_init_creates_database() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("flota.db");

    commands::cmd_init(&db_path, None).unwrap();
    // Second run leaves reference data unchanged
    commands::cmd_init(&db_path, None).unwrap();

    let db = commands::open_db(&db_path).unwrap();
    assert_eq!(db.list_vehicles().unwrap().len(), 5);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let rules: i64 = conn
        .query_row("SELECT COUNT(*) FROM rules", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rules as usize, FleetConfig::embedded().unwrap().rules().len());
}

// ========== Utility Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("exactly10!", 10), "exactly10!");
    assert_eq!(truncate("this is a long string", 10), "this is...");
    assert_eq!(truncate("CAMIÓN ÑANDÚ", 8), "CAMIÓ...");
}
