//! Integration tests for flota-core
//!
//! These tests exercise the full classify → parse → commit → checklist
//! workflow against a temporary SQLite ledger.

use flota_core::{
    db::Database,
    error::{Error, Result},
    importer::{FileOutcome, ImportPayload, Importer, ReferenceData, SourceFile},
    models::{DocumentType, MovementFilter},
    ItemStatus, MonthlyChecklist, FleetConfig, TextExtractor,
};

/// Stands in for PDF extraction: the "PDF" bytes are already text
struct PlainText;

impl TextExtractor for PlainText {
    fn extract_text(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Pdf(e.to_string()))
    }
}

fn importer(db: &Database) -> Importer<'_, Database, PlainText> {
    let config = FleetConfig::embedded().expect("embedded config");
    db.seed_reference(&config).expect("seed reference data");
    let rules = db.active_rules().expect("rules");
    Importer::new(db, PlainText, ReferenceData::new(&config, Some(rules)))
}

fn statement_latin1() -> Vec<u8> {
    let text = "Cuenta;ES12 3456 7890\n\
Titular;TRANSPORTES EJEMPLO SL\n\
\n\
F. Operación;F. Valor;Concepto;Importe;Saldo;Referencia\n\
02/12/2025;02/12/2025;RECIBO TGSS COTIZACION;-1.234,56;10.000,00;R1\n\
05/12/2025;05/12/2025;TRANSFERENCIA NUTRIMENTOS;5.200,00;15.200,00;\n\
09/12/2025;09/12/2025;COMPRA VARIOS;-32,10;15.167,90;\n\
fecha mala;;BASURA;1,00;;\n";
    // Bank exports come in Windows-1252
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(text);
    bytes.into_owned()
}

const STAROIL_INVOICE: &str = "STAROIL DISTRIBUCION S.L.
Fecha Factura Cliente
31/12/25 2503369 101217
Matrícula: 9245MJC
1050227643 01/12/25 107727 Gasol A 200,00 1,428 200,06
1050227644 15/12/25 107727 AdBlue 20,00 0,900 18,00
Matrícula: 1257MTY
1050227650 20/12/25 107727 Gasol A 100,00 1,400 140,00
Base Imponible % Cuota IVA Total Factura
250,06 21,00 52,51 302,57
";

const VALCARCE_FUEL_INVOICE: &str = "ESTACION DE SERVICIO VALCARCE S.L.
31/12/2025 462989 24034 1
** Vehículo : 1257MTY
GA GASOLEO \"A\" 17-12 0039627 100,00 1,4500 145,00
GA GASOLEO \"A\" 24-12 0039628 300,00 1,4500 435,00
-- Total Base Imponible 400,00 484,00
** Vehículo : 0245MLB
GA GASOLEO \"A\" 20-12 0039629 50,00 1,4500 72,50
-- Total Base Imponible 50,00 60,50
-- BASE IMPONIBLE 450,00 21 94,50 544,50
";

const PAYROLL: &str = "COSTES LABORALES DICIEMBRE
1 SEVERINO 1.850,00 117,48 210,30 1.522,22 592,00 2.442,00
4 JESUS 1.700,00 107,95 180,00 1.412,05 544,00 2.244,00
3 CARLOS 1.850,00 117,55
";

const ROUTE_SHEET: &str = "Diciembre 2025 - Dispositivo MJC
Zona Viajes Repartos Km
Verde 30 60 1.500,5
Azul 10 20 500
Total Viajes 40
Días Trabajados 21
";

// =============================================================================
// Bank statements
// =============================================================================

#[test]
fn test_bank_statement_import_is_idempotent() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let importer = importer(&db);
    let bytes = statement_latin1();

    let analysis = importer.analyze("extracto_dic.csv", &bytes).unwrap();
    assert_eq!(analysis.document_type, DocumentType::BankStatement);
    assert_eq!(analysis.reference_month.as_deref(), Some("2025-12"));
    assert_eq!(analysis.errors.len(), 1, "bad date row reported");

    let movements = analysis.payload.movements();
    assert_eq!(movements.len(), 3);
    // Newest first
    assert_eq!(movements[0].description, "COMPRA VARIOS");
    let unmatched = &movements[0];
    assert_eq!(unmatched.category_id, "OTRO");
    assert!(unmatched.needs_review);

    let first = importer.commit(&analysis, false).unwrap();
    assert!(matches!(first, FileOutcome::Imported { inserted: 3, .. }));

    // Same bytes again: flagged, and forcing it changes nothing
    let again = importer.analyze("extracto_dic.csv", &bytes).unwrap();
    assert!(again.is_duplicate());
    assert_eq!(again.payload.duplicate_count(), 3);
    assert!(matches!(
        importer.commit(&again, false).unwrap(),
        FileOutcome::Duplicate { .. }
    ));
    assert!(matches!(
        importer.commit(&again, true).unwrap(),
        FileOutcome::Imported { inserted: 0, ignored: 3, .. }
    ));
    assert_eq!(db.count_movements().unwrap(), 3);
}

#[test]
fn test_renamed_copy_is_flagged_not_double_imported() {
    let db = Database::in_memory().unwrap();
    let importer = importer(&db);
    let bytes = statement_latin1();

    let files = vec![
        SourceFile::new("extracto_dic.csv", bytes.clone()),
        SourceFile::new("extracto_dic (1).csv", bytes),
    ];
    let report = importer.import_batch(&files, false);

    assert_eq!(report.imported(), 1);
    assert_eq!(report.duplicates(), 1);
    match &report.files[1].outcome {
        FileOutcome::Duplicate { reason } => assert!(reason.contains("identical content")),
        other => panic!("expected duplicate, got {:?}", other),
    }
    assert_eq!(db.count_movements().unwrap(), 3);
}

// =============================================================================
// Invoices
// =============================================================================

#[test]
fn test_staroil_invoice_to_ledger() {
    let db = Database::in_memory().unwrap();
    let importer = importer(&db);

    let analysis = importer
        .analyze("factura_staroil.pdf", STAROIL_INVOICE.as_bytes())
        .unwrap();
    assert_eq!(analysis.document_type, DocumentType::StarOilInvoice);
    assert_eq!(analysis.reference_month.as_deref(), Some("2025-12"));

    let ImportPayload::Invoice { invoice, movements, .. } = &analysis.payload else {
        panic!("expected invoice payload");
    };
    assert!(invoice.warnings.is_empty(), "{:?}", invoice.warnings);
    assert_eq!(movements.len(), 2);
    assert_eq!(
        movements[0].description,
        "STAROIL Fra.2503369 - 200L gasoil + 20L AdBlue (2 rep.)"
    );
    assert_eq!(movements[0].amount, -147.99);

    importer.commit(&analysis, false).unwrap();
    let fuel = db
        .list_movements(&MovementFilter {
            category_id: Some("COMB".to_string()),
            vehicle_id: Some("MJC".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(fuel.len(), 1);
    assert_eq!(fuel[0].reference.as_deref(), Some("2503369"));
}

#[test]
fn test_valcarce_fuel_prorated_into_ledger() {
    let db = Database::in_memory().unwrap();
    let importer = importer(&db);

    let report = importer.import_file(
        "valcarce_dic.pdf",
        VALCARCE_FUEL_INVOICE.as_bytes(),
        false,
    );
    assert_eq!(report.document_type, Some(DocumentType::ValcarceFuelInvoice));
    assert!(matches!(
        report.outcome,
        FileOutcome::Imported { inserted: 2, .. }
    ));

    let stored = db.list_movements(&MovementFilter::default()).unwrap();
    let total: f64 = stored.iter().map(|m| m.amount).sum();
    assert!((total + 450.0).abs() < 0.005);
}

#[test]
fn test_unknown_provider_is_file_error() {
    let db = Database::in_memory().unwrap();
    let report = importer(&db).import_file("factura.pdf", b"GASOLINERAS ACME", false);
    match report.outcome {
        FileOutcome::Error { reason } => assert!(reason.contains("provider")),
        other => panic!("expected error, got {:?}", other),
    }
    assert!(db.list_imports(10).unwrap().is_empty());
}

// =============================================================================
// Payroll, route sheets and the monthly checklist
// =============================================================================

#[test]
fn test_payroll_and_route_sheet_import() {
    let db = Database::in_memory().unwrap();
    let importer = importer(&db);

    let payroll = importer.import_file("COST_202512_Emp_65.pdf", PAYROLL.as_bytes(), false);
    assert_eq!(payroll.document_type, Some(DocumentType::Payroll));
    assert!(matches!(payroll.outcome, FileOutcome::Imported { inserted: 2, .. }));
    // The short row is reported, not padded
    assert!(payroll.warnings.iter().any(|w| w.contains("2 amounts")));

    let rows = db.list_payroll("2025-12").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].vehicle_id, "MTY");

    let sheet = importer.import_file("hoja.pdf", ROUTE_SHEET.as_bytes(), false);
    assert_eq!(sheet.document_type, Some(DocumentType::RouteSheet));
    let stored = db.get_route_sheet("2025-12", "MJC").unwrap().unwrap();
    assert_eq!(stored.total_trips, 40);
    assert_eq!(stored.total_deliveries, 80);
    assert_eq!(stored.total_km, 2000.5);
    assert_eq!(stored.days_worked, 21);
}

#[test]
fn test_monthly_checklist_follows_imports() {
    let db = Database::in_memory().unwrap();
    let importer = importer(&db);

    importer.import_file("extracto_dic.csv", &statement_latin1(), false);
    importer.import_file("factura_staroil.pdf", STAROIL_INVOICE.as_bytes(), false);
    let payroll = importer.import_file("COST_202512.pdf", PAYROLL.as_bytes(), false);

    let checklist = MonthlyChecklist::new(&db);
    let month = checklist.build("2025-12").unwrap();
    let status = |key: &str| {
        month
            .items
            .iter()
            .find(|i| i.key == key)
            .map(|i| i.status)
            .unwrap()
    };
    assert_eq!(status("bank_statement"), ItemStatus::Imported);
    assert_eq!(status("staroil_invoice"), ItemStatus::Imported);
    assert_eq!(status("payroll"), ItemStatus::Imported);
    assert_eq!(status("solred_invoice"), ItemStatus::Pending);
    assert!(!month.is_complete());

    checklist
        .set_status("2025-12", "solred_invoice", ItemStatus::NotApplicable)
        .unwrap();
    checklist
        .set_status("2025-12", "valcarce_toll_invoice", ItemStatus::NotApplicable)
        .unwrap();
    assert!(checklist.build("2025-12").unwrap().is_complete());

    // Deleting the payroll import reopens the item
    let FileOutcome::Imported { import_id, .. } = payroll.outcome else {
        panic!("payroll not imported");
    };
    db.delete_import(import_id).unwrap();
    let month = checklist.build("2025-12").unwrap();
    let payroll_item = month.items.iter().find(|i| i.key == "payroll").unwrap();
    assert_eq!(payroll_item.status, ItemStatus::Pending);
}
