//! Import command implementations

use std::path::PathBuf;

use anyhow::Result;
use flota_core::{
    db::Database,
    importer::{BatchReport, FileOutcome, FileReport, ImportPayload, Importer, ReferenceData},
    locale::format_eur,
    FleetConfig, PdfTextExtractor, SourceFile,
};

use super::truncate;

fn build_importer<'a>(
    db: &'a Database,
    config: &FleetConfig,
) -> Result<Importer<'a, Database, PdfTextExtractor>> {
    // Rules edited in the ledger win over the config list
    let rules = db.active_rules()?;
    Ok(Importer::new(
        db,
        PdfTextExtractor,
        ReferenceData::new(config, Some(rules)),
    ))
}

pub fn cmd_import(
    db: &Database,
    config: &FleetConfig,
    files: &[PathBuf],
    confirm_duplicates: bool,
    show_progress: bool,
) -> Result<BatchReport> {
    if show_progress {
        println!("📥 Importing {} file(s)...", files.len());
    }

    let importer = build_importer(db, config)?;
    let mut report = BatchReport::default();

    for path in files {
        let file_report = match SourceFile::read(path) {
            Ok(file) => importer.import_file(&file.name, &file.bytes, confirm_duplicates),
            Err(e) => FileReport::error(&path.display().to_string(), e.to_string()),
        };
        if show_progress {
            print_file_report(&file_report);
        }
        report.push(file_report);
    }

    if !show_progress {
        return Ok(report);
    }

    println!();
    println!("✅ Import complete!");
    println!("   Imported: {} file(s), {} new movements", report.imported(), report.inserted());
    if report.duplicates() > 0 {
        println!(
            "   Duplicates: {} file(s) held back (re-run with --yes to import anyway)",
            report.duplicates()
        );
    }
    if report.errors() > 0 {
        println!("   Errors: {} file(s)", report.errors());
    }

    Ok(report)
}

fn print_file_report(report: &FileReport) {
    let kind = report
        .document_type
        .map(|t| t.label())
        .unwrap_or("unknown");
    let month = report.reference_month.as_deref().unwrap_or("-");

    match &report.outcome {
        FileOutcome::Imported {
            import_id,
            inserted,
            ignored,
        } => println!(
            "   ✓ {} [{} {}] import #{}: {} new, {} already present",
            report.file_name, kind, month, import_id, inserted, ignored
        ),
        FileOutcome::Duplicate { reason } => {
            println!("   ⚠️  {} [{} {}] duplicate: {}", report.file_name, kind, month, reason)
        }
        FileOutcome::Error { reason } => println!("   ✗ {}: {}", report.file_name, reason),
    }
    for warning in &report.warnings {
        println!("      - {}", warning);
    }
}

/// Parse every file and show what would be imported
pub fn cmd_import_dry_run(db: &Database, config: &FleetConfig, files: &[PathBuf]) -> Result<()> {
    println!("🔎 Dry run: nothing will be written");

    let importer = build_importer(db, config)?;

    for path in files {
        let analysis = SourceFile::read(path)
            .map_err(anyhow::Error::from)
            .and_then(|file| Ok(importer.analyze(&file.name, &file.bytes)?));

        let analysis = match analysis {
            Ok(analysis) => analysis,
            Err(e) => {
                println!();
                println!("   ✗ {}: {}", path.display(), e);
                continue;
            }
        };

        println!();
        println!(
            "📄 {} - {} ({})",
            analysis.file_name,
            analysis.document_type.label(),
            analysis.reference_month.as_deref().unwrap_or("month unknown")
        );

        match &analysis.payload {
            ImportPayload::Bank { summary, .. } => {
                println!(
                    "   {} movements: {} income ({}), {} expense ({})",
                    summary.total_rows,
                    summary.income_count,
                    format_eur(summary.income_total),
                    summary.expense_count,
                    format_eur(summary.expense_total)
                );
                if let (Some(from), Some(to)) = (summary.period_from, summary.period_to) {
                    println!("   Period: {} to {}", from, to);
                }
            }
            ImportPayload::Invoice { invoice, .. } => {
                println!(
                    "   Invoice {} dated {}",
                    invoice.invoice_number.as_deref().unwrap_or("?"),
                    invoice
                        .invoice_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "?".to_string())
                );
                for summary in &invoice.summaries {
                    println!(
                        "   {:<6} {:>4} lines  discount {:>12}  net {:>12}",
                        summary.vehicle_id,
                        summary.item_count,
                        format_eur(summary.discount_total),
                        format_eur(summary.net_total)
                    );
                }
            }
            ImportPayload::Payroll(report) => {
                for (vehicle, cost) in report.cost_by_vehicle() {
                    println!("   {:<6} {:>12}", vehicle, format_eur(cost));
                }
                println!("   Total labour cost: {}", format_eur(report.total_cost()));
            }
            ImportPayload::RouteSheet(sheet) => {
                println!(
                    "   {} ({}): {} trips, {} deliveries, {:.1} km, {} days",
                    sheet.vehicle_id,
                    sheet.device,
                    sheet.total_trips,
                    sheet.total_deliveries,
                    sheet.total_km,
                    sheet.days_worked
                );
            }
        }

        for movement in analysis.payload.movements().iter().take(10) {
            println!(
                "     {} {:>12} {:<6} {:<8} {}",
                movement.date,
                format_eur(movement.amount),
                movement.vehicle_id.as_deref().unwrap_or("-"),
                movement.category_id,
                truncate(&movement.description, 50)
            );
        }
        let more = analysis.payload.movements().len().saturating_sub(10);
        if more > 0 {
            println!("     ... {} more", more);
        }

        for reason in &analysis.duplicate_reasons {
            println!("   ⚠️  {}", reason);
        }
        for warning in analysis.warnings.iter().chain(&analysis.errors) {
            println!("   - {}", warning);
        }
    }

    Ok(())
}
