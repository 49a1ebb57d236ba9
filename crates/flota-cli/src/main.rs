//! Flota CLI - Fleet financial document ledger
//!
//! Usage:
//!   flota init                      Initialize database and reference data
//!   flota import FILES...           Import statements, invoices, payroll, route sheets
//!   flota movements --vehicle MTY   List ledger movements
//!   flota checklist --month 2025-12 Monthly document checklist

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, config_path),
        Commands::Import {
            files,
            yes,
            dry_run,
            json,
        } => {
            let db = commands::open_db(&cli.db)?;
            let config = commands::load_config(config_path)?;
            if dry_run {
                commands::cmd_import_dry_run(&db, &config, &files)
            } else {
                let report = commands::cmd_import(&db, &config, &files, yes, !json)?;
                if json {
                    println!("{}", report.to_json()?);
                }
                Ok(())
            }
        }
        Commands::Movements {
            from,
            to,
            vehicle,
            category,
            review,
            limit,
        } => {
            let db = commands::open_db(&cli.db)?;
            let filter = commands::movement_filter(from, to, vehicle, category, review, limit);
            commands::cmd_movements_list(&db, &filter)
        }
        Commands::Imports { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_imports_list(&db, 20),
                Some(ImportsAction::List { limit }) => commands::cmd_imports_list(&db, limit),
                Some(ImportsAction::Delete { id }) => commands::cmd_imports_delete(&db, id),
            }
        }
        Commands::Rules { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_rules_list(&db, false),
                Some(RulesAction::List { all }) => commands::cmd_rules_list(&db, all),
                Some(RulesAction::Add {
                    pattern,
                    category,
                    vehicle,
                    priority,
                }) => commands::cmd_rules_add(
                    &db,
                    &pattern,
                    &category,
                    vehicle.as_deref(),
                    priority,
                ),
                Some(RulesAction::Disable { id }) => commands::cmd_rules_set_active(&db, id, false),
                Some(RulesAction::Enable { id }) => commands::cmd_rules_set_active(&db, id, true),
            }
        }
        Commands::Vehicles { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(VehiclesAction::List) => commands::cmd_vehicles_list(&db),
                Some(VehiclesAction::Depreciation { vehicle, amount }) => {
                    commands::cmd_vehicles_depreciation(&db, &vehicle, amount)
                }
            }
        }
        Commands::Dedupe => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_dedupe(&db)
        }
        Commands::Checklist {
            month,
            not_applicable,
            reset,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_checklist(
                &db,
                month.as_deref(),
                not_applicable.as_deref(),
                reset.as_deref(),
            )
        }
    }
}
