//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Shared utility to load the fleet config
//! - `cmd_init` - Initialize the database and seed reference data
//! - `cmd_dedupe` - Purge duplicate movements

use std::path::Path;

use anyhow::{Context, Result};
use flota_core::{db::Database, FleetConfig};

pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    Database::new(path_str).context("Failed to open database")
}

pub fn load_config(config_path: Option<&Path>) -> Result<FleetConfig> {
    FleetConfig::load(config_path).context("Failed to load fleet config")
}

pub fn cmd_init(db_path: &Path, config_path: Option<&Path>) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;
    let config = load_config(config_path)?;

    let seeded = db
        .seed_reference(&config)
        .context("Failed to seed reference data")?;
    println!(
        "   Seeded {} vehicles, {} categories, {} rules",
        seeded.vehicles, seeded.categories, seeded.rules
    );
    if seeded == Default::default() {
        println!("   Reference data already present, nothing changed");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import documents: flota import extracto.csv facturas/*.pdf");
    println!("  2. Review the month: flota checklist --month YYYY-MM");

    Ok(())
}

pub fn cmd_dedupe(db: &Database) -> Result<()> {
    println!("🧹 Removing duplicate movements...");

    let result = db.purge_duplicate_movements()?;

    println!("   Removed: {}", result.removed);
    if result.index_present {
        println!("✅ Unique movement index in place");
    } else {
        println!("   ⚠️  Unique movement index could not be created");
    }

    Ok(())
}
