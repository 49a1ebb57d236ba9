//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Flota - Fleet ledger from bank statements, invoices, payroll and route sheets
#[derive(Parser)]
#[command(name = "flota")]
#[command(about = "Ingest fleet financial documents into a vehicle-attributed ledger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "flota.db", global = true)]
    pub db: PathBuf,

    /// Fleet config (vehicles, categories, rules, workers)
    ///
    /// Defaults to ~/.config/flota/fleet.toml when present, else the
    /// built-in configuration.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed reference data
    Init,

    /// Import bank CSVs and invoice, payroll or route sheet PDFs
    Import {
        /// Files to import (type is detected per file)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Import files flagged as possible duplicates
        #[arg(short, long)]
        yes: bool,

        /// Parse and report without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Print the batch report as JSON
        #[arg(long, conflicts_with = "dry_run")]
        json: bool,
    },

    /// List ledger movements
    Movements {
        /// From date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// To date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Vehicle id
        #[arg(long)]
        vehicle: Option<String>,

        /// Category id
        #[arg(long)]
        category: Option<String>,

        /// Only movements that need review
        #[arg(long)]
        review: bool,

        /// Maximum rows
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },

    /// Import history (list, delete)
    Imports {
        #[command(subcommand)]
        action: Option<ImportsAction>,
    },

    /// Categorization rules (list, add, disable, enable)
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// Vehicles (list, depreciation)
    Vehicles {
        #[command(subcommand)]
        action: Option<VehiclesAction>,
    },

    /// Remove duplicate movements and restore the unique key index
    Dedupe,

    /// Monthly document checklist
    Checklist {
        /// Month (YYYY-MM), defaults to the current month
        #[arg(short, long)]
        month: Option<String>,

        /// Mark an item as not applicable for the month
        #[arg(long, value_name = "ITEM")]
        not_applicable: Option<String>,

        /// Clear a manual status so the item is computed again
        #[arg(long, value_name = "ITEM")]
        reset: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ImportsAction {
    /// List recent imports
    List {
        /// Maximum rows
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Delete an import and everything it wrote
    Delete {
        /// Import ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List rules in evaluation order
    List {
        /// Include disabled rules
        #[arg(long)]
        all: bool,
    },

    /// Add a rule (evaluated after existing rules unless --priority)
    Add {
        /// Text to look for in movement descriptions
        pattern: String,

        /// Category id
        #[arg(short, long)]
        category: String,

        /// Vehicle id
        #[arg(long)]
        vehicle: Option<String>,

        /// Priority (lower runs first)
        #[arg(long)]
        priority: Option<i64>,
    },

    /// Disable a rule
    Disable {
        /// Rule ID
        id: i64,
    },

    /// Re-enable a rule
    Enable {
        /// Rule ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum VehiclesAction {
    /// List vehicles
    List,

    /// Set a vehicle's monthly depreciation
    Depreciation {
        /// Vehicle id
        vehicle: String,

        /// Amount in EUR per month
        amount: f64,
    },
}
