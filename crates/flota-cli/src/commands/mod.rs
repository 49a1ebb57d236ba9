//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (open_db, load_config) plus init and dedupe
//! - `import` - File import (batch, dry run)
//! - `ledger` - Movements, import history, rules and vehicles
//! - `checklist` - Monthly document checklist

pub mod checklist;
pub mod core;
pub mod import;
pub mod ledger;

// Re-export command functions for main.rs
pub use checklist::*;
pub use core::*;
pub use import::*;
pub use ledger::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Signed EUR amount, red for expenses and green for income
pub fn colored_amount(amount: f64) -> String {
    if amount < 0.0 {
        format!("\x1b[31m{:>12}\x1b[0m", flota_core::locale::format_eur(amount))
    } else {
        format!("\x1b[32m{:>12}\x1b[0m", flota_core::locale::format_eur(amount))
    }
}
