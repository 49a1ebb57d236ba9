//! Monthly checklist command

use anyhow::Result;
use flota_core::{db::Database, ItemStatus, MonthlyChecklist};

/// Current month as YYYY-MM
pub fn current_month() -> String {
    chrono::Local::now().format("%Y-%m").to_string()
}

pub fn cmd_checklist(
    db: &Database,
    month: Option<&str>,
    not_applicable: Option<&str>,
    reset: Option<&str>,
) -> Result<()> {
    let month = month.map(String::from).unwrap_or_else(current_month);
    let checklist = MonthlyChecklist::new(db);

    if let Some(item) = not_applicable {
        checklist.set_status(&month, item, ItemStatus::NotApplicable)?;
        println!("✅ {} marked not applicable for {}", item, month);
    }
    if let Some(item) = reset {
        checklist.set_status(&month, item, ItemStatus::Pending)?;
        println!("✅ {} reset for {}", item, month);
    }

    let built = checklist.build(&month)?;

    println!();
    println!("🗓️  Checklist {}", built.month);
    println!("   ─────────────────────────────────────────────────────────────");

    for item in &built.items {
        let icon = match item.status {
            ItemStatus::Imported | ItemStatus::Detected => "✓",
            ItemStatus::NotApplicable => "–",
            ItemStatus::Pending => "·",
        };
        println!(
            "   {} {:<24} {:<15} {}{}",
            icon,
            item.label,
            item.status,
            if item.mandatory { "" } else { "(optional) " },
            if item.overridden { "(manual)" } else { "" }
        );
    }

    println!();
    if built.is_complete() {
        println!("✅ All required documents are in");
    } else {
        let missing: Vec<&str> = built
            .pending()
            .into_iter()
            .filter(|i| i.mandatory)
            .map(|i| i.key.as_str())
            .collect();
        println!("   Missing: {}", missing.join(", "));
    }

    Ok(())
}
