//! Ledger command implementations: movements, imports, rules, vehicles

use anyhow::{Context, Result};
use chrono::NaiveDate;
use flota_core::{
    db::Database,
    locale::format_eur,
    models::{CategorizationRule, MovementFilter},
};

use super::{colored_amount, truncate};

pub fn movement_filter(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    vehicle: Option<String>,
    category: Option<String>,
    review_only: bool,
    limit: i64,
) -> MovementFilter {
    MovementFilter {
        from,
        to,
        vehicle_id: vehicle.map(|v| v.to_uppercase()),
        category_id: category.map(|c| c.to_uppercase()),
        needs_review: review_only.then_some(true),
        limit: Some(limit),
    }
}

pub fn cmd_movements_list(db: &Database, filter: &MovementFilter) -> Result<()> {
    let movements = db.list_movements(filter)?;

    if movements.is_empty() {
        println!("No movements found. Import some with:");
        println!("  flota import extracto.csv");
        return Ok(());
    }

    println!();
    println!("📝 Movements");
    println!("   ─────────────────────────────────────────────────────────────");

    for m in &movements {
        println!(
            "   {} │ {} │ {:<6} │ {:<8} │ {}{}",
            m.date,
            colored_amount(m.amount),
            m.vehicle_id.as_deref().unwrap_or("-"),
            m.category_id.as_deref().unwrap_or("-"),
            truncate(&m.description, 45),
            if m.needs_review { " ⚑" } else { "" }
        );
    }

    let total: f64 = movements.iter().map(|m| m.amount).sum();
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {} movements, net {}", movements.len(), format_eur(total));

    Ok(())
}

pub fn cmd_imports_list(db: &Database, limit: i64) -> Result<()> {
    let imports = db.list_imports(limit)?;

    if imports.is_empty() {
        println!("No imports yet.");
        return Ok(());
    }

    println!();
    println!("📚 Import History");
    println!("   ─────────────────────────────────────────────────────────────");

    for import in imports {
        println!(
            "   #{:<4} {} │ {:<22} │ {:<7} │ {:>4} items │ {}",
            import.id,
            import.created_at.format("%Y-%m-%d %H:%M"),
            import.declared_type.label(),
            import.reference_month.as_deref().unwrap_or("-"),
            import.item_count,
            truncate(&import.file_name, 40)
        );
    }

    Ok(())
}

pub fn cmd_imports_delete(db: &Database, id: i64) -> Result<()> {
    let import = db
        .get_import(id)?
        .with_context(|| format!("Import #{} not found", id))?;

    let deleted = db.delete_import(id)?;

    println!("🗑️  Deleted import #{} ({})", id, import.file_name);
    println!("   Movements removed: {}", deleted.movements);
    if deleted.reassigned > 0 {
        println!(
            "   Movements kept by a later import of the same file: {}",
            deleted.reassigned
        );
    }
    if deleted.payroll_rows > 0 {
        println!("   Payroll rows removed: {}", deleted.payroll_rows);
    }
    if deleted.route_sheets > 0 {
        println!("   Route sheets removed: {}", deleted.route_sheets);
    }

    Ok(())
}

pub fn cmd_rules_list(db: &Database, include_inactive: bool) -> Result<()> {
    let rules = db.list_rules(include_inactive)?;

    if rules.is_empty() {
        println!("No rules in the database. Seed them with:");
        println!("  flota init");
        return Ok(());
    }

    println!();
    println!("📋 Categorization Rules (first match wins)");
    println!("   ─────────────────────────────────────────────────────────────");

    for rule in rules {
        println!(
            "   #{:<4} {:>3} │ {:<28} → {:<8} {:<6}{}",
            rule.id,
            rule.priority,
            truncate(&rule.rule.pattern, 28),
            rule.rule.category_id,
            rule.rule.vehicle_id.as_deref().unwrap_or(""),
            if rule.active { "" } else { " (disabled)" }
        );
    }

    Ok(())
}

pub fn cmd_rules_add(
    db: &Database,
    pattern: &str,
    category: &str,
    vehicle: Option<&str>,
    priority: Option<i64>,
) -> Result<()> {
    let category = category.to_uppercase();
    if !db.list_categories()?.iter().any(|c| c.id == category) {
        anyhow::bail!("Unknown category: {}", category);
    }
    let vehicle = vehicle.map(|v| v.to_uppercase());
    if let Some(ref vehicle) = vehicle {
        if !db.list_vehicles()?.iter().any(|v| &v.id == vehicle) {
            anyhow::bail!("Unknown vehicle: {}", vehicle);
        }
    }

    let rule = CategorizationRule::new(pattern, &category, vehicle.as_deref());
    let id = db.add_rule(&rule, priority)?;

    println!("✅ Added rule #{}: {} → {}", id, pattern.to_uppercase(), category);
    Ok(())
}

pub fn cmd_rules_set_active(db: &Database, id: i64, active: bool) -> Result<()> {
    db.set_rule_active(id, active)?;
    if active {
        println!("✅ Rule #{} enabled", id);
    } else {
        println!("✅ Rule #{} disabled", id);
    }
    Ok(())
}

pub fn cmd_vehicles_list(db: &Database) -> Result<()> {
    let vehicles = db.list_vehicles()?;

    if vehicles.is_empty() {
        println!("No vehicles in the database. Seed them with:");
        println!("  flota init");
        return Ok(());
    }

    println!();
    println!("🚚 Vehicles");
    println!("   ─────────────────────────────────────────────────────────────");
    for v in vehicles {
        println!(
            "   {:<6} │ {:<30} │ depreciation {:>12}/month",
            v.id,
            truncate(&v.name, 30),
            format_eur(v.monthly_depreciation)
        );
    }

    Ok(())
}

pub fn cmd_vehicles_depreciation(db: &Database, vehicle: &str, amount: f64) -> Result<()> {
    let vehicle = vehicle.to_uppercase();
    db.update_depreciation(&vehicle, amount)?;
    println!(
        "✅ {} monthly depreciation set to {}",
        vehicle,
        format_eur(amount)
    );
    Ok(())
}
