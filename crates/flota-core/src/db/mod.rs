//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `movements` - Ledger movements, duplicate-safe insertion and purge
//! - `imports` - Import history and the `LedgerSink` implementation
//! - `reference` - Vehicles, categories and categorization rules
//! - `payroll` - Monthly labour cost rows
//! - `route_sheets` - Monthly route sheets and zone rows
//! - `checklist` - Manual overrides for the monthly document checklist

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::{Error, Result};

mod checklist;
mod imports;
mod movements;
mod payroll;
mod reference;
mod route_sheets;

pub use imports::DeletedImport;
pub use movements::PurgeResult;
pub use payroll::PayrollCost;
pub use route_sheets::StoredRouteSheet;
pub use reference::SeedResult;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Name of the unique index backing idempotent movement inserts
pub const MOVEMENT_KEY_INDEX: &str = "idx_movements_unique_key";

/// Report a malformed stored value as a conversion failure of column `idx`
fn invalid_column(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(Error::InvalidData(message)),
    )
}

/// Parse a SQLite datetime string (column `idx`) into a DateTime<Utc>
pub(crate) fn parse_datetime(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .map_err(|e| invalid_column(idx, format!("bad timestamp {:?}: {}", s, e)))
}

/// Parse a stored ISO date (column `idx`)
pub(crate) fn parse_date_column(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| invalid_column(idx, format!("bad date {:?}: {}", s, e)))
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (or create) the ledger database at `path` and run migrations
    pub fn new(path: &str) -> Result<Self> {
        // foreign_keys is a per-connection setting
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create an in-memory database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` so that every pooled
    /// connection sees the same database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "flota_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Whether the movement key index exists
    pub fn has_movement_key_index(&self) -> Result<bool> {
        let conn = self.conn()?;
        index_exists(&conn)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Vehicles (plus the shared COMUN bucket)
            CREATE TABLE IF NOT EXISTS vehicles (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                monthly_depreciation REAL NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Categories
            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,                        -- expense, income
                assignment TEXT,                           -- how the cost is spread across vehicles
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Categorization rules (lowest priority runs first)
            CREATE TABLE IF NOT EXISTS rules (
                id INTEGER PRIMARY KEY,
                pattern TEXT NOT NULL UNIQUE,
                category_id TEXT NOT NULL,
                vehicle_id TEXT,
                priority INTEGER NOT NULL DEFAULT 0,
                active BOOLEAN NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_rules_priority ON rules(active, priority);

            -- Import history (one row per committed file)
            CREATE TABLE IF NOT EXISTS imports (
                id INTEGER PRIMARY KEY,
                file_name TEXT NOT NULL,
                content_hash TEXT NOT NULL,                -- SHA-256 of the raw bytes
                declared_type TEXT NOT NULL,
                reference_month TEXT,                      -- YYYY-MM
                item_count INTEGER NOT NULL DEFAULT 0,
                period_from DATE,
                period_to DATE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_imports_hash ON imports(content_hash);
            CREATE INDEX IF NOT EXISTS idx_imports_file_name ON imports(file_name);
            CREATE INDEX IF NOT EXISTS idx_imports_month ON imports(reference_month, declared_type);

            -- Ledger movements
            CREATE TABLE IF NOT EXISTS movements (
                id INTEGER PRIMARY KEY,
                date DATE NOT NULL,
                description TEXT NOT NULL,
                amount REAL NOT NULL,                      -- signed EUR, rounded to cents
                category_id TEXT,
                vehicle_id TEXT,
                reference TEXT,
                needs_review BOOLEAN NOT NULL DEFAULT 0,
                import_id INTEGER REFERENCES imports(id) ON DELETE CASCADE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_movements_date ON movements(date);
            CREATE INDEX IF NOT EXISTS idx_movements_vehicle ON movements(vehicle_id);
            CREATE INDEX IF NOT EXISTS idx_movements_category ON movements(category_id);
            CREATE INDEX IF NOT EXISTS idx_movements_import ON movements(import_id);

            -- Labour costs per worker and month
            CREATE TABLE IF NOT EXISTS payroll_costs (
                id INTEGER PRIMARY KEY,
                month TEXT NOT NULL,
                worker_id INTEGER NOT NULL,
                worker_name TEXT NOT NULL,
                vehicle_id TEXT NOT NULL,
                gross REAL NOT NULL,
                employee_ss REAL NOT NULL,
                withholding REAL NOT NULL,
                net REAL NOT NULL,
                employer_ss REAL NOT NULL,
                total_cost REAL NOT NULL,
                import_id INTEGER REFERENCES imports(id) ON DELETE CASCADE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(month, worker_id)
            );

            -- Route sheets per vehicle and month
            CREATE TABLE IF NOT EXISTS route_sheets (
                id INTEGER PRIMARY KEY,
                month TEXT NOT NULL,
                vehicle_id TEXT NOT NULL,
                device TEXT NOT NULL,
                total_trips INTEGER NOT NULL DEFAULT 0,
                total_deliveries INTEGER NOT NULL DEFAULT 0,
                total_km REAL NOT NULL DEFAULT 0,
                mean_deliveries_per_trip REAL NOT NULL DEFAULT 0,
                days_worked INTEGER NOT NULL DEFAULT 0,
                import_id INTEGER REFERENCES imports(id) ON DELETE CASCADE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(month, vehicle_id)
            );

            CREATE TABLE IF NOT EXISTS route_sheet_zones (
                route_sheet_id INTEGER NOT NULL REFERENCES route_sheets(id) ON DELETE CASCADE,
                zone TEXT NOT NULL,
                trips INTEGER NOT NULL,
                deliveries INTEGER NOT NULL,
                km REAL NOT NULL,
                PRIMARY KEY (route_sheet_id, zone)
            );

            -- Manual checklist decisions (not_applicable / pending)
            CREATE TABLE IF NOT EXISTS checklist_overrides (
                month TEXT NOT NULL,
                item TEXT NOT NULL,
                status TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (month, item)
            );
            "#,
        )?;

        create_movement_key_index(&conn);

        info!("Database schema initialized");
        Ok(())
    }
}

fn index_exists(conn: &Connection) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?",
        [MOVEMENT_KEY_INDEX],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Try to create the (date, description, amount) unique index
///
/// Fails when the table already holds duplicate keys; inserts then fall
/// back to per-row existence checks until the duplicates are purged.
fn create_movement_key_index(conn: &Connection) -> bool {
    let sql = format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON movements(date, description, amount)",
        MOVEMENT_KEY_INDEX
    );
    match conn.execute_batch(&sql) {
        Ok(()) => true,
        Err(e) => {
            warn!("Unique movement index not created ({}); run dedupe", e);
            false
        }
    }
}

#[cfg(test)]
mod tests;
