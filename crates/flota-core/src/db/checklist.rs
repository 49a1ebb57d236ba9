//! Manual checklist overrides

use std::collections::HashMap;

use rusqlite::params;

use super::Database;
use crate::error::Result;

impl Database {
    /// Record a manual status for a checklist item in a month
    pub fn set_checklist_override(&self, month: &str, item: &str, status: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO checklist_overrides (month, item, status) VALUES (?, ?, ?)
            ON CONFLICT(month, item) DO UPDATE SET status = excluded.status, updated_at = CURRENT_TIMESTAMP
            "#,
            params![month, item, status],
        )?;
        Ok(())
    }

    /// Returns whether an override existed
    pub fn clear_checklist_override(&self, month: &str, item: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM checklist_overrides WHERE month = ? AND item = ?",
            params![month, item],
        )?;
        Ok(removed > 0)
    }

    /// item -> status for a month
    pub fn checklist_overrides(&self, month: &str) -> Result<HashMap<String, String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT item, status FROM checklist_overrides WHERE month = ?")?;
        let overrides = stmt
            .query_map(params![month], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(overrides)
    }
}
