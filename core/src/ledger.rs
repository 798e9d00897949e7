//! SQLite persistence for work-item ownership and the reassignment audit.
//!
//! RULE: Only the ledger talks to the database.
//! The coordinator reaches it through the `WorkflowStore` and `AuditLog`
//! traits and never executes SQL directly.

use crate::{
    error::DeskResult,
    types::{ItemId, Timestamp},
    workflow::{AuditEntry, AuditLog, WorkflowStore},
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, types::Type, Connection, OptionalExtension};

pub struct SqliteLedger {
    conn: Mutex<Connection>,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl SqliteLedger {
    pub fn open(path: &str) -> DeskResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> DeskResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn: Mutex::new(conn), path: None })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DeskResult<()> {
        self.conn
            .lock()
            .execute_batch(include_str!("../../migrations/001_workflow.sql"))?;
        Ok(())
    }

    // ── Work items ─────────────────────────────────────────────

    /// Create or overwrite the owner of a work item.
    pub fn assign_work_item(&self, item_id: &str, reviewer_id: &str, at: Timestamp) -> DeskResult<()> {
        self.conn.lock().execute(
            "INSERT INTO work_item (item_id, reviewer_id, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(item_id) DO UPDATE SET reviewer_id = excluded.reviewer_id,
                                                updated_at  = excluded.updated_at",
            params![item_id, reviewer_id, at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn work_item_owner(&self, item_id: &str) -> DeskResult<Option<String>> {
        let owner = self
            .conn
            .lock()
            .query_row(
                "SELECT reviewer_id FROM work_item WHERE item_id = ?1",
                params![item_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }

    pub fn work_item_updated_at(&self, item_id: &str) -> DeskResult<Option<Timestamp>> {
        let stamp: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT updated_at FROM work_item WHERE item_id = ?1",
                params![item_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(stamp) = stamp else {
            return Ok(None);
        };
        let at = DateTime::parse_from_rfc3339(&stamp)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?
            .with_timezone(&Utc);
        Ok(Some(at))
    }

    pub fn work_item_count(&self, reviewer_id: &str) -> DeskResult<i64> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM work_item WHERE reviewer_id = ?1",
            params![reviewer_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ── Audit ──────────────────────────────────────────────────

    pub fn audit_entries_for_item(&self, item_id: &str) -> DeskResult<Vec<AuditEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT item_id, from_reviewer_id, to_reviewer_id, actor_id, actor_email,
                    reason, created_at
             FROM reassignment_audit WHERE item_id = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![item_id], audit_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn audit_entry_count(&self) -> DeskResult<i64> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM reassignment_audit",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl WorkflowStore for SqliteLedger {
    fn list_work_items_assigned_to(&self, reviewer_id: &str) -> DeskResult<Vec<ItemId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT item_id FROM work_item WHERE reviewer_id = ?1 ORDER BY item_id ASC",
        )?;
        let rows = stmt.query_map(params![reviewer_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn reassign_work_item(
        &self,
        item_id:          &str,
        from_reviewer_id: &str,
        to_reviewer_id:   &str,
        at:               Timestamp,
    ) -> DeskResult<bool> {
        let changed = self.conn.lock().execute(
            "UPDATE work_item SET reviewer_id = ?1, updated_at = ?2
             WHERE item_id = ?3 AND reviewer_id = ?4",
            params![to_reviewer_id, at.to_rfc3339(), item_id, from_reviewer_id],
        )?;
        Ok(changed == 1)
    }
}

impl AuditLog for SqliteLedger {
    fn record(&self, entry: &AuditEntry) -> DeskResult<()> {
        self.conn.lock().execute(
            "INSERT INTO reassignment_audit (
                item_id, from_reviewer_id, to_reviewer_id, actor_id, actor_email,
                reason, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &entry.item_id,
                &entry.from_reviewer_id,
                &entry.to_reviewer_id,
                &entry.actor_id,
                &entry.actor_email,
                &entry.reason,
                entry.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

fn audit_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntry> {
    let created_at: String = row.get(6)?;
    let timestamp = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);
    Ok(AuditEntry {
        item_id:          row.get(0)?,
        from_reviewer_id: row.get(1)?,
        to_reviewer_id:   row.get(2)?,
        actor_id:         row.get(3)?,
        actor_email:      row.get(4)?,
        reason:           row.get(5)?,
        timestamp,
    })
}
