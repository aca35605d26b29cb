//! SQLite build ledger
//!
//! Records every event build run with its audit counts and the
//! (entity, Config) pairs that were skipped.

use crate::data::dataset::BuildAudit;
use crate::{EntityKind, EventId, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS builds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                finished_at TEXT,
                status TEXT NOT NULL DEFAULT 'running',
                attempted INTEGER NOT NULL DEFAULT 0,
                succeeded INTEGER NOT NULL DEFAULT 0,
                failed INTEGER NOT NULL DEFAULT 0,
                cached INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS skipped (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                build_id INTEGER NOT NULL REFERENCES builds(id),
                entity_kind TEXT NOT NULL,
                entity_id INTEGER NOT NULL,
                config TEXT NOT NULL,
                reason TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_builds_event ON builds(event_id);
            "#,
        )?;
        Ok(())
    }

    /// Open a ledger entry for an event build
    pub fn start_build(&self, event: EventId) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO builds (event_id, started_at) VALUES (?1, ?2)",
            params![event.0, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Record an (entity, Config) pair that yielded no row
    pub fn record_skip(
        &self,
        build_id: i64,
        kind: EntityKind,
        entity: u32,
        config: &str,
        reason: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO skipped (build_id, entity_kind, entity_id, config, reason)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![build_id, kind.to_string(), entity, config, reason],
        )?;
        Ok(())
    }

    /// Close a ledger entry with its final counts
    pub fn finish_build(&self, build_id: i64, audit: &BuildAudit, status: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE builds SET finished_at = ?1, status = ?2,
                attempted = ?3, succeeded = ?4, failed = ?5, cached = ?6
             WHERE id = ?7",
            params![
                Utc::now().to_rfc3339(),
                status,
                audit.attempted as i64,
                audit.succeeded as i64,
                audit.failed as i64,
                audit.cached as i64,
                build_id,
            ],
        )?;
        Ok(())
    }

    /// Most recent builds first
    pub fn recent_builds(&self, limit: usize) -> Result<Vec<BuildRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_id, started_at, finished_at, status,
                    attempted, succeeded, failed, cached
             FROM builds ORDER BY id DESC LIMIT ?1",
        )?;
        let builds = stmt
            .query_map(params![limit as i64], |row| {
                Ok(BuildRecord {
                    id: row.get(0)?,
                    event: EventId(row.get(1)?),
                    started_at: row.get(2)?,
                    finished_at: row.get(3)?,
                    status: row.get(4)?,
                    audit: BuildAudit {
                        attempted: row.get::<_, i64>(5)? as usize,
                        succeeded: row.get::<_, i64>(6)? as usize,
                        failed: row.get::<_, i64>(7)? as usize,
                        cached: row.get::<_, i64>(8)? as usize,
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(builds)
    }

    /// Skipped pairs of one build as (kind, entity, config, reason)
    pub fn skipped(&self, build_id: i64) -> Result<Vec<(String, u32, String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_kind, entity_id, config, reason FROM skipped
             WHERE build_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![build_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get ledger statistics
    pub fn get_stats(&self) -> Result<LedgerStats> {
        let build_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM builds", [], |row| row.get(0))?;

        let event_count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT event_id) FROM builds",
            [],
            |row| row.get(0),
        )?;

        let skipped_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM skipped", [], |row| row.get(0))?;

        let last_finished: Option<String> = self
            .conn
            .query_row("SELECT MAX(finished_at) FROM builds", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(LedgerStats {
            build_count: build_count as usize,
            event_count: event_count as usize,
            skipped_count: skipped_count as usize,
            last_finished,
        })
    }
}

/// One ledger entry
#[derive(Debug, Clone)]
pub struct BuildRecord {
    pub id: i64,
    pub event: EventId,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String,
    pub audit: BuildAudit,
}

/// Ledger statistics
#[derive(Debug, Clone)]
pub struct LedgerStats {
    pub build_count: usize,
    pub event_count: usize,
    pub skipped_count: usize,
    pub last_finished: Option<String>,
}
