//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the DocumentStore trait.

use crate::crawler::{PerSiteResult, SiteCounts, ValidationResult};
use crate::output::{RunSummary, TriggerType};
use crate::state::{sanitize_folder, HashLedger, HashRecord, SiteStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DocumentMetadata, DocumentStore, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".to_string()))
    }
}

fn parse_time(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<PerSiteResult> {
    let count = |idx: usize| -> rusqlite::Result<usize> { Ok(row.get::<_, i64>(idx)? as usize) };
    Ok(PerSiteResult {
        site_id: row.get(0)?,
        site_name: row.get(1)?,
        site_url: row.get(2)?,
        status: SiteStatus::from_db_string(&row.get::<_, String>(3)?).unwrap_or(SiteStatus::Error),
        counts: SiteCounts {
            found: count(4)?,
            processed: count(5)?,
            new: count(6)?,
            changed: count(7)?,
            unchanged: count(8)?,
            uploaded: count(9)?,
            collisions: count(10)?,
            failed: count(11)?,
            rejected: count(12)?,
            skipped: count(13)?,
        },
        ledger_delta: HashLedger::new(),
        error: row.get(14)?,
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    // ===== Hash Ledger =====

    async fn get_hash_ledger(&self) -> StorageResult<HashLedger> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT url, filename, storage_key, content_hash, last_seen FROM hash_ledger",
        )?;

        let records = stmt
            .query_map([], |row| {
                Ok(HashRecord {
                    url: row.get(0)?,
                    filename: row.get(1)?,
                    storage_key: row.get(2)?,
                    content_hash: row.get(3)?,
                    last_seen: parse_time(&row.get::<_, String>(4)?),
                })
            })?
            .collect::<Result<HashLedger, _>>()?;

        Ok(records)
    }

    async fn put_hash_ledger(&self, ledger: &HashLedger) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO hash_ledger (url, filename, storage_key, content_hash, last_seen)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in ledger.iter() {
                stmt.execute(params![
                    record.url,
                    record.filename,
                    record.storage_key,
                    record.content_hash,
                    record.last_seen.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ===== Documents =====

    async fn put_document(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        metadata: &DocumentMetadata,
    ) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO documents
             (storage_key, site_folder, site_name, source_url, filename, content_type, content_hash,
              status, kind, crawl_level, size_bytes, content, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                key,
                sanitize_folder(&metadata.site_name),
                metadata.site_name,
                metadata.source_url,
                metadata.filename,
                content_type,
                metadata.content_hash,
                metadata.status.as_str(),
                metadata.kind.as_str(),
                metadata.crawl_level,
                bytes.len() as i64,
                bytes,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn stored_document_count(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn documents_by_site(&self) -> StorageResult<Vec<(String, u64)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT site_folder, COUNT(*) AS n FROM documents
             GROUP BY site_folder ORDER BY n DESC, site_folder ASC",
        )?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    // ===== Run History =====

    async fn append_run_summary(
        &self,
        summary: &RunSummary,
        retention: usize,
    ) -> StorageResult<i64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let validation = summary.validation.as_ref();
        tx.execute(
            "INSERT INTO runs (trigger_type, started_at, finished_at, config_hash, ledger_entries,
                               cancelled, notes, validation_uploaded, validation_stored,
                               validation_accuracy, validated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                summary.trigger.to_db_string(),
                summary.started_at.to_rfc3339(),
                summary.finished_at.to_rfc3339(),
                summary.config_hash,
                summary.ledger_entries as i64,
                summary.cancelled,
                summary.notes.join("\n"),
                validation.map(|v| v.uploaded as i64),
                validation.map(|v| v.stored as i64),
                validation.and_then(|v| v.accuracy),
                validation.map(|v| v.checked_at.to_rfc3339()),
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO run_sites (run_id, position, site_id, site_name, site_url, status,
                    documents_found, documents_processed, documents_new, documents_changed,
                    documents_unchanged, documents_uploaded, collisions, documents_failed,
                    documents_rejected, documents_skipped, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            )?;
            for (position, site) in summary.sites.iter().enumerate() {
                let c = &site.counts;
                stmt.execute(params![
                    run_id,
                    position as i64,
                    site.site_id,
                    site.site_name,
                    site.site_url,
                    site.status.to_db_string(),
                    c.found as i64,
                    c.processed as i64,
                    c.new as i64,
                    c.changed as i64,
                    c.unchanged as i64,
                    c.uploaded as i64,
                    c.collisions as i64,
                    c.failed as i64,
                    c.rejected as i64,
                    c.skipped as i64,
                    site.error,
                ])?;
            }
        }

        tx.execute(
            "DELETE FROM runs WHERE id NOT IN (SELECT id FROM runs ORDER BY id DESC LIMIT ?1)",
            params![retention as i64],
        )?;

        tx.commit()?;
        Ok(run_id)
    }

    async fn run_history(&self, limit: usize) -> StorageResult<Vec<RunSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, trigger_type, started_at, finished_at, config_hash, ledger_entries,
                    cancelled, notes, validation_uploaded, validation_stored,
                    validation_accuracy, validated_at
             FROM runs ORDER BY id DESC LIMIT ?1",
        )?;

        let mut summaries = stmt
            .query_map(params![limit as i64], |row| {
                let trigger = TriggerType::from_db_string(&row.get::<_, String>(1)?)
                    .unwrap_or(TriggerType::Manual);
                let notes: String = row.get(7)?;
                let validation = match (
                    row.get::<_, Option<i64>>(8)?,
                    row.get::<_, Option<i64>>(9)?,
                    row.get::<_, Option<String>>(11)?,
                ) {
                    (Some(uploaded), Some(stored), Some(at)) => Some(ValidationResult {
                        uploaded: uploaded as u64,
                        stored: stored as u64,
                        matches: uploaded == stored,
                        accuracy: row.get(10)?,
                        checked_at: parse_time(&at),
                    }),
                    _ => None,
                };

                Ok(RunSummary {
                    id: Some(row.get(0)?),
                    trigger,
                    started_at: parse_time(&row.get::<_, String>(2)?),
                    finished_at: parse_time(&row.get::<_, String>(3)?),
                    config_hash: row.get(4)?,
                    sites: Vec::new(),
                    ledger_entries: row.get::<_, i64>(5)? as usize,
                    validation,
                    cancelled: row.get(6)?,
                    notes: notes
                        .lines()
                        .filter(|l| !l.is_empty())
                        .map(|l| l.to_string())
                        .collect(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut site_stmt = conn.prepare(
            "SELECT site_id, site_name, site_url, status, documents_found, documents_processed,
                    documents_new, documents_changed, documents_unchanged, documents_uploaded,
                    collisions, documents_failed, documents_rejected, documents_skipped, error
             FROM run_sites WHERE run_id = ?1 ORDER BY position",
        )?;

        for summary in &mut summaries {
            if let Some(run_id) = summary.id {
                summary.sites = site_stmt
                    .query_map(params![run_id], site_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
            }
        }

        Ok(summaries)
    }
}
