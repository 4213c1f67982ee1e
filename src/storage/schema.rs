//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the docwatch database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Content hashes carried between runs, keyed by document URL
CREATE TABLE IF NOT EXISTS hash_ledger (
    url TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    storage_key TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    last_seen TEXT NOT NULL
);

-- Stored document content
CREATE TABLE IF NOT EXISTS documents (
    storage_key TEXT PRIMARY KEY,
    site_folder TEXT NOT NULL,
    site_name TEXT NOT NULL,
    source_url TEXT NOT NULL,
    filename TEXT NOT NULL,
    content_type TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    kind TEXT NOT NULL,
    crawl_level INTEGER NOT NULL,
    size_bytes INTEGER NOT NULL,
    content BLOB NOT NULL,
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_site ON documents(site_folder);
CREATE INDEX IF NOT EXISTS idx_documents_url ON documents(source_url);

-- Bounded run history
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    trigger_type TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    config_hash TEXT,
    ledger_entries INTEGER NOT NULL,
    cancelled INTEGER NOT NULL DEFAULT 0,
    notes TEXT NOT NULL DEFAULT '',
    validation_uploaded INTEGER,
    validation_stored INTEGER,
    validation_accuracy REAL,
    validated_at TEXT
);

-- Per-site results of each run
CREATE TABLE IF NOT EXISTS run_sites (
    run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    site_id TEXT NOT NULL,
    site_name TEXT NOT NULL,
    site_url TEXT NOT NULL,
    status TEXT NOT NULL,
    documents_found INTEGER NOT NULL,
    documents_processed INTEGER NOT NULL,
    documents_new INTEGER NOT NULL,
    documents_changed INTEGER NOT NULL,
    documents_unchanged INTEGER NOT NULL,
    documents_uploaded INTEGER NOT NULL,
    collisions INTEGER NOT NULL,
    documents_failed INTEGER NOT NULL,
    documents_rejected INTEGER NOT NULL,
    documents_skipped INTEGER NOT NULL,
    error TEXT,
    PRIMARY KEY (run_id, position)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
