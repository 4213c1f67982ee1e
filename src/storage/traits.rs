//! Storage traits and error types
//!
//! This module defines the trait interface for document store backends and
//! associated error types.

use crate::crawler::DocumentKind;
use crate::output::RunSummary;
use crate::state::{DocumentStatus, HashLedger};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected for {key}: {reason}")]
    WriteRejected { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Descriptive fields stored alongside each document's bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub site_name: String,
    pub source_url: String,
    pub filename: String,
    pub content_hash: String,
    pub status: DocumentStatus,
    pub kind: DocumentKind,
    pub crawl_level: u32,
}

/// Trait for document store backends
///
/// The orchestrator is the only caller of the ledger and history methods; site
/// processors only call [`DocumentStore::put_document`]. Implementations must be
/// safe to share across site tasks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ===== Hash Ledger =====

    /// Loads the ledger written by the previous run (empty on first run)
    async fn get_hash_ledger(&self) -> StorageResult<HashLedger>;

    /// Persists the full ledger, replacing records with the same URL
    async fn put_hash_ledger(&self, ledger: &HashLedger) -> StorageResult<()>;

    // ===== Documents =====

    /// Writes document bytes under `key`, overwriting any earlier version
    ///
    /// # Arguments
    ///
    /// * `key` - Storage key of the form `folder/hash8_base.ext`
    /// * `bytes` - Raw content
    /// * `content_type` - MIME type recorded with the content
    /// * `metadata` - Source and classification details
    async fn put_document(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        metadata: &DocumentMetadata,
    ) -> StorageResult<()>;

    /// Authoritative number of documents currently held
    async fn stored_document_count(&self) -> StorageResult<u64>;

    /// Number of stored documents per site folder, largest first
    async fn documents_by_site(&self) -> StorageResult<Vec<(String, u64)>>;

    // ===== Run History =====

    /// Appends a summary and drops the oldest entries beyond `retention`
    ///
    /// # Returns
    ///
    /// The history id assigned to the summary
    async fn append_run_summary(&self, summary: &RunSummary, retention: usize)
        -> StorageResult<i64>;

    /// Most recent summaries first, at most `limit` of them
    ///
    /// Site results are returned without their ledger deltas.
    async fn run_history(&self, limit: usize) -> StorageResult<Vec<RunSummary>>;
}
