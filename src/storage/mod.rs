//! Storage module for persisting documents and run state
//!
//! This module handles everything that outlives a run:
//! - The content hash ledger used for change detection
//! - Stored document bytes under their storage keys
//! - The bounded run history
//!
//! Two backends implement [`DocumentStore`]: [`SqliteStore`] for real runs and
//! [`MemoryStore`] for tests.

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::{MemoryStore, StoredDocument};
pub use sqlite::SqliteStore;
pub use traits::{DocumentMetadata, DocumentStore, StorageError, StorageResult};

use std::path::Path;

/// Opens or creates the SQLite store at `path`
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}
