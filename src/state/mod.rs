//! State module for change detection
//!
//! This module holds the state carried between runs and the rules applied to it.
//!
//! # Components
//!
//! - `HashLedger`: URL-keyed content hashes from previous runs, with new/changed/unchanged classification
//! - `StorageKeyNamer`: collision-safe storage keys for one batch of documents
//! - `DocumentStatus` / `SiteStatus`: per-document and per-site outcomes

mod ledger;
mod naming;
mod status;

// Re-export main types
pub use ledger::{content_hash, url_hash8, HashLedger, HashRecord};
pub use naming::{derive_key, sanitize_basename, sanitize_folder, StorageKeyNamer};
pub use status::{DocumentStatus, SiteStatus};
