use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::status::DocumentStatus;

/// SHA-256 of the given bytes as lowercase hex
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// First 8 hex characters of the SHA-256 of a URL
pub fn url_hash8(url: &str) -> String {
    let mut digest = content_hash(url.as_bytes());
    digest.truncate(8);
    digest
}

/// What the ledger remembers about one document URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRecord {
    pub url: String,
    pub filename: String,
    pub storage_key: String,
    pub content_hash: String,
    pub last_seen: DateTime<Utc>,
}

/// URL-keyed map of [`HashRecord`]s carried from run to run
///
/// Entries are only added or overwritten, never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashLedger {
    records: BTreeMap<String, HashRecord>,
}

impl HashLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&HashRecord> {
        self.records.get(url)
    }

    /// Inserts or replaces the record for its URL
    pub fn insert(&mut self, record: HashRecord) {
        self.records.insert(record.url.clone(), record);
    }

    /// Overlays every record of `delta` onto this ledger; the delta wins on conflict
    pub fn merge(&mut self, delta: &HashLedger) {
        for record in delta.iter() {
            self.insert(record.clone());
        }
    }

    /// Classifies freshly downloaded content against this ledger
    ///
    /// # Returns
    ///
    /// * `New` - the URL has no record
    /// * `Changed` - the recorded hash differs from `hash`
    /// * `Unchanged` - the recorded hash equals `hash`
    pub fn classify(&self, url: &str, hash: &str) -> DocumentStatus {
        match self.records.get(url) {
            None => DocumentStatus::New,
            Some(record) if record.content_hash != hash => DocumentStatus::Changed,
            Some(_) => DocumentStatus::Unchanged,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates records in URL order
    pub fn iter(&self) -> impl Iterator<Item = &HashRecord> {
        self.records.values()
    }
}

impl FromIterator<HashRecord> for HashLedger {
    fn from_iter<I: IntoIterator<Item = HashRecord>>(iter: I) -> Self {
        let mut ledger = HashLedger::new();
        for record in iter {
            ledger.insert(record);
        }
        ledger
    }
}
