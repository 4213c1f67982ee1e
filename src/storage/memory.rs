//! In-process storage implementation
//!
//! Keeps everything in memory. Used by tests and dry runs; supports injecting
//! failures so error paths can be exercised without a broken database.

use crate::output::RunSummary;
use crate::state::{sanitize_folder, HashLedger};
use crate::storage::traits::{DocumentMetadata, DocumentStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// A document held by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Default)]
struct MemoryState {
    ledger: HashLedger,
    documents: BTreeMap<String, StoredDocument>,
    history: VecDeque<RunSummary>,
    next_run_id: i64,
    put_calls: usize,
}

/// Which operations should fail
#[derive(Debug, Default, Clone)]
struct Faults {
    ledger_load: bool,
    document_count: bool,
    all_puts: bool,
    puts_containing: Vec<String>,
}

/// In-memory [`DocumentStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    faults: Faults,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing ledger, as if a previous run had written it
    pub fn with_ledger(ledger: HashLedger) -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.state.lock() {
            state.ledger = ledger;
        }
        store
    }

    /// Makes `get_hash_ledger` fail
    pub fn failing_ledger_load(mut self) -> Self {
        self.faults.ledger_load = true;
        self
    }

    /// Makes `stored_document_count` fail
    pub fn failing_document_count(mut self) -> Self {
        self.faults.document_count = true;
        self
    }

    /// Makes every `put_document` fail
    pub fn failing_puts(mut self) -> Self {
        self.faults.all_puts = true;
        self
    }

    /// Makes `put_document` fail for keys containing `fragment`
    pub fn failing_puts_containing(mut self, fragment: impl Into<String>) -> Self {
        self.faults.puts_containing.push(fragment.into());
        self
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StorageError::Database("memory store lock poisoned".to_string()))
    }

    /// Snapshot of a stored document
    pub fn document(&self, key: &str) -> Option<StoredDocument> {
        self.lock().ok()?.documents.get(key).cloned()
    }

    /// All stored keys in order
    pub fn keys(&self) -> Vec<String> {
        self.lock()
            .map(|s| s.documents.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the current ledger
    pub fn ledger(&self) -> HashLedger {
        self.lock().map(|s| s.ledger.clone()).unwrap_or_default()
    }

    /// Number of `put_document` calls, including failed ones
    pub fn put_calls(&self) -> usize {
        self.lock().map(|s| s.put_calls).unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_hash_ledger(&self) -> StorageResult<HashLedger> {
        if self.faults.ledger_load {
            return Err(StorageError::Unavailable("ledger load disabled".to_string()));
        }
        Ok(self.lock()?.ledger.clone())
    }

    async fn put_hash_ledger(&self, ledger: &HashLedger) -> StorageResult<()> {
        let mut state = self.lock()?;
        state.ledger.merge(ledger);
        Ok(())
    }

    async fn put_document(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        metadata: &DocumentMetadata,
    ) -> StorageResult<()> {
        let mut state = self.lock()?;
        state.put_calls += 1;

        let rejected = self.faults.all_puts
            || self
                .faults
                .puts_containing
                .iter()
                .any(|fragment| key.contains(fragment.as_str()));
        if rejected {
            return Err(StorageError::WriteRejected {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        state.documents.insert(
            key.to_string(),
            StoredDocument {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }

    async fn stored_document_count(&self) -> StorageResult<u64> {
        if self.faults.document_count {
            return Err(StorageError::Unavailable("document count disabled".to_string()));
        }
        Ok(self.lock()?.documents.len() as u64)
    }

    async fn documents_by_site(&self) -> StorageResult<Vec<(String, u64)>> {
        let state = self.lock()?;
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for doc in state.documents.values() {
            *counts.entry(sanitize_folder(&doc.metadata.site_name)).or_default() += 1;
        }

        let mut rows: Vec<(String, u64)> = counts.into_iter().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(rows)
    }

    async fn append_run_summary(
        &self,
        summary: &RunSummary,
        retention: usize,
    ) -> StorageResult<i64> {
        let mut state = self.lock()?;
        state.next_run_id += 1;
        let id = state.next_run_id;

        let mut stored = summary.clone();
        stored.id = Some(id);
        for site in &mut stored.sites {
            site.ledger_delta = HashLedger::new();
        }

        state.history.push_back(stored);
        while state.history.len() > retention {
            state.history.pop_front();
        }
        Ok(id)
    }

    async fn run_history(&self, limit: usize) -> StorageResult<Vec<RunSummary>> {
        let state = self.lock()?;
        Ok(state.history.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::DocumentKind;
    use crate::output::TriggerType;
    use crate::state::DocumentStatus;
    use chrono::Utc;

    fn metadata(site: &str) -> DocumentMetadata {
        DocumentMetadata {
            site_name: site.to_string(),
            source_url: "https://x/a.pdf".to_string(),
            filename: "a.pdf".to_string(),
            content_hash: "h".to_string(),
            status: DocumentStatus::New,
            kind: DocumentKind::File,
            crawl_level: 1,
        }
    }

    #[tokio::test]
    async fn test_put_and_count() {
        let store = MemoryStore::new();
        store
            .put_document("site/1_a.pdf", b"a", "application/pdf", &metadata("Site"))
            .await
            .unwrap();
        assert_eq!(store.stored_document_count().await.unwrap(), 1);
        assert_eq!(store.document("site/1_a.pdf").unwrap().bytes, b"a".to_vec());
    }

    #[tokio::test]
    async fn test_injected_put_failure() {
        let store = MemoryStore::new().failing_puts_containing("broken");
        assert!(store
            .put_document("site/1_broken.pdf", b"a", "application/pdf", &metadata("Site"))
            .await
            .is_err());
        assert!(store
            .put_document("site/2_fine.pdf", b"a", "application/pdf", &metadata("Site"))
            .await
            .is_ok());
        assert_eq!(store.put_calls(), 2);
        assert_eq!(store.keys(), vec!["site/2_fine.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let store = MemoryStore::new();
        for _ in 0..4 {
            let summary = RunSummary::new(TriggerType::Scheduled, Utc::now());
            store.append_run_summary(&summary, 2).await.unwrap();
        }
        let history = store.run_history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, Some(4));
        assert_eq!(history[1].id, Some(3));
    }

    #[tokio::test]
    async fn test_documents_by_site() {
        let store = MemoryStore::new();
        for (key, site) in [("a/1", "Alpha"), ("a/2", "Alpha"), ("b/1", "Beta")] {
            store
                .put_document(key, b"x", "text/plain", &metadata(site))
                .await
                .unwrap();
        }
        assert_eq!(
            store.documents_by_site().await.unwrap(),
            vec![("alpha".to_string(), 2), ("beta".to_string(), 1)]
        );
    }
}
