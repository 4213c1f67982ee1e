//! Run orchestration
//!
//! This module contains the top-level run logic that ties everything together:
//! - Loading site configuration and the previous hash ledger
//! - Processing every site concurrently, one task per site
//! - Waiting for all tasks, or stopping early on cancellation
//! - Merging ledger deltas and persisting the ledger once
//! - Validating upload counts and recording the run in history

use crate::config::{SiteConfig, SiteSource};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::processor::{PerSiteResult, SiteProcessor};
use crate::crawler::site::CrawlSettings;
use crate::crawler::validator::validate_upload_count;
use crate::output::{RunSummary, TriggerType};
use crate::state::{HashLedger, StorageKeyNamer};
use crate::storage::DocumentStore;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default number of run summaries kept in history
pub const DEFAULT_HISTORY_RETENTION: usize = 50;

/// Runs a full crawl over every enabled site
pub struct Orchestrator {
    sites: Arc<dyn SiteSource>,
    store: Arc<dyn DocumentStore>,
    fetcher: Arc<dyn Fetcher>,
    settings: CrawlSettings,
    history_retention: usize,
    config_hash: Option<String>,
}

impl Orchestrator {
    /// Creates an orchestrator
    ///
    /// # Arguments
    ///
    /// * `sites` - Where enabled site configurations come from
    /// * `store` - Ledger, document and history persistence
    /// * `fetcher` - Network access for every site
    /// * `settings` - Timeouts and limits shared by all sites
    pub fn new(
        sites: Arc<dyn SiteSource>,
        store: Arc<dyn DocumentStore>,
        fetcher: Arc<dyn Fetcher>,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            sites,
            store,
            fetcher,
            settings,
            history_retention: DEFAULT_HISTORY_RETENTION,
            config_hash: None,
        }
    }

    pub fn with_history_retention(mut self, retention: usize) -> Self {
        self.history_retention = retention.max(1);
        self
    }

    /// Records the configuration hash on every summary this orchestrator produces
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Number of run summaries kept in history
    pub fn history_retention(&self) -> usize {
        self.history_retention
    }

    /// Executes one run
    ///
    /// Always produces a summary. Site failures are isolated in their own
    /// results; run-level problems (configuration, ledger, history) are added
    /// to the summary's notes. When `cancel` fires, completed sites keep their
    /// results and unfinished sites are reported as cancelled.
    pub async fn run(&self, trigger: TriggerType, cancel: CancellationToken) -> RunSummary {
        let mut summary = RunSummary::new(trigger, Utc::now());
        summary.config_hash = self.config_hash.clone();
        tracing::info!("Starting {} run", trigger);

        let sites = match self.sites.load_site_configs().await {
            Ok(sites) => sites,
            Err(e) => {
                tracing::error!("Failed to load site configuration: {}", e);
                summary.notes.push(format!("configuration error: {}", e));
                self.finish(&mut summary).await;
                return summary;
            }
        };

        if sites.is_empty() {
            tracing::warn!("No enabled sites configured");
        }

        let previous = match self.store.get_hash_ledger().await {
            Ok(ledger) => {
                tracing::info!("Loaded hash ledger with {} entries", ledger.len());
                ledger
            }
            Err(e) => {
                tracing::warn!("Failed to load hash ledger, treating every document as new: {}", e);
                summary.notes.push(format!("hash ledger unavailable: {}", e));
                HashLedger::new()
            }
        };
        let previous = Arc::new(previous);

        let handles = self.launch(sites, &previous);
        let (results, cancelled) = collect(handles, &cancel).await;
        summary.sites = results;
        summary.cancelled = cancelled;

        if cancelled {
            tracing::warn!("Run cancelled; unfinished sites reported as cancelled");
            summary.notes.push("run cancelled before all sites completed".to_string());
        }

        // Later sites win when two sites report the same URL
        let mut ledger = (*previous).clone();
        for result in &summary.sites {
            ledger.merge(&result.ledger_delta);
        }
        summary.ledger_entries = ledger.len();

        if let Err(e) = self.store.put_hash_ledger(&ledger).await {
            tracing::error!("Failed to persist hash ledger: {}", e);
            summary.notes.push(format!("hash ledger not saved: {}", e));
        }

        let uploaded = summary.totals().uploaded as u64;
        summary.validation = validate_upload_count(self.store.as_ref(), uploaded).await;

        self.finish(&mut summary).await;

        tracing::info!(
            "Run complete: {}/{} sites successful, {} documents uploaded in {:.1}s",
            summary.sites_successful(),
            summary.sites_total(),
            uploaded,
            summary.duration_secs()
        );

        summary
    }

    /// Spawns one processing task per site
    ///
    /// All tasks reserve storage keys in one namer for the run.
    fn launch(
        &self,
        sites: Vec<SiteConfig>,
        previous: &Arc<HashLedger>,
    ) -> Vec<(SiteConfig, JoinHandle<PerSiteResult>)> {
        let processor = Arc::new(SiteProcessor::new(
            self.fetcher.clone(),
            self.store.clone(),
            self.settings.clone(),
        ));
        let keys = Arc::new(Mutex::new(StorageKeyNamer::new()));

        sites
            .into_iter()
            .map(|site| {
                let processor = processor.clone();
                let previous = previous.clone();
                let keys = keys.clone();
                let task_site = site.clone();
                let handle = tokio::spawn(async move {
                    processor
                        .process_with_keys(&task_site, &previous, &keys)
                        .await
                });
                (site, handle)
            })
            .collect()
    }

    /// Stamps the finish time and appends the summary to history
    async fn finish(&self, summary: &mut RunSummary) {
        summary.finished_at = Utc::now();
        match self
            .store
            .append_run_summary(summary, self.history_retention)
            .await
        {
            Ok(id) => summary.id = Some(id),
            Err(e) => {
                tracing::error!("Failed to record run history: {}", e);
                summary.notes.push(format!("run history not saved: {}", e));
            }
        }
    }
}

/// Waits for every site task in launch order
///
/// Returns the results and whether cancellation cut the run short.
async fn collect(
    handles: Vec<(SiteConfig, JoinHandle<PerSiteResult>)>,
    cancel: &CancellationToken,
) -> (Vec<PerSiteResult>, bool) {
    let mut results = Vec::with_capacity(handles.len());
    let mut cancelled = false;

    for (site, mut handle) in handles {
        let joined = if cancel.is_cancelled() && !handle.is_finished() {
            None
        } else {
            tokio::select! {
                biased;
                joined = &mut handle => Some(joined),
                _ = cancel.cancelled() => None,
            }
        };

        match joined {
            Some(Ok(result)) => results.push(result),
            Some(Err(e)) => {
                tracing::error!("Task for {} failed: {}", site.name, e);
                results.push(PerSiteResult::error(&site, format!("site task failed: {}", e)));
            }
            None => {
                handle.abort();
                cancelled = true;
                results.push(PerSiteResult::cancelled(&site));
            }
        }
    }

    (results, cancelled)
}
