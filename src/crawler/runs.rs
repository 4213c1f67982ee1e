//! Asynchronous run control
//!
//! [`RunRegistry`] starts runs in the background and lets callers poll their
//! state, cancel them, or wait for the summary. Each run gets its own
//! cancellation token; an optional timeout cancels the token automatically.
//! Completed runs are kept up to the orchestrator's history retention.

use crate::crawler::orchestrator::Orchestrator;
use crate::output::{RunSummary, TriggerType};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Identifier handed out by [`RunRegistry::start_run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Observable state of a run
#[derive(Debug, Clone)]
pub enum RunState {
    Running,
    Completed(RunSummary),
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            Self::Running => None,
            Self::Completed(summary) => Some(summary),
        }
    }
}

struct RunEntry {
    state: watch::Receiver<RunState>,
    cancel: CancellationToken,
}

/// Tracks runs started from one orchestrator
pub struct RunRegistry {
    orchestrator: Arc<Orchestrator>,
    runs: Mutex<HashMap<RunId, RunEntry>>,
    next_id: AtomicU64,
    timeout: Option<Duration>,
}

impl RunRegistry {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            runs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            timeout: None,
        }
    }

    /// Cancels every run that is still going after `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn runs(&self) -> MutexGuard<'_, HashMap<RunId, RunEntry>> {
        // Entries stay consistent even if a holder panicked
        self.runs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts a run in the background
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_run(&self, trigger: TriggerType) -> RunId {
        let id = RunId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(RunState::Running);

        {
            let mut runs = self.runs();
            prune_completed(&mut runs, self.orchestrator.history_retention());
            runs.insert(
                id,
                RunEntry {
                    state: rx,
                    cancel: cancel.clone(),
                },
            );
        }

        let orchestrator = self.orchestrator.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let done = CancellationToken::new();
            if let Some(limit) = timeout {
                spawn_deadline(id, limit, cancel.clone(), done.clone());
            }

            let summary = orchestrator.run(trigger, cancel).await;
            done.cancel();

            tracing::info!("{} finished", id);
            let _ = tx.send(RunState::Completed(summary));
        });

        tracing::info!("Started {} ({})", id, trigger);
        id
    }

    /// Current state, or `None` for an unknown id
    pub fn get_run_status(&self, id: RunId) -> Option<RunState> {
        self.runs().get(&id).map(|entry| entry.state.borrow().clone())
    }

    /// Requests cancellation
    ///
    /// Returns `true` when the run exists and was still running.
    pub fn cancel_run(&self, id: RunId) -> bool {
        let runs = self.runs();
        let Some(entry) = runs.get(&id) else {
            return false;
        };
        if !entry.state.borrow().is_running() {
            return false;
        }
        tracing::info!("Cancelling {}", id);
        entry.cancel.cancel();
        true
    }

    /// Waits until the run completes and returns its summary
    pub async fn wait(&self, id: RunId) -> Option<RunSummary> {
        let mut state = self.runs().get(&id)?.state.clone();
        let completed = state.wait_for(|s| !s.is_running()).await.ok()?;
        completed.summary().cloned()
    }
}

/// Drops the oldest completed runs so at most `keep` remain
fn prune_completed(runs: &mut HashMap<RunId, RunEntry>, keep: usize) {
    let mut completed: Vec<RunId> = runs
        .iter()
        .filter(|(_, entry)| !entry.state.borrow().is_running())
        .map(|(id, _)| *id)
        .collect();
    if completed.len() <= keep {
        return;
    }

    completed.sort_unstable();
    let excess = completed.len() - keep;
    for id in &completed[..excess] {
        runs.remove(id);
    }
    tracing::debug!("Pruned {} completed runs", excess);
}

/// Cancels `cancel` after `limit` unless `done` fires first
fn spawn_deadline(id: RunId, limit: Duration, cancel: CancellationToken, done: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(limit) => {
                tracing::warn!("{} exceeded its {:?} time limit, cancelling", id, limit);
                cancel.cancel();
            }
            _ = done.cancelled() => {}
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SiteConfig, StaticSites};
    use crate::crawler::fetcher::{FetchError, FetchedPage, Fetcher};
    use crate::crawler::site::CrawlSettings;
    use crate::state::SiteStatus;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    /// Answers immediately, except for hosts named `slow`
    struct Pages;

    #[async_trait]
    impl Fetcher for Pages {
        async fn fetch(&self, url: &str, _timeout: Duration) -> Result<FetchedPage, FetchError> {
            if url.contains("slow") {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(FetchedPage {
                final_url: url.to_string(),
                status: 200,
                content_type: "text/html".to_string(),
                body: br#"<a href="/a.pdf">A</a>"#.to_vec(),
            })
        }
    }

    fn registry(host: &str) -> RunRegistry {
        registry_keeping(host, 50)
    }

    fn registry_keeping(host: &str, retention: usize) -> RunRegistry {
        let sites = StaticSites::new(vec![SiteConfig::new("s", "Site", format!("https://{}/", host))]);
        let settings = CrawlSettings {
            polite_delay: Duration::ZERO,
            ..CrawlSettings::default()
        };
        let orchestrator = Orchestrator::new(
            Arc::new(sites),
            Arc::new(MemoryStore::new()),
            Arc::new(Pages),
            settings,
        )
        .with_history_retention(retention);
        RunRegistry::new(orchestrator)
    }

    #[tokio::test]
    async fn test_start_and_wait() {
        let registry = registry("fast.example");
        let id = registry.start_run(TriggerType::Manual);

        let summary = registry.wait(id).await.unwrap();
        assert_eq!(summary.sites_total(), 1);
        assert!(!registry.get_run_status(id).unwrap().is_running());
        assert!(!registry.cancel_run(id));
    }

    #[tokio::test]
    async fn test_cancel_run() {
        let registry = registry("slow.example");
        let id = registry.start_run(TriggerType::Orchestrated);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(registry.get_run_status(id).unwrap().is_running());
        assert!(registry.cancel_run(id));

        let summary = registry.wait(id).await.unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.sites[0].status, SiteStatus::Error);
    }

    #[tokio::test]
    async fn test_timeout_cancels() {
        let registry = registry("slow.example").with_timeout(Some(Duration::from_millis(100)));
        let id = registry.start_run(TriggerType::Scheduled);

        let summary = registry.wait(id).await.unwrap();
        assert!(summary.cancelled);
    }

    #[tokio::test]
    async fn test_completed_runs_pruned() {
        let registry = registry_keeping("fast.example", 1);

        let first = registry.start_run(TriggerType::Manual);
        registry.wait(first).await.unwrap();
        let second = registry.start_run(TriggerType::Manual);
        registry.wait(second).await.unwrap();
        let third = registry.start_run(TriggerType::Manual);

        assert!(registry.get_run_status(first).is_none());
        assert!(registry.get_run_status(second).is_some());
        assert!(registry.get_run_status(third).is_some());
    }

    #[tokio::test]
    async fn test_unknown_run() {
        let registry = registry("fast.example");
        let id = RunId(99);
        assert!(registry.get_run_status(id).is_none());
        assert!(!registry.cancel_run(id));
        assert!(registry.wait(id).await.is_none());
    }

    #[tokio::test]
    async fn test_run_ids_increase() {
        let registry = registry("fast.example");
        let first = registry.start_run(TriggerType::Manual);
        let second = registry.start_run(TriggerType::Manual);
        assert!(second > first);
        assert_eq!(first.to_string(), "run-1");
    }
}
