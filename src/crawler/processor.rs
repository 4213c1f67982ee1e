//! Per-site processing
//!
//! Turns a site's discovered candidates into stored documents and a ledger
//! delta. A site never affects another: every failure ends up in that site's
//! [`PerSiteResult`].

use crate::config::SiteConfig;
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::guidance::extract_guidance;
use crate::crawler::links::{CandidateDocument, DocumentKind};
use crate::crawler::site::{CrawlSettings, SiteCrawler};
use crate::state::{content_hash, derive_key, DocumentStatus, HashLedger, HashRecord, SiteStatus, StorageKeyNamer};
use crate::storage::{DocumentMetadata, DocumentStore};
use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};

/// Content type recorded for captured guidance text
pub const GUIDANCE_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Document counters for one site
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteCounts {
    /// Unique candidates discovered
    pub found: usize,
    /// Candidates downloaded and hashed
    pub processed: usize,
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
    /// Documents written to the store
    pub uploaded: usize,
    /// Storage keys that needed a collision suffix
    pub collisions: usize,
    /// Download or store failures
    pub failed: usize,
    /// Guidance pages refused by the extractor
    pub rejected: usize,
    /// Pattern-only candidates that were not downloaded
    pub skipped: usize,
}

impl SiteCounts {
    pub fn add(&mut self, other: &SiteCounts) {
        self.found += other.found;
        self.processed += other.processed;
        self.new += other.new;
        self.changed += other.changed;
        self.unchanged += other.unchanged;
        self.uploaded += other.uploaded;
        self.collisions += other.collisions;
        self.failed += other.failed;
        self.rejected += other.rejected;
        self.skipped += other.skipped;
    }

    fn record(&mut self, status: DocumentStatus) {
        self.processed += 1;
        match status {
            DocumentStatus::New => self.new += 1,
            DocumentStatus::Changed => self.changed += 1,
            DocumentStatus::Unchanged => self.unchanged += 1,
        }
    }
}

/// Outcome of processing one site
#[derive(Debug, Clone)]
pub struct PerSiteResult {
    pub site_id: String,
    pub site_name: String,
    pub site_url: String,
    pub status: SiteStatus,
    pub counts: SiteCounts,
    /// Ledger records for documents seen this run, to be merged by the orchestrator
    pub ledger_delta: HashLedger,
    pub error: Option<String>,
}

impl PerSiteResult {
    fn for_site(site: &SiteConfig, status: SiteStatus) -> Self {
        Self {
            site_id: site.id.clone(),
            site_name: site.name.clone(),
            site_url: site.url.clone(),
            status,
            counts: SiteCounts::default(),
            ledger_delta: HashLedger::new(),
            error: None,
        }
    }

    pub fn blocked(site: &SiteConfig, status_code: u16) -> Self {
        let mut result = Self::for_site(site, SiteStatus::Blocked);
        result.error = Some(format!("HTTP {} - access blocked", status_code));
        result
    }

    pub fn error(site: &SiteConfig, message: impl Into<String>) -> Self {
        let mut result = Self::for_site(site, SiteStatus::Error);
        result.error = Some(message.into());
        result
    }

    /// Result for a site whose task was stopped by cancellation
    pub fn cancelled(site: &SiteConfig) -> Self {
        Self::error(site, "cancelled before completion")
    }
}

/// Downloaded content ready for hashing
struct Download {
    bytes: Vec<u8>,
    content_type: String,
}

enum DownloadOutcome {
    Ready(Download),
    Rejected(String),
    Failed(FetchError),
}

/// Crawls one site and stores what changed
pub struct SiteProcessor {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn DocumentStore>,
    settings: CrawlSettings,
}

impl SiteProcessor {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn DocumentStore>, settings: CrawlSettings) -> Self {
        Self {
            fetcher,
            store,
            settings,
        }
    }

    /// Processes `site` against the ledger from the previous run
    ///
    /// Never fails: a blocked or unreachable entry page becomes a `Blocked` or
    /// `Error` result, and per-document failures are counted.
    pub async fn process(&self, site: &SiteConfig, previous: &HashLedger) -> PerSiteResult {
        self.process_with_keys(site, previous, &Mutex::new(StorageKeyNamer::new()))
            .await
    }

    /// Like [`process`](Self::process), reserving storage keys in `keys`
    ///
    /// Sites processed in the same run share one namer so that a key clash
    /// between sites is suffixed and counted instead of overwritten.
    pub async fn process_with_keys(
        &self,
        site: &SiteConfig,
        previous: &HashLedger,
        keys: &Mutex<StorageKeyNamer>,
    ) -> PerSiteResult {
        tracing::info!("Crawling {} ({})", site.name, site.url);

        let crawler = SiteCrawler::new(self.fetcher.clone(), self.settings.clone());
        let discovery = match crawler.discover(site).await {
            Ok(discovery) => discovery,
            Err(FetchError::Blocked { status, .. }) => {
                tracing::warn!("{} blocked the crawler (HTTP {})", site.name, status);
                return PerSiteResult::blocked(site, status);
            }
            Err(e) => {
                tracing::error!("Failed to crawl {}: {}", site.name, e);
                return PerSiteResult::error(site, e.to_string());
            }
        };

        let mut result = PerSiteResult::for_site(site, SiteStatus::Success);
        result.counts.found = discovery.candidates.len();

        if discovery.candidates.is_empty() {
            tracing::info!("No documents found on {}", site.name);
            result.status = SiteStatus::NoDocuments;
            return result;
        }

        for candidate in &discovery.candidates {
            if !candidate.is_downloadable() {
                tracing::debug!("Skipping {} (no known extension)", candidate.url);
                result.counts.skipped += 1;
                continue;
            }

            let download = match self.download(candidate).await {
                DownloadOutcome::Ready(download) => download,
                DownloadOutcome::Rejected(reason) => {
                    tracing::info!("Guidance page {} rejected: {}", candidate.url, reason);
                    result.counts.rejected += 1;
                    continue;
                }
                DownloadOutcome::Failed(e) => {
                    tracing::warn!("Download failed: {}", e);
                    result.counts.failed += 1;
                    continue;
                }
            };

            let hash = content_hash(&download.bytes);
            let status = previous.classify(&candidate.url, &hash);
            result.counts.record(status);

            let key = derive_key(
                &site.name,
                &candidate.url,
                &candidate.filename,
                candidate.kind.default_extension(),
            );
            let (key, collided) = keys
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .assign(key);
            if collided {
                result.counts.collisions += 1;
            }

            if status.should_store() {
                let metadata = DocumentMetadata {
                    site_name: site.name.clone(),
                    source_url: candidate.url.clone(),
                    filename: candidate.filename.clone(),
                    content_hash: hash.clone(),
                    status,
                    kind: candidate.kind,
                    crawl_level: candidate.crawl_level,
                };

                if let Err(e) = self
                    .store
                    .put_document(&key, &download.bytes, &download.content_type, &metadata)
                    .await
                {
                    // Leave the hash out so the next run retries the document
                    tracing::error!("Failed to store {}: {}", key, e);
                    result.counts.failed += 1;
                    continue;
                }

                tracing::info!("Stored {} ({})", key, status);
                result.counts.uploaded += 1;
            }

            result.ledger_delta.insert(HashRecord {
                url: candidate.url.clone(),
                filename: candidate.filename.clone(),
                storage_key: key,
                content_hash: hash,
                last_seen: Utc::now(),
            });
        }

        tracing::info!(
            "{}: {} found, {} new, {} changed, {} unchanged, {} failed, {} collisions",
            site.name,
            result.counts.found,
            result.counts.new,
            result.counts.changed,
            result.counts.unchanged,
            result.counts.failed,
            result.counts.collisions
        );

        result
    }

    async fn download(&self, candidate: &CandidateDocument) -> DownloadOutcome {
        match candidate.kind {
            DocumentKind::File => {
                match self
                    .fetcher
                    .fetch(&candidate.url, self.settings.download_timeout)
                    .await
                {
                    Ok(page) => DownloadOutcome::Ready(Download {
                        content_type: page.mime_type().to_string(),
                        bytes: page.body,
                    }),
                    Err(e) => DownloadOutcome::Failed(e),
                }
            }
            DocumentKind::Guidance => {
                let page = match self
                    .fetcher
                    .fetch(&candidate.url, self.settings.page_timeout)
                    .await
                {
                    Ok(page) => page,
                    Err(e) => return DownloadOutcome::Failed(e),
                };

                if !page.is_html() {
                    return DownloadOutcome::Rejected(format!("not HTML ({})", page.content_type));
                }

                match extract_guidance(&page.text()) {
                    Ok(content) => DownloadOutcome::Ready(Download {
                        bytes: content.to_document(&candidate.url),
                        content_type: GUIDANCE_CONTENT_TYPE.to_string(),
                    }),
                    Err(rejection) => DownloadOutcome::Rejected(rejection.to_string()),
                }
            }
        }
    }
}
