//! Per-site document discovery
//!
//! Drives the fetcher and the extractors over one site:
//! 1. Fetch the entry page and extract document candidates (level 1)
//! 2. Optionally open level-N candidates as pages and collect same-origin documents (level N+1)
//! 3. Optionally walk category pages to find rendered guidance pages
//! 4. Deduplicate candidates by URL

use crate::config::{CrawlerConfig, SiteConfig};
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::guidance::{select_category_pages, select_guidance_pages};
use crate::crawler::links::{extract_document_links, CandidateDocument, DocumentKind, LinkExtraction, UNKNOWN_EXTENSION};
use crate::url::{parse_http_url, same_origin};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Timing and limits shared by every site in a run
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub page_timeout: Duration,
    pub download_timeout: Duration,
    /// Documents per level opened as pages when sub-crawling
    pub sub_crawl_cap: usize,
    /// Pause between successive page fetches on one site
    pub polite_delay: Duration,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self::from(&CrawlerConfig::default())
    }
}

impl From<&CrawlerConfig> for CrawlSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            page_timeout: Duration::from_secs(config.page_timeout_secs),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
            sub_crawl_cap: config.sub_crawl_cap,
            polite_delay: Duration::from_millis(config.polite_delay_ms),
        }
    }
}

/// Everything found on one site
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Unique candidates, entry-page documents first
    pub candidates: Vec<CandidateDocument>,
    /// Links seen on the entry page
    pub entry_links: usize,
    /// Sub-pages and category pages that could not be fetched
    pub pages_failed: usize,
}

impl Discovery {
    pub fn count_at_level(&self, level: u32) -> usize {
        self.candidates.iter().filter(|c| c.crawl_level == level).count()
    }

    pub fn guidance_count(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| c.kind == DocumentKind::Guidance)
            .count()
    }
}

/// Collapses candidates to one per URL
///
/// The first occurrence wins, except that a guidance capture replaces an
/// earlier pattern-only file match for the same URL.
pub fn dedupe_candidates(candidates: Vec<CandidateDocument>) -> Vec<CandidateDocument> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<CandidateDocument> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match index.get(&candidate.url) {
            Some(&i) => {
                let existing = &unique[i];
                if candidate.kind == DocumentKind::Guidance
                    && existing.kind == DocumentKind::File
                    && existing.extension == UNKNOWN_EXTENSION
                {
                    unique[i] = candidate;
                }
            }
            None => {
                index.insert(candidate.url.clone(), unique.len());
                unique.push(candidate);
            }
        }
    }

    unique
}

/// Discovers candidate documents for a site
pub struct SiteCrawler {
    fetcher: Arc<dyn Fetcher>,
    settings: CrawlSettings,
}

impl SiteCrawler {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: CrawlSettings) -> Self {
        Self { fetcher, settings }
    }

    /// Runs discovery for `site`
    ///
    /// # Returns
    ///
    /// * `Ok(Discovery)` - Entry page fetched; sub-page failures are counted, not raised
    /// * `Err(FetchError::Blocked)` - Entry page answered 403
    /// * `Err(FetchError)` - Entry page could not be fetched or the site URL is unusable
    pub async fn discover(&self, site: &SiteConfig) -> Result<Discovery, FetchError> {
        let entry_url = parse_http_url(&site.url).map_err(|e| FetchError::Other {
            url: site.url.clone(),
            message: e.to_string(),
        })?;

        let page = self
            .fetcher
            .fetch(entry_url.as_str(), self.settings.page_timeout)
            .await?;

        // Redirects may move the site (e.g. to a www host); use where it landed
        let origin = Url::parse(&page.final_url).unwrap_or_else(|_| entry_url.clone());

        let extraction = extract_document_links(&page.text(), origin.as_str());
        tracing::info!(
            "Found {} level 1 documents on {} ({} links)",
            extraction.candidates.len(),
            site.name,
            extraction.link_count()
        );

        let mut discovery = Discovery {
            entry_links: extraction.link_count(),
            ..Discovery::default()
        };
        let mut pacer = Pacer::new(self.settings.polite_delay);
        let mut all = extraction.candidates.clone();

        if site.crawls_sub_levels() {
            let deeper = self
                .sub_crawl(site, &origin, &extraction.candidates, &mut pacer, &mut discovery)
                .await;
            tracing::info!(
                "Multi-level crawl of {}: {} level 1 + {} deeper",
                site.name,
                extraction.candidates.len(),
                deeper.len()
            );
            all.extend(deeper);
        }

        if site.capture_html_guidance {
            let guidance = self
                .guidance_walk(site, &origin, &extraction, &mut pacer, &mut discovery)
                .await;
            tracing::info!("Found {} guidance pages on {}", guidance.len(), site.name);
            all.extend(guidance);
        }

        discovery.candidates = dedupe_candidates(all);
        Ok(discovery)
    }

    /// Opens documents level by level up to `max_depth`, keeping same-origin finds
    async fn sub_crawl(
        &self,
        site: &SiteConfig,
        origin: &Url,
        level_one: &[CandidateDocument],
        pacer: &mut Pacer,
        discovery: &mut Discovery,
    ) -> Vec<CandidateDocument> {
        let mut seen: HashSet<String> = level_one.iter().map(|c| c.url.clone()).collect();
        let mut frontier: Vec<CandidateDocument> = level_one.to_vec();
        let mut found = Vec::new();

        for level in 2..=site.max_depth {
            let mut next = Vec::new();

            for parent in frontier.iter().take(self.settings.sub_crawl_cap) {
                pacer.wait().await;

                let page = match self.fetcher.fetch(&parent.url, self.settings.page_timeout).await {
                    Ok(page) => page,
                    Err(e) => {
                        tracing::warn!("Sub-page {} failed: {}", parent.url, e);
                        discovery.pages_failed += 1;
                        continue;
                    }
                };

                if !page.is_html() {
                    tracing::debug!("Sub-page {} is {}, not HTML", parent.url, page.content_type);
                    continue;
                }

                let extraction = extract_document_links(&page.text(), &page.final_url);
                for mut candidate in extraction.candidates {
                    let same_site = Url::parse(&candidate.url)
                        .map(|u| same_origin(origin, &u))
                        .unwrap_or(false);
                    if !same_site || !seen.insert(candidate.url.clone()) {
                        continue;
                    }
                    candidate.crawl_level = level;
                    candidate.parent_url = Some(parent.url.clone());
                    next.push(candidate);
                }
            }

            if next.is_empty() {
                break;
            }
            found.extend(next.iter().cloned());
            frontier = next;
        }

        found
    }

    /// Two-level walk: entry page -> category pages -> guidance pages
    async fn guidance_walk(
        &self,
        site: &SiteConfig,
        origin: &Url,
        entry: &LinkExtraction,
        pacer: &mut Pacer,
        discovery: &mut Discovery,
    ) -> Vec<CandidateDocument> {
        let categories = select_category_pages(origin, &entry.links);
        tracing::debug!("{} category pages on {}", categories.len(), site.name);

        let mut seen = HashSet::new();
        let mut pages = Vec::new();

        for category in categories {
            if pages.len() >= site.max_guidance_pages {
                break;
            }
            pacer.wait().await;

            let page = match self
                .fetcher
                .fetch(category.as_str(), self.settings.page_timeout)
                .await
            {
                Ok(page) if page.is_html() => page,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!("Category page {} failed: {}", category, e);
                    discovery.pages_failed += 1;
                    continue;
                }
            };

            let links = extract_document_links(&page.text(), &page.final_url).links;
            for url in select_guidance_pages(origin, &links, site.min_path_depth) {
                if pages.len() >= site.max_guidance_pages {
                    break;
                }
                if seen.insert(url.to_string()) {
                    let mut candidate = CandidateDocument::guidance(&url, "");
                    candidate.crawl_level = 2;
                    candidate.parent_url = Some(category.to_string());
                    pages.push(candidate);
                }
            }
        }

        pages
    }
}

/// Enforces the polite delay between page fetches after the entry page
struct Pacer {
    delay: Duration,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self { delay }
    }

    async fn wait(&mut self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}
