//! Crawler module for document discovery and change detection
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`Fetcher`] trait
//! - Document link extraction and guidance page capture
//! - Per-site discovery (entry page, sub-levels, guidance walk)
//! - Per-site processing against the hash ledger
//! - Run orchestration, validation and background run control

mod fetcher;
mod guidance;
mod links;
mod orchestrator;
mod processor;
mod runs;
mod site;
mod validator;

pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher, HttpFetcher, BROWSER_USER_AGENT};
pub use guidance::{
    extract_guidance, select_category_pages, select_guidance_pages, GuidanceContent,
    GuidanceRejection, MIN_GUIDANCE_CHARS,
};
pub use links::{extract_document_links, CandidateDocument, DocumentKind, LinkExtraction, UNKNOWN_EXTENSION};
pub use orchestrator::{Orchestrator, DEFAULT_HISTORY_RETENTION};
pub use processor::{PerSiteResult, SiteCounts, SiteProcessor, GUIDANCE_CONTENT_TYPE};
pub use runs::{RunId, RunRegistry, RunState};
pub use site::{dedupe_candidates, CrawlSettings, Discovery, SiteCrawler};
pub use validator::{validate_upload_count, ValidationResult};
