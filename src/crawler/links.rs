//! Document link extraction
//!
//! This module parses an HTML page and picks out the links that look like
//! documents, either by file extension or by URL path heuristics. Every other
//! resolvable link is returned as well so that sub-crawling can inspect it.

use crate::url::{extension_of, is_document_extension, last_segment, matches_document_pattern, resolve_link};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::fmt;
use url::Url;

/// Extension recorded for pattern-only matches
pub const UNKNOWN_EXTENSION: &str = "unknown";

/// What a candidate refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// A file downloaded as raw bytes
    File,
    /// A rendered HTML guidance page captured as extracted text
    Guidance,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Guidance => "guidance",
        }
    }

    /// Extension used for storage keys when the filename has none
    pub fn default_extension(&self) -> &'static str {
        match self {
            Self::File => "pdf",
            Self::Guidance => "txt",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A link that may point at a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDocument {
    /// Absolute URL, fragment removed
    pub url: String,
    /// Anchor text, whitespace collapsed
    pub link_text: String,
    pub filename: String,
    /// Lowercased extension, or [`UNKNOWN_EXTENSION`]
    pub extension: String,
    /// 1 for the entry page, parent level + 1 for sub-crawled pages
    pub crawl_level: u32,
    pub parent_url: Option<String>,
    pub kind: DocumentKind,
}

impl CandidateDocument {
    /// Only known extensions and guidance captures are downloaded
    pub fn is_downloadable(&self) -> bool {
        self.kind == DocumentKind::Guidance || is_document_extension(&self.extension)
    }

    /// Builds a guidance-kind candidate for a page URL
    pub fn guidance(url: &Url, link_text: &str) -> Self {
        let filename = last_segment(url).unwrap_or_else(|| "index".to_string());
        Self {
            url: url.to_string(),
            link_text: link_text.to_string(),
            filename,
            extension: "txt".to_string(),
            crawl_level: 1,
            parent_url: None,
            kind: DocumentKind::Guidance,
        }
    }
}

/// Output of [`extract_document_links`]
#[derive(Debug, Clone, Default)]
pub struct LinkExtraction {
    /// Document candidates in page order, one per URL
    pub candidates: Vec<CandidateDocument>,
    /// Every resolvable http(s) link on the page, in page order
    pub links: Vec<String>,
}

impl LinkExtraction {
    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

/// Collapses runs of whitespace into single spaces
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn candidate_for(url: &Url, link_text: String) -> Option<CandidateDocument> {
    let extension = extension_of(url).filter(|ext| is_document_extension(ext));

    let extension = match extension {
        Some(ext) => ext,
        None if matches_document_pattern(url) => UNKNOWN_EXTENSION.to_string(),
        None => return None,
    };

    let filename = last_segment(url)
        .or_else(|| (!link_text.is_empty()).then(|| link_text.clone()))
        .unwrap_or_else(|| "document".to_string());

    Some(CandidateDocument {
        url: url.to_string(),
        link_text,
        filename,
        extension,
        crawl_level: 1,
        parent_url: None,
        kind: DocumentKind::File,
    })
}

/// Finds document links in an HTML page
///
/// # Matching Rules
///
/// A link is a candidate when:
/// - its last path segment ends in one of `pdf, doc, docx, txt, xls, xlsx, xml, csv, rtf`, or
/// - its lowercased path and query match a document heuristic (`/data/`, `/publications/`,
///   `download`, `/ukpga/<year>` and similar); these are tagged with an `unknown` extension
///
/// Never fails: malformed HTML is parsed leniently, and an unusable base URL
/// yields an empty result.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - URL of the page, used to resolve relative links
///
/// # Example
///
/// ```
/// use docwatch::crawler::extract_document_links;
///
/// let html = r#"<a href="/files/report.pdf">Report</a><a href="/about">About</a>"#;
/// let found = extract_document_links(html, "https://example.gov/");
/// assert_eq!(found.candidates.len(), 1);
/// assert_eq!(found.link_count(), 2);
/// ```
pub fn extract_document_links(html: &str, base_url: &str) -> LinkExtraction {
    let base = match Url::parse(base_url) {
        Ok(base) => base,
        Err(e) => {
            tracing::warn!("Cannot extract links, invalid base URL {}: {}", base_url, e);
            return LinkExtraction::default();
        }
    };

    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return LinkExtraction::default();
    };

    let mut extraction = LinkExtraction::default();
    let mut seen = HashSet::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_link(&base, href) else {
            continue;
        };

        extraction.links.push(url.to_string());

        if seen.contains(url.as_str()) {
            continue;
        }

        let link_text = collapse_whitespace(&element.text().collect::<String>());
        if let Some(candidate) = candidate_for(&url, link_text) {
            tracing::debug!("Candidate {} ({})", candidate.url, candidate.extension);
            seen.insert(url.to_string());
            extraction.candidates.push(candidate);
        }
    }

    extraction
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.gov/guidance/";

    #[test]
    fn test_extension_match() {
        let html = r#"<a href="report.PDF">Annual   report</a>"#;
        let found = extract_document_links(html, BASE);

        assert_eq!(found.candidates.len(), 1);
        let c = &found.candidates[0];
        assert_eq!(c.url, "https://example.gov/guidance/report.PDF");
        assert_eq!(c.extension, "pdf");
        assert_eq!(c.filename, "report.PDF");
        assert_eq!(c.link_text, "Annual report");
        assert_eq!(c.crawl_level, 1);
        assert_eq!(c.kind, DocumentKind::File);
        assert!(c.is_downloadable());
    }

    #[test]
    fn test_all_known_extensions() {
        let html = ["pdf", "doc", "docx", "txt", "xls", "xlsx", "xml", "csv", "rtf"]
            .iter()
            .map(|ext| format!(r#"<a href="/f/a.{ext}">x</a>"#))
            .collect::<String>();
        let found = extract_document_links(&html, BASE);
        assert_eq!(found.candidates.len(), 9);
        assert!(found.candidates.iter().all(|c| c.is_downloadable()));
    }

    #[test]
    fn test_pattern_only_match_is_unknown() {
        let html = r#"<a href="/publications/annual-review">Review</a>
                      <a href="https://www.legislation.gov.uk/ukpga/2024/3">Act</a>"#;
        let found = extract_document_links(html, BASE);

        assert_eq!(found.candidates.len(), 2);
        assert!(found
            .candidates
            .iter()
            .all(|c| c.extension == UNKNOWN_EXTENSION && !c.is_downloadable()));
    }

    #[test]
    fn test_non_document_links_still_listed() {
        let html = r#"<a href="/about">About</a><a href="/contact">Contact</a>"#;
        let found = extract_document_links(html, BASE);
        assert!(found.candidates.is_empty());
        assert_eq!(found.link_count(), 2);
        assert_eq!(found.links[0], "https://example.gov/about");
    }

    #[test]
    fn test_query_string_does_not_hide_extension() {
        let html = r#"<a href="/files/a.pdf?version=2">A</a>"#;
        let found = extract_document_links(html, BASE);
        assert_eq!(found.candidates[0].extension, "pdf");
    }

    #[test]
    fn test_fragment_dropped_and_deduplicated() {
        let html = r##"<a href="/a.pdf#p1">A</a><a href="/a.pdf#p2">A again</a>"##;
        let found = extract_document_links(html, BASE);
        assert_eq!(found.candidates.len(), 1);
        assert_eq!(found.candidates[0].url, "https://example.gov/a.pdf");
        assert_eq!(found.candidates[0].link_text, "A");
        assert_eq!(found.link_count(), 2);
    }

    #[test]
    fn test_skips_non_navigational() {
        let html = r##"<a href="mailto:x@example.gov">mail</a><a href="javascript:void(0)">js</a><a href="#top">top</a>"##;
        let found = extract_document_links(html, BASE);
        assert_eq!(found.link_count(), 0);
    }

    #[test]
    fn test_malformed_html() {
        let html = r#"<div><a href="/x.csv">data<p></div></span><a href="/y.xlsx""#;
        let found = extract_document_links(html, BASE);
        assert!(!found.candidates.is_empty());
    }

    #[test]
    fn test_invalid_base_url_yields_empty() {
        let html = r#"<a href="/a.pdf">A</a>"#;
        let found = extract_document_links(html, "not a url");
        assert!(found.candidates.is_empty());
        assert_eq!(found.link_count(), 0);
    }

    #[test]
    fn test_guidance_candidate() {
        let url = Url::parse("https://example.gov/guidance/bail/decisions").unwrap();
        let c = CandidateDocument::guidance(&url, "Bail decisions");
        assert_eq!(c.kind, DocumentKind::Guidance);
        assert_eq!(c.filename, "decisions");
        assert!(c.is_downloadable());
    }
}
