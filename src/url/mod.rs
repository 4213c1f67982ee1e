//! URL handling module for docwatch
//!
//! This module provides link resolution, origin comparison, path helpers, and the
//! heuristics used to decide whether a URL looks like a document or a listing page.

mod domain;
mod resolve;

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, netloc, same_origin};
pub use resolve::{
    extension_of, last_segment, parse_http_url, path_and_query_lower, path_depth, path_segments,
    resolve_link,
};

/// File extensions treated as downloadable documents
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "xls", "xlsx", "xml", "csv", "rtf"];

/// Path shapes that suggest a document even without a known extension
#[allow(clippy::expect_used)]
static DOCUMENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/data/",
        r"/documents?/",
        r"/publications?/",
        r"/files?/",
        r"\.pdf\?",
        r"download",
        r"/ukpga/\d{4}",
        r"/uksi/\d{4}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("document pattern is valid")) // Static pattern, safe to panic
    .collect()
});

/// Search, pagination, sorting and tag-index URLs
#[allow(clippy::expect_used)]
static LISTING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"[?&](page|search|query|q|sort|order|filter\w*)=",
        r"/search(/|$)",
        r"/page/\d+",
        r"/tags?/",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("listing pattern is valid")) // Static pattern, safe to panic
    .collect()
});

/// True when the extension is one of [`DOCUMENT_EXTENSIONS`]
pub fn is_document_extension(ext: &str) -> bool {
    DOCUMENT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

/// True when the URL's lowercased path and query match a document path heuristic
pub fn matches_document_pattern(url: &Url) -> bool {
    let target = path_and_query_lower(url);
    DOCUMENT_PATTERNS.iter().any(|re| re.is_match(&target))
}

/// True for search results, paginated listings and tag indexes
///
/// Such pages are never captured as guidance content.
pub fn is_listing_url(url: &Url) -> bool {
    let target = path_and_query_lower(url);
    LISTING_PATTERNS.iter().any(|re| re.is_match(&target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_document_extensions() {
        assert!(is_document_extension("pdf"));
        assert!(is_document_extension("DOCX"));
        assert!(is_document_extension("rtf"));
        assert!(!is_document_extension("html"));
        assert!(!is_document_extension("zip"));
    }

    #[test]
    fn test_document_patterns() {
        assert!(matches_document_pattern(&url("https://a.gov/data/set")));
        assert!(matches_document_pattern(&url("https://a.gov/Publications/annual")));
        assert!(matches_document_pattern(&url("https://a.gov/document/123")));
        assert!(matches_document_pattern(&url("https://a.gov/file/123")));
        assert!(matches_document_pattern(&url("https://a.gov/get.pdf?id=4")));
        assert!(matches_document_pattern(&url("https://a.gov/x?action=download")));
        assert!(matches_document_pattern(&url("https://www.legislation.gov.uk/ukpga/2024/3")));
        assert!(matches_document_pattern(&url("https://www.legislation.gov.uk/uksi/2023/12")));

        assert!(!matches_document_pattern(&url("https://a.gov/about-us")));
        assert!(!matches_document_pattern(&url("https://a.gov/ukpga/latest")));
    }

    #[test]
    fn test_listing_urls() {
        assert!(is_listing_url(&url("https://a.gov/guidance?page=2")));
        assert!(is_listing_url(&url("https://a.gov/guidance?type=x&sort=date")));
        assert!(is_listing_url(&url("https://a.gov/search?q=bail")));
        assert!(is_listing_url(&url("https://a.gov/news/page/3")));
        assert!(is_listing_url(&url("https://a.gov/tags/bail")));

        assert!(!is_listing_url(&url("https://a.gov/guidance/bail-decisions")));
        assert!(!is_listing_url(&url("https://a.gov/research-reports/pages")));
    }
}
