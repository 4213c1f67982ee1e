use crate::{UrlError, UrlResult};
use url::Url;

/// Parses an absolute http(s) URL
pub fn parse_http_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Resolves an `href` value against the page it was found on
///
/// Fragments are dropped so `a.pdf#page=2` and `a.pdf` resolve to the same
/// document. Non-navigational links (`javascript:`, `mailto:`, `tel:`, bare
/// fragments) and non-http(s) results return `None`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use docwatch::url::resolve_link;
///
/// let base = Url::parse("https://example.gov/guidance/").unwrap();
/// let url = resolve_link(&base, "../files/report.pdf#p2").unwrap();
/// assert_eq!(url.as_str(), "https://example.gov/files/report.pdf");
/// ```
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("mailto:") || lower.starts_with("tel:")
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Non-empty path segments of a URL
pub fn path_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Number of non-empty path segments; `/a/b/` has depth 2
pub fn path_depth(url: &Url) -> usize {
    path_segments(url).len()
}

/// The last non-empty path segment, if any
pub fn last_segment(url: &Url) -> Option<String> {
    path_segments(url).pop()
}

/// Lowercased text after the last dot of the last path segment
///
/// Returns `None` when the segment has no dot, or the dot is leading or trailing.
pub fn extension_of(url: &Url) -> Option<String> {
    let segment = last_segment(url)?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Path and query of a URL, lowercased, for pattern heuristics
pub fn path_and_query_lower(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{}", url.path(), q).to_lowercase(),
        None => url.path().to_lowercase(),
    }
}
