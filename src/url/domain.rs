use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use docwatch::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the network location of a URL: lowercase host plus an explicit port
///
/// Default ports are omitted, so `https://example.com:443/` and
/// `https://example.com/` share a netloc.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use docwatch::url::netloc;
///
/// let url = Url::parse("http://127.0.0.1:8080/docs").unwrap();
/// assert_eq!(netloc(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn netloc(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// True when both URLs share a netloc
///
/// Scheme is ignored; a site served over both http and https is one origin here.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    match (netloc(a), netloc(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_extract_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_netloc_keeps_explicit_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(netloc(&url), Some("example.com:8080".to_string()));
    }

    #[test]
    fn test_netloc_drops_default_port() {
        let url = Url::parse("https://example.com:443/").unwrap();
        assert_eq!(netloc(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_same_origin() {
        let base = Url::parse("https://www.cps.gov.uk/guidance").unwrap();
        let inner = Url::parse("https://www.cps.gov.uk/files/a.pdf").unwrap();
        let other = Url::parse("https://cps.gov.uk/files/a.pdf").unwrap();
        let other_port = Url::parse("https://www.cps.gov.uk:8443/files/a.pdf").unwrap();

        assert!(same_origin(&base, &inner));
        assert!(!same_origin(&base, &other));
        assert!(!same_origin(&base, &other_port));

        let plain = Url::parse("http://www.cps.gov.uk/files/a.pdf").unwrap();
        assert!(same_origin(&base, &plain));
    }

    #[test]
    fn test_same_origin_without_host() {
        let base = Url::parse("https://example.com/").unwrap();
        let data = Url::parse("data:text/plain,hello").unwrap();
        assert!(!same_origin(&base, &data));
    }
}
