//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building an HTTP client with browser-like default headers
//! - GET requests with a per-request timeout
//! - Transparent gzip/brotli decoding (handled by reqwest)
//! - Error classification into blocked / timeout / other

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Default User-Agent: a current desktop browser, since several monitored sites
/// refuse obvious bot agents
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 Edg/119.0.0.0";

/// Typed fetch failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The server refused the request (HTTP 403)
    #[error("Blocked by {url} (HTTP {status})")]
    Blocked { url: String, status: u16 },

    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    /// Connection failures, other non-2xx statuses, body decode failures
    #[error("Failed to fetch {url}: {message}")]
    Other { url: String, message: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::Blocked { url, .. } | Self::Timeout { url } | Self::Other { url, .. } => url,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// A successfully fetched response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,
    pub status: u16,
    /// Content-Type header value, empty when absent
    pub content_type: String,
    /// Decoded body bytes
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// True when the Content-Type denotes HTML
    pub fn is_html(&self) -> bool {
        let ct = self.content_type.to_ascii_lowercase();
        ct.contains("text/html") || ct.contains("application/xhtml")
    }

    /// Body as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Content-Type without parameters, or a fallback when absent
    pub fn mime_type(&self) -> &str {
        let mime = self.content_type.split(';').next().unwrap_or("").trim();
        if mime.is_empty() {
            "application/octet-stream"
        } else {
            mime
        }
    }
}

/// Anything that can GET a URL
///
/// The crawler only talks to the network through this trait so tests can
/// substitute their own implementation.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`, giving up after `timeout`
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with browser-like headers
///
/// # Arguments
///
/// * `user_agent` - Overrides [`BROWSER_USER_AGENT`] when set
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client (e.g. invalid user agent)
///
/// # Example
///
/// ```no_run
/// use docwatch::crawler::build_http_client;
///
/// let client = build_http_client(None).unwrap();
/// ```
pub fn build_http_client(user_agent: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-GB,en;q=0.9"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));

    Client::builder()
        .user_agent(user_agent.unwrap_or(BROWSER_USER_AGENT))
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`Fetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the default browser-like client
    pub fn new(user_agent: Option<&str>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent)?,
        })
    }
}

fn classify_request_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        FetchError::Other {
            url: url.to_string(),
            message: format!("connection failed: {}", e),
        }
    } else {
        FetchError::Other {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_request_error(url, e))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(FetchError::Blocked {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            return Err(FetchError::Other {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_request_error(url, e))?;

        tracing::debug!("Fetched {} ({} bytes, {})", final_url, body.len(), content_type);

        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }
}
