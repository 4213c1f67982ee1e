use serde::Deserialize;

/// Main configuration structure for docwatch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteConfig>,
}

impl Config {
    /// Returns the sites that are switched on for crawling
    pub fn enabled_sites(&self) -> Vec<SiteConfig> {
        self.sites.iter().filter(|s| s.enabled).cloned().collect()
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Timeout for entry pages, category pages and sub-pages (seconds)
    #[serde(rename = "page-timeout-secs", default = "default_page_timeout")]
    pub page_timeout_secs: u64,

    /// Timeout for document downloads (seconds)
    #[serde(rename = "download-timeout-secs", default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// How many documents per level are opened when sub-crawling
    #[serde(rename = "sub-crawl-cap", default = "default_sub_crawl_cap")]
    pub sub_crawl_cap: usize,

    /// Delay between successive sub-page fetches on the same site (milliseconds)
    #[serde(rename = "polite-delay-ms", default = "default_polite_delay")]
    pub polite_delay_ms: u64,

    /// Overrides the browser-like default User-Agent header
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,

    /// Cancels a run that is still going after this many seconds
    #[serde(rename = "run-timeout-secs", default)]
    pub run_timeout_secs: Option<u64>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_timeout_secs: default_page_timeout(),
            download_timeout_secs: default_download_timeout(),
            sub_crawl_cap: default_sub_crawl_cap(),
            polite_delay_ms: default_polite_delay(),
            user_agent: None,
            run_timeout_secs: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding documents, ledger and run history
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown run report
    #[serde(rename = "summary-path")]
    pub summary_path: String,

    /// Number of run summaries kept in the history
    #[serde(rename = "history-retention", default = "default_history_retention")]
    pub history_retention: usize,
}

/// One website to monitor
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SiteConfig {
    /// Stable identifier (e.g. "cps_guidance")
    pub id: String,

    /// Display name, also used for the storage folder
    pub name: String,

    /// Entry page URL
    pub url: String,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub description: Option<String>,

    /// Follow links found on level-1 documents
    #[serde(rename = "multi-level", default)]
    pub multi_level: bool,

    /// Deepest crawl level when multi-level is on (1 = entry page only)
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Capture rendered guidance pages as documents
    #[serde(rename = "capture-html-guidance", default)]
    pub capture_html_guidance: bool,

    /// Minimum number of path segments for a guidance page URL
    #[serde(rename = "min-path-depth", default = "default_min_path_depth")]
    pub min_path_depth: usize,

    /// Upper bound on guidance pages collected per run
    #[serde(rename = "max-guidance-pages", default = "default_max_guidance_pages")]
    pub max_guidance_pages: usize,
}

impl SiteConfig {
    /// Creates an enabled single-level site with default options
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            enabled: true,
            description: None,
            multi_level: false,
            max_depth: default_max_depth(),
            capture_html_guidance: false,
            min_path_depth: default_min_path_depth(),
            max_guidance_pages: default_max_guidance_pages(),
        }
    }

    /// True when sub-crawling should go beyond the entry page
    pub fn crawls_sub_levels(&self) -> bool {
        self.multi_level && self.max_depth > 1
    }
}

fn default_page_timeout() -> u64 {
    15
}

fn default_download_timeout() -> u64 {
    30
}

fn default_sub_crawl_cap() -> usize {
    100
}

fn default_polite_delay() -> u64 {
    1000
}

fn default_history_retention() -> usize {
    50
}

fn default_max_depth() -> u32 {
    1
}

fn default_min_path_depth() -> usize {
    2
}

fn default_max_guidance_pages() -> usize {
    50
}
