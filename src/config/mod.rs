//! Configuration module for docwatch
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and exposes the site list to the orchestrator through the [`SiteSource`] trait.
//!
//! # Example
//!
//! ```no_run
//! use docwatch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("docwatch.toml")).unwrap();
//! println!("Sites enabled: {}", config.enabled_sites().len());
//! ```

mod parser;
mod types;
mod validation;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::ConfigResult;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, SiteConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

/// Supplies the enabled site list at the start of each run
///
/// Implementations return owned values; the crawl never mutates them.
#[async_trait]
pub trait SiteSource: Send + Sync {
    /// Loads the sites to crawl this run (enabled sites only)
    async fn load_site_configs(&self) -> ConfigResult<Vec<SiteConfig>>;
}

/// Reads sites from a TOML configuration file each time a run starts
#[derive(Debug, Clone)]
pub struct TomlSiteSource {
    path: PathBuf,
}

impl TomlSiteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SiteSource for TomlSiteSource {
    async fn load_site_configs(&self) -> ConfigResult<Vec<SiteConfig>> {
        let config = load_config(&self.path)?;
        Ok(config.enabled_sites())
    }
}

/// A fixed, in-memory site list
///
/// The list is validated like a configuration file on every load.
#[derive(Debug, Clone, Default)]
pub struct StaticSites {
    sites: Vec<SiteConfig>,
}

impl StaticSites {
    pub fn new(sites: Vec<SiteConfig>) -> Self {
        Self { sites }
    }
}

#[async_trait]
impl SiteSource for StaticSites {
    async fn load_site_configs(&self) -> ConfigResult<Vec<SiteConfig>> {
        validation::validate_sites(&self.sites)?;
        Ok(self.sites.iter().filter(|s| s.enabled).cloned().collect())
    }
}
