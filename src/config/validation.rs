use crate::config::types::{Config, CrawlerConfig, OutputConfig, SiteConfig};
use crate::state::sanitize_folder;
use crate::ConfigError;
use std::collections::{HashMap, HashSet};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "page-timeout-secs must be >= 1, got {}",
            config.page_timeout_secs
        )));
    }

    if config.download_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "download-timeout-secs must be >= 1, got {}",
            config.download_timeout_secs
        )));
    }

    if config.sub_crawl_cap < 1 || config.sub_crawl_cap > 1000 {
        return Err(ConfigError::Validation(format!(
            "sub-crawl-cap must be between 1 and 1000, got {}",
            config.sub_crawl_cap
        )));
    }

    if let Some(agent) = &config.user_agent {
        if agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agent cannot be empty when set".to_string(),
            ));
        }
    }

    if config.run_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "run-timeout-secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty".to_string(),
        ));
    }

    if config.history_retention < 1 {
        return Err(ConfigError::Validation(
            "history-retention must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the site list
///
/// Site names map to storage folders, so two names that sanitize to the same
/// folder are rejected along with duplicate ids.
pub(crate) fn validate_sites(sites: &[SiteConfig]) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();
    let mut folders: HashMap<String, &str> = HashMap::new();
    for site in sites {
        if !seen_ids.insert(site.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate site id '{}'",
                site.id
            )));
        }
        validate_site(site)?;

        let folder = sanitize_folder(&site.name);
        if let Some(other) = folders.insert(folder.clone(), site.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Sites '{}' and '{}' share the storage folder '{}'; rename one of them",
                other, site.id, folder
            )));
        }
    }
    Ok(())
}

/// Validates a single site entry
pub(crate) fn validate_site(site: &SiteConfig) -> Result<(), ConfigError> {
    if site.id.trim().is_empty() {
        return Err(ConfigError::Validation("site id cannot be empty".to_string()));
    }

    if site.name.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "site '{}' must have a name",
            site.id
        )));
    }

    let url = Url::parse(&site.url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid URL for site '{}': {}", site.id, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Site '{}' URL must use http or https, got {}",
            site.id,
            url.scheme()
        )));
    }

    if site.max_depth < 1 || site.max_depth > 5 {
        return Err(ConfigError::Validation(format!(
            "max-depth for site '{}' must be between 1 and 5, got {}",
            site.id, site.max_depth
        )));
    }

    if site.capture_html_guidance {
        if site.min_path_depth < 1 {
            return Err(ConfigError::Validation(format!(
                "min-path-depth for site '{}' must be >= 1",
                site.id
            )));
        }
        if site.max_guidance_pages < 1 {
            return Err(ConfigError::Validation(format!(
                "max-guidance-pages for site '{}' must be >= 1",
                site.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: &str, url: &str) -> SiteConfig {
        SiteConfig::new(id, format!("Test Site {}", id), url)
    }

    #[test]
    fn test_validate_site_url() {
        assert!(validate_site(&site("a", "https://example.gov/docs")).is_ok());
        assert!(validate_site(&site("a", "http://localhost:8080/")).is_ok());

        assert!(matches!(
            validate_site(&site("a", "not a url")),
            Err(ConfigError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_site(&site("a", "ftp://example.gov/")),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_validate_max_depth_bounds() {
        let mut s = site("a", "https://example.gov/");
        s.max_depth = 0;
        assert!(validate_site(&s).is_err());
        s.max_depth = 6;
        assert!(validate_site(&s).is_err());
        s.max_depth = 2;
        assert!(validate_site(&s).is_ok());
    }

    #[test]
    fn test_validate_guidance_limits() {
        let mut s = site("a", "https://example.gov/");
        s.capture_html_guidance = true;
        s.max_guidance_pages = 0;
        assert!(validate_site(&s).is_err());
    }

    #[test]
    fn test_duplicate_site_ids_rejected() {
        let sites = vec![
            site("dup", "https://one.example/"),
            site("dup", "https://two.example/"),
        ];
        assert!(matches!(
            validate_sites(&sites),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_shared_storage_folder_rejected() {
        let sites = vec![
            SiteConfig::new("a", "Ministry Guidance", "https://a.example/"),
            SiteConfig::new("b", "ministry guidance!", "https://b.example/"),
        ];
        let err = validate_sites(&sites).unwrap_err();
        assert!(err.to_string().contains("ministry-guidance"));
    }

    #[test]
    fn test_folder_truncation_clash_rejected() {
        let prefix = "Department for Environment Food";
        let sites = vec![
            SiteConfig::new("a", format!("{} and Rural Affairs", prefix), "https://a.example/"),
            SiteConfig::new("b", format!("{} Standards Agency", prefix), "https://b.example/"),
        ];
        assert!(matches!(
            validate_sites(&sites),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_distinct_folders_accepted() {
        let sites = vec![
            SiteConfig::new("a", "Home Office", "https://a.example/"),
            SiteConfig::new("b", "Ministry of Justice", "https://b.example/"),
        ];
        assert!(validate_sites(&sites).is_ok());
    }
}
