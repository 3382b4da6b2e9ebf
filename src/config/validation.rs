use crate::config::types::{Config, CrawlerConfig, DatabaseConfig, SiteConfig, VectorConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Largest `per_page` the catalog API accepts
const MAX_PAGE_SIZE: u32 = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_database_config(&config.database)?;
    validate_vector_config(&config.vector)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.page_size < 1 || config.page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, config.page_size
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_seconds must be >= 1, got {}",
            config.timeout_seconds
        )));
    }

    if config.retry_base_delay_ms > config.retry_max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "retry_base_delay_ms ({}) cannot exceed retry_max_delay_ms ({})",
            config.retry_base_delay_ms, config.retry_max_delay_ms
        )));
    }

    Ok(())
}

/// Validates relational store configuration
fn validate_database_config(config: &DatabaseConfig) -> Result<(), ConfigError> {
    if config.fallback_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database fallback_path cannot be empty".to_string(),
        ));
    }

    if config.port == 0 {
        return Err(ConfigError::Validation(
            "database port must be non-zero".to_string(),
        ));
    }

    Ok(())
}

/// Validates vector index configuration
fn validate_vector_config(config: &VectorConfig) -> Result<(), ConfigError> {
    if config.persist_directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "vector persist_directory cannot be empty".to_string(),
        ));
    }

    if config.dimension < 8 {
        return Err(ConfigError::Validation(format!(
            "vector dimension must be >= 8, got {}",
            config.dimension
        )));
    }

    Ok(())
}

/// Validates site entries
fn validate_sites(sites: &[SiteConfig]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[site]] entry is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for site in sites {
        validate_site_name(&site.name)?;

        if !seen.insert(site.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site name '{}'",
                site.name
            )));
        }

        let url = Url::parse(&site.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid URL for site '{}': {}", site.name, e))
        })?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::Validation(format!(
                "Site URL '{}' must use HTTP or HTTPS",
                site.url
            )));
        }

        if site.consumer_key.trim().is_empty() || site.consumer_secret.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Site '{}' must have a consumer key and secret",
                site.name
            )));
        }
    }

    Ok(())
}

/// Site names: non-empty, alphanumeric plus hyphens and underscores
fn validate_site_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "site name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "site name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            name
        )));
    }

    Ok(())
}
