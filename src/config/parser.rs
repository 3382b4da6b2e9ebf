use crate::config::types::Config;
use crate::config::validation::validate;
use crate::{ConfigError, ConfigResult};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hex SHA-256 of configuration text
///
/// Every crawl log records this hash so runs can be tied to the configuration
/// that produced them.
pub fn hash_config_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Loads and validates the configuration file at `path`
///
/// # Returns
///
/// * `Ok(Config)` - Parsed and validated configuration
/// * `Err(ConfigError)` - The file could not be read, parsed, or validated
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Hash of the configuration file at `path`
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    Ok(hash_config_content(&std::fs::read_to_string(path)?))
}

/// Reads the file once and returns the configuration with the hash of
/// exactly the text it was parsed from
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_config_content(&content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseTarget;
    use std::io::Write;

    const TWO_STORES: &str = r#"
[crawler]
user-agent = "TestBot/1.0"
delay-seconds = 0
page-size = 50

[database]
url = "sqlite://./test.db"

[vector]
persist-directory = "./vectors"
per-site-collections = false

[[site]]
name = "store1"
url = "https://store1.example.com"
consumer-key = "ck_123"
consumer-secret = "cs_456"

[[site]]
name = "store2"
url = "https://store2.example.com"
consumer-key = "ck_789"
consumer-secret = "cs_012"
"#;

    #[test]
    fn test_parse_two_stores() {
        let config = parse_config(TWO_STORES).unwrap();

        assert_eq!(config.crawler.user_agent, "TestBot/1.0");
        assert_eq!(config.crawler.page_size, 50);
        // Unspecified keys keep their defaults
        assert_eq!(config.crawler.max_attempts, 3);
        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.sites[1].consumer_key, "ck_789");
        assert!(!config.vector.per_site_collections);
        assert_eq!(
            config.database.target(),
            DatabaseTarget::Url("sqlite://./test.db".to_string())
        );
    }

    #[test]
    fn test_single_site_falls_back_to_defaults() {
        let config = parse_config(
            r#"
[[site]]
name = "default"
url = "https://shop.example.com"
consumer-key = "ck"
consumer-secret = "cs"
"#,
        )
        .unwrap();

        assert_eq!(config.crawler.page_size, 100);
        assert_eq!(config.crawler.delay_seconds, 1);
        assert!(config.crawler.sitemap);
        assert_eq!(config.vector.persist_directory, "./data/vectors");
        assert!(matches!(config.database.target(), DatabaseTarget::File(_)));
    }

    #[test]
    fn test_parse_errors_are_distinguished() {
        assert!(matches!(
            parse_config("[[site]\nname = "),
            Err(ConfigError::Parse(_))
        ));

        let oversized_pages = r#"
[crawler]
page-size = 500

[[site]]
name = "store1"
url = "https://store1.example.com"
consumer-key = "ck"
consumer-secret = "cs"
"#;
        assert!(matches!(
            parse_config(oversized_pages),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/sync.toml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_hash_tracks_file_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TWO_STORES.as_bytes()).unwrap();
        file.flush().unwrap();

        let (config, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(config.sites[0].name, "store1");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
        assert_eq!(hash, hash_config_content(TWO_STORES));
        assert_ne!(hash, hash_config_content("per-site-collections = true"));
    }
}
