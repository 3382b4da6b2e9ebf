use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::ConfigError;

/// Main configuration structure for Storefront-Sync
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(rename = "site", default)]
    pub sites: Vec<SiteConfig>,
}

impl Config {
    /// Names of all configured sites, in file order
    pub fn site_names(&self) -> Vec<String> {
        self.sites.iter().map(|s| s.name.clone()).collect()
    }

    /// Selects the site to synchronize
    ///
    /// With an explicit name the site must exist. Without one, a site named
    /// `default` is used, or the only configured site when there is exactly one.
    pub fn site(&self, name: Option<&str>) -> Result<&SiteConfig, ConfigError> {
        match name {
            Some(name) => self
                .sites
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| ConfigError::UnknownSite {
                    name: name.to_string(),
                    available: self.site_names(),
                }),
            None => {
                if let Some(site) = self.sites.iter().find(|s| s.name == DEFAULT_SITE_NAME) {
                    return Ok(site);
                }
                match self.sites.as_slice() {
                    [only] => Ok(only),
                    _ => Err(ConfigError::NoDefaultSite {
                        available: self.site_names(),
                    }),
                }
            }
        }
    }
}

/// Name of the site picked when none is given on the command line
pub const DEFAULT_SITE_NAME: &str = "default";

/// Fetch behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Fixed pause between variation fetches, sitemap fetches and page fetches
    pub delay_seconds: u64,

    /// Per-request timeout
    pub timeout_seconds: u64,

    /// `per_page` value for collection requests (the API caps it at 100)
    pub page_size: u32,

    /// Attempts per page fetch, including the first
    pub max_attempts: u32,

    /// Backoff before the first retry
    pub retry_base_delay_ms: u64,

    /// Upper bound for any single backoff
    pub retry_max_delay_ms: u64,

    /// Parse the site's sitemap at the start of each run
    pub sitemap: bool,

    /// Fetch sitemap pages and posts and index their text
    pub index_pages: bool,

    /// Maximum nesting of sitemap indexes, never above 5
    pub max_sitemap_depth: usize,
}

impl CrawlerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: "StorefrontSync-Bot/1.0".to_string(),
            delay_seconds: 1,
            timeout_seconds: 30,
            page_size: 100,
            max_attempts: 3,
            retry_base_delay_ms: 4_000,
            retry_max_delay_ms: 10_000,
            sitemap: true,
            index_pages: false,
            max_sitemap_depth: crate::sitemap::MAX_SITEMAP_DEPTH,
        }
    }
}

/// Relational store configuration
///
/// Resolution order: `url`, then the discrete server parameters, then the
/// local `fallback-path` file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub fallback_path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: 3306,
            user: None,
            password: None,
            name: None,
            fallback_path: "data/products.db".to_string(),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl DatabaseConfig {
    /// Resolves the connection target by precedence
    pub fn target(&self) -> DatabaseTarget {
        if let Some(url) = non_blank(&self.url) {
            return DatabaseTarget::Url(url.to_string());
        }

        if let (Some(user), Some(database)) = (non_blank(&self.user), non_blank(&self.name)) {
            return DatabaseTarget::Server {
                host: non_blank(&self.host).unwrap_or("localhost").to_string(),
                port: self.port,
                user: user.to_string(),
                password: self.password.clone().unwrap_or_default(),
                database: database.to_string(),
            };
        }

        DatabaseTarget::File(PathBuf::from(&self.fallback_path))
    }
}

/// Where the relational store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// Full connection URL, e.g. `sqlite://data/products.db`
    Url(String),

    /// Discrete server parameters
    Server {
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    },

    /// Local file-based store
    File(PathBuf),
}

impl fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{}", url),
            Self::Server {
                host,
                port,
                user,
                database,
                ..
            } => write!(f, "{}:***@{}:{}/{}", user, host, port, database),
            Self::File(path) => write!(f, "sqlite file {}", path.display()),
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct VectorConfig {
    /// Directory holding the persistent index
    pub persist_directory: String,

    /// Suffix collection names with `_site_<id>`
    pub per_site_collections: bool,

    /// Embedding width of the built-in hashing embedder
    pub dimension: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            persist_directory: "./data/vectors".to_string(),
            per_site_collections: true,
            dimension: 256,
        }
    }
}

/// One storefront and its API credentials
#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl fmt::Debug for SiteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteConfig")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("consumer_key", &"***")
            .field("consumer_secret", &"***")
            .finish()
    }
}
