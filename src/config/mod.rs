//! Configuration module for Storefront-Sync
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use storefront_sync::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sync.toml")).unwrap();
//! println!("Configured sites: {:?}", config.site_names());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DatabaseConfig, DatabaseTarget, SiteConfig, VectorConfig,
    DEFAULT_SITE_NAME,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, hash_config_content, load_config, load_config_with_hash, parse_config,
};
