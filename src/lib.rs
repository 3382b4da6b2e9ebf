//! Storefront-Sync: catalog mirroring for WooCommerce storefronts
//!
//! This crate pulls catalog data (products, categories, variations, shipping
//! configuration) from the WooCommerce REST API of one or more sites, upserts it
//! into a SQLite store keyed by `(site, remote id)`, and mirrors a text
//! projection of every product into a file-backed vector index.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod reconcile;
pub mod sitemap;
pub mod storage;
pub mod vector;

use thiserror::Error;

/// Main error type for Storefront-Sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Vector index error: {0}")]
    Vector(#[from] vector::VectorError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid crawl status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: storage::CrawlStatus,
        to: storage::CrawlStatus,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Site '{name}' not found in configuration")]
    UnknownSite { name: String, available: Vec<String> },

    #[error("No site selected and no default site configured")]
    NoDefaultSite { available: Vec<String> },
}

impl ConfigError {
    /// Site names the operator can choose from, when the error is about site selection
    pub fn available_sites(&self) -> Option<&[String]> {
        match self {
            Self::UnknownSite { available, .. } | Self::NoDefaultSite { available } => {
                Some(available)
            }
            _ => None,
        }
    }
}

/// Result type alias for Storefront-Sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_sync, Coordinator, SyncOptions, SyncSummary};
pub use reconcile::{Reconciler, SaveReport};
pub use storage::{CrawlStatus, SqliteStorage, Storage};
