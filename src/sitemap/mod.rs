//! Sitemap discovery
//!
//! This module locates a storefront's sitemap, walks sitemap indexes into
//! their children, and buckets the discovered URLs by the kind of page they
//! point at.

mod classify;
mod parser;
mod source;

pub use classify::{categorize, classify_url, CategorizedUrls, UrlCategory};
pub use parser::{parse_sitemap, SitemapDocument};
pub use source::SitemapSource;

use thiserror::Error;

/// Priority reported for entries that carry none
pub const DEFAULT_PRIORITY: &str = "0.5";

/// Deepest sitemap-index nesting followed
pub const MAX_SITEMAP_DEPTH: usize = 5;

/// One `<url>` entry of a sitemap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapUrl {
    pub url: String,
    pub lastmod: Option<String>,
    pub priority: String,
}

impl SitemapUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            lastmod: None,
            priority: DEFAULT_PRIORITY.to_string(),
        }
    }
}

/// Errors raised while reading sitemap documents
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("Malformed sitemap XML at byte {position}: {message}")]
    Xml { position: usize, message: String },

    #[error("Sitemap document ended inside <{0}>")]
    Truncated(String),

    #[error("Sitemap document has no root element")]
    Empty,

    #[error("Invalid sitemap location: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type SitemapResult<T> = std::result::Result<T, SitemapError>;
