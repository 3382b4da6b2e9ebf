//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::config::SiteConfig;
use crate::model::{
    CategoryRecord, ProductRecord, ShippingClassRecord, ShippingMethodRecord, ShippingZoneRecord,
    VariationRecord,
};
use crate::storage::{
    CategoryRow, ClassRateRow, CrawlCounts, CrawlLogRow, CrawlStatus, EntityKind, ProductRow,
    ShippingClassRow, ShippingMethodRow, ShippingZoneRow, SiteRow, VariationRow,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Crawl log not found: {0}")]
    CrawlLogNotFound(i64),

    #[error("Invalid crawl status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: CrawlStatus, to: CrawlStatus },

    #[error("Unsupported database backend: {0}")]
    UnsupportedBackend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for relational store implementations
///
/// Every `upsert_*` call runs in its own transaction: it looks the row up by
/// natural key, overwrites it in place when found and inserts it otherwise.
/// A failing call leaves earlier writes untouched.
pub trait Storage {
    // ===== Sites =====

    /// Returns the id of the named site, creating it or refreshing its
    /// URL and credentials as needed
    fn get_or_create_site(&mut self, site: &SiteConfig) -> StorageResult<i64>;

    fn get_site(&self, name: &str) -> StorageResult<Option<SiteRow>>;

    fn list_sites(&self) -> StorageResult<Vec<SiteRow>>;

    // ===== Crawl Logs =====

    /// Opens a crawl log in the `running` state
    fn create_crawl_log(&mut self, site_id: i64, config_hash: &str) -> StorageResult<i64>;

    /// Moves a running crawl log to a terminal state with its counts
    ///
    /// Fails with [`StorageError::InvalidTransition`] when the log is not
    /// running or `status` is not terminal.
    fn finish_crawl_log(
        &mut self,
        log_id: i64,
        status: CrawlStatus,
        counts: &CrawlCounts,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    fn get_crawl_log(&self, log_id: i64) -> StorageResult<CrawlLogRow>;

    /// Most recent crawl logs of a site, newest first
    fn recent_crawl_logs(&self, site_id: i64, limit: usize) -> StorageResult<Vec<CrawlLogRow>>;

    // ===== Catalog =====

    fn upsert_category(&mut self, site_id: i64, category: &CategoryRecord) -> StorageResult<i64>;

    /// Upserts a product and replaces its category links
    ///
    /// Categories are resolved by remote id within the site; unknown ones are
    /// skipped.
    fn upsert_product(&mut self, site_id: i64, product: &ProductRecord) -> StorageResult<i64>;

    fn upsert_variation(
        &mut self,
        site_id: i64,
        product_row_id: i64,
        variation: &VariationRecord,
    ) -> StorageResult<i64>;

    // ===== Shipping =====

    fn upsert_shipping_zone(
        &mut self,
        site_id: i64,
        zone: &ShippingZoneRecord,
    ) -> StorageResult<i64>;

    /// Upserts a method keyed by `(zone, instance id)` and re-derives its
    /// class rates from the settings
    fn upsert_shipping_method(
        &mut self,
        site_id: i64,
        zone_row_id: i64,
        method: &ShippingMethodRecord,
    ) -> StorageResult<i64>;

    fn upsert_shipping_class(
        &mut self,
        site_id: i64,
        class: &ShippingClassRecord,
    ) -> StorageResult<i64>;

    // ===== Lookups =====

    /// Row id of a product by its remote id
    fn product_row_id(&self, site_id: i64, remote_id: i64) -> StorageResult<Option<i64>>;

    fn get_product(&self, site_id: i64, remote_id: i64) -> StorageResult<Option<ProductRow>>;

    fn get_category(&self, site_id: i64, remote_id: i64) -> StorageResult<Option<CategoryRow>>;

    /// Remote ids of the categories linked to a product, ascending
    fn product_category_ids(&self, product_row_id: i64) -> StorageResult<Vec<i64>>;

    fn get_variations(&self, product_row_id: i64) -> StorageResult<Vec<VariationRow>>;

    fn get_shipping_zone(
        &self,
        site_id: i64,
        remote_id: i64,
    ) -> StorageResult<Option<ShippingZoneRow>>;

    fn get_shipping_methods(&self, zone_row_id: i64) -> StorageResult<Vec<ShippingMethodRow>>;

    fn get_shipping_class(
        &self,
        site_id: i64,
        remote_id: i64,
    ) -> StorageResult<Option<ShippingClassRow>>;

    /// Rates of a method, no-class first, then by class id
    fn get_class_rates(&self, method_row_id: i64) -> StorageResult<Vec<ClassRateRow>>;

    // ===== Statistics =====

    fn count_entities(&self, site_id: i64, kind: EntityKind) -> StorageResult<u64>;
}
