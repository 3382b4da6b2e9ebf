//! Storage module for persisting catalog data
//!
//! This module handles all relational store operations for the sync, including:
//! - SQLite database initialization and schema management
//! - Per-record transactional upserts keyed by `(site, remote id)`
//! - Crawl log tracking with status transitions
//! - Read-back and counting queries for reports

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::DatabaseTarget;

/// Opens the relational store named by a resolved database target
pub fn open_storage(target: &DatabaseTarget) -> StorageResult<SqliteStorage> {
    SqliteStorage::open_target(target)
}

/// A storefront partition
#[derive(Debug, Clone)]
pub struct SiteRow {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A stored product
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub id: i64,
    pub site_id: i64,
    pub remote_id: i64,
    pub name: String,
    pub slug: String,
    pub permalink: String,
    pub sku: String,
    pub price: String,
    pub regular_price: String,
    pub sale_price: String,
    pub description: String,
    pub short_description: String,
    pub weight: String,
    pub length: String,
    pub width: String,
    pub height: String,
    pub shipping_class: String,
    pub stock_quantity: Option<i64>,
    pub stock_status: String,
    pub manage_stock: bool,
    pub featured: bool,
    pub product_type: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct VariationRow {
    pub id: i64,
    pub site_id: i64,
    pub product_id: i64,
    pub remote_id: i64,
    pub sku: String,
    pub price: String,
    pub regular_price: String,
    pub sale_price: String,
    pub stock_quantity: Option<i64>,
    pub stock_status: String,
    pub weight: String,
    pub length: String,
    pub width: String,
    pub height: String,
    /// JSON list of attribute objects
    pub attributes: String,
}

#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub id: i64,
    pub site_id: i64,
    pub remote_id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub parent_remote_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ShippingZoneRow {
    pub id: i64,
    pub site_id: i64,
    pub remote_id: i64,
    pub name: String,
    pub zone_order: i64,
    /// JSON list of `{code, type}` objects
    pub locations: String,
}

#[derive(Debug, Clone)]
pub struct ShippingMethodRow {
    pub id: i64,
    pub zone_id: i64,
    pub instance_id: i64,
    pub title: String,
    pub method_id: String,
    pub method_title: String,
    pub enabled: bool,
    pub method_order: i64,
    /// Raw settings object as JSON
    pub settings: String,
}

#[derive(Debug, Clone)]
pub struct ShippingClassRow {
    pub id: i64,
    pub site_id: i64,
    pub remote_id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
}

/// A derived per-class rate of a shipping method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRateRow {
    pub id: i64,
    pub method_id: i64,
    /// Remote shipping class id; `None` for items without a class
    pub class_remote_id: Option<i64>,
    pub cost: String,
    pub calc_type: String,
}

/// Per-entity counts recorded when a crawl finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlCounts {
    pub products: u64,
    pub categories: u64,
    pub variations: u64,
    pub zones: u64,
    pub classes: u64,
    pub pages: u64,
    pub failed: u64,
}

/// Represents one sync run
#[derive(Debug, Clone)]
pub struct CrawlLogRow {
    pub id: i64,
    pub site_id: i64,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: CrawlStatus,
    pub counts: CrawlCounts,
    pub error_message: Option<String>,
    pub config_hash: String,
}

/// Status of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl CrawlStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// `pending -> running -> {completed, failed}`; finished runs are final
    pub fn can_transition_to(&self, next: CrawlStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Entity tables that can be counted per site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Product,
    Variation,
    Category,
    ShippingZone,
    ShippingMethod,
    ShippingClass,
    ClassRate,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        Self::Product,
        Self::Variation,
        Self::Category,
        Self::ShippingZone,
        Self::ShippingMethod,
        Self::ShippingClass,
        Self::ClassRate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Product => "Products",
            Self::Variation => "Variations",
            Self::Category => "Categories",
            Self::ShippingZone => "Shipping zones",
            Self::ShippingMethod => "Shipping methods",
            Self::ShippingClass => "Shipping classes",
            Self::ClassRate => "Class rates",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_status_roundtrip() {
        for status in &[
            CrawlStatus::Pending,
            CrawlStatus::Running,
            CrawlStatus::Completed,
            CrawlStatus::Failed,
        ] {
            let db_str = status.to_db_string();
            let parsed = CrawlStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_crawl_status_invalid() {
        assert_eq!(CrawlStatus::from_db_string("interrupted"), None);
    }

    #[test]
    fn test_crawl_status_transitions() {
        assert!(CrawlStatus::Pending.can_transition_to(CrawlStatus::Running));
        assert!(CrawlStatus::Running.can_transition_to(CrawlStatus::Completed));
        assert!(CrawlStatus::Running.can_transition_to(CrawlStatus::Failed));

        assert!(!CrawlStatus::Pending.can_transition_to(CrawlStatus::Completed));
        assert!(!CrawlStatus::Completed.can_transition_to(CrawlStatus::Failed));
        assert!(!CrawlStatus::Failed.can_transition_to(CrawlStatus::Running));
        assert!(!CrawlStatus::Running.can_transition_to(CrawlStatus::Running));

        assert!(CrawlStatus::Failed.is_terminal());
        assert!(!CrawlStatus::Running.is_terminal());
    }
}
