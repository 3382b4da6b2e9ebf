//! Crawler module for remote catalog fetching
//!
//! This module contains the network side of a sync, including:
//! - HTTP fetching with retry logic
//! - Paginated WooCommerce REST API access
//! - HTML text extraction for page indexing
//! - Overall run coordination

mod catalog;
mod coordinator;
mod fetcher;
mod parser;

pub use catalog::{CatalogClient, TOTAL_PAGES_HEADER};
pub use coordinator::{run_all_sites, run_sync, Coordinator, SyncOptions, SyncSummary};
pub use fetcher::{build_http_client, fetch_url, fetch_with_retry, FetchResult, RetryPolicy};
pub use parser::{extract_page_text, PageText};
