//! Output module for sync reports and catalog statistics
//!
//! This module handles:
//! - Formatting the summary of a finished sync run
//! - Loading and printing per-site statistics from storage

pub mod stats;
mod summary;

pub use stats::{load_statistics, print_statistics, SiteStatistics};
pub use summary::{format_sync_summary, print_sync_summary};
