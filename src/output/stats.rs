//! Statistics generation from the catalog database
//!
//! This module provides functionality for extracting and displaying
//! per-site catalog counts and recent sync runs from the storage layer.

use crate::storage::{CrawlLogRow, EntityKind, SiteRow, Storage, StorageResult};

/// Catalog statistics for one site
#[derive(Debug, Clone)]
pub struct SiteStatistics {
    pub site: SiteRow,

    /// Stored rows per entity table, in [`EntityKind::ALL`] order
    pub entity_counts: Vec<(EntityKind, u64)>,

    /// Most recent sync runs, newest first
    pub recent_runs: Vec<CrawlLogRow>,
}

impl SiteStatistics {
    pub fn count(&self, kind: EntityKind) -> u64 {
        self.entity_counts
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, count)| *count)
    }
}

/// Loads statistics for every site in storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `run_limit` - How many recent runs to load per site
pub fn load_statistics(
    storage: &dyn Storage,
    run_limit: usize,
) -> StorageResult<Vec<SiteStatistics>> {
    let mut stats = Vec::new();

    for site in storage.list_sites()? {
        let mut entity_counts = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            entity_counts.push((kind, storage.count_entities(site.id, kind)?));
        }

        let recent_runs = storage.recent_crawl_logs(site.id, run_limit)?;

        stats.push(SiteStatistics {
            site,
            entity_counts,
            recent_runs,
        });
    }

    Ok(stats)
}

/// Run duration in seconds, when the run has finished
fn run_duration_seconds(run: &CrawlLogRow) -> Option<i64> {
    let started = run.started_at.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
    let finished = run
        .completed_at
        .as_deref()?
        .parse::<chrono::DateTime<chrono::Utc>>()
        .ok()?;
    Some((finished - started).num_seconds())
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &[SiteStatistics]) {
    println!("=== Catalog Statistics ===\n");

    if stats.is_empty() {
        println!("No sites have been synchronized yet.");
        return;
    }

    for entry in stats {
        println!(
            "Site: {} ({}) [id {}]",
            entry.site.name, entry.site.url, entry.site.id
        );
        for (kind, count) in &entry.entity_counts {
            println!("  {}: {}", kind.label(), count);
        }

        if entry.recent_runs.is_empty() {
            println!("  No sync runs recorded");
        } else {
            println!("  Recent runs:");
            for run in &entry.recent_runs {
                let duration = run_duration_seconds(run)
                    .map(|s| format!(" in {}s", s))
                    .unwrap_or_default();
                println!(
                    "    #{} {} {}{}: {} products, {} categories, {} variations, {} failed",
                    run.id,
                    run.started_at,
                    run.status.to_db_string(),
                    duration,
                    run.counts.products,
                    run.counts.categories,
                    run.counts.variations,
                    run.counts.failed
                );
                if let Some(message) = &run.error_message {
                    println!("      error: {}", message);
                }
            }
        }
        println!();
    }
}
