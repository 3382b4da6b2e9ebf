//! Plain-text report of a finished sync run

use crate::crawler::SyncSummary;
use crate::reconcile::SaveReport;
use crate::sitemap::UrlCategory;

/// Failures listed per entity before the rest are elided
const MAX_LISTED_FAILURES: usize = 10;

/// Formats a sync summary for the terminal
pub fn format_sync_summary(summary: &SyncSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Sync Summary: {} ===\n\n", summary.site_name));
    out.push_str(&format!(
        "Run: #{} (site id {})\n",
        summary.crawl_log_id, summary.site_id
    ));
    out.push_str(&format!("Status: {}\n", summary.status.to_db_string()));
    out.push_str(&format!("Duration: {:.1}s\n", summary.duration.as_secs_f64()));
    if let Some(error) = &summary.error {
        out.push_str(&format!("Error: {}\n", error));
    }

    if let Some(sitemap) = &summary.sitemap {
        out.push_str(&format!("\nSitemap URLs ({}):\n", sitemap.total()));
        for category in UrlCategory::ALL {
            out.push_str(&format!("  {}: {}\n", category, sitemap.get(category).len()));
        }
    }

    out.push_str("\nSaved:\n");
    let sections: [(&str, &SaveReport); 7] = [
        ("Categories", &summary.categories),
        ("Products", &summary.products),
        ("Variations", &summary.variations),
        ("Shipping zones", &summary.shipping.zones),
        ("Shipping methods", &summary.shipping.methods),
        ("Shipping classes", &summary.shipping.classes),
        ("Pages", &summary.pages),
    ];
    for (label, report) in sections {
        out.push_str(&format!(
            "  {}: {} ({} failed)\n",
            label,
            report.saved,
            report.failed()
        ));
    }

    for (label, report) in sections {
        if report.is_clean() {
            continue;
        }
        out.push_str(&format!("\n{} failures:\n", label));
        for failure in report.failures.iter().take(MAX_LISTED_FAILURES) {
            let id = failure
                .remote_id
                .map_or_else(|| "-".to_string(), |id| id.to_string());
            out.push_str(&format!(
                "  [{}] id {}: {}\n",
                failure.stage, id, failure.message
            ));
        }
        if report.failed() > MAX_LISTED_FAILURES {
            out.push_str(&format!(
                "  ... and {} more\n",
                report.failed() - MAX_LISTED_FAILURES
            ));
        }
    }

    out
}

/// Prints a sync summary to stdout
pub fn print_sync_summary(summary: &SyncSummary) {
    print!("{}", format_sync_summary(summary));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::FailureStage;
    use crate::sitemap::{categorize, SitemapUrl};
    use crate::storage::CrawlStatus;

    fn summary() -> SyncSummary {
        SyncSummary {
            site_name: "store1".to_string(),
            site_id: 1,
            crawl_log_id: 7,
            status: CrawlStatus::Completed,
            error: None,
            sitemap: None,
            categories: SaveReport::default(),
            products: SaveReport::default(),
            variations: SaveReport::default(),
            shipping: Default::default(),
            pages: SaveReport::default(),
            duration: Default::default(),
        }
    }

    #[test]
    fn test_format_counts_and_status() {
        let mut s = summary();
        s.products.saved = 12;
        s.sitemap = Some(categorize(vec![
            SitemapUrl::new("https://store1.example.com/product/a"),
            SitemapUrl::new("https://store1.example.com/blog/b"),
        ]));

        let text = format_sync_summary(&s);
        assert!(text.contains("=== Sync Summary: store1 ==="));
        assert!(text.contains("Status: completed"));
        assert!(text.contains("Products: 12 (0 failed)"));
        assert!(text.contains("Sitemap URLs (2):"));
        assert!(text.contains("  posts: 1"));
        assert!(!text.contains("failures:"));
    }

    #[test]
    fn test_failures_listed_and_elided() {
        let mut s = summary();
        s.status = CrawlStatus::Failed;
        s.error = Some("database is locked".to_string());
        for id in 0..12 {
            s.products
                .record_failure(Some(id), FailureStage::Relational, "constraint failed");
        }

        let text = format_sync_summary(&s);
        assert!(text.contains("Error: database is locked"));
        assert!(text.contains("Products failures:"));
        assert!(text.contains("  [relational] id 0: constraint failed"));
        assert!(!text.contains("id 10:"));
        assert!(text.contains("... and 2 more"));
    }
}
