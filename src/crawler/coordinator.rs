//! Sync coordinator - per-site orchestration of a catalog run
//!
//! A run walks one site through a fixed sequence:
//! - Optional sitemap discovery and URL bucketing
//! - Categories, then products
//! - Variations of every stored variable product
//! - Shipping zones, their methods and shipping classes
//! - Optional page indexing of sitemap pages and posts
//!
//! Every step is awaited before the next starts. The crawl log moves from
//! `running` to `completed` or `failed`; a failure inside the sequence is
//! recorded rather than returned.

use crate::config::{Config, CrawlerConfig, SiteConfig};
use crate::crawler::CatalogClient;
use crate::model::remote_id_hint;
use crate::reconcile::{FailureStage, Reconciler, SaveReport, ShippingReport};
use crate::sitemap::{categorize, CategorizedUrls, SitemapSource};
use crate::storage::{open_storage, CrawlCounts, CrawlStatus, SqliteStorage};
use crate::vector::{HashingEmbedder, SqliteVectorIndex};
use crate::{Result, SyncError};
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// What to synchronize
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Site to sync; `None` picks the default site
    pub site_name: Option<String>,

    /// Sitemap to start from instead of `<site-url>/sitemap.xml`
    pub sitemap_url: Option<String>,
}

/// Everything a finished run reports
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub site_name: String,
    pub site_id: i64,
    pub crawl_log_id: i64,
    pub status: CrawlStatus,
    pub error: Option<String>,
    /// Sitemap buckets, when the sitemap step ran
    pub sitemap: Option<CategorizedUrls>,
    pub categories: SaveReport,
    pub products: SaveReport,
    pub variations: SaveReport,
    pub shipping: ShippingReport,
    pub pages: SaveReport,
    pub duration: Duration,
}

impl SyncSummary {
    fn new(site_name: &str, site_id: i64) -> Self {
        Self {
            site_name: site_name.to_string(),
            site_id,
            crawl_log_id: 0,
            status: CrawlStatus::Pending,
            error: None,
            sitemap: None,
            categories: SaveReport::default(),
            products: SaveReport::default(),
            variations: SaveReport::default(),
            shipping: ShippingReport::default(),
            pages: SaveReport::default(),
            duration: Duration::ZERO,
        }
    }

    /// Counts recorded in the crawl log
    pub fn counts(&self) -> CrawlCounts {
        let failed = self.categories.failed()
            + self.products.failed()
            + self.variations.failed()
            + self.shipping.failed()
            + self.pages.failed();

        CrawlCounts {
            products: self.products.saved as u64,
            categories: self.categories.saved as u64,
            variations: self.variations.saved as u64,
            zones: self.shipping.zones.saved as u64,
            classes: self.shipping.classes.saved as u64,
            pages: self.pages.saved as u64,
            failed: failed as u64,
        }
    }
}

/// Main sync coordinator structure
///
/// Owns both store handles for the run; they are closed when the
/// coordinator is dropped.
pub struct Coordinator {
    site: SiteConfig,
    crawler: CrawlerConfig,
    config_hash: String,
    reconciler: Reconciler<SqliteStorage, SqliteVectorIndex>,
    catalog: CatalogClient,
    sitemap: SitemapSource,
    status: CrawlStatus,
}

impl Coordinator {
    /// Resolves the site and opens both stores
    ///
    /// # Arguments
    ///
    /// * `config` - The loaded configuration
    /// * `config_hash` - Hash recorded in the crawl log
    /// * `site_name` - Site to sync, or `None` for the default site
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(SyncError)` - Unknown site, or a store could not be opened
    pub fn new(config: &Config, config_hash: &str, site_name: Option<&str>) -> Result<Self> {
        let site = config.site(site_name)?.clone();
        info!("Syncing site '{}' ({})", site.name, site.url);

        let target = config.database.target();
        debug!("Opening relational store {}", target);
        let storage = open_storage(&target)?;

        let embedder = HashingEmbedder::new(config.vector.dimension);
        let index = SqliteVectorIndex::open(
            Path::new(&config.vector.persist_directory),
            Box::new(embedder),
        )?;

        let reconciler = Reconciler::new(
            storage,
            index,
            &site,
            config.vector.per_site_collections,
        )?;

        let catalog = CatalogClient::new(&site, &config.crawler)?;
        let sitemap = SitemapSource::new(&site, &config.crawler)?;

        Ok(Self {
            site,
            crawler: config.crawler.clone(),
            config_hash: config_hash.to_string(),
            reconciler,
            catalog,
            sitemap,
            status: CrawlStatus::Pending,
        })
    }

    pub fn status(&self) -> CrawlStatus {
        self.status
    }

    pub fn site_id(&self) -> i64 {
        self.reconciler.site_id()
    }

    pub fn reconciler(&self) -> &Reconciler<SqliteStorage, SqliteVectorIndex> {
        &self.reconciler
    }

    fn transition(&mut self, next: CrawlStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(SyncError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        debug!("Run status {:?} -> {:?}", self.status, next);
        self.status = next;
        Ok(())
    }

    /// Runs the sync once
    ///
    /// Returns `Err` only when the run cannot start or its log cannot be
    /// closed. A failure inside the sequence yields a summary with status
    /// `Failed` and the error message.
    pub async fn run(&mut self, sitemap_url: Option<&str>) -> Result<SyncSummary> {
        self.transition(CrawlStatus::Running)?;
        let start = Instant::now();

        let mut summary = SyncSummary::new(&self.site.name, self.reconciler.site_id());
        summary.crawl_log_id = self.reconciler.create_crawl_log(&self.config_hash)?;
        info!(
            "Starting sync run {} for site '{}'",
            summary.crawl_log_id, self.site.name
        );

        let outcome = self.sync_steps(sitemap_url, &mut summary).await;

        let status = match outcome {
            Ok(()) => CrawlStatus::Completed,
            Err(e) => {
                error!("Sync of site '{}' failed: {}", self.site.name, e);
                summary.error = Some(e.to_string());
                CrawlStatus::Failed
            }
        };
        self.transition(status)?;
        summary.status = status;
        summary.duration = start.elapsed();

        self.reconciler.finish_crawl_log(
            summary.crawl_log_id,
            status,
            &summary.counts(),
            summary.error.as_deref(),
        )?;

        info!(
            "Sync run {} {:?} in {:.1}s",
            summary.crawl_log_id,
            status,
            summary.duration.as_secs_f64()
        );
        Ok(summary)
    }

    async fn sync_steps(
        &mut self,
        sitemap_url: Option<&str>,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        if self.crawler.sitemap {
            summary.sitemap = self.discover_sitemap(sitemap_url).await;
        }

        let categories = self.catalog.get_all_categories().await;
        summary.categories = self.reconciler.save_categories(&categories);
        info!(
            "Saved {} categories ({} failed)",
            summary.categories.saved,
            summary.categories.failed()
        );

        let products = self.catalog.get_all_products().await;
        summary.products = self.reconciler.save_products(&products);
        info!(
            "Saved {} products ({} failed)",
            summary.products.saved,
            summary.products.failed()
        );

        summary.variations = self.sync_variations(&products).await?;

        let zones = self.catalog.get_shipping_zones().await;
        let classes = self.catalog.get_shipping_classes().await;
        summary.shipping = self.reconciler.save_shipping_data(&zones, &classes);
        info!(
            "Saved {} shipping zones, {} methods and {} classes",
            summary.shipping.zones.saved,
            summary.shipping.methods.saved,
            summary.shipping.classes.saved
        );

        if self.crawler.index_pages {
            if let Some(categorized) = &summary.sitemap {
                summary.pages = self.index_pages(categorized).await;
            }
        }

        Ok(())
    }

    /// Parses and buckets the sitemap; never fails the run
    async fn discover_sitemap(&self, sitemap_url: Option<&str>) -> Option<CategorizedUrls> {
        match self.sitemap.parse(sitemap_url).await {
            Ok(urls) => {
                let categorized = categorize(urls);
                info!(
                    "Sitemap: {} products, {} categories, {} pages, {} posts, {} other",
                    categorized.products.len(),
                    categorized.categories.len(),
                    categorized.pages.len(),
                    categorized.posts.len(),
                    categorized.other.len()
                );
                Some(categorized)
            }
            Err(e) => {
                warn!("Skipping sitemap for site '{}': {}", self.site.name, e);
                None
            }
        }
    }

    async fn sync_variations(&mut self, products: &[Value]) -> Result<SaveReport> {
        let variable_ids: Vec<i64> = products
            .iter()
            .filter(|p| p.get("type").and_then(Value::as_str) == Some("variable"))
            .filter_map(remote_id_hint)
            .collect();

        let mut report = SaveReport::default();
        let mut fetched = 0usize;

        for remote_id in variable_ids {
            let Some(row_id) = self.reconciler.product_row_id(remote_id)? else {
                debug!("Product {} was not stored, skipping its variations", remote_id);
                continue;
            };

            if fetched > 0 {
                tokio::time::sleep(self.crawler.delay()).await;
            }
            fetched += 1;

            let records = self.catalog.get_product_variations(remote_id).await;
            report.absorb(self.reconciler.save_product_variations(row_id, &records));
        }

        info!(
            "Saved {} variations of {} variable products ({} failed)",
            report.saved,
            fetched,
            report.failed()
        );
        Ok(report)
    }

    async fn index_pages(&mut self, categorized: &CategorizedUrls) -> SaveReport {
        let mut report = SaveReport::default();

        for (i, (category, entry)) in categorized.indexable().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.crawler.delay()).await;
            }

            let Some(page) = self.sitemap.fetch_page_text(&entry.url).await else {
                debug!("No indexable content at {}", entry.url);
                continue;
            };

            match self
                .reconciler
                .save_page_content(&entry.url, &page.to_document(), category.label())
            {
                Ok(()) => report.saved += 1,
                Err(e) => {
                    error!("Error indexing page {}: {}", entry.url, e);
                    report.record_failure(None, FailureStage::Vector, e.to_string());
                }
            }
        }

        info!("Indexed {} pages ({} failed)", report.saved, report.failed());
        report
    }
}

/// Runs a sync for the site selected by `options`
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `config_hash` - Hash recorded in the crawl log
/// * `options` - Site and sitemap selection
pub async fn run_sync(
    config: &Config,
    config_hash: &str,
    options: &SyncOptions,
) -> Result<SyncSummary> {
    let mut coordinator = Coordinator::new(config, config_hash, options.site_name.as_deref())?;
    coordinator.run(options.sitemap_url.as_deref()).await
}

/// Runs a sync for every configured site, one after another
///
/// A site that cannot start does not stop the others.
pub async fn run_all_sites(
    config: &Config,
    config_hash: &str,
    options: &SyncOptions,
) -> Vec<(String, Result<SyncSummary>)> {
    let mut results = Vec::with_capacity(config.sites.len());

    for name in config.site_names() {
        let site_options = SyncOptions {
            site_name: Some(name.clone()),
            ..options.clone()
        };
        let result = run_sync(config, config_hash, &site_options).await;
        if let Err(e) = &result {
            error!("Could not sync site '{}': {}", name, e);
        }
        results.push((name, result));
    }

    results
}
