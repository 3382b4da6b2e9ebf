//! Fetching and walking a site's sitemaps

use super::{parse_sitemap, SitemapDocument, SitemapResult, SitemapUrl, MAX_SITEMAP_DEPTH};
use crate::config::{CrawlerConfig, SiteConfig};
use crate::crawler::{
    build_http_client, extract_page_text, fetch_url, FetchResult, PageText, RetryPolicy,
};
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Reads the sitemaps and pages of one storefront
pub struct SitemapSource {
    client: Client,
    retry: RetryPolicy,
    base_url: String,
    delay: Duration,
    max_depth: usize,
}

impl SitemapSource {
    pub fn new(site: &SiteConfig, crawler: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(crawler)?, &site.url, crawler))
    }

    pub fn with_client(client: Client, base_url: &str, crawler: &CrawlerConfig) -> Self {
        Self {
            client,
            retry: RetryPolicy::from_config(crawler),
            base_url: base_url.to_string(),
            delay: crawler.delay(),
            max_depth: crawler.max_sitemap_depth.min(MAX_SITEMAP_DEPTH),
        }
    }

    /// `/sitemap.xml` at the root of the site's host
    pub fn default_sitemap_url(&self) -> SitemapResult<String> {
        Ok(Url::parse(&self.base_url)?.join("/sitemap.xml")?.to_string())
    }

    /// Collects every `<url>` reachable from the given or default sitemap
    ///
    /// Sitemap indexes are walked depth-first in document order. Each sitemap
    /// is fetched at most once, nesting beyond the configured depth is
    /// skipped, and a document that cannot be fetched or parsed contributes
    /// nothing. The only error is an unusable site URL.
    pub async fn parse(&self, sitemap_url: Option<&str>) -> SitemapResult<Vec<SitemapUrl>> {
        let root = match sitemap_url {
            Some(url) => url.to_string(),
            None => self.default_sitemap_url()?,
        };

        let mut pending = vec![(root, 0usize)];
        let mut visited = HashSet::new();
        let mut urls = Vec::new();
        let mut fetched = 0usize;

        while let Some((location, depth)) = pending.pop() {
            if depth > self.max_depth {
                warn!("Skipping sitemap {}: nested deeper than {}", location, self.max_depth);
                continue;
            }
            if !visited.insert(location.clone()) {
                debug!("Sitemap {} already visited", location);
                continue;
            }

            if fetched > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            fetched += 1;

            let Some(body) = self.fetch_document(&location).await else {
                continue;
            };

            match parse_sitemap(&body) {
                Ok(SitemapDocument::Index(children)) => {
                    info!("Sitemap index {} lists {} sitemaps", location, children.len());
                    pending.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
                }
                Ok(SitemapDocument::UrlSet(entries)) => {
                    debug!("Sitemap {} lists {} URLs", location, entries.len());
                    urls.extend(entries);
                }
                Err(e) => warn!("Error parsing sitemap {}: {}", location, e),
            }
        }

        info!("Found {} URLs in {} sitemap(s)", urls.len(), fetched);
        Ok(urls)
    }

    /// Fetches a storefront page and extracts its indexable text
    pub async fn fetch_page_text(&self, url: &str) -> Option<PageText> {
        let body = self.fetch_document(url).await?;
        let page = extract_page_text(&body);
        (!page.is_empty()).then_some(page)
    }

    async fn fetch_document(&self, url: &str) -> Option<String> {
        match fetch_url(&self.client, &self.retry, url).await {
            FetchResult::Success { body, .. } => Some(body),
            FetchResult::HttpError { status_code, .. } => {
                warn!("Error fetching {}: HTTP {}", url, status_code);
                None
            }
            FetchResult::NetworkError { error } => {
                warn!("Error fetching {}: {}", url, error);
                None
            }
        }
    }
}
