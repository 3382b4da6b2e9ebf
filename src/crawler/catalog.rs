//! Paginated client for the WooCommerce `wc/v3` REST API

use crate::config::{CrawlerConfig, SiteConfig};
use crate::crawler::fetcher::{build_http_client, fetch_with_retry, FetchResult, RetryPolicy};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Path of the REST API below the site URL
const API_PREFIX: &str = "wp-json/wc/v3";

/// Response header carrying the number of pages of a collection
pub const TOTAL_PAGES_HEADER: &str = "X-WP-TotalPages";

/// Fetches catalog collections for one site
pub struct CatalogClient {
    client: Client,
    api_base: String,
    consumer_key: String,
    consumer_secret: String,
    page_size: u32,
    retry: RetryPolicy,
}

impl CatalogClient {
    pub fn new(site: &SiteConfig, crawler: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(crawler)?, site, crawler))
    }

    /// Builds a client around an existing HTTP client
    pub fn with_client(client: Client, site: &SiteConfig, crawler: &CrawlerConfig) -> Self {
        Self {
            client,
            api_base: format!("{}/{}", site.url.trim_end_matches('/'), API_PREFIX),
            consumer_key: site.consumer_key.clone(),
            consumer_secret: site.consumer_secret.clone(),
            page_size: crawler.page_size,
            retry: RetryPolicy::from_config(crawler),
        }
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/{}", self.api_base, resource.trim_start_matches('/'))
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> FetchResult {
        fetch_with_retry(&self.retry, url, || {
            self.client
                .get(url)
                .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
                .query(query)
        })
        .await
    }

    /// Pages through a collection until an empty page or the reported last page
    ///
    /// Non-success statuses, non-array bodies and exhausted retries all end the
    /// collection early with whatever was collected so far.
    pub async fn fetch_collection(&self, resource: &str, params: &[(&str, &str)]) -> Vec<Value> {
        let url = self.endpoint(resource);
        let mut records = Vec::new();
        let mut page: u32 = 1;

        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("per_page", self.page_size.to_string()),
                ("page", page.to_string()),
            ];
            query.extend(params.iter().map(|(k, v)| (*k, v.to_string())));

            let (headers, body) = match self.get(&url, &query).await {
                FetchResult::Success { headers, body, .. } => (headers, body),
                FetchResult::HttpError { status_code, body } => {
                    warn!(
                        "Error fetching {} page {}: HTTP {} {}",
                        resource, page, status_code, body
                    );
                    break;
                }
                FetchResult::NetworkError { error } => {
                    warn!("Giving up on {} page {}: {}", resource, page, error);
                    break;
                }
            };

            let batch = match serde_json::from_str::<Value>(&body) {
                Ok(Value::Array(items)) => items,
                Ok(_) => {
                    warn!("Unexpected {} response on page {}: not a list", resource, page);
                    break;
                }
                Err(e) => {
                    warn!("Invalid JSON for {} page {}: {}", resource, page, e);
                    break;
                }
            };

            if batch.is_empty() {
                break;
            }
            records.extend(batch);

            let total_pages = headers
                .get(TOTAL_PAGES_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(1);
            debug!("Fetched {} page {}/{}", resource, page, total_pages);

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        records
    }

    /// All published products
    pub async fn get_all_products(&self) -> Vec<Value> {
        let products = self
            .fetch_collection("products", &[("status", "publish")])
            .await;
        info!("Fetched {} products", products.len());
        products
    }

    pub async fn get_all_categories(&self) -> Vec<Value> {
        let categories = self.fetch_collection("products/categories", &[]).await;
        info!("Fetched {} categories", categories.len());
        categories
    }

    pub async fn get_product_variations(&self, product_id: i64) -> Vec<Value> {
        self.fetch_collection(&format!("products/{}/variations", product_id), &[])
            .await
    }

    /// Zones with `methods` and `locations` arrays attached to each zone
    pub async fn get_shipping_zones(&self) -> Vec<Value> {
        let mut zones = self.fetch_collection("shipping/zones", &[]).await;

        for zone in &mut zones {
            let Some(zone_id) = zone.get("id").and_then(Value::as_i64) else {
                continue;
            };
            let methods = self
                .fetch_collection(&format!("shipping/zones/{}/methods", zone_id), &[])
                .await;
            let locations = self
                .fetch_collection(&format!("shipping/zones/{}/locations", zone_id), &[])
                .await;

            if let Some(fields) = zone.as_object_mut() {
                fields.insert("methods".to_string(), Value::Array(methods));
                fields.insert("locations".to_string(), Value::Array(locations));
            }
        }

        info!("Fetched {} shipping zones", zones.len());
        zones
    }

    pub async fn get_shipping_classes(&self) -> Vec<Value> {
        let classes = self.fetch_collection("products/shipping_classes", &[]).await;
        info!("Fetched {} shipping classes", classes.len());
        classes
    }

    /// A single product, or `None` on any failure
    pub async fn get_product_by_id(&self, product_id: i64) -> Option<Value> {
        let url = self.endpoint(&format!("products/{}", product_id));
        match self.get(&url, &[]).await {
            FetchResult::Success { body, .. } => match serde_json::from_str::<Value>(&body) {
                Ok(value @ Value::Object(_)) => Some(value),
                _ => {
                    warn!("Unexpected response body for product {}", product_id);
                    None
                }
            },
            FetchResult::HttpError { status_code, .. } => {
                warn!("Error fetching product {}: HTTP {}", product_id, status_code);
                None
            }
            FetchResult::NetworkError { error } => {
                warn!("Error fetching product {}: {}", product_id, error);
                None
            }
        }
    }
}
