//! Reconciliation of remote records into the relational store and vector index
//!
//! The [`Reconciler`] owns both stores for one site. Each incoming JSON record
//! is mapped to its typed form, upserted in its own transaction and, for
//! products and pages, mirrored into the vector index. A failing record is
//! logged, listed in the returned [`SaveReport`] and never aborts the batch.

mod report;

pub use report::{FailureStage, RecordFailure, SaveReport, ShippingReport};

use crate::config::SiteConfig;
use crate::model::{
    remote_id_hint, CategoryRecord, ProductRecord, ShippingClassRecord, ShippingMethodRecord,
    ShippingZoneRecord, VariationRecord,
};
use crate::storage::{CrawlCounts, CrawlStatus, Storage, StorageResult};
use crate::vector::{
    collection_name, page_document, product_document, VectorIndex, VectorResult,
    PAGES_COLLECTION, PRODUCTS_COLLECTION,
};
use serde_json::Value;
use tracing::{debug, error};

/// Writes one site's catalog into a relational store and a vector index
pub struct Reconciler<S: Storage, V: VectorIndex> {
    storage: S,
    index: V,
    site_id: i64,
    products_collection: String,
    pages_collection: String,
}

impl<S: Storage, V: VectorIndex> Reconciler<S, V> {
    /// Binds the stores to a site, creating the site row on first use
    pub fn new(
        mut storage: S,
        index: V,
        site: &SiteConfig,
        per_site_collections: bool,
    ) -> StorageResult<Self> {
        let site_id = storage.get_or_create_site(site)?;
        Ok(Self {
            storage,
            index,
            site_id,
            products_collection: collection_name(PRODUCTS_COLLECTION, site_id, per_site_collections),
            pages_collection: collection_name(PAGES_COLLECTION, site_id, per_site_collections),
        })
    }

    pub fn site_id(&self) -> i64 {
        self.site_id
    }

    pub fn products_collection(&self) -> &str {
        &self.products_collection
    }

    pub fn pages_collection(&self) -> &str {
        &self.pages_collection
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn index(&self) -> &V {
        &self.index
    }

    pub fn into_parts(self) -> (S, V) {
        (self.storage, self.index)
    }

    // ===== Crawl Logs =====

    pub fn create_crawl_log(&mut self, config_hash: &str) -> StorageResult<i64> {
        self.storage.create_crawl_log(self.site_id, config_hash)
    }

    pub fn finish_crawl_log(
        &mut self,
        log_id: i64,
        status: CrawlStatus,
        counts: &CrawlCounts,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        self.storage
            .finish_crawl_log(log_id, status, counts, error_message)
    }

    // ===== Catalog =====

    pub fn save_categories(&mut self, records: &[Value]) -> SaveReport {
        let mut report = SaveReport::default();

        for record in records {
            let hint = remote_id_hint(record);
            let category = match CategoryRecord::from_remote_record(record) {
                Ok(category) => category,
                Err(e) => {
                    error!("Skipping category {:?}: {}", hint, e);
                    report.record_failure(hint, FailureStage::Validation, e.to_string());
                    continue;
                }
            };

            match self.storage.upsert_category(self.site_id, &category) {
                Ok(_) => report.saved += 1,
                Err(e) => {
                    error!("Error saving category {}: {}", category.remote_id, e);
                    report.record_failure(
                        Some(category.remote_id),
                        FailureStage::Relational,
                        e.to_string(),
                    );
                }
            }
        }

        report
    }

    /// Saves products and mirrors each into the product collection
    ///
    /// Categories should be saved first so product links resolve.
    pub fn save_products(&mut self, records: &[Value]) -> SaveReport {
        let mut report = SaveReport::default();

        for record in records {
            let hint = remote_id_hint(record);
            let product = match ProductRecord::from_remote_record(record) {
                Ok(product) => product,
                Err(e) => {
                    error!("Skipping product {:?}: {}", hint, e);
                    report.record_failure(hint, FailureStage::Validation, e.to_string());
                    continue;
                }
            };

            if let Err(e) = self.storage.upsert_product(self.site_id, &product) {
                error!("Error saving product {}: {}", product.remote_id, e);
                report.record_failure(
                    Some(product.remote_id),
                    FailureStage::Relational,
                    e.to_string(),
                );
                continue;
            }

            // The row stays committed; the next sync re-indexes it
            if let Err(e) = self.index_product(&product) {
                error!("Error indexing product {}: {}", product.remote_id, e);
                report.record_failure(Some(product.remote_id), FailureStage::Vector, e.to_string());
                continue;
            }

            report.saved += 1;
        }

        report
    }

    fn index_product(&mut self, product: &ProductRecord) -> VectorResult<()> {
        let document = product_document(self.site_id, product);
        self.index.upsert(&self.products_collection, &document)
    }

    pub fn save_product_variations(&mut self, product_row_id: i64, records: &[Value]) -> SaveReport {
        let mut report = SaveReport::default();

        for record in records {
            let hint = remote_id_hint(record);
            let variation = match VariationRecord::from_remote_record(record) {
                Ok(variation) => variation,
                Err(e) => {
                    error!("Skipping variation {:?}: {}", hint, e);
                    report.record_failure(hint, FailureStage::Validation, e.to_string());
                    continue;
                }
            };

            match self
                .storage
                .upsert_variation(self.site_id, product_row_id, &variation)
            {
                Ok(_) => report.saved += 1,
                Err(e) => {
                    error!("Error saving variation {}: {}", variation.remote_id, e);
                    report.record_failure(
                        Some(variation.remote_id),
                        FailureStage::Relational,
                        e.to_string(),
                    );
                }
            }
        }

        report
    }

    /// Row id of a stored product, if its save succeeded
    pub fn product_row_id(&self, remote_id: i64) -> StorageResult<Option<i64>> {
        self.storage.product_row_id(self.site_id, remote_id)
    }

    // ===== Shipping =====

    /// Saves zones (with the `methods` array the catalog client attaches to
    /// each zone) and then shipping classes
    pub fn save_shipping_data(&mut self, zones: &[Value], classes: &[Value]) -> ShippingReport {
        let mut report = ShippingReport::default();

        for record in zones {
            let hint = remote_id_hint(record);
            let zone = match ShippingZoneRecord::from_remote_record(record) {
                Ok(zone) => zone,
                Err(e) => {
                    error!("Skipping shipping zone {:?}: {}", hint, e);
                    report
                        .zones
                        .record_failure(hint, FailureStage::Validation, e.to_string());
                    continue;
                }
            };

            let zone_row_id = match self.storage.upsert_shipping_zone(self.site_id, &zone) {
                Ok(id) => id,
                Err(e) => {
                    error!("Error saving shipping zone {}: {}", zone.remote_id, e);
                    report.zones.record_failure(
                        Some(zone.remote_id),
                        FailureStage::Relational,
                        e.to_string(),
                    );
                    continue;
                }
            };
            report.zones.saved += 1;

            let methods = record
                .get("methods")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            report
                .methods
                .absorb(self.save_shipping_methods(zone_row_id, methods));
        }

        for record in classes {
            let hint = remote_id_hint(record);
            let class = match ShippingClassRecord::from_remote_record(record) {
                Ok(class) => class,
                Err(e) => {
                    error!("Skipping shipping class {:?}: {}", hint, e);
                    report
                        .classes
                        .record_failure(hint, FailureStage::Validation, e.to_string());
                    continue;
                }
            };

            match self.storage.upsert_shipping_class(self.site_id, &class) {
                Ok(_) => report.classes.saved += 1,
                Err(e) => {
                    error!("Error saving shipping class {}: {}", class.remote_id, e);
                    report.classes.record_failure(
                        Some(class.remote_id),
                        FailureStage::Relational,
                        e.to_string(),
                    );
                }
            }
        }

        report
    }

    fn save_shipping_methods(&mut self, zone_row_id: i64, records: &[Value]) -> SaveReport {
        let mut report = SaveReport::default();

        for record in records {
            let hint = record.get("instance_id").and_then(Value::as_i64);
            let method = match ShippingMethodRecord::from_remote_record(record) {
                Ok(method) => method,
                Err(e) => {
                    error!("Skipping shipping method {:?}: {}", hint, e);
                    report.record_failure(hint, FailureStage::Validation, e.to_string());
                    continue;
                }
            };

            match self
                .storage
                .upsert_shipping_method(self.site_id, zone_row_id, &method)
            {
                Ok(_) => {
                    debug!(
                        "Saved shipping method {} with {} class rates",
                        method.instance_id,
                        method.class_rates().len()
                    );
                    report.saved += 1;
                }
                Err(e) => {
                    error!("Error saving shipping method {}: {}", method.instance_id, e);
                    report.record_failure(
                        Some(method.instance_id),
                        FailureStage::Relational,
                        e.to_string(),
                    );
                }
            }
        }

        report
    }

    // ===== Pages =====

    /// Indexes crawled page text into the page collection
    pub fn save_page_content(
        &mut self,
        url: &str,
        content: &str,
        page_type: &str,
    ) -> VectorResult<()> {
        let document = page_document(self.site_id, url, content, page_type);
        self.index.upsert(&self.pages_collection, &document)
    }
}
