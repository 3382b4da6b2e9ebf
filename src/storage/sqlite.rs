//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::config::{DatabaseTarget, SiteConfig};
use crate::model::{
    CategoryRecord, ProductRecord, ShippingClassRecord, ShippingMethodRecord, ShippingZoneRecord,
    VariationRecord,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    CategoryRow, ClassRateRow, CrawlCounts, CrawlLogRow, CrawlStatus, EntityKind, ProductRow,
    ShippingClassRow, ShippingMethodRow, ShippingZoneRow, SiteRow, VariationRow,
};
use chrono::Utc;
use rusqlite::{named_params, params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::debug;

const SITE_COLUMNS: &str =
    "id, name, url, consumer_key, consumer_secret, active, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "id, site_id, remote_id, name, slug, permalink, sku, price,
     regular_price, sale_price, description, short_description, weight, length, width, height,
     shipping_class, stock_quantity, stock_status, manage_stock, featured, product_type,
     created_at, updated_at";

const VARIATION_COLUMNS: &str = "id, site_id, product_id, remote_id, sku, price, regular_price,
     sale_price, stock_quantity, stock_status, weight, length, width, height, attributes";

const CRAWL_LOG_COLUMNS: &str = "id, site_id, started_at, completed_at, status, products_count,
     categories_count, variations_count, zones_count, classes_count, pages_count, failed_count,
     error_message, config_hash";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates a database file, creating missing parent directories
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Opens the store named by a resolved target
    ///
    /// `sqlite:` URLs and plain file targets are supported. Server targets are
    /// rejected with [`StorageError::UnsupportedBackend`].
    pub fn open_target(target: &DatabaseTarget) -> StorageResult<Self> {
        match target {
            DatabaseTarget::File(path) => Self::new(path),
            DatabaseTarget::Url(url) => match sqlite_path_from_url(url) {
                Some(":memory:") => Self::new_in_memory(),
                Some(path) if !path.is_empty() => Self::new(Path::new(path)),
                _ => Err(StorageError::UnsupportedBackend(format!(
                    "cannot open '{}' with the SQLite engine",
                    url
                ))),
            },
            DatabaseTarget::Server { .. } => Err(StorageError::UnsupportedBackend(format!(
                "server target {} requires a server driver; use a sqlite: URL or fallback-path",
                target
            ))),
        }
    }
}

/// Extracts the filesystem path from `sqlite:path`, `sqlite://path` or
/// `sqlite:///abs/path`, dropping any query string
fn sqlite_path_from_url(url: &str) -> Option<&str> {
    let rest = url.strip_prefix("sqlite:")?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    Some(rest.split('?').next().unwrap_or(rest))
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn site_from_row(row: &Row) -> rusqlite::Result<SiteRow> {
    Ok(SiteRow {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        consumer_key: row.get(3)?,
        consumer_secret: row.get(4)?,
        active: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn product_from_row(row: &Row) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        id: row.get(0)?,
        site_id: row.get(1)?,
        remote_id: row.get(2)?,
        name: row.get(3)?,
        slug: row.get(4)?,
        permalink: row.get(5)?,
        sku: row.get(6)?,
        price: row.get(7)?,
        regular_price: row.get(8)?,
        sale_price: row.get(9)?,
        description: row.get(10)?,
        short_description: row.get(11)?,
        weight: row.get(12)?,
        length: row.get(13)?,
        width: row.get(14)?,
        height: row.get(15)?,
        shipping_class: row.get(16)?,
        stock_quantity: row.get(17)?,
        stock_status: row.get(18)?,
        manage_stock: row.get(19)?,
        featured: row.get(20)?,
        product_type: row.get(21)?,
        created_at: row.get(22)?,
        updated_at: row.get(23)?,
    })
}

fn variation_from_row(row: &Row) -> rusqlite::Result<VariationRow> {
    Ok(VariationRow {
        id: row.get(0)?,
        site_id: row.get(1)?,
        product_id: row.get(2)?,
        remote_id: row.get(3)?,
        sku: row.get(4)?,
        price: row.get(5)?,
        regular_price: row.get(6)?,
        sale_price: row.get(7)?,
        stock_quantity: row.get(8)?,
        stock_status: row.get(9)?,
        weight: row.get(10)?,
        length: row.get(11)?,
        width: row.get(12)?,
        height: row.get(13)?,
        attributes: row.get(14)?,
    })
}

fn crawl_log_from_row(row: &Row) -> rusqlite::Result<CrawlLogRow> {
    let count = |idx: usize| -> rusqlite::Result<u64> { Ok(row.get::<_, i64>(idx)?.max(0) as u64) };
    Ok(CrawlLogRow {
        id: row.get(0)?,
        site_id: row.get(1)?,
        started_at: row.get(2)?,
        completed_at: row.get(3)?,
        status: CrawlStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(CrawlStatus::Failed),
        counts: CrawlCounts {
            products: count(5)?,
            categories: count(6)?,
            variations: count(7)?,
            zones: count(8)?,
            classes: count(9)?,
            pages: count(10)?,
            failed: count(11)?,
        },
        error_message: row.get(12)?,
        config_hash: row.get(13)?,
    })
}

/// Looks up a row id by `(site_id, remote_id)` inside a transaction
fn natural_key_lookup(
    conn: &Connection,
    table: &str,
    site_id: i64,
    remote_id: i64,
) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        &format!(
            "SELECT id FROM {} WHERE site_id = ?1 AND remote_id = ?2",
            table
        ),
        params![site_id, remote_id],
        |row| row.get(0),
    )
    .optional()
}

impl Storage for SqliteStorage {
    // ===== Sites =====

    fn get_or_create_site(&mut self, site: &SiteConfig) -> StorageResult<i64> {
        let now = now();

        if let Some(existing) = self.get_site(&site.name)? {
            if existing.url != site.url
                || existing.consumer_key != site.consumer_key
                || existing.consumer_secret != site.consumer_secret
            {
                debug!("Refreshing stored settings for site '{}'", site.name);
                self.conn.execute(
                    "UPDATE sites SET url = ?1, consumer_key = ?2, consumer_secret = ?3,
                     updated_at = ?4 WHERE id = ?5",
                    params![
                        site.url,
                        site.consumer_key,
                        site.consumer_secret,
                        now,
                        existing.id
                    ],
                )?;
            }
            return Ok(existing.id);
        }

        self.conn.execute(
            "INSERT INTO sites (name, url, consumer_key, consumer_secret, active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
            params![
                site.name,
                site.url,
                site.consumer_key,
                site.consumer_secret,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_site(&self, name: &str) -> StorageResult<Option<SiteRow>> {
        let site = self
            .conn
            .query_row(
                &format!("SELECT {} FROM sites WHERE name = ?1", SITE_COLUMNS),
                params![name],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    fn list_sites(&self) -> StorageResult<Vec<SiteRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM sites ORDER BY name", SITE_COLUMNS))?;
        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    // ===== Crawl Logs =====

    fn create_crawl_log(&mut self, site_id: i64, config_hash: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO crawl_logs (site_id, started_at, status, config_hash) VALUES (?1, ?2, ?3, ?4)",
            params![
                site_id,
                now(),
                CrawlStatus::Running.to_db_string(),
                config_hash
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_crawl_log(
        &mut self,
        log_id: i64,
        status: CrawlStatus,
        counts: &CrawlCounts,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let current = self.get_crawl_log(log_id)?.status;
        if !status.is_terminal() || !current.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                from: current,
                to: status,
            });
        }

        self.conn.execute(
            "UPDATE crawl_logs SET status = :status, completed_at = :completed_at,
             products_count = :products, categories_count = :categories,
             variations_count = :variations, zones_count = :zones, classes_count = :classes,
             pages_count = :pages, failed_count = :failed, error_message = :error
             WHERE id = :id",
            named_params! {
                ":status": status.to_db_string(),
                ":completed_at": now(),
                ":products": counts.products as i64,
                ":categories": counts.categories as i64,
                ":variations": counts.variations as i64,
                ":zones": counts.zones as i64,
                ":classes": counts.classes as i64,
                ":pages": counts.pages as i64,
                ":failed": counts.failed as i64,
                ":error": error_message,
                ":id": log_id,
            },
        )?;
        Ok(())
    }

    fn get_crawl_log(&self, log_id: i64) -> StorageResult<CrawlLogRow> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM crawl_logs WHERE id = ?1", CRAWL_LOG_COLUMNS),
                params![log_id],
                crawl_log_from_row,
            )
            .optional()?
            .ok_or(StorageError::CrawlLogNotFound(log_id))
    }

    fn recent_crawl_logs(&self, site_id: i64, limit: usize) -> StorageResult<Vec<CrawlLogRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM crawl_logs WHERE site_id = ?1 ORDER BY id DESC LIMIT ?2",
            CRAWL_LOG_COLUMNS
        ))?;
        let logs = stmt
            .query_map(params![site_id, limit as i64], crawl_log_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    // ===== Catalog =====

    fn upsert_category(&mut self, site_id: i64, category: &CategoryRecord) -> StorageResult<i64> {
        let tx = self.conn.transaction()?;
        let existing = natural_key_lookup(&tx, "categories", site_id, category.remote_id)?;
        let timestamp = now();
        let values = named_params! {
            ":site_id": site_id,
            ":remote_id": category.remote_id,
            ":name": category.name,
            ":slug": category.slug,
            ":description": category.description,
            ":parent": category.parent,
            ":now": timestamp,
        };

        let id = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE categories SET name = :name, slug = :slug, description = :description,
                     parent_remote_id = :parent, updated_at = :now
                     WHERE site_id = :site_id AND remote_id = :remote_id",
                    values,
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO categories (site_id, remote_id, name, slug, description,
                     parent_remote_id, created_at, updated_at)
                     VALUES (:site_id, :remote_id, :name, :slug, :description, :parent, :now, :now)",
                    values,
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.commit()?;
        Ok(id)
    }

    fn upsert_product(&mut self, site_id: i64, product: &ProductRecord) -> StorageResult<i64> {
        let tx = self.conn.transaction()?;
        let existing = natural_key_lookup(&tx, "products", site_id, product.remote_id)?;
        let dims = &product.dimensions;
        let timestamp = now();
        let values = named_params! {
            ":site_id": site_id,
            ":remote_id": product.remote_id,
            ":name": product.name,
            ":slug": product.slug,
            ":permalink": product.permalink,
            ":sku": product.sku,
            ":price": product.price,
            ":regular_price": product.regular_price,
            ":sale_price": product.sale_price,
            ":description": product.description,
            ":short_description": product.short_description,
            ":weight": product.weight,
            ":length": dims.length,
            ":width": dims.width,
            ":height": dims.height,
            ":shipping_class": product.shipping_class,
            ":stock_quantity": product.stock_quantity,
            ":stock_status": product.stock_status,
            ":manage_stock": product.manage_stock,
            ":featured": product.featured,
            ":product_type": product.product_type,
            ":now": timestamp,
        };

        let id = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE products SET name = :name, slug = :slug, permalink = :permalink,
                     sku = :sku, price = :price, regular_price = :regular_price,
                     sale_price = :sale_price, description = :description,
                     short_description = :short_description, weight = :weight,
                     length = :length, width = :width, height = :height,
                     shipping_class = :shipping_class, stock_quantity = :stock_quantity,
                     stock_status = :stock_status, manage_stock = :manage_stock,
                     featured = :featured, product_type = :product_type, updated_at = :now
                     WHERE site_id = :site_id AND remote_id = :remote_id",
                    values,
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO products (site_id, remote_id, name, slug, permalink, sku, price,
                     regular_price, sale_price, description, short_description, weight, length,
                     width, height, shipping_class, stock_quantity, stock_status, manage_stock,
                     featured, product_type, created_at, updated_at)
                     VALUES (:site_id, :remote_id, :name, :slug, :permalink, :sku, :price,
                     :regular_price, :sale_price, :description, :short_description, :weight,
                     :length, :width, :height, :shipping_class, :stock_quantity, :stock_status,
                     :manage_stock, :featured, :product_type, :now, :now)",
                    values,
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.execute(
            "DELETE FROM product_categories WHERE product_id = ?1",
            params![id],
        )?;
        for category in &product.categories {
            match natural_key_lookup(&tx, "categories", site_id, category.remote_id)? {
                Some(category_id) => {
                    tx.execute(
                        "INSERT OR IGNORE INTO product_categories (product_id, category_id) VALUES (?1, ?2)",
                        params![id, category_id],
                    )?;
                }
                None => debug!(
                    "Product {} references unknown category {}; link skipped",
                    product.remote_id, category.remote_id
                ),
            }
        }

        tx.commit()?;
        Ok(id)
    }

    fn upsert_variation(
        &mut self,
        site_id: i64,
        product_row_id: i64,
        variation: &VariationRecord,
    ) -> StorageResult<i64> {
        let tx = self.conn.transaction()?;
        let existing = natural_key_lookup(&tx, "product_variations", site_id, variation.remote_id)?;
        let dims = &variation.dimensions;
        let attributes = variation.attributes_json();
        let timestamp = now();
        let values = named_params! {
            ":site_id": site_id,
            ":product_id": product_row_id,
            ":remote_id": variation.remote_id,
            ":sku": variation.sku,
            ":price": variation.price,
            ":regular_price": variation.regular_price,
            ":sale_price": variation.sale_price,
            ":stock_quantity": variation.stock_quantity,
            ":stock_status": variation.stock_status,
            ":weight": variation.weight,
            ":length": dims.length,
            ":width": dims.width,
            ":height": dims.height,
            ":attributes": attributes,
            ":now": timestamp,
        };

        let id = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE product_variations SET product_id = :product_id, sku = :sku,
                     price = :price, regular_price = :regular_price, sale_price = :sale_price,
                     stock_quantity = :stock_quantity, stock_status = :stock_status,
                     weight = :weight, length = :length, width = :width, height = :height,
                     attributes = :attributes, updated_at = :now
                     WHERE site_id = :site_id AND remote_id = :remote_id",
                    values,
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO product_variations (site_id, product_id, remote_id, sku, price,
                     regular_price, sale_price, stock_quantity, stock_status, weight, length,
                     width, height, attributes, created_at, updated_at)
                     VALUES (:site_id, :product_id, :remote_id, :sku, :price, :regular_price,
                     :sale_price, :stock_quantity, :stock_status, :weight, :length, :width,
                     :height, :attributes, :now, :now)",
                    values,
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.commit()?;
        Ok(id)
    }

    // ===== Shipping =====

    fn upsert_shipping_zone(
        &mut self,
        site_id: i64,
        zone: &ShippingZoneRecord,
    ) -> StorageResult<i64> {
        let tx = self.conn.transaction()?;
        let existing = natural_key_lookup(&tx, "shipping_zones", site_id, zone.remote_id)?;
        let locations = zone.locations_json();
        let timestamp = now();
        let values = named_params! {
            ":site_id": site_id,
            ":remote_id": zone.remote_id,
            ":name": zone.name,
            ":zone_order": zone.order,
            ":locations": locations,
            ":now": timestamp,
        };

        let id = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE shipping_zones SET name = :name, zone_order = :zone_order,
                     locations = :locations, updated_at = :now
                     WHERE site_id = :site_id AND remote_id = :remote_id",
                    values,
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO shipping_zones (site_id, remote_id, name, zone_order, locations,
                     created_at, updated_at)
                     VALUES (:site_id, :remote_id, :name, :zone_order, :locations, :now, :now)",
                    values,
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.commit()?;
        Ok(id)
    }

    fn upsert_shipping_method(
        &mut self,
        site_id: i64,
        zone_row_id: i64,
        method: &ShippingMethodRecord,
    ) -> StorageResult<i64> {
        let tx = self.conn.transaction()?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM shipping_methods WHERE zone_id = ?1 AND instance_id = ?2",
                params![zone_row_id, method.instance_id],
                |row| row.get(0),
            )
            .optional()?;
        let settings = method.settings_json();
        let timestamp = now();
        let values = named_params! {
            ":zone_id": zone_row_id,
            ":instance_id": method.instance_id,
            ":title": method.title,
            ":method_id": method.method_id,
            ":method_title": method.method_title,
            ":enabled": method.enabled,
            ":method_order": method.order,
            ":settings": settings,
            ":now": timestamp,
        };

        let id = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE shipping_methods SET title = :title, method_id = :method_id,
                     method_title = :method_title, enabled = :enabled,
                     method_order = :method_order, settings = :settings, updated_at = :now
                     WHERE zone_id = :zone_id AND instance_id = :instance_id",
                    values,
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO shipping_methods (zone_id, instance_id, title, method_id,
                     method_title, enabled, method_order, settings, created_at, updated_at)
                     VALUES (:zone_id, :instance_id, :title, :method_id, :method_title, :enabled,
                     :method_order, :settings, :now, :now)",
                    values,
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.execute(
            "DELETE FROM shipping_class_rates WHERE method_id = ?1",
            params![id],
        )?;
        for rate in method.class_rates() {
            tx.execute(
                "INSERT INTO shipping_class_rates (site_id, method_id, class_remote_id, cost, calc_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![site_id, id, rate.class_id, rate.cost, rate.calc_type],
            )?;
        }

        tx.commit()?;
        Ok(id)
    }

    fn upsert_shipping_class(
        &mut self,
        site_id: i64,
        class: &ShippingClassRecord,
    ) -> StorageResult<i64> {
        let tx = self.conn.transaction()?;
        let existing = natural_key_lookup(&tx, "shipping_classes", site_id, class.remote_id)?;
        let timestamp = now();
        let values = named_params! {
            ":site_id": site_id,
            ":remote_id": class.remote_id,
            ":name": class.name,
            ":slug": class.slug,
            ":description": class.description,
            ":now": timestamp,
        };

        let id = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE shipping_classes SET name = :name, slug = :slug,
                     description = :description, updated_at = :now
                     WHERE site_id = :site_id AND remote_id = :remote_id",
                    values,
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO shipping_classes (site_id, remote_id, name, slug, description,
                     created_at, updated_at)
                     VALUES (:site_id, :remote_id, :name, :slug, :description, :now, :now)",
                    values,
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.commit()?;
        Ok(id)
    }

    // ===== Lookups =====

    fn product_row_id(&self, site_id: i64, remote_id: i64) -> StorageResult<Option<i64>> {
        Ok(natural_key_lookup(
            &self.conn, "products", site_id, remote_id,
        )?)
    }

    fn get_product(&self, site_id: i64, remote_id: i64) -> StorageResult<Option<ProductRow>> {
        let product = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM products WHERE site_id = ?1 AND remote_id = ?2",
                    PRODUCT_COLUMNS
                ),
                params![site_id, remote_id],
                product_from_row,
            )
            .optional()?;
        Ok(product)
    }

    fn get_category(&self, site_id: i64, remote_id: i64) -> StorageResult<Option<CategoryRow>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, site_id, remote_id, name, slug, description, parent_remote_id
                 FROM categories WHERE site_id = ?1 AND remote_id = ?2",
                params![site_id, remote_id],
                |row| {
                    Ok(CategoryRow {
                        id: row.get(0)?,
                        site_id: row.get(1)?,
                        remote_id: row.get(2)?,
                        name: row.get(3)?,
                        slug: row.get(4)?,
                        description: row.get(5)?,
                        parent_remote_id: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(category)
    }

    fn product_category_ids(&self, product_row_id: i64) -> StorageResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.remote_id FROM product_categories pc
             JOIN categories c ON c.id = pc.category_id
             WHERE pc.product_id = ?1 ORDER BY c.remote_id",
        )?;
        let ids = stmt
            .query_map(params![product_row_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn get_variations(&self, product_row_id: i64) -> StorageResult<Vec<VariationRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM product_variations WHERE product_id = ?1 ORDER BY remote_id",
            VARIATION_COLUMNS
        ))?;
        let variations = stmt
            .query_map(params![product_row_id], variation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(variations)
    }

    fn get_shipping_zone(
        &self,
        site_id: i64,
        remote_id: i64,
    ) -> StorageResult<Option<ShippingZoneRow>> {
        let zone = self
            .conn
            .query_row(
                "SELECT id, site_id, remote_id, name, zone_order, locations
                 FROM shipping_zones WHERE site_id = ?1 AND remote_id = ?2",
                params![site_id, remote_id],
                |row| {
                    Ok(ShippingZoneRow {
                        id: row.get(0)?,
                        site_id: row.get(1)?,
                        remote_id: row.get(2)?,
                        name: row.get(3)?,
                        zone_order: row.get(4)?,
                        locations: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(zone)
    }

    fn get_shipping_methods(&self, zone_row_id: i64) -> StorageResult<Vec<ShippingMethodRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, zone_id, instance_id, title, method_id, method_title, enabled,
             method_order, settings
             FROM shipping_methods WHERE zone_id = ?1 ORDER BY method_order, instance_id",
        )?;
        let methods = stmt
            .query_map(params![zone_row_id], |row| {
                Ok(ShippingMethodRow {
                    id: row.get(0)?,
                    zone_id: row.get(1)?,
                    instance_id: row.get(2)?,
                    title: row.get(3)?,
                    method_id: row.get(4)?,
                    method_title: row.get(5)?,
                    enabled: row.get(6)?,
                    method_order: row.get(7)?,
                    settings: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(methods)
    }

    fn get_shipping_class(
        &self,
        site_id: i64,
        remote_id: i64,
    ) -> StorageResult<Option<ShippingClassRow>> {
        let class = self
            .conn
            .query_row(
                "SELECT id, site_id, remote_id, name, slug, description
                 FROM shipping_classes WHERE site_id = ?1 AND remote_id = ?2",
                params![site_id, remote_id],
                |row| {
                    Ok(ShippingClassRow {
                        id: row.get(0)?,
                        site_id: row.get(1)?,
                        remote_id: row.get(2)?,
                        name: row.get(3)?,
                        slug: row.get(4)?,
                        description: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(class)
    }

    fn get_class_rates(&self, method_row_id: i64) -> StorageResult<Vec<ClassRateRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, method_id, class_remote_id, cost, calc_type
             FROM shipping_class_rates WHERE method_id = ?1
             ORDER BY class_remote_id IS NOT NULL, class_remote_id",
        )?;
        let rates = stmt
            .query_map(params![method_row_id], |row| {
                Ok(ClassRateRow {
                    id: row.get(0)?,
                    method_id: row.get(1)?,
                    class_remote_id: row.get(2)?,
                    cost: row.get(3)?,
                    calc_type: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rates)
    }

    // ===== Statistics =====

    fn count_entities(&self, site_id: i64, kind: EntityKind) -> StorageResult<u64> {
        let sql = match kind {
            EntityKind::Product => "SELECT COUNT(*) FROM products WHERE site_id = ?1",
            EntityKind::Variation => "SELECT COUNT(*) FROM product_variations WHERE site_id = ?1",
            EntityKind::Category => "SELECT COUNT(*) FROM categories WHERE site_id = ?1",
            EntityKind::ShippingZone => "SELECT COUNT(*) FROM shipping_zones WHERE site_id = ?1",
            EntityKind::ShippingMethod => {
                "SELECT COUNT(*) FROM shipping_methods m
                 JOIN shipping_zones z ON z.id = m.zone_id WHERE z.site_id = ?1"
            }
            EntityKind::ShippingClass => "SELECT COUNT(*) FROM shipping_classes WHERE site_id = ?1",
            EntityKind::ClassRate => "SELECT COUNT(*) FROM shipping_class_rates WHERE site_id = ?1",
        };
        let count: i64 = self
            .conn
            .query_row(sql, params![site_id], |row| row.get(0))?;
        Ok(count as u64)
    }
}
