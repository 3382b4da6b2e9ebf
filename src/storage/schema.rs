//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Storefront-Sync database.
//! Every catalog table carries a `UNIQUE(site_id, remote_id)` natural key.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per configured storefront
CREATE TABLE IF NOT EXISTS sites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    consumer_key TEXT NOT NULL,
    consumer_secret TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id),
    remote_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    permalink TEXT NOT NULL,
    sku TEXT NOT NULL,
    price TEXT NOT NULL,
    regular_price TEXT NOT NULL,
    sale_price TEXT NOT NULL,
    description TEXT NOT NULL,
    short_description TEXT NOT NULL,
    weight TEXT NOT NULL,
    length TEXT NOT NULL,
    width TEXT NOT NULL,
    height TEXT NOT NULL,
    shipping_class TEXT NOT NULL,
    stock_quantity INTEGER,
    stock_status TEXT NOT NULL DEFAULT 'instock',
    manage_stock INTEGER NOT NULL DEFAULT 0,
    featured INTEGER NOT NULL DEFAULT 0,
    product_type TEXT NOT NULL DEFAULT 'simple',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(site_id, remote_id)
);

CREATE INDEX IF NOT EXISTS idx_products_sku ON products(sku);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id),
    remote_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    description TEXT NOT NULL,
    parent_remote_id INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(site_id, remote_id)
);

-- Product <-> category links, rewritten on every product save
CREATE TABLE IF NOT EXISTS product_categories (
    product_id INTEGER NOT NULL REFERENCES products(id),
    category_id INTEGER NOT NULL REFERENCES categories(id),
    PRIMARY KEY (product_id, category_id)
);

CREATE TABLE IF NOT EXISTS product_variations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id),
    product_id INTEGER NOT NULL REFERENCES products(id),
    remote_id INTEGER NOT NULL,
    sku TEXT NOT NULL,
    price TEXT NOT NULL,
    regular_price TEXT NOT NULL,
    sale_price TEXT NOT NULL,
    stock_quantity INTEGER,
    stock_status TEXT NOT NULL DEFAULT 'instock',
    weight TEXT NOT NULL,
    length TEXT NOT NULL,
    width TEXT NOT NULL,
    height TEXT NOT NULL,
    attributes TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(site_id, remote_id)
);

CREATE INDEX IF NOT EXISTS idx_variations_product ON product_variations(product_id);

CREATE TABLE IF NOT EXISTS shipping_zones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id),
    remote_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    zone_order INTEGER NOT NULL DEFAULT 0,
    locations TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(site_id, remote_id)
);

CREATE TABLE IF NOT EXISTS shipping_methods (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    zone_id INTEGER NOT NULL REFERENCES shipping_zones(id),
    instance_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    method_id TEXT NOT NULL,
    method_title TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    method_order INTEGER NOT NULL DEFAULT 0,
    settings TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(zone_id, instance_id)
);

CREATE TABLE IF NOT EXISTS shipping_classes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id),
    remote_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(site_id, remote_id)
);

-- Derived from method settings; replaced wholesale on every method save
CREATE TABLE IF NOT EXISTS shipping_class_rates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id),
    method_id INTEGER NOT NULL REFERENCES shipping_methods(id),
    class_remote_id INTEGER,
    cost TEXT NOT NULL,
    calc_type TEXT NOT NULL DEFAULT 'flat'
);

CREATE INDEX IF NOT EXISTS idx_class_rates_method ON shipping_class_rates(method_id);

-- One row per sync run
CREATE TABLE IF NOT EXISTS crawl_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id),
    started_at TEXT NOT NULL,
    completed_at TEXT,
    status TEXT NOT NULL,
    products_count INTEGER NOT NULL DEFAULT 0,
    categories_count INTEGER NOT NULL DEFAULT 0,
    variations_count INTEGER NOT NULL DEFAULT 0,
    zones_count INTEGER NOT NULL DEFAULT 0,
    classes_count INTEGER NOT NULL DEFAULT 0,
    pages_count INTEGER NOT NULL DEFAULT 0,
    failed_count INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    config_hash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawl_logs_site ON crawl_logs(site_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let tables = vec![
            "sites",
            "products",
            "categories",
            "product_categories",
            "product_variations",
            "shipping_zones",
            "shipping_methods",
            "shipping_classes",
            "shipping_class_rates",
            "crawl_logs",
        ];

        for table in tables {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_natural_key_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO sites (name, url, consumer_key, consumer_secret, created_at, updated_at)
             VALUES ('s', 'https://s.example.com', 'k', 'c', 'now', 'now')",
            [],
        )
        .unwrap();

        let insert = "INSERT INTO categories (site_id, remote_id, name, slug, description, created_at, updated_at)
                      VALUES (1, 9, 'A', 'a', '', 'now', 'now')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
