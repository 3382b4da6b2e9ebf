//! Integration tests for the catalog sync
//!
//! These tests use wiremock to stand in for a WooCommerce REST API and test
//! pagination, retry and the full sync cycle end-to-end.

use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use storefront_sync::config::{
    Config, CrawlerConfig, DatabaseConfig, SiteConfig, VectorConfig,
};
use storefront_sync::crawler::{
    run_sync, CatalogClient, Coordinator, SyncOptions, TOTAL_PAGES_HEADER,
};
use storefront_sync::storage::{CrawlStatus, EntityKind, SqliteStorage, Storage};
use storefront_sync::vector::{
    collection_name, HashingEmbedder, SqliteVectorIndex, VectorIndex, PAGES_COLLECTION,
    PRODUCTS_COLLECTION,
};
use storefront_sync::SyncError;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API: &str = "/wp-json/wc/v3";

fn site(url: &str) -> SiteConfig {
    SiteConfig {
        name: "store1".to_string(),
        url: url.to_string(),
        consumer_key: "ck_test".to_string(),
        consumer_secret: "cs_test".to_string(),
    }
}

/// Fast retries and no pacing
fn crawler_config() -> CrawlerConfig {
    CrawlerConfig {
        delay_seconds: 0,
        timeout_seconds: 5,
        max_attempts: 3,
        retry_base_delay_ms: 10,
        retry_max_delay_ms: 20,
        ..Default::default()
    }
}

fn products_page(start: i64, count: i64) -> Value {
    Value::Array(
        (start..start + count)
            .map(|id| json!({"id": id, "name": format!("Product {}", id), "price": "9.99"}))
            .collect(),
    )
}

#[tokio::test]
async fn test_pagination_collects_every_page() {
    let server = MockServer::start().await;

    for (page, start, count) in [("1", 1, 100), ("2", 101, 100), ("3", 201, 37)] {
        Mock::given(method("GET"))
            .and(path(format!("{}/products", API)))
            .and(query_param("page", page))
            .and(query_param("per_page", "100"))
            .and(query_param("status", "publish"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(TOTAL_PAGES_HEADER, "3")
                    .set_body_json(products_page(start, count)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = CatalogClient::new(&site(&server.uri()), &crawler_config()).unwrap();
    let products = client.get_all_products().await;

    assert_eq!(products.len(), 237);
    assert_eq!(products[0]["id"], 1);
    assert_eq!(products[236]["id"], 237);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_empty_page_ends_collection() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/products/categories", API)))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(TOTAL_PAGES_HEADER, "5")
                .set_body_json(json!([{"id": 1, "name": "Lamps"}])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/products/categories", API)))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = CatalogClient::new(&site(&server.uri()), &crawler_config()).unwrap();
    assert_eq!(client.get_all_categories().await.len(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;

    // First attempt outlives the client timeout
    Mock::given(method("GET"))
        .and(path(format!("{}/products", API)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(products_page(1, 2)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/products", API)))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_page(1, 2)))
        .mount(&server)
        .await;

    let crawler = CrawlerConfig {
        timeout_seconds: 1,
        ..crawler_config()
    };
    let client = CatalogClient::new(&site(&server.uri()), &crawler).unwrap();
    let products = client.get_all_products().await;

    assert_eq!(products.len(), 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_http_error_ends_collection_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/products/shipping_classes", API)))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid consumer key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = CatalogClient::new(&site(&server.uri()), &crawler_config()).unwrap();
    assert!(client.get_shipping_classes().await.is_empty());
}

#[tokio::test]
async fn test_product_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/products/10", API)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 10, "name": "Desk Lamp"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/products/12", API)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 12}])))
        .mount(&server)
        .await;

    let client = CatalogClient::new(&site(&server.uri()), &crawler_config()).unwrap();

    let product = client.get_product_by_id(10).await.unwrap();
    assert_eq!(product["name"], "Desk Lamp");

    assert!(client.get_product_by_id(12).await.is_none());
}

#[tokio::test]
async fn test_missing_product_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/products/404", API)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "woocommerce_rest_product_invalid_id",
            "message": "Invalid ID."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CatalogClient::new(&site(&server.uri()), &crawler_config()).unwrap();
    assert!(client.get_product_by_id(404).await.is_none());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

/// Mounts a small but complete storefront
async fn mount_storefront(server: &MockServer) {
    let base = server.uri();

    let routes: Vec<(String, Value)> = vec![
        (
            "/products/categories".to_string(),
            json!([{"id": 5, "name": "Lamps", "slug": "lamps", "description": "", "parent": 0}]),
        ),
        (
            "/products".to_string(),
            json!([
                {
                    "id": 10,
                    "name": "Desk Lamp",
                    "slug": "desk-lamp",
                    "type": "simple",
                    "sku": "DL-1",
                    "price": "25.00",
                    "stock_status": "instock",
                    "categories": [{"id": 5, "name": "Lamps"}],
                    "tags": [{"id": 1, "name": "office"}]
                },
                {
                    "id": 11,
                    "name": "Floor Lamp",
                    "slug": "floor-lamp",
                    "type": "variable",
                    "price": "80.00",
                    "categories": [{"id": 5, "name": "Lamps"}]
                }
            ]),
        ),
        (
            "/products/11/variations".to_string(),
            json!([
                {"id": 111, "sku": "FL-BLK", "price": "80.00",
                 "attributes": [{"name": "Color", "option": "Black"}]},
                {"id": 112, "sku": "FL-WHT", "price": "85.00",
                 "attributes": [{"name": "Color", "option": "White"}]}
            ]),
        ),
        (
            "/shipping/zones".to_string(),
            json!([{"id": 1, "name": "UK", "order": 0}]),
        ),
        (
            "/shipping/zones/1/methods".to_string(),
            json!([{
                "instance_id": 3,
                "title": "Flat rate",
                "order": 1,
                "enabled": true,
                "method_id": "flat_rate",
                "method_title": "Flat rate",
                "settings": {
                    "class_cost_7": {"id": "class_cost_7", "value": "5.00"},
                    "class_calc_7": "flat",
                    "no_class_cost": {"value": "2.00"}
                }
            }]),
        ),
        (
            "/shipping/zones/1/locations".to_string(),
            json!([{"code": "GB", "type": "country", "_links": {}}]),
        ),
        (
            "/products/shipping_classes".to_string(),
            json!([{"id": 7, "name": "Bulky", "slug": "bulky", "description": ""}]),
        ),
    ];

    for (resource, body) in routes {
        Mock::given(method("GET"))
            .and(path(format!("{}{}", API, resource)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <url><loc>{base}/product/desk-lamp/</loc><priority>0.8</priority></url>
            <url><loc>{base}/about/</loc></url>
            <url><loc>{base}/</loc></url>
        </urlset>"#
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(
                    "<html><head><title>About us</title></head>\
                     <body><p>Family run lamp shop.</p><script>track()</script></body></html>",
                ),
        )
        .mount(server)
        .await;
}

fn test_config(server: &MockServer, dir: &TempDir) -> Config {
    Config {
        crawler: CrawlerConfig {
            index_pages: true,
            ..crawler_config()
        },
        database: DatabaseConfig {
            fallback_path: dir.path().join("products.db").display().to_string(),
            ..Default::default()
        },
        vector: VectorConfig {
            persist_directory: dir.path().join("vectors").display().to_string(),
            ..Default::default()
        },
        sites: vec![site(&server.uri())],
    }
}

#[tokio::test]
async fn test_full_sync_is_idempotent() {
    let server = MockServer::start().await;
    mount_storefront(&server).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    let summary = run_sync(&config, "hash-1", &SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.status, CrawlStatus::Completed);
    assert_eq!(summary.error, None);
    assert_eq!(summary.categories.saved, 1);
    assert_eq!(summary.products.saved, 2);
    assert_eq!(summary.variations.saved, 2);
    assert_eq!(summary.shipping.zones.saved, 1);
    assert_eq!(summary.shipping.methods.saved, 1);
    assert_eq!(summary.shipping.classes.saved, 1);
    assert_eq!(summary.pages.saved, 1);
    assert_eq!(summary.counts().failed, 0);

    let sitemap = summary.sitemap.as_ref().unwrap();
    assert_eq!(sitemap.products.len(), 1);
    assert_eq!(sitemap.pages.len(), 1);
    assert_eq!(sitemap.other.len(), 1);

    // Second run over unchanged data
    let second = run_sync(&config, "hash-1", &SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(second.status, CrawlStatus::Completed);
    assert_eq!(second.products.saved, 2);

    let storage = SqliteStorage::new(&dir.path().join("products.db")).unwrap();
    let site_id = summary.site_id;
    assert_eq!(second.site_id, site_id);
    assert_eq!(storage.count_entities(site_id, EntityKind::Product).unwrap(), 2);
    assert_eq!(storage.count_entities(site_id, EntityKind::Variation).unwrap(), 2);
    assert_eq!(storage.count_entities(site_id, EntityKind::Category).unwrap(), 1);
    assert_eq!(storage.count_entities(site_id, EntityKind::ShippingMethod).unwrap(), 1);
    assert_eq!(storage.count_entities(site_id, EntityKind::ClassRate).unwrap(), 2);

    let lamp = storage.get_product(site_id, 10).unwrap().unwrap();
    assert_eq!(lamp.price, "25.00");
    let lamp_row = storage.product_row_id(site_id, 10).unwrap().unwrap();
    assert_eq!(storage.product_category_ids(lamp_row).unwrap().len(), 1);

    let zone = storage.get_shipping_zone(site_id, 1).unwrap().unwrap();
    assert_eq!(zone.locations, r#"[{"code":"GB","type":"country"}]"#);

    let runs = storage.recent_crawl_logs(site_id, 10).unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.status == CrawlStatus::Completed));
    assert!(runs.iter().all(|r| r.config_hash == "hash-1"));
    assert_eq!(runs[0].counts.products, 2);

    let index = SqliteVectorIndex::open(
        Path::new(&config.vector.persist_directory),
        Box::new(HashingEmbedder::new(config.vector.dimension)),
    )
    .unwrap();
    let products = collection_name(PRODUCTS_COLLECTION, site_id, true);
    let pages = collection_name(PAGES_COLLECTION, site_id, true);
    assert_eq!(index.count(&products).unwrap(), 2);
    assert_eq!(index.count(&pages).unwrap(), 1);

    let hits = index.query(&products, "Desk Lamp DL-1", 1).unwrap();
    assert_eq!(hits[0].metadata["product_id"], "10");
}

#[tokio::test]
async fn test_price_change_updates_in_place() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server, &dir);
    config.crawler.sitemap = false;
    config.crawler.index_pages = false;

    Mock::given(method("GET"))
        .and(path(format!("{}/products", API)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 10, "name": "Desk Lamp", "price": "25.00"}])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/products", API)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 10, "name": "Desk Lamp", "price": "19.00"}])),
        )
        .mount(&server)
        .await;

    run_sync(&config, "h", &SyncOptions::default()).await.unwrap();
    let summary = run_sync(&config, "h", &SyncOptions::default()).await.unwrap();
    assert!(summary.sitemap.is_none());

    let storage = SqliteStorage::new(&dir.path().join("products.db")).unwrap();
    assert_eq!(
        storage
            .count_entities(summary.site_id, EntityKind::Product)
            .unwrap(),
        1
    );
    let lamp = storage.get_product(summary.site_id, 10).unwrap().unwrap();
    assert_eq!(lamp.price, "19.00");
}

#[tokio::test]
async fn test_unknown_site_lists_available_names() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    let options = SyncOptions {
        site_name: Some("missing".to_string()),
        ..Default::default()
    };
    let err = run_sync(&config, "h", &options).await.err().unwrap();

    match err {
        SyncError::Config(e) => {
            assert_eq!(e.available_sites().unwrap(), &["store1".to_string()]);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_string_product_ids_get_variations() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server, &dir);
    config.crawler.sitemap = false;
    config.crawler.index_pages = false;

    Mock::given(method("GET"))
        .and(path(format!("{}/products", API)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "11", "name": "Floor Lamp", "type": "variable", "price": "80.00"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/products/11/variations", API)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 111, "sku": "FL-BLK", "price": "80.00"},
            {"id": 112, "sku": "FL-WHT", "price": "85.00"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let summary = run_sync(&config, "h", &SyncOptions::default()).await.unwrap();
    assert_eq!(summary.products.saved, 1);
    assert_eq!(summary.variations.saved, 2);
}

#[tokio::test]
async fn test_failed_run_is_recorded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server, &dir);
    config.crawler.sitemap = false;
    config.crawler.index_pages = false;

    Mock::given(method("GET"))
        .and(path(format!("{}/products", API)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 11, "name": "Floor Lamp", "type": "variable", "price": "80.00"}
        ])))
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(&config, "h", None).unwrap();

    // Variation lookup needs the products table
    let db_path = dir.path().join("products.db");
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    conn.execute_batch("DROP TABLE products").unwrap();
    drop(conn);

    let summary = coordinator.run(None).await.unwrap();
    assert_eq!(summary.status, CrawlStatus::Failed);
    let message = summary.error.clone().unwrap();
    assert!(message.contains("products"));
    assert_eq!(summary.products.saved, 0);
    assert_eq!(summary.products.failed(), 1);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let runs = storage.recent_crawl_logs(summary.site_id, 10).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, CrawlStatus::Failed);
    assert_eq!(runs[0].error_message.as_deref(), Some(message.as_str()));
    assert!(runs[0].completed_at.is_some());
}
