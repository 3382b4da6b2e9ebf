//! Integration tests for sitemap discovery
//!
//! A wiremock server serves sitemap indexes and url sets; the tests walk
//! them through `SitemapSource` and bucket the results.

use storefront_sync::config::CrawlerConfig;
use storefront_sync::sitemap::{categorize, SitemapSource};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn crawler_config() -> CrawlerConfig {
    CrawlerConfig {
        delay_seconds: 0,
        max_attempts: 1,
        ..Default::default()
    }
}

fn source(server: &MockServer) -> SitemapSource {
    SitemapSource::with_client(reqwest::Client::new(), &server.uri(), &crawler_config())
}

async fn mount_xml(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/xml")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

fn url_set(locs: &[String]) -> String {
    let entries: String = locs
        .iter()
        .map(|loc| format!("<url><loc>{}</loc></url>", loc))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        entries
    )
}

fn index(children: &[String]) -> String {
    let entries: String = children
        .iter()
        .map(|loc| format!("<sitemap><loc>{}</loc></sitemap>", loc))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</sitemapindex>"#,
        entries
    )
}

#[tokio::test]
async fn test_index_with_two_children() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        index(&[
            format!("{}/product-sitemap.xml", base),
            format!("{}/post-sitemap.xml", base),
        ]),
    )
    .await;
    mount_xml(
        &server,
        "/product-sitemap.xml",
        url_set(&[format!("{}/product/widget", base)]),
    )
    .await;
    mount_xml(
        &server,
        "/post-sitemap.xml",
        url_set(&[format!("{}/blog/post-1", base)]),
    )
    .await;

    let urls = source(&server).parse(None).await.unwrap();
    assert_eq!(urls.len(), 2);
    assert_eq!(urls[0].url, format!("{}/product/widget", base));
    assert_eq!(urls[0].priority, "0.5");
    assert_eq!(urls[1].url, format!("{}/blog/post-1", base));

    let categorized = categorize(urls);
    assert_eq!(categorized.products.len(), 1);
    assert_eq!(categorized.posts.len(), 1);
    assert_eq!(categorized.total(), 2);
}

#[tokio::test]
async fn test_explicit_sitemap_url() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/custom.xml",
        url_set(&[format!("{}/about/", base), format!("{}/shop/", base)]),
    )
    .await;

    let explicit = format!("{}/custom.xml", base);
    let urls = source(&server).parse(Some(&explicit)).await.unwrap();
    assert_eq!(urls.len(), 2);

    let categorized = categorize(urls);
    assert_eq!(categorized.pages.len(), 1);
    assert_eq!(categorized.products.len(), 1);
}

#[tokio::test]
async fn test_malformed_child_contributes_nothing() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        index(&[
            format!("{}/broken.xml", base),
            format!("{}/missing.xml", base),
            format!("{}/good.xml", base),
        ]),
    )
    .await;
    mount_xml(
        &server,
        "/broken.xml",
        "<urlset><url><loc>oops</url></urlset>".to_string(),
    )
    .await;
    mount_xml(
        &server,
        "/good.xml",
        url_set(&[format!("{}/category/news/", base)]),
    )
    .await;

    let urls = source(&server).parse(None).await.unwrap();
    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].url, format!("{}/category/news/", base));
}

#[tokio::test]
async fn test_malformed_root_yields_empty() {
    let server = MockServer::start().await;
    mount_xml(&server, "/sitemap.xml", "this is not xml <<<".to_string()).await;

    let urls = source(&server).parse(None).await.unwrap();
    assert!(urls.is_empty());
}

#[tokio::test]
async fn test_missing_sitemap_yields_empty() {
    let server = MockServer::start().await;

    let urls = source(&server).parse(None).await.unwrap();
    assert!(urls.is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cycles_are_fetched_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    // The index lists itself and a child that points back at it
    mount_xml(
        &server,
        "/sitemap.xml",
        index(&[
            format!("{}/sitemap.xml", base),
            format!("{}/nested.xml", base),
        ]),
    )
    .await;
    mount_xml(
        &server,
        "/nested.xml",
        index(&[
            format!("{}/sitemap.xml", base),
            format!("{}/pages.xml", base),
        ]),
    )
    .await;
    mount_xml(
        &server,
        "/pages.xml",
        url_set(&[format!("{}/contact/", base)]),
    )
    .await;

    let urls = source(&server).parse(None).await.unwrap();
    assert_eq!(urls.len(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_nesting_beyond_limit_is_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    // sitemap.xml -> level1.xml -> level2.xml, with a depth limit of 1
    mount_xml(
        &server,
        "/sitemap.xml",
        index(&[format!("{}/level1.xml", base)]),
    )
    .await;
    mount_xml(
        &server,
        "/level1.xml",
        index(&[format!("{}/level2.xml", base)]),
    )
    .await;
    mount_xml(
        &server,
        "/level2.xml",
        url_set(&[format!("{}/product/deep", base)]),
    )
    .await;

    let crawler = CrawlerConfig {
        max_sitemap_depth: 1,
        ..crawler_config()
    };
    let source = SitemapSource::with_client(reqwest::Client::new(), &base, &crawler);

    let urls = source.parse(None).await.unwrap();
    assert!(urls.is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
