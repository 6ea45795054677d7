//! Integration tests for `StoreClient::fetch_products_page`.
//!
//! Uses `wiremock` to stand up a local HTTP server for each test so no real
//! network traffic is made. Covers the happy paths (empty, single page,
//! cursor extraction) and each error variant the page fetch can produce.

use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shopdash_shopify::{StoreClient, StoreError};

/// A `StoreClient` suitable for tests: short timeout, no retries.
fn test_client() -> StoreClient {
    StoreClient::new(5, "shopdash-test/0.1", 0, 0).expect("failed to build test StoreClient")
}

/// A `StoreClient` with retries enabled and zero backoff for retry tests.
fn retrying_client(max_retries: u32) -> StoreClient {
    StoreClient::new(5, "shopdash-test/0.1", max_retries, 0)
        .expect("failed to build test StoreClient")
}

/// Minimal valid one-product catalog payload.
fn one_product_json(id: i64) -> serde_json::Value {
    json!({
        "products": [{
            "id": id,
            "title": "Test Product",
            "handle": "test-product",
            "vendor": "Test Vendor",
            "product_type": "Widgets",
            "variants": [{
                "id": id * 10,
                "title": "Default Title",
                "price": "12.99",
                "available": true,
                "position": 1
            }]
        }]
    })
}

#[tokio::test]
async fn empty_catalog_yields_empty_page_without_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"products": []})))
        .mount(&server)
        .await;

    let page = test_client()
        .fetch_products_page(&server.uri(), 250, None)
        .await
        .expect("fetch should succeed");

    assert!(page.products.is_empty());
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn single_page_returns_products_and_no_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&one_product_json(1)))
        .mount(&server)
        .await;

    let page = test_client()
        .fetch_products_page(&server.uri(), 250, None)
        .await
        .expect("fetch should succeed");

    assert_eq!(page.products.len(), 1);
    assert_eq!(page.products[0].id, 1);
    assert_eq!(page.products[0].variants.len(), 1);
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn link_header_cursor_is_surfaced_and_sent_on_next_fetch() {
    let server = MockServer::start().await;

    let next_link = format!(
        "<{base}/products.json?limit=250&page_info=cursor2>; rel=\"next\"",
        base = server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param_is_missing("page_info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(&one_product_json(1))
                .insert_header("Link", next_link.as_str()),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("page_info", "cursor2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&one_product_json(2)))
        .mount(&server)
        .await;

    let client = test_client();

    let first = client
        .fetch_products_page(&server.uri(), 250, None)
        .await
        .expect("first page");
    assert_eq!(first.next_cursor.as_deref(), Some("cursor2"));

    let second = client
        .fetch_products_page(&server.uri(), 250, first.next_cursor.as_deref())
        .await
        .expect("second page");
    assert_eq!(second.products[0].id, 2);
    assert!(second.next_cursor.is_none());
}

#[tokio::test]
async fn rate_limit_then_success_completes_within_retry_budget() {
    let server = MockServer::start().await;

    // Two 429s, then a clean 200 for every request after.
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&one_product_json(1)))
        .mount(&server)
        .await;

    let page = retrying_client(3)
        .fetch_products_page(&server.uri(), 250, None)
        .await
        .expect("retries should recover from 429s");

    assert_eq!(page.products.len(), 1);
}

#[tokio::test]
async fn rate_limit_exhaustion_surfaces_rate_limited_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .mount(&server)
        .await;

    let result = retrying_client(1)
        .fetch_products_page(&server.uri(), 250, None)
        .await;

    assert!(matches!(result, Err(StoreError::RateLimited { .. })));
}

#[tokio::test]
async fn missing_endpoint_is_not_found_and_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = retrying_client(3)
        .fetch_products_page(&server.uri(), 250, None)
        .await;

    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn forbidden_surfaces_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = test_client()
        .fetch_products_page(&server.uri(), 250, None)
        .await;

    assert!(
        matches!(result, Err(StoreError::UnexpectedStatus { status: 403, .. })),
        "expected UnexpectedStatus(403), got: {result:?}"
    );
}

#[tokio::test]
async fn malformed_body_surfaces_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let result = test_client()
        .fetch_products_page(&server.uri(), 250, None)
        .await;

    assert!(matches!(result, Err(StoreError::Deserialize { .. })));
}

#[tokio::test]
async fn requested_limit_is_forwarded_as_query_param() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"products": []})))
        .expect(1)
        .mount(&server)
        .await;

    test_client()
        .fetch_products_page(&server.uri(), 50, None)
        .await
        .expect("fetch should succeed");
}
