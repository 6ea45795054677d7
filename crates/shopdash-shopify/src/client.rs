//! HTTP client for the external store's public `products.json` endpoint.

use std::time::Duration;

use reqwest::Client;

use crate::error::StoreError;
use crate::pagination::next_page_cursor;
use crate::rate_limit::retry_with_backoff;
use crate::types::{ShopifyProduct, ShopifyProductsResponse};

/// One page of the external catalog plus the cursor for the page after it.
///
/// `next_cursor` is `None` on the last page.
#[derive(Debug)]
pub struct ProductPage {
    pub products: Vec<ShopifyProduct>,
    pub next_cursor: Option<String>,
}

/// HTTP client for the store's public `products.json` endpoint.
///
/// Handles rate limiting (429), not-found (404), and other non-2xx responses
/// as typed errors. Pagination cursors come from the `Link` response header;
/// callers drive the page loop themselves so they can record progress
/// between pages.
///
/// Transient errors (429, network failures) are retried with exponential
/// backoff and jitter up to `max_retries` additional attempts.
pub struct StoreClient {
    client: Client,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff.
    backoff_base_secs: u64,
}

impl StoreClient {
    /// Creates a `StoreClient` with configured timeout, `User-Agent`, and
    /// retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Upstream`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Fetches one page of products from the store catalog, with automatic
    /// retry on transient errors.
    ///
    /// Pass `page_info = None` for the first page; thereafter pass the
    /// `next_cursor` of the previous page until it comes back `None`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::RateLimited`] - HTTP 429 after all retries exhausted.
    /// - [`StoreError::NotFound`] - HTTP 404 (not retried).
    /// - [`StoreError::UnexpectedStatus`] - any other non-2xx status.
    /// - [`StoreError::Upstream`] - network failure after retries exhausted.
    /// - [`StoreError::Deserialize`] - body is not a valid catalog payload.
    pub async fn fetch_products_page(
        &self,
        shop_url: &str,
        limit: u32,
        page_info: Option<&str>,
    ) -> Result<ProductPage, StoreError> {
        let url = Self::products_url(shop_url, limit, page_info)?;

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            let shop_url = shop_url.to_owned();
            async move {
                let response = self
                    .client
                    .get(&url)
                    .header(
                        reqwest::header::ACCEPT,
                        "application/json,text/html;q=0.9,*/*;q=0.8",
                    )
                    .header(reqwest::header::CACHE_CONTROL, "no-cache")
                    .send()
                    .await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);

                    return Err(StoreError::RateLimited {
                        domain: store_domain(&shop_url),
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(StoreError::NotFound { url });
                }

                if !status.is_success() {
                    return Err(StoreError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                // Read the Link header before consuming the body.
                let link_header = response
                    .headers()
                    .get(reqwest::header::LINK)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);

                let body = response.text().await?;
                let parsed = serde_json::from_str::<ShopifyProductsResponse>(&body).map_err(
                    |e| StoreError::Deserialize {
                        context: format!("products page from {shop_url}"),
                        source: e,
                    },
                )?;

                Ok(ProductPage {
                    products: parsed.products,
                    next_cursor: next_page_cursor(link_header.as_deref()),
                })
            }
        })
        .await
    }

    /// Builds the `products.json` URL for the given shop, page size, and
    /// optional cursor.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidShopUrl`] if the configured shop URL
    /// cannot be parsed as a URL base.
    fn products_url(
        shop_url: &str,
        limit: u32,
        page_info: Option<&str>,
    ) -> Result<String, StoreError> {
        let origin = store_origin(shop_url);
        let base = format!("{origin}/products.json");
        let mut url = reqwest::Url::parse(&base).map_err(|e| StoreError::InvalidShopUrl {
            shop_url: shop_url.to_owned(),
            reason: format!("origin \"{origin}\" is not a valid URL base: {e}"),
        })?;

        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());

        if let Some(cursor) = page_info {
            url.query_pairs_mut().append_pair("page_info", cursor);
        }

        Ok(url.to_string())
    }
}

/// Extracts the scheme+host origin from a shop URL.
///
/// Given `"https://shop.example.com/collections/all"`, returns
/// `"https://shop.example.com"` so `products.json` is always fetched from
/// the store root, regardless of what path the configured URL carries.
fn store_origin(shop_url: &str) -> String {
    reqwest::Url::parse(shop_url).map_or_else(
        |e| {
            tracing::warn!(
                shop_url,
                error = %e,
                "could not parse shop URL, falling back to string split for origin extraction"
            );
            shop_url
                .trim_end_matches('/')
                .splitn(4, '/')
                .take(3)
                .collect::<Vec<_>>()
                .join("/")
        },
        |u| u.origin().ascii_serialization(),
    )
}

/// Extracts the hostname from a shop URL for use in error messages.
///
/// Falls back to the full URL string if parsing fails.
fn store_domain(shop_url: &str) -> String {
    reqwest::Url::parse(shop_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| shop_url.to_owned())
}
