use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Network-level failure talking to the store (DNS, TLS, timeout, reset).
    #[error("upstream unavailable: {0}")]
    Upstream(#[from] reqwest::Error),

    /// HTTP 429 from the platform; the caller must back off before retrying.
    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("catalog endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid shop URL \"{shop_url}\": {reason}")]
    InvalidShopUrl { shop_url: String, reason: String },
}

impl StoreError {
    /// Returns `true` if the error is a transient condition worth retrying
    /// after a backoff delay: a 429 or a network-level failure. Everything
    /// else (404, unexpected status, parse failure) is permanent for the
    /// current request.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::RateLimited { .. } | StoreError::Upstream(_)
        )
    }
}
