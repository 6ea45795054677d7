use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The external store could not be read (network, auth, throttling)
    /// after the client's retry budget was exhausted.
    #[error(transparent)]
    Store(#[from] shopdash_shopify::StoreError),

    /// A database write failed. Never retried: the job fails immediately
    /// and the error detail lands on the job row.
    #[error(transparent)]
    Persistence(#[from] shopdash_db::DbError),

    /// The page loop exceeded its safety bound, which indicates a cycling
    /// pagination cursor rather than a genuinely huge catalog.
    #[error("catalog pagination exceeded {max_pages} pages")]
    PageLimitExceeded { max_pages: usize },
}
