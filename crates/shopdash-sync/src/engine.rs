//! The reconciliation engine.
//!
//! One pass aligns the local `products` table with the external catalog:
//! claim the single-flight slot, page through the store, upsert every item
//! by external id, then soft-delete whatever the pass did not see. Progress
//! lands on the job row after every page so the dashboard's polling reads
//! are always close to live.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use shopdash_db::{ClaimOutcome, SyncJobRow};
use shopdash_shopify::{normalize_product, StoreClient};

use crate::error::SyncError;

/// Upper bound on catalog pages per pass. Prevents infinite loops on
/// cycling cursors; each page may additionally be retried by the client.
const MAX_PAGES: usize = 200;

/// Per-pass knobs, split from [`StoreClient`] construction so the engine
/// can be built from an `AppConfig` in one call.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub shop_url: String,
    pub page_size: u32,
    pub inter_request_delay_ms: u64,
}

impl SyncOptions {
    #[must_use]
    pub fn from_app_config(config: &shopdash_core::AppConfig) -> Self {
        Self {
            shop_url: config.shop_url.clone(),
            page_size: config.page_size,
            inter_request_delay_ms: config.inter_request_delay_ms,
        }
    }
}

/// Outcome of a trigger request.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// A new job was claimed; the drive loop is running in the background.
    Started(SyncJobRow),
    /// Another job already holds the slot; its row is returned so every
    /// concurrent caller observes the same job id.
    AlreadyRunning(SyncJobRow),
}

/// Outcome of a blocking pass (CLI path).
#[derive(Debug)]
pub enum RunOutcome {
    /// The pass ran to a terminal state; the final job row is returned
    /// (status `completed`, or `failed` when the pass was aborted mid-run).
    Finished(SyncJobRow),
    /// Another job already holds the slot.
    AlreadyRunning(SyncJobRow),
}

/// The reconciliation engine. Sole writer of `products` and `sync_jobs`;
/// everything else in the system only reads them.
#[derive(Clone)]
pub struct SyncService {
    pool: PgPool,
    client: Arc<StoreClient>,
    options: SyncOptions,
}

impl SyncService {
    #[must_use]
    pub fn new(pool: PgPool, client: Arc<StoreClient>, options: SyncOptions) -> Self {
        Self {
            pool,
            client,
            options,
        }
    }

    /// Builds the engine and its store client from application config.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the HTTP client cannot be constructed.
    pub fn from_app_config(
        pool: PgPool,
        config: &shopdash_core::AppConfig,
    ) -> Result<Self, SyncError> {
        let client = StoreClient::new(
            config.fetch_timeout_secs,
            &config.user_agent,
            config.max_retries,
            config.retry_backoff_base_secs,
        )?;
        Ok(Self::new(
            pool,
            Arc::new(client),
            SyncOptions::from_app_config(config),
        ))
    }

    /// Triggers a reconciliation pass without waiting for it.
    ///
    /// Exactly one concurrent caller claims the slot and gets
    /// [`TriggerOutcome::Started`]; the drive loop is spawned onto the
    /// runtime. Everyone else gets [`TriggerOutcome::AlreadyRunning`] with
    /// the same in-flight job.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] if the claim itself fails.
    pub async fn trigger(&self, trigger_source: &str) -> Result<TriggerOutcome, SyncError> {
        match shopdash_db::claim_sync_job(&self.pool, trigger_source).await? {
            ClaimOutcome::InFlight(job) => {
                tracing::info!(
                    job_id = %job.public_id,
                    status = %job.status,
                    "sync already in flight, returning existing job"
                );
                Ok(TriggerOutcome::AlreadyRunning(job))
            }
            ClaimOutcome::Claimed(job) => {
                tracing::info!(
                    job_id = %job.public_id,
                    trigger_source,
                    "claimed sync job, starting reconciliation"
                );
                let engine = self.clone();
                let spawned = job.clone();
                tokio::spawn(async move {
                    if let Err(e) = engine.drive(&spawned).await {
                        tracing::error!(
                            job_id = %spawned.public_id,
                            error = %e,
                            "reconciliation pass failed"
                        );
                    }
                });
                Ok(TriggerOutcome::Started(job))
            }
        }
    }

    /// Runs one full reconciliation pass inline and returns the final job
    /// row. Used by the CLI; the server path goes through [`Self::trigger`].
    ///
    /// # Errors
    ///
    /// Returns the error that failed the pass; the job row is already
    /// marked `failed` with the same detail by the time this returns.
    pub async fn run_blocking(&self, trigger_source: &str) -> Result<RunOutcome, SyncError> {
        match shopdash_db::claim_sync_job(&self.pool, trigger_source).await? {
            ClaimOutcome::InFlight(job) => Ok(RunOutcome::AlreadyRunning(job)),
            ClaimOutcome::Claimed(job) => {
                self.drive(&job).await?;
                let finished = shopdash_db::get_sync_job(&self.pool, job.id).await?;
                Ok(RunOutcome::Finished(finished))
            }
        }
    }

    /// Aborts the running pass, if any, marking its job `failed`.
    ///
    /// The drive loop notices the flip on its next progress write and stops
    /// without rolling back upserts already applied.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] if the update fails.
    pub async fn abort(&self, reason: &str) -> Result<Option<SyncJobRow>, SyncError> {
        let aborted = shopdash_db::abort_running_sync_job(&self.pool, reason).await?;
        if let Some(job) = &aborted {
            tracing::warn!(job_id = %job.public_id, reason, "sync job aborted");
        }
        Ok(aborted)
    }

    /// Drives a claimed job to a terminal state.
    ///
    /// Every failure path marks the job `failed` (best effort) before the
    /// error propagates, so the job ledger never strands an in-flight row.
    async fn drive(&self, job: &SyncJobRow) -> Result<(), SyncError> {
        match self.reconcile(job).await {
            Ok(()) => Ok(()),
            Err(e) => {
                fail_job_best_effort(&self.pool, job.id, &e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn reconcile(&self, job: &SyncJobRow) -> Result<(), SyncError> {
        let shop_url = &self.options.shop_url;

        // The job stays `pending` until the first page fetch succeeds, so a
        // dead store never produces a half-started run.
        let first_page = self
            .client
            .fetch_products_page(shop_url, self.options.page_size, None)
            .await?;

        // The public catalog endpoint exposes no exact total. Fix the
        // estimate at the running transition: the last completed pass size
        // (active local products), clamped to at least the first page.
        let local_count = shopdash_db::count_active_products(&self.pool).await?;
        let total = clamp_to_i32(local_count.max(as_i64(first_page.products.len())));
        shopdash_db::start_sync_job(&self.pool, job.id, total).await?;

        let mut seen_external_ids: Vec<String> = Vec::new();
        let mut processed: i32 = 0;
        let mut page = first_page;
        let mut page_count = 0usize;

        loop {
            page_count += 1;
            if page_count > MAX_PAGES {
                return Err(SyncError::PageLimitExceeded {
                    max_pages: MAX_PAGES,
                });
            }

            processed = self.apply_page(page.products, &mut seen_external_ids, processed).await?;

            let still_running =
                shopdash_db::record_sync_progress(&self.pool, job.id, processed).await?;
            if !still_running {
                tracing::warn!(
                    job_id = %job.public_id,
                    processed,
                    "sync job no longer running, stopping without rollback"
                );
                return Ok(());
            }

            let Some(cursor) = page.next_cursor.take() else {
                break;
            };

            if self.options.inter_request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.options.inter_request_delay_ms))
                    .await;
            }

            page = self
                .client
                .fetch_products_page(shop_url, self.options.page_size, Some(&cursor))
                .await?;
        }

        // Reconciliation pass: whatever this run did not see is gone from
        // the store. An empty run is authoritative too - it deactivates the
        // whole local catalog.
        let deactivated =
            shopdash_db::deactivate_missing_products(&self.pool, &seen_external_ids).await?;

        shopdash_db::complete_sync_job(&self.pool, job.id, processed).await?;
        tracing::info!(
            job_id = %job.public_id,
            processed,
            deactivated,
            "reconciliation pass completed"
        );
        Ok(())
    }

    /// Upserts one page of catalog items. Within a run, a repeated external
    /// id (pagination overlap) simply upserts again: last write wins.
    async fn apply_page(
        &self,
        products: Vec<shopdash_shopify::ShopifyProduct>,
        seen_external_ids: &mut Vec<String>,
        mut processed: i32,
    ) -> Result<i32, SyncError> {
        for raw in products {
            let product = normalize_product(raw);
            shopdash_db::upsert_product(&self.pool, &product).await?;
            seen_external_ids.push(product.external_id);
            processed = processed.saturating_add(1);
        }
        Ok(processed)
    }
}

/// Marks the job failed, logging rather than propagating a second failure;
/// the original error is the one worth surfacing.
async fn fail_job_best_effort(pool: &PgPool, job_id: i64, detail: &str) {
    if let Err(e) = shopdash_db::fail_sync_job(pool, job_id, detail).await {
        tracing::error!(
            job_id,
            error = %e,
            "could not record sync job failure"
        );
    }
}

fn as_i64(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

fn clamp_to_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
