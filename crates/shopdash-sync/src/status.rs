//! Read-only status accessors over the sync job ledger and product counts.
//!
//! Everything here is a plain read: safe to call concurrently with an
//! in-flight reconciliation, and never blocked by one. The dashboard stats
//! are a point-in-time composition of two separate reads, so they are
//! eventually consistent rather than transactional across tables.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use shopdash_db::{DbError, SyncJobRow};

/// Snapshot of the most recent sync job, shaped for the polling UI.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub in_progress: bool,
    pub processed: i32,
    pub total: i32,
    pub last_updated: Option<DateTime<Utc>>,
}

impl SyncStatus {
    fn idle() -> Self {
        Self {
            in_progress: false,
            processed: 0,
            total: 0,
            last_updated: None,
        }
    }
}

/// Derived dashboard projection. Never persisted - recomputed on read.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub product_count: i64,
    pub synced_products: i64,
    pub last_sync: Option<DateTime<Utc>>,
    pub sync_in_progress: bool,
}

/// Status of the most recent sync job.
///
/// With no jobs on record, reports idle with zero counts.
///
/// # Errors
///
/// Returns [`DbError`] if the read fails.
pub async fn current_status(pool: &PgPool) -> Result<SyncStatus, DbError> {
    let Some(job) = shopdash_db::latest_sync_job(pool).await? else {
        return Ok(SyncStatus::idle());
    };

    Ok(SyncStatus {
        in_progress: job.is_in_flight(),
        processed: job.processed_count,
        total: job.total_count,
        last_updated: Some(job.updated_at),
    })
}

/// The most recently completed job, if any.
///
/// # Errors
///
/// Returns [`DbError`] if the read fails.
pub async fn last_completed_job(pool: &PgPool) -> Result<Option<SyncJobRow>, DbError> {
    shopdash_db::last_completed_sync_job(pool).await
}

/// Composes product counts with the current sync status for the dashboard
/// landing page.
///
/// # Errors
///
/// Returns [`DbError`] if any read fails.
pub async fn dashboard_stats(pool: &PgPool) -> Result<DashboardStats, DbError> {
    let product_count = shopdash_db::count_active_products(pool).await?;
    let synced_products = shopdash_db::count_synced_products(pool).await?;
    let last_sync = last_completed_job(pool).await?.and_then(|j| j.completed_at);
    let status = current_status(pool).await?;

    Ok(DashboardStats {
        product_count,
        synced_products,
        last_sync,
        sync_in_progress: status.in_progress,
    })
}
