//! Database operations for the `sync_jobs` table.
//!
//! The single-flight guarantee lives here: [`claim_sync_job`] inserts a new
//! job only when no other job is in flight, and a partial unique index on
//! in-flight statuses closes the window between two simultaneous claims.
//! Status transitions are guarded UPDATEs that check `rows_affected`, so an
//! out-of-order transition surfaces as a typed error instead of silently
//! clobbering another writer.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `sync_jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncJobRow {
    pub id: i64,
    pub public_id: Uuid,
    /// What initiated the run: `api`, `scheduler`, or `cli`.
    pub trigger_source: String,
    /// `pending`, `running`, `completed`, or `failed`.
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processed_count: i32,
    /// Catalog size estimate, fixed when the job transitions to `running`.
    pub total_count: i32,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncJobRow {
    /// `true` while the job occupies the single-flight slot.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.status == "pending" || self.status == "running"
    }
}

/// Result of attempting to claim the single-flight sync slot.
#[derive(Debug)]
pub enum ClaimOutcome {
    /// This caller owns the new job and must drive it to completion.
    Claimed(SyncJobRow),
    /// Another job is already in flight; its row is returned unchanged.
    InFlight(SyncJobRow),
}

const JOB_COLUMNS: &str = "id, public_id, trigger_source, status, started_at, completed_at, \
     processed_count, total_count, error_detail, created_at, updated_at";

/// Atomically claims the sync slot: inserts a `pending` job only if no job
/// is currently `pending` or `running`.
///
/// Two concurrent claims cannot both win. The conditional insert loses to a
/// committed in-flight row, and the partial unique index rejects the second
/// of two simultaneous inserts - that unique-violation loser is folded into
/// [`ClaimOutcome::InFlight`] as well.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure, or [`DbError::NotFound`] in
/// the pathological case where the claim lost but no in-flight row can be
/// read back (the competing job finished in between - callers retry).
pub async fn claim_sync_job(
    pool: &PgPool,
    trigger_source: &str,
) -> Result<ClaimOutcome, DbError> {
    let public_id = Uuid::new_v4();

    let insert = sqlx::query_as::<_, SyncJobRow>(&format!(
        "INSERT INTO sync_jobs (public_id, trigger_source, status) \
         SELECT $1, $2, 'pending' \
         WHERE NOT EXISTS \
             (SELECT 1 FROM sync_jobs WHERE status IN ('pending', 'running')) \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(public_id)
    .bind(trigger_source)
    .fetch_optional(pool)
    .await;

    match insert {
        Ok(Some(row)) => Ok(ClaimOutcome::Claimed(row)),
        Ok(None) => in_flight_job(pool).await,
        Err(e) if is_unique_violation(&e) => in_flight_job(pool).await,
        Err(e) => Err(e.into()),
    }
}

async fn in_flight_job(pool: &PgPool) -> Result<ClaimOutcome, DbError> {
    let row = sqlx::query_as::<_, SyncJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM sync_jobs \
         WHERE status IN ('pending', 'running') \
         ORDER BY created_at DESC, id DESC \
         LIMIT 1"
    ))
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(ClaimOutcome::InFlight(row))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Transitions a claimed job from `pending` to `running`, fixing
/// `total_count` and stamping `started_at`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncJobTransition`] if the job is not
/// `pending`, or [`DbError::Sqlx`] if the update fails.
pub async fn start_sync_job(pool: &PgPool, id: i64, total_count: i32) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_jobs \
         SET status = 'running', started_at = NOW(), total_count = $1, updated_at = NOW() \
         WHERE id = $2 AND status = 'pending'",
    )
    .bind(total_count)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncJobTransition {
            id,
            expected_status: "pending",
        });
    }

    Ok(())
}

/// Records page-level progress on a running job.
///
/// Returns `false` when the job is no longer `running` - the signal the
/// drive loop uses to notice an abort between pages. Not an error: the
/// caller decides whether a vanished run is fatal.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn record_sync_progress(
    pool: &PgPool,
    id: i64,
    processed_count: i32,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE sync_jobs \
         SET processed_count = $1, updated_at = NOW() \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(processed_count)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Marks a running job `completed`, stamping `completed_at` and the final
/// processed count.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncJobTransition`] if the job is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_sync_job(
    pool: &PgPool,
    id: i64,
    processed_count: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_jobs \
         SET status = 'completed', completed_at = NOW(), processed_count = $1, \
             updated_at = NOW() \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(processed_count)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncJobTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks an in-flight job `failed` with the error detail.
///
/// Accepts both `pending` and `running` so a job that never fetched its
/// first page still gets a terminal state.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncJobTransition`] if the job is already
/// terminal, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_sync_job(pool: &PgPool, id: i64, error_detail: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_jobs \
         SET status = 'failed', completed_at = NOW(), error_detail = $1, updated_at = NOW() \
         WHERE id = $2 AND status IN ('pending', 'running')",
    )
    .bind(error_detail)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncJobTransition {
            id,
            expected_status: "pending or running",
        });
    }

    Ok(())
}

/// Aborts whichever job currently holds the running slot, if any.
///
/// Returns the aborted job, or `None` when nothing was running. The drive
/// loop notices the flip on its next progress write and stops; upserts
/// already applied stay applied.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn abort_running_sync_job(
    pool: &PgPool,
    reason: &str,
) -> Result<Option<SyncJobRow>, DbError> {
    let row = sqlx::query_as::<_, SyncJobRow>(&format!(
        "UPDATE sync_jobs \
         SET status = 'failed', completed_at = NOW(), error_detail = $1, updated_at = NOW() \
         WHERE status = 'running' \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(reason)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Fetches a single job by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_sync_job(pool: &PgPool, id: i64) -> Result<SyncJobRow, DbError> {
    sqlx::query_as::<_, SyncJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM sync_jobs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// The most recent job by creation order, in-flight or terminal.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_sync_job(pool: &PgPool) -> Result<Option<SyncJobRow>, DbError> {
    let row = sqlx::query_as::<_, SyncJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM sync_jobs \
         ORDER BY created_at DESC, id DESC \
         LIMIT 1"
    ))
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// The most recently completed job, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn last_completed_sync_job(pool: &PgPool) -> Result<Option<SyncJobRow>, DbError> {
    let row = sqlx::query_as::<_, SyncJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM sync_jobs \
         WHERE status = 'completed' \
         ORDER BY completed_at DESC, id DESC \
         LIMIT 1"
    ))
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the most recent `limit` jobs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_jobs(pool: &PgPool, limit: i64) -> Result<Vec<SyncJobRow>, DbError> {
    let rows = sqlx::query_as::<_, SyncJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM sync_jobs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
