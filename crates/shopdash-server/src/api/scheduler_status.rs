use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, AppState};

/// Body of `GET /api/scheduler/status`.
///
/// `isRunning` reflects an in-flight reconciliation pass (the scheduler
/// itself is always alive while the process is). `lastRun` is the start of
/// the most recent job regardless of outcome; `nextRun` is the next cron
/// tick, absent when the recurring job is disabled.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SchedulerStatusBody {
    is_running: bool,
    last_run: Option<DateTime<Utc>>,
    next_run: Option<DateTime<Utc>>,
}

/// Body of `GET /api/scheduler/shopify-sync-progress`.
///
/// `total` is a catalog size estimate fixed when the pass started; the
/// exact figure is only known once the pass completes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyncProgressBody {
    in_progress: bool,
    completed: i32,
    total: i32,
    last_updated: Option<DateTime<Utc>>,
}

pub(super) async fn get_scheduler_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<SchedulerStatusBody>, ApiError> {
    let latest = shopdash_db::latest_sync_job(&state.pool)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    let next_run = match &state.scheduler {
        Some(handle) => handle.next_run().await,
        None => None,
    };

    Ok(Json(SchedulerStatusBody {
        is_running: latest.as_ref().is_some_and(shopdash_db::SyncJobRow::is_in_flight),
        last_run: latest.and_then(|j| j.started_at),
        next_run,
    }))
}

pub(super) async fn get_sync_progress(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<SyncProgressBody>, ApiError> {
    let status = shopdash_sync::current_status(&state.pool)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(Json(SyncProgressBody {
        in_progress: status.in_progress,
        completed: status.processed,
        total: status.total,
        last_updated: status.last_updated,
    }))
}
