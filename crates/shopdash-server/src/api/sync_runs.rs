use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shopdash_sync::{SyncError, TriggerOutcome};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, AppState};

/// Body of `POST /api/sync/run`, for both the 202 and 409 outcomes - a 409
/// carries the id of the job already holding the slot, so polling callers
/// converge on the same job either way.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TriggeredBody {
    job_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub(super) struct SyncJobsQuery {
    pub limit: Option<i64>,
}

/// Sync job projection for the dashboard's run-history view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyncJobItem {
    job_id: Uuid,
    trigger_source: String,
    status: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    processed_count: i32,
    total_count: i32,
    error_detail: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<shopdash_db::SyncJobRow> for SyncJobItem {
    fn from(row: shopdash_db::SyncJobRow) -> Self {
        Self {
            job_id: row.public_id,
            trigger_source: row.trigger_source,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            processed_count: row.processed_count,
            total_count: row.total_count,
            error_detail: row.error_detail,
            created_at: row.created_at,
        }
    }
}

pub(super) async fn trigger_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    match state.sync.trigger("api").await {
        Ok(TriggerOutcome::Started(job)) => Ok((
            StatusCode::ACCEPTED,
            Json(TriggeredBody {
                job_id: job.public_id,
            }),
        )),
        Ok(TriggerOutcome::AlreadyRunning(job)) => Ok((
            StatusCode::CONFLICT,
            Json(TriggeredBody {
                job_id: job.public_id,
            }),
        )),
        Err(SyncError::Persistence(e)) => Err(map_db_error(&req_id.0, &e)),
        Err(e) => {
            tracing::error!(request_id = %req_id.0, error = %e, "sync trigger failed");
            Err(ApiError::new("internal_error", "could not trigger sync"))
        }
    }
}

pub(super) async fn list_sync_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SyncJobsQuery>,
) -> Result<Json<Vec<SyncJobItem>>, ApiError> {
    let rows = shopdash_db::list_sync_jobs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(Json(rows.into_iter().map(SyncJobItem::from).collect()))
}
