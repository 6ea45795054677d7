use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, AppState};

/// Body of `GET /api/dashboard/stats` - the landing-page summary.
///
/// Composed from two independent reads (product counts and the sync job
/// ledger), so the pair is eventually consistent rather than a single
/// transactional snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DashboardStatsBody {
    product_count: i64,
    synced_products: i64,
    last_sync: Option<DateTime<Utc>>,
    sync_in_progress: bool,
}

pub(super) async fn get_dashboard_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<DashboardStatsBody>, ApiError> {
    let stats = shopdash_sync::dashboard_stats(&state.pool)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(Json(DashboardStatsBody {
        product_count: stats.product_count,
        synced_products: stats.synced_products,
        last_sync: stats.last_sync,
        sync_in_progress: stats.sync_in_progress,
    }))
}

#[cfg(test)]
mod tests {
    use super::DashboardStatsBody;

    #[test]
    fn stats_body_serializes_camel_case_with_null_last_sync() {
        let body = DashboardStatsBody {
            product_count: 3,
            synced_products: 2,
            last_sync: None,
            sync_in_progress: true,
        };

        let json = serde_json::to_value(&body).expect("serialize stats");
        assert_eq!(json["productCount"], 3);
        assert_eq!(json["syncedProducts"], 2);
        assert!(json["lastSync"].is_null());
        assert_eq!(json["syncInProgress"], true);
    }
}
