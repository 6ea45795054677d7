mod dashboard;
mod products;
mod scheduler_status;
mod sync_runs;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use shopdash_sync::SyncService;

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};
use crate::scheduler::SchedulerHandle;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub sync: SyncService,
    /// Absent in tests and in deployments that disable the recurring sync;
    /// the scheduler-status endpoint then reports no next run.
    pub scheduler: Option<SchedulerHandle>,
}

/// Stable error body: `{"error": {"code": ..., "message": ...}}`.
///
/// Success bodies are the exact shapes the dashboard UI consumes, so errors
/// are the only enveloped responses. Raw internal errors never reach the
/// client - handlers map them here with a stable code.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: &str, error: &shopdash_db::DbError) -> ApiError {
    tracing::error!(request_id, error = %error, "database query failed");
    ApiError::new("internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

fn api_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/products", get(products::list_products))
        .route("/api/dashboard/stats", get(dashboard::get_dashboard_stats))
        .route(
            "/api/scheduler/status",
            get(scheduler_status::get_scheduler_status),
        )
        .route(
            "/api/scheduler/shopify-sync-progress",
            get(scheduler_status::get_sync_progress),
        )
        .route("/api/sync/run", post(sync_runs::trigger_sync))
        .route("/api/sync/jobs", get(sync_runs::list_sync_jobs))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(api_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    match shopdash_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthData {
                status: "ok",
                database: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!(request_id = %req_id.0, error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthData {
                    status: "degraded",
                    database: "unavailable",
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{method as http_method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use shopdash_core::CatalogProduct;
    use shopdash_shopify::StoreClient;
    use shopdash_sync::SyncOptions;

    fn test_state(pool: sqlx::PgPool, shop_url: &str) -> AppState {
        let client =
            StoreClient::new(5, "shopdash-test/0.1", 0, 0).expect("build test StoreClient");
        let sync = SyncService::new(
            pool.clone(),
            Arc::new(client),
            SyncOptions {
                shop_url: shop_url.to_string(),
                page_size: 250,
                inter_request_delay_ms: 0,
            },
        );
        AppState {
            pool,
            sync,
            scheduler: None,
        }
    }

    fn test_app(pool: sqlx::PgPool, shop_url: &str) -> Router {
        build_app(test_state(pool, shop_url), default_rate_limit_state())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).expect("json parse");
        (status, json)
    }

    fn seed_product(external_id: &str, title: &str) -> CatalogProduct {
        CatalogProduct {
            external_id: external_id.to_string(),
            title: title.to_string(),
            vendor: Some("Acme Apparel".to_string()),
            product_type: Some("Shirts".to_string()),
            handle: Some("seeded".to_string()),
            price: Some("24.99".to_string()),
            inventory_count: 4,
        }
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_conflict_maps_to_409() {
        let response = ApiError::new("conflict", "sync already running").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn api_error_unknown_code_maps_to_500() {
        let response = ApiError::new("mystery", "??").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_reports_ok_with_live_database(pool: sqlx::PgPool) {
        let (status, json) = get_json(test_app(pool, "https://unused.test"), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["database"], "ok");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn products_endpoint_returns_camel_case_array(pool: sqlx::PgPool) {
        shopdash_db::upsert_product(&pool, &seed_product("101", "Organic Cotton Tee"))
            .await
            .expect("seed");

        let (status, json) = get_json(test_app(pool, "https://unused.test"), "/api/products").await;

        assert_eq!(status, StatusCode::OK);
        let items = json.as_array().expect("top-level array");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["externalId"], "101");
        assert_eq!(items[0]["title"], "Organic Cotton Tee");
        assert_eq!(items[0]["inventoryCount"], 4);
        assert_eq!(items[0]["active"], true);
        assert_eq!(items[0]["price"], "24.99");
        assert!(items[0].get("lastSyncedAt").is_some());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn dashboard_stats_counts_active_products(pool: sqlx::PgPool) {
        for (id, title) in [("1", "Tee"), ("2", "Tote"), ("3", "Mug")] {
            shopdash_db::upsert_product(&pool, &seed_product(id, title))
                .await
                .expect("seed");
        }

        let (status, json) =
            get_json(test_app(pool, "https://unused.test"), "/api/dashboard/stats").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["productCount"], 3);
        assert_eq!(json["syncedProducts"], 3);
        assert_eq!(json["syncInProgress"], false);
        assert!(json["lastSync"].is_null(), "no completed job yet");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn scheduler_status_without_scheduler_has_null_next_run(pool: sqlx::PgPool) {
        let (status, json) =
            get_json(test_app(pool, "https://unused.test"), "/api/scheduler/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["isRunning"], false);
        assert!(json["lastRun"].is_null());
        assert!(json["nextRun"].is_null());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn sync_progress_is_idle_zeroes_on_fresh_database(pool: sqlx::PgPool) {
        let (status, json) = get_json(
            test_app(pool, "https://unused.test"),
            "/api/scheduler/shopify-sync-progress",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["inProgress"], false);
        assert_eq!(json["completed"], 0);
        assert_eq!(json["total"], 0);
        assert!(json["lastUpdated"].is_null());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn trigger_sync_returns_202_with_job_id(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        Mock::given(http_method("GET"))
            .and(path("/products.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(&serde_json::json!({"products": []})),
            )
            .mount(&server)
            .await;

        let response = test_app(pool, &server.uri())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sync/run")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert!(json["jobId"].is_string(), "body should carry the job id");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn trigger_sync_conflicts_with_in_flight_job(pool: sqlx::PgPool) {
        let shopdash_db::ClaimOutcome::Claimed(held) =
            shopdash_db::claim_sync_job(&pool, "api").await.expect("claim")
        else {
            panic!("expected to claim the slot");
        };

        let response = test_app(pool, "https://unused.test")
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sync/run")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(
            json["jobId"].as_str(),
            Some(held.public_id.to_string().as_str()),
            "conflict body should name the in-flight job"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn sync_jobs_endpoint_lists_recent_jobs(pool: sqlx::PgPool) {
        let shopdash_db::ClaimOutcome::Claimed(job) =
            shopdash_db::claim_sync_job(&pool, "cli").await.expect("claim")
        else {
            panic!("expected to claim the slot");
        };
        shopdash_db::start_sync_job(&pool, job.id, 3).await.expect("start");
        shopdash_db::complete_sync_job(&pool, job.id, 3)
            .await
            .expect("complete");

        let (status, json) =
            get_json(test_app(pool, "https://unused.test"), "/api/sync/jobs").await;

        assert_eq!(status, StatusCode::OK);
        let items = json.as_array().expect("array body");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["status"], "completed");
        assert_eq!(items[0]["processedCount"], 3);
        assert_eq!(items[0]["triggerSource"], "cli");
    }
}
