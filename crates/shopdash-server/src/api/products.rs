use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ProductsQuery {
    pub limit: Option<i64>,
}

/// Product projection for the dashboard's products table.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProductItem {
    id: i64,
    external_id: String,
    title: String,
    vendor: Option<String>,
    product_type: Option<String>,
    handle: Option<String>,
    price: Option<Decimal>,
    inventory_count: i32,
    active: bool,
    last_synced_at: Option<DateTime<Utc>>,
}

impl From<shopdash_db::ProductRow> for ProductItem {
    fn from(row: shopdash_db::ProductRow) -> Self {
        Self {
            id: row.id,
            external_id: row.source_product_id,
            title: row.title,
            vendor: row.vendor,
            product_type: row.product_type,
            handle: row.handle,
            price: row.price,
            inventory_count: row.inventory_count,
            active: row.is_active,
            last_synced_at: row.last_synced_at,
        }
    }
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<Vec<ProductItem>>, ApiError> {
    let rows = shopdash_db::list_products(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(Json(rows.into_iter().map(ProductItem::from).collect()))
}
