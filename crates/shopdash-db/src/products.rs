//! Database operations for the `products` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub source_product_id: String,
    pub title: String,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub handle: Option<String>,
    pub price: Option<Decimal>,
    pub inventory_count: i32,
    /// `FALSE` once a completed reconciliation pass no longer saw the
    /// product in the external catalog (soft delete).
    pub is_active: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PRODUCT_COLUMNS: &str = "id, source_product_id, title, vendor, product_type, handle, \
     price, inventory_count, is_active, last_synced_at, created_at, updated_at";

/// Upserts a product row by its external identifier.
///
/// Conflicts on `source_product_id` update the descriptive fields in place
/// and reactivate soft-deleted rows. `last_synced_at` advances via
/// `GREATEST(existing, NOW())` so the per-product timestamp never moves
/// backwards, even if two writers race.
///
/// The price string is bound as `TEXT` and cast to `NUMERIC(10,2)` inside
/// the statement so the database performs the coercion consistently.
///
/// Returns the internal `id` of the upserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_product(
    pool: &PgPool,
    product: &shopdash_core::CatalogProduct,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products \
             (source_product_id, title, vendor, product_type, handle, price, \
              inventory_count, is_active, last_synced_at) \
         VALUES ($1, $2, $3, $4, $5, $6::numeric(10,2), $7, TRUE, NOW()) \
         ON CONFLICT (source_product_id) DO UPDATE SET \
             title           = EXCLUDED.title, \
             vendor          = EXCLUDED.vendor, \
             product_type    = EXCLUDED.product_type, \
             handle          = EXCLUDED.handle, \
             price           = EXCLUDED.price, \
             inventory_count = EXCLUDED.inventory_count, \
             is_active       = TRUE, \
             last_synced_at  = GREATEST(products.last_synced_at, EXCLUDED.last_synced_at), \
             updated_at      = NOW() \
         RETURNING id",
    )
    .bind(&product.external_id)
    .bind(&product.title)
    .bind(&product.vendor)
    .bind(&product.product_type)
    .bind(&product.handle)
    .bind(&product.price)
    .bind(product.inventory_count)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Soft-deletes active products whose external identifier was NOT seen in
/// the current reconciliation pass.
///
/// An empty `seen_external_ids` slice deactivates every active product -
/// an empty external catalog is treated as authoritative.
///
/// Returns the number of rows deactivated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn deactivate_missing_products(
    pool: &PgPool,
    seen_external_ids: &[String],
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE products \
         SET is_active = FALSE, updated_at = NOW() \
         WHERE is_active AND NOT (source_product_id = ANY($1))",
    )
    .bind(seen_external_ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Fetches a single product by its external identifier.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_product(pool: &PgPool, source_product_id: &str) -> Result<ProductRow, DbError> {
    let query =
        format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE source_product_id = $1");

    sqlx::query_as::<_, ProductRow>(&query)
        .bind(source_product_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Returns up to `limit` products ordered by title, active rows first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(pool: &PgPool, limit: i64) -> Result<Vec<ProductRow>, DbError> {
    let query = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         ORDER BY is_active DESC, title ASC, id ASC \
         LIMIT $1"
    );

    let rows = sqlx::query_as::<_, ProductRow>(&query)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Count of active (not soft-deleted) products.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_active_products(pool: &PgPool) -> Result<i64, DbError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active")
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Count of active products that have been through at least one sync pass.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_synced_products(pool: &PgPool) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM products WHERE is_active AND last_synced_at IS NOT NULL",
    )
    .fetch_one(pool)
    .await?;
    Ok(count)
}
