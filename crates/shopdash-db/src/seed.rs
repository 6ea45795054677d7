//! Development fixtures for local dashboard work.

use sqlx::PgPool;

use crate::DbError;

/// A small fixture catalog so the dashboard has something to render before
/// the first real sync.
const DEMO_PRODUCTS: &[(&str, &str, &str, &str, &str, i32)] = &[
    ("9100000000001", "Organic Cotton Tee", "Acme Apparel", "Shirts", "24.99", 40),
    ("9100000000002", "Canvas Tote Bag", "Acme Apparel", "Bags", "18.00", 25),
    ("9100000000003", "Enamel Camp Mug", "Hearthware", "Drinkware", "16.50", 60),
    ("9100000000004", "Beeswax Candle Trio", "Hearthware", "Home", "32.00", 12),
];

/// Upsert the demo products into the database.
///
/// Returns the number of products processed. All upserts run inside a
/// single transaction; if any operation fails the entire batch is rolled
/// back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_demo_products(pool: &PgPool) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for (external_id, title, vendor, product_type, price, inventory) in DEMO_PRODUCTS {
        sqlx::query(
            "INSERT INTO products \
                 (source_product_id, title, vendor, product_type, handle, price, inventory_count) \
             VALUES ($1, $2, $3, $4, $5, $6::numeric(10,2), $7) \
             ON CONFLICT (source_product_id) DO UPDATE SET \
                 title           = EXCLUDED.title, \
                 vendor          = EXCLUDED.vendor, \
                 product_type    = EXCLUDED.product_type, \
                 price           = EXCLUDED.price, \
                 inventory_count = EXCLUDED.inventory_count, \
                 updated_at      = NOW()",
        )
        .bind(external_id)
        .bind(title)
        .bind(vendor)
        .bind(product_type)
        .bind(slugify(title))
        .bind(price)
        .bind(inventory)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}

fn slugify(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
