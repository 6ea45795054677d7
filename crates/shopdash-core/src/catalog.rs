use serde::{Deserialize, Serialize};

/// A product fetched from the external store, normalized for persistence
/// and diffing against the local catalog mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// Store-side numeric product ID, kept as a string to avoid precision loss.
    pub external_id: String,
    pub title: String,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    /// Storefront URL slug, e.g. `"organic-cotton-tee"`.
    pub handle: Option<String>,
    /// Price of the storefront-default variant as a decimal string, exactly
    /// as the store returns it (e.g. `"24.99"`). Persistence casts to
    /// `NUMERIC(10,2)` so the database performs the coercion consistently.
    pub price: Option<String>,
    /// Units on hand across all variants. Falls back to the number of
    /// purchasable variants when the store omits quantities.
    pub inventory_count: i32,
}

impl CatalogProduct {
    /// Returns `true` if at least one unit is available for purchase.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.inventory_count > 0
    }
}
