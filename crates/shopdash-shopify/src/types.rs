//! Shopify API response types for the public `products.json` endpoint.
//!
//! ## Observed shape notes
//!
//! ### `vendor` / `product_type`
//! Plain strings; either may be an empty string (`""`) rather than absent.
//! Empty strings are normalized to `None` in `normalize.rs`.
//!
//! ### `inventory_quantity`
//! Present on variants when the store exposes stock levels (authenticated
//! responses, and some storefronts with inventory tracking published).
//! Absent on most public endpoints - we model it as `Option<i64>` and fall
//! back to counting purchasable variants during normalization.
//!
//! ### `available` on variants
//! Boolean; `true` when the variant is purchasable. May be absent on older
//! stores. We default to `true` (optimistic) when missing.
//!
//! ### `position` on variants
//! Integer; `1` for the storefront-default variant. Always present in
//! observed responses but modeled as `Option<i32>` for safety. The default
//! variant's price becomes the product-level price.

use serde::Deserialize;

/// Top-level response from `GET /products.json`.
#[derive(Debug, Deserialize)]
pub struct ShopifyProductsResponse {
    pub products: Vec<ShopifyProduct>,
}

/// A single product from the store catalog.
#[derive(Debug, Deserialize)]
pub struct ShopifyProduct {
    /// Shopify numeric product ID (e.g., `6789012345678`).
    pub id: i64,

    /// Display name of the product.
    pub title: String,

    /// URL slug for the product page.
    pub handle: String,

    /// Vendor / brand name as configured in the store admin. May be an
    /// empty string.
    #[serde(default)]
    pub vendor: Option<String>,

    /// Product category string. May be empty - normalized to `None` when so.
    #[serde(default)]
    pub product_type: Option<String>,

    /// All purchasable variants for this product.
    pub variants: Vec<ShopifyVariant>,
}

/// A single purchasable variant of a [`ShopifyProduct`].
#[derive(Debug, Deserialize)]
pub struct ShopifyVariant {
    /// Shopify numeric variant ID.
    pub id: i64,

    /// Display title of the variant, e.g. `"Small / Black"` or `"Default Title"`.
    pub title: String,

    /// Current price as a decimal string (e.g., `"24.99"`). Never null.
    pub price: String,

    /// Units on hand, when the store exposes stock levels.
    #[serde(default)]
    pub inventory_quantity: Option<i64>,

    /// Whether this variant is currently available for purchase.
    /// Defaults to `true` when absent.
    #[serde(default = "default_available")]
    pub available: bool,

    /// 1-based position; `1` is the storefront-default variant.
    #[serde(default)]
    pub position: Option<i32>,
}

/// Default value for `ShopifyVariant::available` when the field is absent.
///
/// serde's `default = "..."` attribute expects a function path, so this
/// cannot be a `const`.
fn default_available() -> bool {
    true
}
