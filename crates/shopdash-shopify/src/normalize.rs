//! Normalization from raw Shopify types to [`shopdash_core::CatalogProduct`].
//!
//! The dashboard tracks products at one level, so variant detail collapses
//! here: the storefront-default variant contributes the price, and the
//! inventory count aggregates across variants.

use shopdash_core::CatalogProduct;

use crate::types::{ShopifyProduct, ShopifyVariant};

/// Normalizes a raw [`ShopifyProduct`] into a [`CatalogProduct`].
///
/// Price comes from the position-1 variant (the storefront default),
/// falling back to the first variant by index when no position data exists.
/// Products without variants normalize with no price and zero inventory -
/// the store can legitimately list such placeholders.
#[must_use]
pub fn normalize_product(product: ShopifyProduct) -> CatalogProduct {
    let price = default_variant(&product.variants).map(|v| v.price.clone());

    CatalogProduct {
        external_id: product.id.to_string(),
        title: product.title,
        vendor: product.vendor.filter(|s| !s.is_empty()),
        product_type: product.product_type.filter(|s| !s.is_empty()),
        handle: Some(product.handle),
        price,
        inventory_count: inventory_count(&product.variants),
    }
}

/// The storefront-default variant: position 1 when position data exists,
/// otherwise the first variant.
fn default_variant(variants: &[ShopifyVariant]) -> Option<&ShopifyVariant> {
    let has_position_data = variants.iter().any(|v| v.position.is_some());
    if has_position_data {
        variants
            .iter()
            .find(|v| v.position == Some(1))
            .or_else(|| variants.first())
    } else {
        variants.first()
    }
}

/// Aggregate units on hand.
///
/// When the store exposes `inventory_quantity` on any variant, sum the
/// exposed quantities (negative oversell values clamp to zero). Otherwise
/// fall back to counting purchasable variants, so `available: true` stores
/// still report non-zero stock.
fn inventory_count(variants: &[ShopifyVariant]) -> i32 {
    let has_quantities = variants.iter().any(|v| v.inventory_quantity.is_some());

    let total: i64 = if has_quantities {
        variants
            .iter()
            .filter_map(|v| v.inventory_quantity)
            .map(|q| q.max(0))
            .sum()
    } else {
        let available = variants.iter().filter(|v| v.available).count();
        i64::try_from(available).unwrap_or(i64::MAX)
    };

    i32::try_from(total).unwrap_or(i32::MAX)
}
