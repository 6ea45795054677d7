pub mod client;
pub mod error;
pub mod normalize;
pub mod pagination;
mod rate_limit;
pub mod types;

pub use client::{ProductPage, StoreClient};
pub use error::StoreError;
pub use normalize::normalize_product;
pub use types::{ShopifyProduct, ShopifyProductsResponse, ShopifyVariant};
