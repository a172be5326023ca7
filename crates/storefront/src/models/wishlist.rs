//! Wishlist entry type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clothify_core::ProductId;

use super::Product;

/// A liked product with the display fields captured at the time it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

impl WishlistEntry {
    /// Snapshot `product` for insertion.
    #[must_use]
    pub fn snapshot(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            created_at: Utc::now(),
        }
    }
}
