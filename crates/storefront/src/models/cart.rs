//! Cart line types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clothify_core::ProductId;

use super::Product;

/// One product in the cart with its denormalized display fields.
///
/// Serialized as `{id, name, price, image, stock, quantity}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
    /// Stock ceiling captured when the line was added.
    pub stock: u32,
    pub quantity: u32,
}

impl CartLine {
    /// A fresh line holding one unit of `product`.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            stock: product.quantity,
            quantity: 1,
        }
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A cart line as presented to the client.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub line_total: Decimal,
    /// The product has no stock at all.
    pub out_of_stock: bool,
    /// Incrementing further would exceed stock.
    pub max_reached: bool,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            line: line.clone(),
            line_total: line.line_total(),
            out_of_stock: line.stock == 0,
            max_reached: line.quantity >= line.stock,
        }
    }
}

/// The full cart view.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: usize,
    pub total_amount: Decimal,
}
