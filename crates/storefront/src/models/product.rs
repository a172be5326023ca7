//! Catalog product types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clothify_core::{Category, ProductId};

/// Stock assumed for a product record that omits `quantity`.
pub const DEFAULT_STOCK: u32 = 100;

const fn default_stock() -> u32 {
    DEFAULT_STOCK
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    /// Units available; the cart never holds more than this.
    #[serde(default = "default_stock")]
    pub quantity: u32,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Product {
    #[must_use]
    pub fn in_category(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}

/// Largest price the `NUMERIC(12, 2)` column holds.
const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Largest stock count the `INTEGER` column holds.
const MAX_QUANTITY: u32 = i32::MAX.unsigned_abs();

/// Admin create/update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub image: String,
    pub categories: Vec<Category>,
}

impl ProductInput {
    /// Check the admin form rules, returning a message for the first failure.
    ///
    /// Duplicate categories are collapsed and the exclusive-selection rule is
    /// enforced: `Kids` or `Accessories` must be the only category.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message describing the invalid field.
    pub fn validate(mut self) -> Result<Self, String> {
        self.name = self.name.trim().to_string();
        self.image = self.image.trim().to_string();

        if self.name.is_empty() {
            return Err("Product name is required".to_string());
        }
        if self.price.is_sign_negative() {
            return Err("Price cannot be negative".to_string());
        }
        if self.price > MAX_PRICE {
            return Err(format!("Price cannot exceed {MAX_PRICE}"));
        }
        if self.price.normalize().scale() > 2 {
            return Err("Price can have at most two decimal places".to_string());
        }
        if self.quantity > MAX_QUANTITY {
            return Err(format!("Quantity cannot exceed {MAX_QUANTITY}"));
        }

        self.categories.sort();
        self.categories.dedup();

        if self.categories.is_empty() {
            return Err("Select at least one category".to_string());
        }
        if self.categories.len() > 1 && self.categories.iter().any(Category::is_exclusive) {
            return Err("Kids and Accessories cannot be combined with other categories".to_string());
        }

        Ok(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(categories: Vec<Category>) -> ProductInput {
        ProductInput {
            name: "  Linen Shirt ".to_string(),
            price: Decimal::from(1299),
            quantity: 5,
            image: String::new(),
            categories,
        }
    }

    #[test]
    fn test_missing_quantity_defaults_to_100() {
        let product: Product =
            serde_json::from_str(r#"{"id":"p1","name":"Cap","price":"499"}"#).unwrap();
        assert_eq!(product.quantity, DEFAULT_STOCK);
        assert!(product.categories.is_empty());
        assert!(product.image.is_empty());
    }

    #[test]
    fn test_numeric_price_accepted() {
        let product: Product =
            serde_json::from_str(r#"{"id":"p1","name":"Cap","price":499.5,"quantity":0}"#)
                .unwrap();
        assert_eq!(product.price, Decimal::new(4995, 1));
        assert_eq!(product.quantity, 0);
    }

    #[test]
    fn test_validate_trims_name() {
        let valid = input(vec![Category::Men, Category::Women]).validate().unwrap();
        assert_eq!(valid.name, "Linen Shirt");
    }

    #[test]
    fn test_validate_rejects_mixed_exclusive() {
        assert!(input(vec![Category::Kids, Category::Men]).validate().is_err());
        assert!(input(vec![Category::Accessories]).validate().is_ok());
    }

    #[test]
    fn test_validate_price_fits_column() {
        let mut at_limit = input(vec![Category::Men]);
        at_limit.price = Decimal::new(999_999_999_999, 2);
        assert!(at_limit.validate().is_ok());

        let mut too_big = input(vec![Category::Men]);
        too_big.price = Decimal::new(1_000_000_000_000, 2);
        assert_eq!(
            too_big.validate().unwrap_err(),
            "Price cannot exceed 9999999999.99"
        );

        let mut fractional = input(vec![Category::Men]);
        fractional.price = Decimal::new(12_995, 3);
        assert!(fractional.validate().is_err());

        let mut trailing_zero = input(vec![Category::Men]);
        trailing_zero.price = Decimal::new(12_990, 3);
        assert!(trailing_zero.validate().is_ok());
    }

    #[test]
    fn test_validate_quantity_fits_column() {
        let mut at_limit = input(vec![Category::Men]);
        at_limit.quantity = 2_147_483_647;
        assert!(at_limit.validate().is_ok());

        let mut too_many = input(vec![Category::Men]);
        too_many.quantity = 2_147_483_648;
        assert_eq!(
            too_many.validate().unwrap_err(),
            "Quantity cannot exceed 2147483647"
        );
    }

    #[test]
    fn test_validate_requires_category_and_name() {
        assert!(input(vec![]).validate().is_err());
        let mut blank = input(vec![Category::Men]);
        blank.name = "   ".to_string();
        assert!(blank.validate().is_err());
    }
}
