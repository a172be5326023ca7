//! Product repository.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use clothify_core::{Category, ProductId};

use super::RepositoryError;
use crate::models::{Product, ProductInput};

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    price: Decimal,
    quantity: i32,
    image: String,
    categories: Vec<String>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative quantity {} for product {}",
                row.quantity, row.id
            ))
        })?;

        let categories = row
            .categories
            .iter()
            .filter_map(|raw| match raw.parse::<Category>() {
                Ok(category) => Some(category),
                Err(e) => {
                    tracing::warn!(product_id = %row.id, error = %e, "Ignoring unknown category");
                    None
                }
            })
            .collect();

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            price: row.price,
            quantity,
            image: row.image,
            categories,
        })
    }
}

const PRODUCT_COLUMNS: &str = "id::text AS id, name, price, quantity, image, categories";

/// Parse a product id; ids that are not UUIDs can never match a row.
pub(super) fn parse_id(id: &ProductId) -> Option<Uuid> {
    Uuid::parse_str(id.as_str()).ok()
}

fn category_names(categories: &[Category]) -> Vec<String> {
    categories.iter().map(ToString::to_string).collect()
}

fn quantity_param(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {quantity} is too large")))
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every product in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at, id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let Some(uuid) = parse_id(id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(uuid)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO products (name, price, quantity, image, categories)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&input.name)
        .bind(input.price)
        .bind(quantity_param(input.quantity)?)
        .bind(&input.image)
        .bind(category_names(&input.categories))
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    pub async fn update(
        &self,
        id: &ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let uuid = parse_id(id).ok_or(RepositoryError::NotFound)?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE products
            SET name = $2, price = $3, quantity = $4, image = $5, categories = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(uuid)
        .bind(&input.name)
        .bind(input.price)
        .bind(quantity_param(input.quantity)?)
        .bind(&input.image)
        .bind(category_names(&input.categories))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Delete a product.
    ///
    /// # Returns
    ///
    /// Returns `true` if the product was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        let Some(uuid) = parse_id(id) else {
            return Ok(false);
        };

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(uuid)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(quantity: i32, categories: &[&str]) -> ProductRow {
        ProductRow {
            id: "7b0e9b3c-1f5e-4c4b-9a49-3d1f0a2e6c11".to_string(),
            name: "Denim Jacket".to_string(),
            price: Decimal::from(2499),
            quantity,
            image: "https://cdn.example/denim.jpg".to_string(),
            categories: categories.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_row_conversion_skips_unknown_categories() {
        let product: Product = row(3, &["Men", "Shoes"]).try_into().unwrap();
        assert_eq!(product.categories, vec![Category::Men]);
        assert_eq!(product.quantity, 3);
    }

    #[test]
    fn test_row_conversion_rejects_negative_stock() {
        let result: Result<Product, _> = row(-1, &[]).try_into();
        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }

    #[test]
    fn test_non_uuid_ids_never_match() {
        assert!(parse_id(&ProductId::from("not-a-uuid")).is_none());
    }
}
