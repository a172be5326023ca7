//! Wishlist repository.
//!
//! Every write fires the `wishlist_changed` notification (see the
//! `notify_wishlist_changed` trigger), which live subscribers listen on.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use clothify_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::WishlistEntry;

/// `LISTEN` channel carrying the id of the user whose wishlist changed.
pub const WISHLIST_CHANNEL: &str = "wishlist_changed";

#[derive(Debug, sqlx::FromRow)]
struct WishlistRow {
    product_id: String,
    name: String,
    price: Decimal,
    image: String,
    created_at: DateTime<Utc>,
}

impl From<WishlistRow> for WishlistEntry {
    fn from(row: WishlistRow) -> Self {
        Self {
            product_id: ProductId::new(row.product_id),
            name: row.name,
            price: row.price,
            image: row.image,
            created_at: row.created_at,
        }
    }
}

/// Repository for per-user wishlist rows.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All entries for a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, WishlistRow>(
            r"
            SELECT product_id, name, price, image, created_at
            FROM wishlist_items
            WHERE user_id = $1
            ORDER BY created_at, product_id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert an entry. A second insert for the same product is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, user_id: UserId, entry: &WishlistEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO wishlist_items (user_id, product_id, name, price, image, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, product_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(entry.product_id.as_str())
        .bind(&entry.name)
        .bind(entry.price)
        .bind(&entry.image)
        .bind(entry.created_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Remove an entry.
    ///
    /// # Returns
    ///
    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove(&self, user_id: UserId, product_id: &ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id.as_str())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
