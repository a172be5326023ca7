//! Review repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use clothify_core::{Email, ProductId, ReviewId, UserId};

use super::RepositoryError;
use super::products::parse_id;
use crate::models::{NewReview, Review};

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    product_id: String,
    user_email: String,
    comment: String,
    rating: i16,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let user_email = Email::parse(&row.user_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let rating = u8::try_from(row.rating).map_err(|_| {
            RepositoryError::DataCorruption(format!("rating {} out of range", row.rating))
        })?;

        Ok(Self {
            id: ReviewId::new(row.id),
            product_id: ProductId::new(row.product_id),
            user_email,
            comment: row.comment,
            rating,
            created_at: row.created_at,
        })
    }
}

const REVIEW_COLUMNS: &str = "id, product_id::text AS product_id, user_email, comment, rating, created_at";

/// Repository for product reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews for one product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let Some(uuid) = parse_id(product_id) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(uuid)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Store a validated review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, or
    /// `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        product_id: &ProductId,
        user_id: UserId,
        user_email: &Email,
        review: &NewReview,
    ) -> Result<Review, RepositoryError> {
        let uuid = parse_id(product_id).ok_or(RepositoryError::NotFound)?;

        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r"
            INSERT INTO reviews (product_id, user_id, user_email, comment, rating)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(uuid)
        .bind(user_id)
        .bind(user_email.as_str())
        .bind(&review.comment)
        .bind(i16::from(review.rating))
        .fetch_one(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RepositoryError::NotFound
            }
            other => RepositoryError::Database(other),
        })?;

        row.try_into()
    }
}
