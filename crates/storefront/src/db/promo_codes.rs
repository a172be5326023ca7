//! Promo code repository.

use sqlx::PgPool;

use clothify_core::DiscountPercent;

use super::RepositoryError;
use crate::models::PromoCode;
use crate::models::promo::normalize_code;

#[derive(Debug, sqlx::FromRow)]
struct PromoCodeRow {
    code: String,
    discount_percent: i16,
    active: bool,
}

impl TryFrom<PromoCodeRow> for PromoCode {
    type Error = RepositoryError;

    fn try_from(row: PromoCodeRow) -> Result<Self, Self::Error> {
        let discount_percent = DiscountPercent::new(i64::from(row.discount_percent))
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            code: row.code,
            discount_percent,
            active: row.active,
        })
    }
}

/// Repository for promo codes.
pub struct PromoCodeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PromoCodeRepository<'a> {
    /// Create a new promo code repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up an active code. Input is trimmed and upper-cased first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_active(&self, raw_code: &str) -> Result<Option<PromoCode>, RepositoryError> {
        let code = normalize_code(raw_code);
        if code.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, PromoCodeRow>(
            "SELECT code, discount_percent, active FROM promo_codes WHERE code = $1 AND active",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a code, or reactivate and reprice an existing one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a blank code.
    pub async fn upsert(
        &self,
        raw_code: &str,
        discount_percent: DiscountPercent,
    ) -> Result<PromoCode, RepositoryError> {
        let code = normalize_code(raw_code);
        if code.is_empty() {
            return Err(RepositoryError::Conflict("promo code cannot be blank".to_string()));
        }

        let row = sqlx::query_as::<_, PromoCodeRow>(
            r"
            INSERT INTO promo_codes (code, discount_percent, active)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (code) DO UPDATE
                SET discount_percent = EXCLUDED.discount_percent, active = TRUE
            RETURNING code, discount_percent, active
            ",
        )
        .bind(code)
        .bind(i16::from(discount_percent.get()))
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Deactivate a code.
    ///
    /// # Returns
    ///
    /// Returns `true` if an active code was deactivated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn deactivate(&self, raw_code: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE promo_codes SET active = FALSE WHERE code = $1 AND active")
            .bind(normalize_code(raw_code))
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
