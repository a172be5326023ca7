//! Promo code management.
//!
//! ```bash
//! clothify-cli promo create -c SUMMER15 -p 15
//! clothify-cli promo deactivate -c SUMMER15
//! ```

use clothify_core::DiscountPercent;
use clothify_storefront::db::promo_codes::PromoCodeRepository;

use super::{CommandError, connect};

/// Create a code, or reactivate and reprice an existing one.
///
/// # Errors
///
/// Returns an error for a percent outside `0..=100` or a database failure.
pub async fn create(code: &str, percent: i64) -> Result<(), CommandError> {
    let percent =
        DiscountPercent::new(percent).map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    let pool = connect().await?;

    let promo = PromoCodeRepository::new(&pool).upsert(code, percent).await?;

    tracing::info!("Promo code {} active at {}% off", promo.code, promo.discount_percent.get());
    Ok(())
}

/// Stop a code from being accepted at checkout.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub async fn deactivate(code: &str) -> Result<(), CommandError> {
    let pool = connect().await?;

    if PromoCodeRepository::new(&pool).deactivate(code).await? {
        tracing::info!("Promo code {} deactivated", code.trim().to_uppercase());
    } else {
        tracing::warn!("No active promo code matches {}", code.trim().to_uppercase());
    }
    Ok(())
}
