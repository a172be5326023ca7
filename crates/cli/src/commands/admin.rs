//! Admin role management.
//!
//! ```bash
//! clothify-cli admin grant -e owner@example.com
//! clothify-cli admin revoke -e owner@example.com
//! ```
//!
//! The account must already exist; register through the storefront first.

use clothify_core::{Email, UserRole};
use clothify_storefront::db::users::UserRepository;

use super::{CommandError, connect};

/// Set the role on an existing account's profile.
///
/// # Errors
///
/// Returns an error for an invalid email, an unknown account or a database
/// failure.
pub async fn set_role(email: &str, role: UserRole) -> Result<(), CommandError> {
    let email =
        Email::parse(email).map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    let pool = connect().await?;

    let profile = UserRepository::new(&pool).set_role(&email, role).await?;

    tracing::info!(
        "{} is now {} (user {})",
        email,
        profile.role.as_str(),
        profile.user_id
    );
    Ok(())
}
