//! Session-related types.
//!
//! Types stored in the session for authentication and checkout state.

use serde::{Deserialize, Serialize};

use clothify_core::{Email, UserId, UserRole};

/// Session-stored user identity.
///
/// Merged from the identity record and the stored profile at login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Name shown in the storefront header and payment prefill.
    pub display_name: String,
    /// Role from the profile (`user` when no profile exists).
    #[serde(default)]
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Session keys for storefront data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the serialized cart lines.
    pub const CART: &str = "clothify-cart";

    /// Key for the applied promo code state.
    pub const PROMO: &str = "checkout_promo";

    /// Key for a checkout awaiting the gateway callback.
    pub const PENDING_CHECKOUT: &str = "pending_checkout";
}
