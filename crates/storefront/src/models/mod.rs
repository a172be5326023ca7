//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`].

pub mod cart;
pub mod contact;
pub mod order;
pub mod product;
pub mod promo;
pub mod review;
pub mod session;
pub mod user;
pub mod wishlist;

pub use cart::{CartLine, CartLineView, CartView};
pub use contact::{ContactMessage, NewContactMessage};
pub use order::{CustomerInfo, NewOrder, Order};
pub use product::{Product, ProductInput};
pub use promo::PromoCode;
pub use review::{NewReview, Review};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{User, UserProfile};
pub use wishlist::WishlistEntry;
