//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Email/password accounts and the session identity
//! - `cart` - Session-persisted cart with stock ceilings
//! - `catalog` - Cached catalog plus the shop view filter engine
//! - `checkout` - Promo codes, gateway orders and payment confirmation
//! - `wishlist` - Per-user wishlist mirror with a live feed

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod wishlist;
