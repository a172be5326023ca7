//! Razorpay payment gateway integration.
//!
//! The gateway owns the payment itself; the storefront only creates gateway
//! orders and verifies the signed success callback.
//!
//! # Flow
//!
//! 1. Server creates an order (`POST {api_base}/orders`, HTTP basic auth)
//! 2. Browser opens the payment dialog with the returned order id
//! 3. Gateway calls back with `order_id`, `payment_id` and `signature`
//! 4. Server checks `hex(HMAC-SHA256(key_secret, "{order_id}|{payment_id}"))`

mod client;
mod error;
pub mod types;

pub use client::{GatewayLoader, RazorpayClient, verify_payment_signature};
pub use error::GatewayError;
pub use types::{CreateOrderRequest, GatewayOrder, PaymentCallback};
