//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Catalog
//! GET  /products               - Filtered, sorted, paginated listing
//! GET  /products/{id}          - Product detail
//! GET  /products/{id}/reviews  - Reviews, newest first
//! POST /products/{id}/reviews  - Post a review (signed in, rate limited)
//!
//! # Cart (session)
//! GET  /cart                   - Cart contents and totals
//! POST /cart/add               - Add one unit
//! POST /cart/update            - Set a line quantity
//! POST /cart/remove            - Remove a line
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Distinct line count
//!
//! # Wishlist (signed in)
//! GET  /wishlist               - Current entries
//! POST /wishlist/toggle        - Add or remove a product
//! GET  /wishlist/events        - Live updates (SSE)
//!
//! # Checkout (signed in, rate limited)
//! GET  /checkout               - Totals with promo applied
//! POST /checkout               - Start payment
//! POST /checkout/promo         - Apply promo code
//! POST /checkout/confirm       - Gateway success callback
//! POST /checkout/cancel        - Gateway dismissal or failure
//! POST /api/create-order       - Create a gateway order
//!
//! # Auth
//! POST /auth/register          - Create account (rate limited)
//! POST /auth/login             - Sign in (rate limited)
//! POST /auth/logout            - Sign out
//! GET  /auth/session           - Current identity
//!
//! # Account (signed in)
//! GET  /account/orders         - Order history
//!
//! # Admin (admin role)
//! GET  /admin/products         - Product list
//! POST /admin/products         - Create product
//! PUT  /admin/products/{id}    - Update product
//! DELETE /admin/products/{id}  - Delete product
//! GET  /admin/orders           - All orders
//! GET  /admin/contacts         - Contact messages
//!
//! # Contact
//! POST /contact                - Submit the contact form (rate limited)
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod contact;
pub mod health;
pub mod payments;
pub mod products;
pub mod wishlist;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter, payment_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route_layer(auth_rate_limiter());

    Router::new()
        .merge(limited)
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::current))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/reviews", get(products::reviews))
        .route(
            "/{id}/reviews",
            post(products::add_review).route_layer(api_rate_limiter()),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/toggle", post(wishlist::toggle))
        .route("/events", get(wishlist::events))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::begin))
        .route("/promo", post(checkout::apply_promo))
        .route("/confirm", post(checkout::confirm))
        .route("/cancel", post(checkout::cancel))
        .route_layer(payment_rate_limiter())
}

/// Create the gateway API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/create-order", post(payments::create_order))
        .route_layer(payment_rate_limiter())
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new().route("/orders", get(account::orders))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(admin::list_products).post(admin::create_product),
        )
        .route(
            "/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route("/orders", get(admin::list_orders))
        .route("/contacts", get(admin::list_contacts))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/checkout", checkout_routes())
        .nest("/api", api_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/admin", admin_routes())
        .route(
            "/contact",
            post(contact::submit).route_layer(api_rate_limiter()),
        )
}
