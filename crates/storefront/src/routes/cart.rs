//! Cart route handlers.
//!
//! The cart lives in the session under the `clothify-cart` key. Every
//! response carries the full cart view so the client can re-render without a
//! second request.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use clothify_core::ProductId;

use crate::db::products::ProductRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::{CartView, Product};
use crate::services::cart::{AddOutcome, CartManager, SessionCartStore};
use crate::state::AppState;

/// Body for add/remove.
#[derive(Debug, Deserialize)]
pub struct CartItemRequest {
    pub product_id: String,
}

/// Body for quantity changes.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// Result of an add.
#[derive(Debug, Serialize)]
pub struct AddResponse {
    /// `added`, `incremented` or `capped`.
    pub outcome: &'static str,
    pub cart: CartView,
}

/// Load the session cart.
pub(crate) async fn load_cart(session: Session) -> CartManager<SessionCartStore> {
    CartManager::load(SessionCartStore::new(session)).await
}

async fn find_product(state: &AppState, id: &ProductId) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Current cart.
#[instrument(skip(session))]
pub async fn show(session: Session) -> Json<CartView> {
    Json(load_cart(session).await.view())
}

/// Add one unit of a product.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CartItemRequest>,
) -> Result<Json<AddResponse>> {
    let product = find_product(&state, &ProductId::new(body.product_id)).await?;
    let mut cart = load_cart(session).await;

    let outcome = match cart.add_to_cart(&product).await? {
        AddOutcome::Added => "added",
        AddOutcome::Incremented => "incremented",
        AddOutcome::Capped => "capped",
    };

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", product.id.as_str()), ("outcome", outcome)]),
    );

    Ok(Json(AddResponse {
        outcome,
        cart: cart.view(),
    }))
}

/// Set a line's quantity, clamped to `[1, stock]`.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>> {
    let id = ProductId::new(body.product_id);
    let mut cart = load_cart(session).await;

    let Some(line) = cart.line(&id) else {
        return Ok(Json(cart.view()));
    };
    let saved_stock = line.stock;

    // Prefer live stock; a deleted product keeps the ceiling from when it was added.
    let max = ProductRepository::new(state.pool())
        .get_by_id(&id)
        .await?
        .map_or(saved_stock, |p| p.quantity);

    cart.update_quantity(&id, body.quantity, max).await?;
    Ok(Json(cart.view()))
}

/// Remove a line.
#[instrument(skip(session))]
pub async fn remove(session: Session, Json(body): Json<CartItemRequest>) -> Result<Json<CartView>> {
    let id = ProductId::new(body.product_id);
    let mut cart = load_cart(session).await;
    cart.remove_from_cart(&id).await?;

    add_breadcrumb("cart", "Removed from cart", Some(&[("product_id", id.as_str())]));

    Ok(Json(cart.view()))
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<impl IntoResponse> {
    let mut cart = load_cart(session).await;
    cart.clear_cart().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Number of distinct lines, for the header badge.
#[instrument(skip(session))]
pub async fn count(session: Session) -> Json<serde_json::Value> {
    let cart = load_cart(session).await;
    Json(json!({ "count": cart.item_count() }))
}
