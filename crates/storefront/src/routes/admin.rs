//! Admin route handlers.
//!
//! Every handler requires the `admin` role. Product writes drop the cached
//! catalog so shoppers see the change on their next request.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{info, instrument};

use clothify_core::ProductId;

use crate::db::contacts::ContactRepository;
use crate::db::orders::OrderRepository;
use crate::db::products::ProductRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAdmin;
use crate::models::{ContactMessage, Order, Product, ProductInput};
use crate::state::AppState;

/// All products, straight from the database.
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn list_products(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool()).list_all().await?;
    Ok(Json(products))
}

/// Create a product.
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let input = input.validate().map_err(AppError::BadRequest)?;

    let product = ProductRepository::new(state.pool()).create(&input).await?;
    state.catalog().invalidate().await;

    info!(product_id = %product.id, "Product created");
    add_breadcrumb("admin", "Product created", Some(&[("product_id", product.id.as_str())]));

    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's fields.
#[instrument(skip_all, fields(admin = %admin.id, product_id = %id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    let input = input.validate().map_err(AppError::BadRequest)?;
    let id = ProductId::new(id);

    let product = ProductRepository::new(state.pool())
        .update(&id, &input)
        .await?;
    state.catalog().invalidate().await;

    info!("Product updated");

    Ok(Json(product))
}

/// Delete a product. Carts holding it keep their saved snapshot.
#[instrument(skip_all, fields(admin = %admin.id, product_id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = ProductId::new(id);

    if !ProductRepository::new(state.pool()).delete(&id).await? {
        return Err(AppError::NotFound(format!("product {id}")));
    }
    state.catalog().invalidate().await;

    info!("Product deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Every order, newest first.
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn list_orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(OrderRepository::new(state.pool()).list_all().await?))
}

/// Contact form submissions, newest first.
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn list_contacts(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<ContactMessage>>> {
    Ok(Json(ContactRepository::new(state.pool()).list_all().await?))
}
