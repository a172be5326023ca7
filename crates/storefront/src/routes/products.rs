//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::{info, instrument};

use clothify_core::ProductId;

use crate::db::products::ProductRepository;
use crate::db::reviews::ReviewRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{NewReview, Product, Review};
use crate::services::catalog::{CatalogPage, CatalogQuery};
use crate::state::AppState;

/// Shop view: filtered, sorted, paginated catalog.
///
/// Query parameters: `search`, `category`, `price_mode`, `min_price`,
/// `max_price`, `sort`, `page`, `page_size`.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CatalogPage>> {
    let page = state.catalog().search(state.pool(), &query).await?;
    Ok(Json(page))
}

/// Product detail, read fresh so stock is current.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    let id = ProductId::new(id);
    ProductRepository::new(state.pool())
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Reviews for a product, newest first.
#[instrument(skip(state))]
pub async fn reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Review>>> {
    let reviews = ReviewRepository::new(state.pool())
        .list_for_product(&ProductId::new(id))
        .await?;
    Ok(Json(reviews))
}

/// Post a review as the signed-in user.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn add_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Json(body): Json<NewReview>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = body.validate().map_err(AppError::BadRequest)?;
    let id = ProductId::new(id);

    let saved = ReviewRepository::new(state.pool())
        .create(&id, user.id, &user.email, &review)
        .await?;

    info!(review_id = %saved.id, rating = saved.rating, "Review posted");
    add_breadcrumb("reviews", "Review posted", Some(&[("product_id", id.as_str())]));

    Ok((StatusCode::CREATED, Json(saved)))
}
