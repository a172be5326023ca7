//! Wishlist route handlers.
//!
//! Each request builds a [`WishlistManager`] for the signed-in user. The
//! event stream keeps its manager alive for the life of the connection and
//! ends when the session signs out.

use std::time::Duration;

use async_stream::stream;
use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_sessions::Session;
use tracing::{debug, instrument};

use clothify_core::{ProductId, UserId};

use crate::db::products::ProductRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::WishlistEntry;
use crate::services::wishlist::{
    PgWishlistStore, WishlistError, WishlistManager, WishlistStore,
};
use crate::state::AppState;

/// Body for toggling.
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub product_id: String,
}

/// Result of a toggle.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub product_id: ProductId,
    pub in_wishlist: bool,
    pub items: Vec<WishlistEntry>,
}

async fn manager_for(
    state: &AppState,
    user: Option<UserId>,
) -> Result<WishlistManager<PgWishlistStore>> {
    let mut manager = WishlistManager::new(state.wishlist_store());
    manager.set_user(user).await?;
    Ok(manager)
}

/// The signed-in user's wishlist.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<WishlistEntry>>> {
    let manager = manager_for(&state, Some(user.id)).await?;
    Ok(Json(manager.entries()))
}

/// Add or remove a product.
///
/// Signed-out visitors get 401 and nothing is written.
#[instrument(skip(state, user))]
pub async fn toggle(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>> {
    let Some(user) = user else {
        return Err(WishlistError::AuthenticationRequired.into());
    };
    let manager = manager_for(&state, Some(user.id)).await?;

    let id = ProductId::new(body.product_id);
    let product = ProductRepository::new(state.pool())
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let in_wishlist = manager.toggle(&product).await?;

    add_breadcrumb(
        "wishlist",
        if in_wishlist { "Added to wishlist" } else { "Removed from wishlist" },
        Some(&[("product_id", product.id.as_str())]),
    );

    Ok(Json(ToggleResponse {
        product_id: product.id,
        in_wishlist,
        items: manager.entries(),
    }))
}

/// Snapshots from `manager` until `session_id` signs out.
///
/// The manager moves into the stream so its feed lives as long as the
/// connection.
fn snapshot_stream<S: WishlistStore>(
    manager: WishlistManager<S>,
    mut logouts: broadcast::Receiver<String>,
    session_id: Option<String>,
) -> impl Stream<Item = std::result::Result<Event, axum::Error>> {
    let mut mirror = manager.subscribe();

    stream! {
        let _manager = manager;

        loop {
            let snapshot = mirror.borrow_and_update().entries().to_vec();
            yield Event::default().event("wishlist").json_data(snapshot);

            let keep_going = loop {
                tokio::select! {
                    changed = mirror.changed() => break changed.is_ok(),
                    logout = logouts.recv() => match logout {
                        Ok(id) if Some(&id) == session_id.as_ref() => break false,
                        Ok(_) | Err(RecvError::Lagged(_)) => {}
                        Err(RecvError::Closed) => break false,
                    },
                }
            };

            if !keep_going {
                debug!("Wishlist event stream closed");
                break;
            }
        }
    }
}

/// Server-sent wishlist snapshots.
///
/// Emits a `wishlist` event with the full entry list now and after every
/// change. The stream closes when this session logs out.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn events(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>> {
    let manager = manager_for(&state, Some(user.id)).await?;
    let stream = snapshot_stream(
        manager,
        state.logout_events(),
        session.id().map(|id| id.to_string()),
    );

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
