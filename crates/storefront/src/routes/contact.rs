//! Contact form route handler.

use axum::{Json, extract::State, http::StatusCode};
use tracing::{info, instrument};

use crate::db::contacts::ContactRepository;
use crate::error::{AppError, Result};
use crate::models::{ContactMessage, NewContactMessage};
use crate::state::AppState;

/// Store a contact form submission.
///
/// POST /contact
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    Json(form): Json<NewContactMessage>,
) -> Result<(StatusCode, Json<ContactMessage>)> {
    let (name, email, message) = form.validate().map_err(AppError::BadRequest)?;

    let saved = ContactRepository::new(state.pool())
        .create(&name, &email, &message)
        .await?;

    info!(contact_id = %saved.id, "Contact message received");

    Ok((StatusCode::CREATED, Json(saved)))
}
