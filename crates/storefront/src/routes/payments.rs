//! Gateway order endpoint used by the payment dialog.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use clothify_core::CurrencyCode;

use crate::services::checkout::{CheckoutError, create_gateway_order};
use crate::state::AppState;

/// Body of `POST /api/create-order`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    /// Major units (rupees).
    pub amount: Decimal,
    /// Defaults to `INR`.
    #[serde(default)]
    pub currency: Option<String>,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Create a gateway order for `amount`.
///
/// Responds with the gateway order object. Any gateway failure is a 500
/// with `{"error": "Failed to create order"}`.
#[instrument(skip(state))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderBody>,
) -> Response {
    let currency = match body.currency.as_deref().map(str::parse::<CurrencyCode>) {
        None => CurrencyCode::INR,
        Some(Ok(currency)) => currency,
        Some(Err(e)) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    match create_gateway_order(state.gateway(), body.amount, currency).await {
        Ok(order) => Json(order).into_response(),
        Err(CheckoutError::Validation(msg)) => error_response(StatusCode::BAD_REQUEST, &msg),
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create order"),
    }
}
