//! Checkout route handlers.
//!
//! ```text
//! GET  /checkout          - Totals for the current cart and promo state
//! POST /checkout/promo    - Apply a promo code
//! POST /checkout          - Start payment, returns options for the payment dialog
//! POST /checkout/confirm  - Gateway success callback
//! POST /checkout/cancel   - Gateway dismissal or failure
//! ```

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use clothify_core::{CurrencyCode, DiscountPercent};

use super::cart::load_cart;
use crate::db::orders::OrderRepository;
use crate::db::promo_codes::PromoCodeRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{CartView, CustomerInfo, Order, session_keys};
use crate::razorpay::PaymentCallback;
use crate::services::checkout::{
    CheckoutError, CheckoutService, DiscountCalculator, PaymentOptions, PendingCheckout,
    PromoOutcome,
};
use crate::state::AppState;

/// Checkout totals.
#[derive(Debug, Serialize)]
pub struct CheckoutSummary {
    pub cart: CartView,
    pub subtotal: Decimal,
    pub discount_percent: DiscountPercent,
    pub promo_code: Option<String>,
    pub promo_locked: bool,
    pub total: Decimal,
    pub currency: CurrencyCode,
}

/// Body for applying a promo code.
#[derive(Debug, Deserialize)]
pub struct PromoRequest {
    pub code: String,
}

/// Promo attempt plus the updated totals.
#[derive(Debug, Serialize)]
pub struct PromoResponse {
    #[serde(flatten)]
    pub outcome: PromoOutcome,
    pub summary: CheckoutSummary,
}

/// Body sent when the payment dialog closes without success.
#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    /// Gateway failure description; absent when the buyer dismissed the dialog.
    #[serde(default)]
    pub error: Option<String>,
}

async fn load_discount(session: &Session) -> DiscountCalculator {
    session
        .get::<DiscountCalculator>(session_keys::PROMO)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Fail while a captured payment is still waiting for its order.
///
/// Called before anything that drops the pending checkout. Unreadable
/// session data counts as no checkout.
pub(crate) async fn ensure_no_captured_payment(session: &Session) -> Result<()> {
    let pending = session
        .get::<PendingCheckout>(session_keys::PENDING_CHECKOUT)
        .await
        .ok()
        .flatten();
    match pending {
        Some(pending) => pending.ensure_discardable().map_err(Into::into),
        None => Ok(()),
    }
}

async fn summary(state: &AppState, session: Session, discount: &DiscountCalculator) -> CheckoutSummary {
    let cart = load_cart(session).await;
    let subtotal = cart.total_amount();

    CheckoutSummary {
        cart: cart.view(),
        subtotal,
        discount_percent: discount.discount_percent(),
        promo_code: discount.code().map(str::to_string),
        promo_locked: discount.is_locked(),
        total: discount.compute_discounted_total(subtotal),
        currency: state.config().store.currency,
    }
}

/// Current totals.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Json<CheckoutSummary> {
    let discount = load_discount(&session).await;
    Json(summary(&state, session, &discount).await)
}

/// Apply a promo code. A rejected code keeps the current discount.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn apply_promo(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(body): Json<PromoRequest>,
) -> Result<Json<PromoResponse>> {
    let mut discount = load_discount(&session).await;

    let outcome = discount
        .apply_promo_code(&PromoCodeRepository::new(state.pool()), &body.code)
        .await?;

    if outcome.success {
        session.insert(session_keys::PROMO, &discount).await?;
        let code = discount.code().unwrap_or_default();
        add_breadcrumb("checkout", "Promo code applied", Some(&[("code", code)]));
    }

    Ok(Json(PromoResponse {
        outcome,
        summary: summary(&state, session, &discount).await,
    }))
}

/// Start a payment for the current cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn begin(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(customer): Json<CustomerInfo>,
) -> Result<Json<PaymentOptions>> {
    ensure_no_captured_payment(&session).await?;

    let discount = load_discount(&session).await;
    let cart = load_cart(session.clone()).await;

    let service = CheckoutService::new(state.gateway(), &state.config().store);
    let (options, pending) = service
        .begin(&user, customer, cart.lines(), &discount)
        .await?;

    session
        .insert(session_keys::PENDING_CHECKOUT, &pending)
        .await?;

    add_breadcrumb(
        "checkout",
        "Payment started",
        Some(&[("gateway_order_id", pending.gateway_order_id.as_str())]),
    );

    Ok(Json(options))
}

/// Gateway success callback.
///
/// On success the cart, promo and pending checkout are cleared. If the
/// order cannot be saved the captured payment stays in the session so the
/// same callback can be retried.
#[instrument(skip_all, fields(user_id = %user.id, payment_id = %callback.payment_id))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(callback): Json<PaymentCallback>,
) -> Result<(StatusCode, Json<Order>)> {
    let mut pending: PendingCheckout = session
        .get(session_keys::PENDING_CHECKOUT)
        .await?
        .ok_or(CheckoutError::NoPendingCheckout)?;

    let service = CheckoutService::new(state.gateway(), &state.config().store);
    let result = service
        .confirm(
            &mut pending,
            &user,
            &callback,
            &OrderRepository::new(state.pool()),
        )
        .await;

    let order = match result {
        Ok(order) => order,
        Err(e @ CheckoutError::PaymentCapturedOrderNotSaved { .. }) => {
            session
                .insert(session_keys::PENDING_CHECKOUT, &pending)
                .await?;
            // Error responses are not persisted by the session layer.
            session.save().await?;
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    let mut cart = load_cart(session.clone()).await;
    if let Err(e) = cart.clear_cart().await {
        // The order is saved; a stale cart is recoverable by the buyer.
        warn!(error = %e, order_id = %order.id, "Failed to clear cart after order");
    }
    session
        .remove::<DiscountCalculator>(session_keys::PROMO)
        .await?;
    session
        .remove::<PendingCheckout>(session_keys::PENDING_CHECKOUT)
        .await?;

    info!(order_id = %order.id, "Checkout complete");

    Ok((StatusCode::CREATED, Json(order)))
}

/// Gateway dismissal or failure. The cart is left untouched.
///
/// A checkout whose payment was already captured is kept until its order
/// is saved.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn cancel(
    session: Session,
    RequireAuth(user): RequireAuth,
    body: Option<Json<CancelRequest>>,
) -> Result<StatusCode> {
    ensure_no_captured_payment(&session).await?;

    session
        .remove::<PendingCheckout>(session_keys::PENDING_CHECKOUT)
        .await?;

    let Json(body) = body.unwrap_or_default();
    let err = match body.error {
        Some(description) if !description.trim().is_empty() => {
            CheckoutError::PaymentFailed(description.trim().to_string())
        }
        _ => CheckoutError::PaymentCancelled,
    };

    add_breadcrumb("checkout", &err.to_string(), None);

    Err(AppError::Checkout(err))
}
