//! Authentication route handlers.
//!
//! Email/password sign-in and registration. The session id is cycled on
//! every sign-in to prevent fixation.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument};

use super::checkout::ensure_no_captured_payment;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Login body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub display_name: String,
}

/// Who is signed in, if anyone.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Option<CurrentUser>,
}

/// Sign out whoever holds this session before a new sign-in.
///
/// Streams opened under the old session id are told to close since the id
/// is about to be cycled. Switching to a different account also drops the
/// previous account's checkout state.
async fn end_previous_identity(
    state: &AppState,
    session: &Session,
    next: &CurrentUser,
) -> Result<()> {
    let Some(previous) = current_user(session).await else {
        return Ok(());
    };

    if previous.id != next.id {
        ensure_no_captured_payment(session).await?;
        clear_current_user(session).await?;
    }

    if let Some(id) = session.id() {
        state.notify_logout(id.to_string());
    }
    Ok(())
}

async fn start_session(session: &Session, user: &CurrentUser) -> Result<()> {
    session.cycle_id().await?;
    set_current_user(session, user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create an account and sign in.
#[instrument(skip_all, fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let user = AuthService::new(state.pool())
        .register(
            &body.email,
            &body.password,
            &body.password_confirm,
            &body.display_name,
        )
        .await?;

    end_previous_identity(&state, &session, &user).await?;
    start_session(&session, &user).await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse { user: Some(user) }),
    ))
}

/// Sign in.
#[instrument(skip_all, fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    end_previous_identity(&state, &session, &user).await?;
    start_session(&session, &user).await?;
    info!(user_id = %user.id, "User signed in");

    Ok(Json(SessionResponse { user: Some(user) }))
}

/// Sign out.
///
/// Open wishlist streams for this session are told to close. Refused while
/// a captured payment is still waiting for its order.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<StatusCode> {
    ensure_no_captured_payment(&session).await?;

    let session_id = session.id().map(|id| id.to_string());

    clear_current_user(&session).await?;
    clear_sentry_user();

    if let Some(id) = session_id {
        // An emptied session only loses its cookie in the layer; overwrite the record.
        session.save().await?;
        state.notify_logout(id);
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Current identity.
pub async fn current(OptionalAuth(user): OptionalAuth) -> Json<SessionResponse> {
    Json(SessionResponse { user })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower_sessions::cookie::time::{Duration, OffsetDateTime};
    use tower_sessions::session::{Id, Record};
    use tower_sessions::{MemoryStore, SessionStore};
    use url::Url;

    use clothify_core::{CurrencyCode, DiscountPercent, Email, UserId, UserRole};

    use super::*;
    use crate::config::{RazorpayConfig, StoreConfig, StorefrontConfig};
    use crate::models::{CustomerInfo, session_keys};
    use crate::services::checkout::{CapturedPayment, PendingCheckout};

    fn state() -> AppState {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://clothify@127.0.0.1:1/clothify_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5000,
            base_url: "http://localhost:5000".to_string(),
            session_secret: SecretString::from("kT9#vQ2$wN7!pL4&zR8*mX3^bH6@cJ1%"),
            allowed_origins: Vec::new(),
            store: StoreConfig::default(),
            razorpay: RazorpayConfig {
                key_id: "rzp_test_key".to_string(),
                key_secret: SecretString::from("Xy7!pQ2#mN9$wR4&"),
                api_base: Url::parse("http://127.0.0.1:1/v1").unwrap(),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://clothify@127.0.0.1:1/clothify_test")
            .unwrap();
        AppState::new(config, pool)
    }

    fn user(id: i32) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse(&format!("user{id}@example.in")).unwrap(),
            display_name: format!("User {id}"),
            role: UserRole::User,
        }
    }

    /// A session already persisted in a store, as a returning browser has.
    async fn stored_session(data: HashMap<String, serde_json::Value>) -> Session {
        let store = Arc::new(MemoryStore::default());
        let mut record = Record {
            id: Id::default(),
            data,
            expiry_date: OffsetDateTime::now_utc() + Duration::days(1),
        };
        store.create(&mut record).await.unwrap();
        Session::new(Some(record.id), store, None)
    }

    async fn signed_in(user: &CurrentUser) -> Session {
        stored_session(HashMap::from([(
            session_keys::CURRENT_USER.to_string(),
            serde_json::to_value(user).unwrap(),
        )]))
        .await
    }

    #[tokio::test]
    async fn test_sign_in_over_other_account_closes_its_streams() {
        let state = state();
        let mut logouts = state.logout_events();
        let session = signed_in(&user(1)).await;
        let old_id = session.id().unwrap().to_string();
        session
            .insert(session_keys::PROMO, serde_json::json!({ "code": "DISCOUNT10" }))
            .await
            .unwrap();

        end_previous_identity(&state, &session, &user(2)).await.unwrap();

        assert_eq!(logouts.try_recv().unwrap(), old_id);
        assert!(current_user(&session).await.is_none());
        assert!(
            session
                .get::<serde_json::Value>(session_keys::PROMO)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_sign_in_again_as_same_account_closes_old_streams() {
        let state = state();
        let mut logouts = state.logout_events();
        let session = signed_in(&user(1)).await;
        let old_id = session.id().unwrap().to_string();

        end_previous_identity(&state, &session, &user(1)).await.unwrap();

        assert_eq!(logouts.try_recv().unwrap(), old_id);
        assert_eq!(current_user(&session).await, Some(user(1)));
    }

    #[tokio::test]
    async fn test_first_sign_in_sends_no_logout() {
        let state = state();
        let mut logouts = state.logout_events();
        let session = stored_session(HashMap::new()).await;

        end_previous_identity(&state, &session, &user(1)).await.unwrap();

        assert!(logouts.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_switching_account_keeps_captured_payment() {
        let state = state();
        let mut logouts = state.logout_events();
        let pending = PendingCheckout {
            gateway_order_id: "order_test".to_string(),
            amount_minor: 50_000,
            currency: CurrencyCode::INR,
            subtotal: Decimal::from(500),
            total: Decimal::from(500),
            discount_percent: DiscountPercent::default(),
            promo_code: None,
            customer: CustomerInfo {
                name: "Asha".to_string(),
                address: "12 MG Road, Pune".to_string(),
                phone: "9876543210".to_string(),
            },
            items: Vec::new(),
            captured: Some(CapturedPayment {
                payment_id: "pay_9".to_string(),
                signature: "sig".to_string(),
            }),
        };
        let session = signed_in(&user(1)).await;
        session
            .insert(session_keys::PENDING_CHECKOUT, &pending)
            .await
            .unwrap();

        let result = end_previous_identity(&state, &session, &user(2)).await;

        assert!(matches!(
            result,
            Err(crate::error::AppError::Checkout(
                crate::services::checkout::CheckoutError::PaymentCapturedOrderNotSaved { .. }
            ))
        ));
        assert_eq!(current_user(&session).await, Some(user(1)));
        assert!(logouts.try_recv().is_err());
    }
}
