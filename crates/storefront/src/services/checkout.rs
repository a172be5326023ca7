//! Checkout: promo codes, gateway order creation and payment confirmation.
//!
//! # Flow
//!
//! 1. [`DiscountCalculator::apply_promo_code`] locks in at most one code
//! 2. [`CheckoutService::begin`] validates the buyer and cart, creates a
//!    gateway order for the discounted total and returns [`PaymentOptions`]
//!    for the browser plus a [`PendingCheckout`] kept in the session
//! 3. [`CheckoutService::confirm`] verifies the signed callback and records
//!    the order
//!
//! A verified payment whose order cannot be saved is reported as
//! [`CheckoutError::PaymentCapturedOrderNotSaved`]. The pending checkout keeps
//! the captured payment so confirmation can be retried without paying again.

use std::future::Future;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use clothify_core::{CurrencyCode, DiscountPercent, OrderStatus, discounted_total, to_minor_units};

use crate::config::StoreConfig;
use crate::db::RepositoryError;
use crate::db::orders::OrderRepository;
use crate::db::promo_codes::PromoCodeRepository;
use crate::models::promo::normalize_code;
use crate::models::{CartLine, CurrentUser, CustomerInfo, NewOrder, Order, PromoCode};
use crate::razorpay::{CreateOrderRequest, GatewayError, GatewayLoader, GatewayOrder, PaymentCallback};

/// Errors from the checkout flow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(String),

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Payment gateway failed to load")]
    GatewayUnavailable(#[source] GatewayError),

    #[error("Failed to create order")]
    OrderCreationFailed(#[source] GatewayError),

    #[error("Payment cancelled")]
    PaymentCancelled,

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("No checkout in progress")]
    NoPendingCheckout,

    #[error("Payment does not match the checkout in progress")]
    OrderMismatch,

    #[error("Payment signature could not be verified")]
    SignatureMismatch,

    /// The gateway captured the money but the order row was not written.
    #[error("Payment {payment_id} succeeded but the order could not be saved")]
    PaymentCapturedOrderNotSaved { payment_id: String },

    #[error("checkout storage error: {0}")]
    Repository(#[from] RepositoryError),
}

// =============================================================================
// Discounts
// =============================================================================

/// Source of active promo codes.
pub trait PromoLookup: Sync {
    /// Find an active code; `code` is already normalized.
    fn lookup(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<PromoCode>, RepositoryError>> + Send;
}

impl PromoLookup for PromoCodeRepository<'_> {
    async fn lookup(&self, code: &str) -> Result<Option<PromoCode>, RepositoryError> {
        self.find_active(code).await
    }
}

/// Why a promo code was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoRejection {
    /// No active code matches.
    Unknown,
    /// A code is already locked in.
    AlreadyApplied,
}

/// Result of [`DiscountCalculator::apply_promo_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PromoOutcome {
    pub success: bool,
    /// The discount in effect after the attempt.
    pub discount_percent: DiscountPercent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<PromoRejection>,
}

/// Discount state for one checkout. Stored in the session.
///
/// Once a code is accepted the calculator locks and rejects further codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCalculator {
    code: Option<String>,
    percent: DiscountPercent,
    locked: bool,
}

impl DiscountCalculator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to apply `raw_code`. A rejected code leaves the current discount.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the lookup fails.
    pub async fn apply_promo_code(
        &mut self,
        lookup: &impl PromoLookup,
        raw_code: &str,
    ) -> Result<PromoOutcome, RepositoryError> {
        if self.locked {
            return Ok(self.rejected(PromoRejection::AlreadyApplied));
        }

        let code = normalize_code(raw_code);
        if code.is_empty() {
            return Ok(self.rejected(PromoRejection::Unknown));
        }

        let Some(promo) = lookup.lookup(&code).await? else {
            return Ok(self.rejected(PromoRejection::Unknown));
        };

        self.code = Some(promo.code);
        self.percent = promo.discount_percent;
        self.locked = true;

        Ok(PromoOutcome {
            success: true,
            discount_percent: self.percent,
            rejection: None,
        })
    }

    const fn rejected(&self, reason: PromoRejection) -> PromoOutcome {
        PromoOutcome {
            success: false,
            discount_percent: self.percent,
            rejection: Some(reason),
        }
    }

    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    #[must_use]
    pub const fn discount_percent(&self) -> DiscountPercent {
        self.percent
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// `total * (1 - percent / 100)`, never negative.
    #[must_use]
    pub fn compute_discounted_total(&self, total: Decimal) -> Decimal {
        discounted_total(total, self.percent)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Where verified orders are written.
pub trait OrderRecorder: Sync {
    fn record(&self, order: &NewOrder) -> impl Future<Output = Result<Order, RepositoryError>> + Send;
}

impl OrderRecorder for OrderRepository<'_> {
    async fn record(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        self.create(order).await
    }
}

/// Prefill fields for the payment dialog.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentPrefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

/// Everything the browser needs to open the payment dialog.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOptions {
    /// Public key id.
    pub key: String,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    /// Gateway order id.
    pub order_id: String,
    /// Store name.
    pub name: String,
    pub description: String,
    pub prefill: PaymentPrefill,
}

/// A payment the gateway reported as captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPayment {
    pub payment_id: String,
    pub signature: String,
}

/// A checkout waiting for the gateway callback. Stored in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCheckout {
    pub gateway_order_id: String,
    pub amount_minor: i64,
    pub currency: CurrencyCode,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub discount_percent: DiscountPercent,
    pub promo_code: Option<String>,
    pub customer: CustomerInfo,
    pub items: Vec<CartLine>,
    /// Set once a callback has been verified.
    #[serde(default)]
    pub captured: Option<CapturedPayment>,
}

impl PendingCheckout {
    /// Refuse to discard a checkout whose payment was captured but not saved.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::PaymentCapturedOrderNotSaved` while a captured
    /// payment is waiting for its order to be recorded.
    pub fn ensure_discardable(&self) -> Result<(), CheckoutError> {
        match &self.captured {
            Some(captured) => Err(CheckoutError::PaymentCapturedOrderNotSaved {
                payment_id: captured.payment_id.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Create a gateway order for `amount` major units.
///
/// # Errors
///
/// Returns `CheckoutError::Validation` for a negative or oversized amount,
/// `CheckoutError::GatewayUnavailable` if the client cannot load and
/// `CheckoutError::OrderCreationFailed` if the gateway rejects the order.
#[instrument(skip(gateway))]
pub async fn create_gateway_order(
    gateway: &GatewayLoader,
    amount: Decimal,
    currency: CurrencyCode,
) -> Result<GatewayOrder, CheckoutError> {
    let amount_minor =
        to_minor_units(amount).map_err(|e| CheckoutError::Validation(e.to_string()))?;

    let client = gateway.get().await.map_err(|e| {
        error!(error = %e, "Payment gateway failed to load");
        CheckoutError::GatewayUnavailable(e)
    })?;

    let request = CreateOrderRequest {
        amount: amount_minor,
        currency: currency.code().to_string(),
        receipt: format!("rcpt_{}", Uuid::new_v4().simple()),
    };

    client.create_order(&request).await.map_err(|e| {
        error!(error = %e, "Failed to create gateway order");
        CheckoutError::OrderCreationFailed(e)
    })
}

/// Checkout orchestration over the lazily loaded gateway client.
pub struct CheckoutService<'a> {
    gateway: &'a GatewayLoader,
    store: &'a StoreConfig,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(gateway: &'a GatewayLoader, store: &'a StoreConfig) -> Self {
        Self { gateway, store }
    }

    /// Start a checkout.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` for missing contact details,
    /// `CheckoutError::EmptyCart` for an empty cart, or a gateway error. No
    /// payment options are produced on failure.
    #[instrument(skip_all, fields(user_id = %user.id, lines = lines.len()))]
    pub async fn begin(
        &self,
        user: &CurrentUser,
        customer: CustomerInfo,
        lines: &[CartLine],
        discount: &DiscountCalculator,
    ) -> Result<(PaymentOptions, PendingCheckout), CheckoutError> {
        let customer = customer.validate().map_err(CheckoutError::Validation)?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let subtotal: Decimal = lines.iter().map(CartLine::line_total).sum();
        let total = discount.compute_discounted_total(subtotal);

        let order = create_gateway_order(self.gateway, total, self.store.currency).await?;
        let client = self
            .gateway
            .get()
            .await
            .map_err(CheckoutError::GatewayUnavailable)?;

        info!(gateway_order_id = %order.id, amount = order.amount, "Checkout started");

        let options = PaymentOptions {
            key: client.key_id().to_string(),
            amount: order.amount,
            currency: order.currency.clone(),
            order_id: order.id.clone(),
            name: self.store.name.clone(),
            description: format!("Order of {} item(s)", lines.len()),
            prefill: PaymentPrefill {
                name: customer.name.clone(),
                email: user.email.to_string(),
                contact: customer.phone.clone(),
            },
        };

        let pending = PendingCheckout {
            gateway_order_id: order.id,
            amount_minor: order.amount,
            currency: self.store.currency,
            subtotal,
            total,
            discount_percent: discount.discount_percent(),
            promo_code: discount.code().map(str::to_string),
            customer,
            items: lines.to_vec(),
            captured: None,
        };

        Ok((options, pending))
    }

    /// Verify the gateway success callback and record the order.
    ///
    /// On a verified signature `pending.captured` is set before the order is
    /// written, so a failed write can be retried with the same callback.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderMismatch` or `CheckoutError::SignatureMismatch`
    /// for a callback that does not belong to `pending`, and
    /// `CheckoutError::PaymentCapturedOrderNotSaved` if recording fails.
    #[instrument(skip_all, fields(user_id = %user.id, gateway_order_id = %callback.order_id))]
    pub async fn confirm(
        &self,
        pending: &mut PendingCheckout,
        user: &CurrentUser,
        callback: &PaymentCallback,
        recorder: &impl OrderRecorder,
    ) -> Result<Order, CheckoutError> {
        if callback.order_id != pending.gateway_order_id {
            warn!(expected = %pending.gateway_order_id, "Callback for a different gateway order");
            return Err(CheckoutError::OrderMismatch);
        }

        let client = self
            .gateway
            .get()
            .await
            .map_err(CheckoutError::GatewayUnavailable)?;

        client
            .verify_signature(&callback.order_id, &callback.payment_id, &callback.signature)
            .map_err(|_| {
                warn!(payment_id = %callback.payment_id, "Payment signature mismatch");
                CheckoutError::SignatureMismatch
            })?;

        pending.captured = Some(CapturedPayment {
            payment_id: callback.payment_id.clone(),
            signature: callback.signature.clone(),
        });

        let order = NewOrder {
            user_id: user.id,
            user_email: user.email.clone(),
            items: pending.items.clone(),
            subtotal: pending.subtotal,
            discount_percent: pending.discount_percent,
            promo_code: pending.promo_code.clone(),
            total: pending.total,
            currency: pending.currency,
            customer: pending.customer.clone(),
            payment_id: callback.payment_id.clone(),
            gateway_order_id: callback.order_id.clone(),
            signature: callback.signature.clone(),
            status: OrderStatus::Paid,
        };

        match recorder.record(&order).await {
            Ok(saved) => {
                info!(order_id = %saved.id, payment_id = %saved.payment_id, "Order recorded");
                Ok(saved)
            }
            Err(e) => {
                error!(
                    error = %e,
                    payment_id = %callback.payment_id,
                    "Payment captured but order could not be saved"
                );
                Err(CheckoutError::PaymentCapturedOrderNotSaved {
                    payment_id: callback.payment_id.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use axum::{Json, Router, routing::post};
    use chrono::Utc;
    use hmac::{Hmac, Mac};
    use secrecy::SecretString;
    use sha2::Sha256;
    use url::Url;

    use clothify_core::{Email, OrderId, ProductId, UserId, UserRole};

    use crate::config::RazorpayConfig;

    const SECRET: &str = "Xy7!pQ2#mN9$wR4&";

    struct StaticPromoCodes(Vec<PromoCode>);

    impl PromoLookup for StaticPromoCodes {
        async fn lookup(&self, code: &str) -> Result<Option<PromoCode>, RepositoryError> {
            Ok(self
                .0
                .iter()
                .find(|p| p.active && p.code == code)
                .cloned())
        }
    }

    struct MemoryOrders {
        saved: Mutex<Vec<NewOrder>>,
        failing: bool,
    }

    impl MemoryOrders {
        fn new(failing: bool) -> Self {
            Self {
                saved: Mutex::new(Vec::new()),
                failing,
            }
        }
    }

    impl OrderRecorder for MemoryOrders {
        async fn record(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
            if self.failing {
                return Err(RepositoryError::DataCorruption("disk full".to_string()));
            }
            self.saved.lock().unwrap().push(order.clone());
            Ok(Order {
                id: OrderId::new(1),
                user_id: order.user_id,
                user_email: order.user_email.clone(),
                items: order.items.clone(),
                subtotal: order.subtotal,
                discount_percent: order.discount_percent,
                promo_code: order.promo_code.clone(),
                total: order.total,
                currency: order.currency,
                customer: order.customer.clone(),
                payment_id: order.payment_id.clone(),
                gateway_order_id: order.gateway_order_id.clone(),
                signature: order.signature.clone(),
                status: order.status,
                created_at: Utc::now(),
            })
        }
    }

    fn promo_codes() -> StaticPromoCodes {
        StaticPromoCodes(vec![
            PromoCode {
                code: "DISCOUNT10".to_string(),
                discount_percent: DiscountPercent::new(10).unwrap(),
                active: true,
            },
            PromoCode {
                code: "OLD50".to_string(),
                discount_percent: DiscountPercent::new(50).unwrap(),
                active: false,
            },
        ])
    }

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::new(42),
            email: Email::parse("asha@example.in").unwrap(),
            display_name: "Asha".to_string(),
            role: UserRole::User,
        }
    }

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: " Asha ".to_string(),
            address: "12 MG Road, Pune".to_string(),
            phone: "9876543210".to_string(),
        }
    }

    fn lines() -> Vec<CartLine> {
        vec![CartLine {
            id: ProductId::from("p1"),
            name: "Kurta".to_string(),
            price: Decimal::from(500),
            image: String::new(),
            stock: 10,
            quantity: 2,
        }]
    }

    fn sign(order_id: &str, payment_id: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).expect("valid key length");
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn loader(api_base: &str) -> GatewayLoader {
        GatewayLoader::new(RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: SecretString::from(SECRET),
            api_base: Url::parse(api_base).unwrap(),
        })
    }

    async fn fake_gateway() -> String {
        let router = Router::new().route(
            "/v1/orders",
            post(|Json(body): Json<serde_json::Value>| async move {
                Json(serde_json::json!({
                    "id": "order_test",
                    "amount": body["amount"],
                    "currency": body["currency"],
                    "receipt": body["receipt"],
                    "status": "created"
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn pending() -> PendingCheckout {
        PendingCheckout {
            gateway_order_id: "order_test".to_string(),
            amount_minor: 90_000,
            currency: CurrencyCode::INR,
            subtotal: Decimal::from(1000),
            total: Decimal::from(900),
            discount_percent: DiscountPercent::new(10).unwrap(),
            promo_code: Some("DISCOUNT10".to_string()),
            customer: customer().validate().unwrap(),
            items: lines(),
            captured: None,
        }
    }

    #[tokio::test]
    async fn test_discount10_on_1000_is_900() {
        let mut calc = DiscountCalculator::new();
        let outcome = calc
            .apply_promo_code(&promo_codes(), "  discount10 ")
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.discount_percent.get(), 10);
        assert!(calc.is_locked());
        assert_eq!(calc.compute_discounted_total(Decimal::from(1000)), Decimal::from(900));
    }

    #[tokio::test]
    async fn test_unknown_code_keeps_full_price() {
        let mut calc = DiscountCalculator::new();
        let outcome = calc.apply_promo_code(&promo_codes(), "FREESTUFF").await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.rejection, Some(PromoRejection::Unknown));
        assert!(!calc.is_locked());
        assert_eq!(calc.compute_discounted_total(Decimal::from(1000)), Decimal::from(1000));
    }

    #[tokio::test]
    async fn test_inactive_code_rejected() {
        let mut calc = DiscountCalculator::new();
        let outcome = calc.apply_promo_code(&promo_codes(), "old50").await.unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_locked_rejects_second_code() {
        let mut calc = DiscountCalculator::new();
        calc.apply_promo_code(&promo_codes(), "DISCOUNT10").await.unwrap();

        let outcome = calc.apply_promo_code(&promo_codes(), "DISCOUNT10").await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.rejection, Some(PromoRejection::AlreadyApplied));
        assert_eq!(outcome.discount_percent.get(), 10);
    }

    #[tokio::test]
    async fn test_begin_requires_contact_details() {
        let gateway = loader("http://127.0.0.1:9/v1");
        let store = StoreConfig::default();
        let service = CheckoutService::new(&gateway, &store);
        let mut incomplete = customer();
        incomplete.address = "   ".to_string();

        let result = service
            .begin(&user(), incomplete, &lines(), &DiscountCalculator::new())
            .await;

        assert!(matches!(result, Err(CheckoutError::Validation(msg)) if msg.contains("address")));
        assert!(!gateway.is_loaded());
    }

    #[tokio::test]
    async fn test_begin_rejects_empty_cart() {
        let gateway = loader("http://127.0.0.1:9/v1");
        let store = StoreConfig::default();
        let service = CheckoutService::new(&gateway, &store);

        let result = service
            .begin(&user(), customer(), &[], &DiscountCalculator::new())
            .await;

        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_begin_charges_discounted_total() {
        let gateway = loader(&fake_gateway().await);
        let store = StoreConfig::default();
        let service = CheckoutService::new(&gateway, &store);
        let mut calc = DiscountCalculator::new();
        calc.apply_promo_code(&promo_codes(), "DISCOUNT10").await.unwrap();

        let (options, pending) = service.begin(&user(), customer(), &lines(), &calc).await.unwrap();

        assert_eq!(options.amount, 90_000);
        assert_eq!(options.currency, "INR");
        assert_eq!(options.order_id, "order_test");
        assert_eq!(options.key, "rzp_test_key");
        assert_eq!(options.name, "Clothify");
        assert_eq!(options.prefill.name, "Asha");
        assert_eq!(options.prefill.email, "asha@example.in");
        assert_eq!(pending.total, Decimal::from(900));
        assert_eq!(pending.promo_code.as_deref(), Some("DISCOUNT10"));
    }

    #[tokio::test]
    async fn test_begin_gateway_failure_returns_no_options() {
        let gateway = loader("http://127.0.0.1:9/v1");
        let store = StoreConfig::default();
        let service = CheckoutService::new(&gateway, &store);

        let result = service
            .begin(&user(), customer(), &lines(), &DiscountCalculator::new())
            .await;

        assert!(matches!(result, Err(CheckoutError::OrderCreationFailed(_))));
    }

    #[tokio::test]
    async fn test_confirm_records_verified_payment() {
        let gateway = loader("https://api.razorpay.com/v1");
        let store = StoreConfig::default();
        let service = CheckoutService::new(&gateway, &store);
        let orders = MemoryOrders::new(false);
        let mut pending = pending();
        let callback = PaymentCallback {
            order_id: "order_test".to_string(),
            payment_id: "pay_1".to_string(),
            signature: sign("order_test", "pay_1"),
        };

        let order = service
            .confirm(&mut pending, &user(), &callback, &orders)
            .await
            .unwrap();

        assert_eq!(order.payment_id, "pay_1");
        assert_eq!(order.total, Decimal::from(900));
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(orders.saved.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_rejects_bad_signature() {
        let gateway = loader("https://api.razorpay.com/v1");
        let store = StoreConfig::default();
        let service = CheckoutService::new(&gateway, &store);
        let orders = MemoryOrders::new(false);
        let mut pending = pending();
        let callback = PaymentCallback {
            order_id: "order_test".to_string(),
            payment_id: "pay_1".to_string(),
            signature: sign("order_test", "pay_2"),
        };

        let result = service.confirm(&mut pending, &user(), &callback, &orders).await;

        assert!(matches!(result, Err(CheckoutError::SignatureMismatch)));
        assert!(pending.captured.is_none());
        assert!(orders.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_rejects_other_order() {
        let gateway = loader("https://api.razorpay.com/v1");
        let store = StoreConfig::default();
        let service = CheckoutService::new(&gateway, &store);
        let mut pending = pending();
        let callback = PaymentCallback {
            order_id: "order_other".to_string(),
            payment_id: "pay_1".to_string(),
            signature: sign("order_other", "pay_1"),
        };

        let result = service
            .confirm(&mut pending, &user(), &callback, &MemoryOrders::new(false))
            .await;

        assert!(matches!(result, Err(CheckoutError::OrderMismatch)));
    }

    #[tokio::test]
    async fn test_confirm_save_failure_keeps_captured_payment() {
        let gateway = loader("https://api.razorpay.com/v1");
        let store = StoreConfig::default();
        let service = CheckoutService::new(&gateway, &store);
        let mut pending = pending();
        let callback = PaymentCallback {
            order_id: "order_test".to_string(),
            payment_id: "pay_9".to_string(),
            signature: sign("order_test", "pay_9"),
        };

        let result = service
            .confirm(&mut pending, &user(), &callback, &MemoryOrders::new(true))
            .await;

        assert!(matches!(
            result,
            Err(CheckoutError::PaymentCapturedOrderNotSaved { ref payment_id }) if payment_id == "pay_9"
        ));
        assert_eq!(pending.captured.as_ref().map(|c| c.payment_id.as_str()), Some("pay_9"));

        let retried = service
            .confirm(&mut pending, &user(), &callback, &MemoryOrders::new(false))
            .await;
        assert!(retried.is_ok());
    }

    #[test]
    fn test_captured_checkout_is_not_discardable() {
        let mut pending = pending();
        assert!(pending.ensure_discardable().is_ok());

        pending.captured = Some(CapturedPayment {
            payment_id: "pay_9".to_string(),
            signature: sign("order_test", "pay_9"),
        });
        assert!(matches!(
            pending.ensure_discardable(),
            Err(CheckoutError::PaymentCapturedOrderNotSaved { ref payment_id }) if payment_id == "pay_9"
        ));
    }
}
