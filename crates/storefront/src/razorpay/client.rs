//! Razorpay REST client and callback signature verification.

use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tokio::sync::OnceCell;
use tracing::{debug, error, instrument};
use url::Url;

use super::error::GatewayError;
use super::types::{CreateOrderRequest, GatewayOrder};
use crate::config::RazorpayConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

type HmacSha256 = Hmac<Sha256>;

/// Razorpay API client.
#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: SecretString,
    orders_url: Url,
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("orders_url", &self.orders_url.as_str())
            .finish_non_exhaustive()
    }
}

impl RazorpayClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Unavailable` if the HTTP client cannot be built
    /// or the API base URL cannot be joined.
    pub fn new(config: &RazorpayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let mut base = config.api_base.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let orders_url = base
            .join("orders")
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            orders_url,
        })
    }

    /// Public key id handed to the browser.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create a gateway order for `amount` minor units.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the gateway answers non-2xx.
    #[instrument(skip(self), fields(amount = request.amount, currency = %request.currency))]
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<GatewayOrder, GatewayError> {
        let response = self
            .client
            .post(self.orders_url.clone())
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Response(e.to_string()))?;

        if !status.is_success() {
            let body: String = body.chars().take(500).collect();
            error!(status = %status, body = %body, "Gateway rejected order creation");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let order: GatewayOrder =
            serde_json::from_str(&body).map_err(|e| GatewayError::Response(e.to_string()))?;

        debug!(order_id = %order.id, "Gateway order created");

        Ok(order)
    }

    /// Verify a payment success callback.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidSignature` on mismatch.
    pub fn verify_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), GatewayError> {
        verify_payment_signature(&self.key_secret, order_id, payment_id, signature)
    }
}

/// Check `signature == hex(HMAC-SHA256(key_secret, "{order_id}|{payment_id}"))`.
///
/// # Errors
///
/// Returns `GatewayError::InvalidSignature` on mismatch.
pub fn verify_payment_signature(
    key_secret: &SecretString,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), GatewayError> {
    let mut mac = HmacSha256::new_from_slice(key_secret.expose_secret().as_bytes())
        .map_err(|_| GatewayError::InvalidSignature)?;
    mac.update(format!("{order_id}|{payment_id}").as_bytes());

    let expected = hex::encode(mac.finalize().into_bytes());

    if constant_time_compare(&expected, &signature.to_ascii_lowercase()) {
        Ok(())
    } else {
        Err(GatewayError::InvalidSignature)
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

/// Lazily constructed gateway client.
///
/// Concurrent and repeated calls to [`GatewayLoader::get`] share one
/// initialization; a failed attempt is retried on the next call.
pub struct GatewayLoader {
    config: RazorpayConfig,
    client: OnceCell<RazorpayClient>,
}

impl GatewayLoader {
    #[must_use]
    pub fn new(config: RazorpayConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// Get the client, initializing it on first use.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Unavailable` if initialization fails.
    pub async fn get(&self) -> Result<&RazorpayClient, GatewayError> {
        self.client
            .get_or_try_init(|| async {
                tracing::info!("Loading payment gateway client");
                RazorpayClient::new(&self.config)
            })
            .await
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.client.initialized()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    use axum::{Json, Router, http::StatusCode, routing::post};

    fn config(api_base: &str) -> RazorpayConfig {
        RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: SecretString::from("Xy7!pQ2#mN9$wR4&"),
            api_base: Url::parse(api_base).unwrap(),
        }
    }

    fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("valid key length");
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    async fn fake_gateway(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    #[test]
    fn test_signature_verification_valid() {
        let secret = SecretString::from("Xy7!pQ2#mN9$wR4&");
        let signature = sign("Xy7!pQ2#mN9$wR4&", "order_1", "pay_1");
        assert!(verify_payment_signature(&secret, "order_1", "pay_1", &signature).is_ok());
    }

    #[test]
    fn test_signature_verification_rejects_swapped_ids() {
        let secret = SecretString::from("Xy7!pQ2#mN9$wR4&");
        let signature = sign("Xy7!pQ2#mN9$wR4&", "order_1", "pay_1");
        assert!(matches!(
            verify_payment_signature(&secret, "order_2", "pay_1", &signature),
            Err(GatewayError::InvalidSignature)
        ));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
    }

    #[test]
    fn test_orders_url_keeps_version_path() {
        let client = RazorpayClient::new(&config("https://api.razorpay.com/v1")).unwrap();
        assert_eq!(client.orders_url.as_str(), "https://api.razorpay.com/v1/orders");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let client = RazorpayClient::new(&config("https://api.razorpay.com/v1")).unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("Xy7!"));
    }

    #[tokio::test]
    async fn test_create_order_success() {
        let router = Router::new().route(
            "/v1/orders",
            post(|Json(body): Json<serde_json::Value>| async move {
                Json(serde_json::json!({
                    "id": "order_abc",
                    "amount": body["amount"],
                    "currency": body["currency"],
                    "receipt": body["receipt"],
                    "status": "created"
                }))
            }),
        );
        let base = fake_gateway(router).await;
        let client = RazorpayClient::new(&config(&base)).unwrap();

        let order = client
            .create_order(&CreateOrderRequest {
                amount: 90_000,
                currency: "INR".to_string(),
                receipt: "r-1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(order.id, "order_abc");
        assert_eq!(order.amount, 90_000);
        assert_eq!(order.status, "created");
    }

    #[tokio::test]
    async fn test_create_order_non_success_status() {
        let router = Router::new().route(
            "/v1/orders",
            post(|| async { (StatusCode::BAD_REQUEST, "bad amount") }),
        );
        let base = fake_gateway(router).await;
        let client = RazorpayClient::new(&config(&base)).unwrap();

        let result = client
            .create_order(&CreateOrderRequest {
                amount: 0,
                currency: "INR".to_string(),
                receipt: "r-2".to_string(),
            })
            .await;

        assert!(matches!(result, Err(GatewayError::Api { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_loader_initializes_once() {
        let loader = std::sync::Arc::new(GatewayLoader::new(config("https://api.razorpay.com/v1")));
        assert!(!loader.is_loaded());

        let a = loader.clone();
        let b = loader.clone();
        let (first, second) = tokio::join!(
            async move { a.get().await.map(|c| std::ptr::from_ref(c) as usize) },
            async move { b.get().await.map(|c| std::ptr::from_ref(c) as usize) },
        );

        assert_eq!(first.unwrap(), second.unwrap());
        assert!(loader.is_loaded());
    }
}
