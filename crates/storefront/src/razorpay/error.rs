//! Payment gateway errors.

use thiserror::Error;

/// Errors that can occur when talking to the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The client could not be initialized.
    #[error("payment gateway failed to load: {0}")]
    Unavailable(String),

    /// HTTP request failed.
    #[error("gateway request failed: {0}")]
    Request(String),

    /// The gateway answered with a non-success status.
    #[error("gateway returned {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// Failed to parse the gateway response.
    #[error("gateway response error: {0}")]
    Response(String),

    /// Callback signature did not match.
    #[error("invalid payment signature")]
    InvalidSignature,
}
