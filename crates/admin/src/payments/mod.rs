//! Online payment gateway integration.
//!
//! The checkout flow talks to the gateway only through [`PaymentGateway`],
//! so tests can swap in an in-memory fake. [`RazorpayClient`] is the
//! production implementation.
//!
//! # API Reference
//!
//! - Base URL: `https://api.razorpay.com/v1`
//! - Authentication: HTTP basic auth with the key ID and key secret
//! - Checkout signature: `HMAC-SHA256(key_secret, "{order_id}|{payment_id}")`
//! - Webhook signature: `HMAC-SHA256(webhook_secret, raw_body)` in
//!   `X-Razorpay-Signature`

mod razorpay;
pub mod signature;
mod webhook;

pub use razorpay::RazorpayClient;
pub use webhook::{WebhookEvent, WebhookKind};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Currency for every gateway order.
pub const CURRENCY: &str = "INR";

/// Errors that can occur when interacting with the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the gateway.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Unauthorized (invalid key pair).
    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Signature did not match.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Webhooks arrive but no webhook secret is configured.
    #[error("Webhook secret not configured")]
    WebhookNotConfigured,
}

/// An order created on the gateway for one checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayOrder {
    /// Gateway order ID (`order_...`).
    pub id: String,
    /// Amount in paise.
    pub amount: i64,
    pub currency: String,
    /// Our order ID.
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Payment gateway operations used by checkout.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key ID handed to the checkout widget.
    fn key_id(&self) -> &str;

    /// Create a gateway order for `amount_paise`, tagged with `receipt`.
    async fn create_order(&self, amount_paise: i64, receipt: &str) -> Result<GatewayOrder, GatewayError>;

    /// Check the signature the widget returns on success.
    fn verify_checkout_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), GatewayError>;

    /// Check the signature on a webhook body.
    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> Result<(), GatewayError>;
}
