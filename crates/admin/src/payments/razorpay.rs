//! Razorpay Orders API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{CURRENCY, GatewayError, GatewayOrder, PaymentGateway, signature};
use crate::config::RazorpayConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Razorpay API client.
#[derive(Clone)]
pub struct RazorpayClient {
    inner: Arc<RazorpayClientInner>,
}

struct RazorpayClientInner {
    client: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: SecretString,
    webhook_secret: Option<SecretString>,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl RazorpayClient {
    /// Create a new Razorpay client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &RazorpayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(RazorpayClientInner {
                client,
                api_base: config.api_base.trim_end_matches('/').to_string(),
                key_id: config.key_id.clone(),
                key_secret: config.key_secret.clone(),
                webhook_secret: config.webhook_secret.clone(),
            }),
        })
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| GatewayError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(self.parse_error(response).await)
    }

    /// Parse error response from the Razorpay API.
    async fn parse_error(&self, response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return GatewayError::RateLimited(retry_after);
        }

        if status == 401 || status == 403 {
            return GatewayError::Unauthorized;
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        GatewayError::Api {
            status,
            message: error_message(&body),
        }
    }
}

/// Pull `error.code: error.description` out of an error body, or fall back
/// to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error:
                ErrorBody {
                    code,
                    description: Some(description),
                },
        }) => match code {
            Some(code) => format!("{code}: {description}"),
            None => description,
        },
        _ => body.to_string(),
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    fn key_id(&self) -> &str {
        &self.inner.key_id
    }

    #[instrument(skip(self))]
    async fn create_order(&self, amount_paise: i64, receipt: &str) -> Result<GatewayOrder, GatewayError> {
        let request = CreateOrderRequest {
            amount: amount_paise,
            currency: CURRENCY,
            receipt,
            payment_capture: 1,
        };

        let response = self
            .inner
            .client
            .post(format!("{}/orders", self.inner.api_base))
            .basic_auth(&self.inner.key_id, Some(self.inner.key_secret.expose_secret()))
            .json(&request)
            .send()
            .await?;

        let order: GatewayOrder = self.handle_response(response).await?;
        debug!(gateway_order_id = %order.id, "Gateway order created");
        Ok(order)
    }

    fn verify_checkout_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), GatewayError> {
        let message = signature::checkout_message(gateway_order_id, payment_id);
        if signature::verify(
            self.inner.key_secret.expose_secret(),
            message.as_bytes(),
            signature,
        ) {
            Ok(())
        } else {
            warn!(gateway_order_id, "Checkout signature mismatch");
            Err(GatewayError::InvalidSignature(
                "Signature mismatch".to_string(),
            ))
        }
    }

    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> Result<(), GatewayError> {
        let secret = self
            .inner
            .webhook_secret
            .as_ref()
            .ok_or(GatewayError::WebhookNotConfigured)?;

        if signature::verify(secret.expose_secret(), body, signature) {
            Ok(())
        } else {
            Err(GatewayError::InvalidSignature(
                "Signature mismatch".to_string(),
            ))
        }
    }
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("api_base", &self.inner.api_base)
            .field("key_id", &self.inner.key_id)
            .field("key_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(webhook_secret: Option<&str>) -> RazorpayClient {
        RazorpayClient::new(&RazorpayConfig {
            key_id: "rzp_test_abc".to_string(),
            key_secret: SecretString::from("test_secret".to_string()),
            webhook_secret: webhook_secret.map(|s| SecretString::from(s.to_string())),
            api_base: "https://api.razorpay.com/v1/".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        assert_eq!(client(None).inner.api_base, "https://api.razorpay.com/v1");
    }

    #[test]
    fn test_checkout_signature_verification() {
        let client = client(None);
        assert!(
            client
                .verify_checkout_signature(
                    "order_ABC",
                    "pay_XYZ",
                    "15656b40fea6f2159b578efa459e969de9f5e223fb8a08393e274ac578d9d005"
                )
                .is_ok()
        );
        assert!(matches!(
            client.verify_checkout_signature("order_ABC", "pay_OTHER", "deadbeef"),
            Err(GatewayError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_webhook_requires_secret() {
        assert!(matches!(
            client(None).verify_webhook_signature(b"{}", "abc"),
            Err(GatewayError::WebhookNotConfigured)
        ));
    }

    #[test]
    fn test_webhook_signature_verification() {
        let body = br#"{"event":"payment.captured"}"#;
        let client = client(Some("whsec"));
        assert!(
            client
                .verify_webhook_signature(
                    body,
                    "4673dd707ef4c41b987cb7fefe1583142dc702388c93145b7814b9ad3d3c183e"
                )
                .is_ok()
        );
    }

    #[test]
    fn test_create_order_request_shape() {
        let request = CreateOrderRequest {
            amount: 12_000,
            currency: CURRENCY,
            receipt: "42",
            payment_capture: 1,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["amount"], 12_000);
        assert_eq!(json["currency"], "INR");
        assert_eq!(json["receipt"], "42");
        assert_eq!(json["payment_capture"], 1);
    }

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"amount too small"}}"#;
        assert_eq!(error_message(body), "BAD_REQUEST_ERROR: amount too small");
        assert_eq!(error_message("gateway down"), "gateway down");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", client(None));
        assert!(!debug.contains("test_secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
