//! Razorpay webhook receiver.
//!
//! The body is verified against `X-Razorpay-Signature` before it is parsed.
//! A verified delivery is answered 200 once it is applied, and also when it
//! cannot be parsed or names an order we do not know, so the gateway stops
//! redelivering. When the store is unreachable the delivery is refused with
//! 503 and Razorpay sends it again later.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::{
    payments::{GatewayError, PaymentGateway, WebhookEvent},
    services::CheckoutService,
    state::AppState,
};

/// Header carrying the HMAC of the raw body.
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Handle a Razorpay webhook delivery.
#[instrument(skip_all)]
pub async fn razorpay(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    receive(state.gateway(), &state.checkout(), signature, &body)
        .await
        .into_response()
}

/// Verify, parse and apply one delivery, returning the status to answer.
pub async fn receive(
    gateway: &dyn PaymentGateway,
    checkout: &CheckoutService<'_>,
    signature: &str,
    body: &[u8],
) -> StatusCode {
    match gateway.verify_webhook_signature(body, signature) {
        Ok(()) => {}
        Err(GatewayError::WebhookNotConfigured) => {
            tracing::warn!("Webhook received but no webhook secret is configured");
            return StatusCode::NOT_FOUND;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected webhook");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let event: WebhookEvent = match serde_json::from_slice(body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Verified webhook could not be parsed");
            return StatusCode::OK;
        }
    };

    match checkout.handle_webhook(&event).await {
        Ok(()) => StatusCode::OK,
        Err(e) if e.is_transient() => {
            tracing::error!(event = %event.event, error = %e, "Webhook not applied, asking for redelivery");
            StatusCode::SERVICE_UNAVAILABLE
        }
        Err(e) => {
            tracing::error!(event = %event.event, error = %e, "Failed to apply webhook");
            sentry::capture_error(&e);
            StatusCode::OK
        }
    }
}
