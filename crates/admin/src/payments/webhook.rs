//! Webhook payloads.

use serde::Deserialize;

/// What a webhook means for the matching payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookKind {
    /// Money was captured; the attempt is settled.
    Settled,
    /// The payment failed.
    Failed,
    /// Any event we do not act on.
    Ignored,
}

/// A webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<Wrapped<WebhookPayment>>,
    #[serde(default)]
    pub order: Option<Wrapped<WebhookOrder>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Wrapped<T> {
    pub entity: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayment {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookOrder {
    pub id: String,
}

impl WebhookEvent {
    /// Classify the event.
    #[must_use]
    pub fn kind(&self) -> WebhookKind {
        match self.event.as_str() {
            "payment.captured" | "order.paid" => WebhookKind::Settled,
            "payment.failed" => WebhookKind::Failed,
            _ => WebhookKind::Ignored,
        }
    }

    /// Gateway order ID, from the order entity or the payment's `order_id`.
    #[must_use]
    pub fn gateway_order_id(&self) -> Option<&str> {
        self.payload
            .order
            .as_ref()
            .map(|o| o.entity.id.as_str())
            .or_else(|| {
                self.payload
                    .payment
                    .as_ref()
                    .and_then(|p| p.entity.order_id.as_deref())
            })
    }

    /// Gateway payment ID, if the payload carries a payment.
    #[must_use]
    pub fn payment_id(&self) -> Option<&str> {
        self.payload.payment.as_ref().map(|p| p.entity.id.as_str())
    }
}
