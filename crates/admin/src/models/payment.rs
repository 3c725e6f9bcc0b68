//! Payment attempts.
//!
//! One row per gateway order. The row is created when the checkout widget is
//! opened and is the durable record that the order still needs to be marked
//! paid once the gateway settles it.

use chrono::{DateTime, Utc};

use jmd_tiffins_core::{Money, OrderId, PaymentAttemptId, PaymentAttemptStatus};

/// A checkout attempt against the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAttempt {
    pub id: PaymentAttemptId,
    pub order_id: OrderId,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount_paise: i64,
    pub status: PaymentAttemptStatus,
    /// How many times applying the paid status to the order has failed.
    pub apply_failures: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
    /// When the order row was confirmed as paid.
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl PaymentAttempt {
    /// Settled at the gateway but the order is not yet marked paid.
    #[must_use]
    pub const fn awaiting_acknowledgement(&self) -> bool {
        matches!(self.status, PaymentAttemptStatus::Settled) && self.acknowledged_at.is_none()
    }

    /// Amount charged, in rupees.
    #[must_use]
    pub fn amount(&self) -> Money {
        Money::from_paise(self.amount_paise)
    }
}

/// Fields for recording a freshly created gateway order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentAttempt {
    pub order_id: OrderId,
    pub gateway_order_id: String,
    pub amount_paise: i64,
}
