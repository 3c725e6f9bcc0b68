//! Order-payment workflow.
//!
//! One checkout on the public form moves through these states:
//!
//! ```text
//! FormEditing --submit--> Submitting --inserted--> OrderCreated
//!      ^                      |                     |        |
//!      +---- invalid/failed --+            pay later|        |pay now
//!                                                   v        v
//!                                         PlacedUnpaid   PaymentRequested
//!                                               ^          |          |
//!                               gateway failed -+  dismiss |          | success
//!                                                          v          v
//!                                          PaymentAbandoned --> PaymentPending --ack--> PaymentSettled
//!                                                         late capture
//! ```
//!
//! `PaymentPending` means the gateway has confirmed the money but the order
//! row has not yet been marked paid. It is visible to the payer and is
//! resolved by the retrying status update or the reconciliation worker.
//!
//! The order row is committed before any payment is requested, so every
//! state after `OrderCreated` carries its id.

use thiserror::Error;

use crate::types::OrderId;

/// Where a checkout currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    /// Form shown, optionally with the message from the last attempt.
    FormEditing { message: Option<String> },
    /// Inputs accepted, order being written.
    Submitting { pay_now: bool },
    /// Order row committed as unpaid.
    OrderCreated { order_id: OrderId, pay_now: bool },
    /// Order placed without online payment. Terminal.
    PlacedUnpaid { order_id: OrderId },
    /// Gateway order created, widget open.
    PaymentRequested {
        order_id: OrderId,
        gateway_order_id: String,
    },
    /// Widget dismissed or payment failed; order stays unpaid.
    PaymentAbandoned {
        order_id: OrderId,
        gateway_order_id: String,
    },
    /// Gateway settled, order not yet acknowledged as paid.
    PaymentPending {
        order_id: OrderId,
        gateway_order_id: String,
    },
    /// Order marked paid. Terminal.
    PaymentSettled { order_id: OrderId },
}

/// Inputs that drive the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    /// Payer pressed "pay later" (`pay_now: false`) or "pay now".
    Submit { pay_now: bool },
    /// Pay-later order confirmed as placed.
    PayLater,
    /// Required fields missing or invalid.
    Rejected(String),
    /// Order row inserted.
    OrderInserted(OrderId),
    /// Order insert failed; no retry.
    InsertFailed(String),
    /// Gateway order created for the pay-now path.
    PaymentOrderCreated { gateway_order_id: String },
    /// Gateway order could not be created; the order stays placed unpaid.
    PaymentOrderFailed,
    /// Widget success callback with a verified signature.
    PaymentSucceeded,
    /// Widget dismissed by the payer.
    PaymentDismissed,
    /// Widget or gateway reported a failed payment.
    PaymentFailed,
    /// Order row confirmed as paid.
    StatusAcknowledged,
}

/// An event that makes no sense in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot apply {event} while {state}")]
pub struct TransitionError {
    pub state: &'static str,
    pub event: &'static str,
}

impl CheckoutState {
    /// A fresh, empty form.
    #[must_use]
    pub const fn new() -> Self {
        Self::FormEditing { message: None }
    }

    /// Apply an event, returning the next state.
    ///
    /// Dismiss and failure events that arrive after a success are absorbed
    /// without changing state, so callback ordering from the widget cannot
    /// downgrade a settled payment.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` if the event is not valid in this state.
    pub fn apply(self, event: CheckoutEvent) -> Result<Self, TransitionError> {
        use CheckoutEvent as E;

        let next = match (self, event) {
            (Self::FormEditing { .. }, E::Submit { pay_now }) => Self::Submitting { pay_now },

            (Self::Submitting { .. }, E::Rejected(message) | E::InsertFailed(message)) => {
                Self::FormEditing {
                    message: Some(message),
                }
            }
            (Self::Submitting { pay_now }, E::OrderInserted(order_id)) => {
                Self::OrderCreated { order_id, pay_now }
            }

            (
                Self::OrderCreated {
                    order_id,
                    pay_now: true,
                },
                E::PaymentOrderCreated { gateway_order_id },
            ) => Self::PaymentRequested {
                order_id,
                gateway_order_id,
            },
            (
                Self::OrderCreated {
                    order_id,
                    pay_now: true,
                },
                E::PaymentOrderFailed,
            ) => Self::PlacedUnpaid { order_id },
            (
                Self::OrderCreated {
                    order_id,
                    pay_now: false,
                },
                E::PayLater,
            ) => Self::PlacedUnpaid { order_id },

            (
                Self::PaymentRequested {
                    order_id,
                    gateway_order_id,
                }
                | Self::PaymentAbandoned {
                    order_id,
                    gateway_order_id,
                },
                E::PaymentSucceeded,
            ) => Self::PaymentPending {
                order_id,
                gateway_order_id,
            },
            (
                Self::PaymentRequested {
                    order_id,
                    gateway_order_id,
                },
                E::PaymentDismissed | E::PaymentFailed,
            ) => Self::PaymentAbandoned {
                order_id,
                gateway_order_id,
            },

            (Self::PaymentPending { order_id, .. }, E::StatusAcknowledged) => {
                Self::PaymentSettled { order_id }
            }

            // Late or replayed callbacks.
            (
                state @ (Self::PaymentPending { .. } | Self::PaymentSettled { .. }),
                E::PaymentSucceeded | E::PaymentDismissed | E::PaymentFailed,
            )
            | (state @ Self::PaymentAbandoned { .. }, E::PaymentDismissed | E::PaymentFailed)
            | (state @ Self::PaymentSettled { .. }, E::StatusAcknowledged) => state,

            (state, event) => {
                return Err(TransitionError {
                    state: state.name(),
                    event: event.name(),
                });
            }
        };

        Ok(next)
    }

    /// The committed order, once there is one.
    #[must_use]
    pub const fn order_id(&self) -> Option<OrderId> {
        match self {
            Self::FormEditing { .. } | Self::Submitting { .. } => None,
            Self::OrderCreated { order_id, .. }
            | Self::PlacedUnpaid { order_id }
            | Self::PaymentRequested { order_id, .. }
            | Self::PaymentAbandoned { order_id, .. }
            | Self::PaymentPending { order_id, .. }
            | Self::PaymentSettled { order_id } => Some(*order_id),
        }
    }

    /// Whether no further events are expected.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::PlacedUnpaid { .. } | Self::PaymentSettled { .. })
    }

    /// Whether the payer should be told the order is placed but unpaid.
    #[must_use]
    pub const fn is_placed_unpaid(&self) -> bool {
        matches!(
            self,
            Self::PlacedUnpaid { .. } | Self::PaymentAbandoned { .. }
        )
    }

    /// Short state name for logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FormEditing { .. } => "form_editing",
            Self::Submitting { .. } => "submitting",
            Self::OrderCreated { .. } => "order_created",
            Self::PlacedUnpaid { .. } => "placed_unpaid",
            Self::PaymentRequested { .. } => "payment_requested",
            Self::PaymentAbandoned { .. } => "payment_abandoned",
            Self::PaymentPending { .. } => "payment_pending",
            Self::PaymentSettled { .. } => "payment_settled",
        }
    }
}

impl Default for CheckoutState {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutEvent {
    /// Short event name for logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::PayLater => "pay_later",
            Self::Rejected(_) => "rejected",
            Self::OrderInserted(_) => "order_inserted",
            Self::InsertFailed(_) => "insert_failed",
            Self::PaymentOrderCreated { .. } => "payment_order_created",
            Self::PaymentOrderFailed => "payment_order_failed",
            Self::PaymentSucceeded => "payment_succeeded",
            Self::PaymentDismissed => "payment_dismissed",
            Self::PaymentFailed => "payment_failed",
            Self::StatusAcknowledged => "status_acknowledged",
        }
    }
}
