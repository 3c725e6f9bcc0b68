//! Public-form checkout.
//!
//! Drives [`CheckoutState`] against an [`OrderStore`] and a
//! [`PaymentGateway`]:
//!
//! 1. [`CheckoutService::place_order`] validates the form, commits the order
//!    as unpaid and, for "pay now", creates a gateway order plus a
//!    `payment_attempts` row.
//! 2. [`CheckoutService::confirm_payment`] handles the widget's success
//!    callback: settle the attempt, then mark the order paid with retries.
//! 3. [`CheckoutService::abandon_payment`] handles dismissal and failure.
//!
//! When the paid status cannot be written in time the result is
//! [`CheckoutState::PaymentPending`]; [`reconcile_once`] finishes the job.

#[cfg(test)]
pub(crate) mod fake;
mod retry;
mod store;

pub use retry::RetryPolicy;
pub use store::{OrderStore, PgOrderStore};

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use jmd_tiffins_core::{
    CheckoutEvent, CheckoutState, CustomerId, DeliveryLocation, MenuItemId, OrderId,
    PaymentAttemptStatus, PaymentStatus, TransitionError, local_today, resolve_delivery,
};

use crate::db::RepositoryError;
use crate::models::{Customer, CustomerInput, NewOrder, NewPaymentAttempt, Order, PaymentAttempt};
use crate::payments::{CURRENCY, GatewayError, PaymentGateway, WebhookEvent, WebhookKind};

/// Attempts processed per reconciliation pass.
pub const RECONCILE_BATCH: i64 = 50;

/// Errors from the checkout workflow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Form input rejected; the message is shown to the payer.
    #[error("{0}")]
    Validation(String),

    /// Store read or write failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Gateway call failed.
    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Callback arrived in a state that cannot accept it.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Callback signature did not verify.
    #[error("invalid payment signature")]
    InvalidSignature,

    /// No such order or payment attempt.
    #[error("not found")]
    NotFound,
}

impl CheckoutError {
    /// Whether the same call may succeed later (pool exhausted, connection
    /// lost).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Repository(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Who is ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerChoice {
    Existing(CustomerId),
    New { name: String, phone_number: String },
}

/// A submitted public order form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub customer: Option<CustomerChoice>,
    pub menu_item_id: Option<MenuItemId>,
    pub delivery_location: Option<DeliveryLocation>,
    pub pay_now: bool,
}

/// What the widget needs to open for a pay-now order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub key_id: String,
    pub gateway_order_id: String,
    pub amount_paise: i64,
    pub currency: &'static str,
}

/// Result of a successful submit.
#[derive(Debug, Clone)]
pub struct Placement {
    pub order: Order,
    pub customer: Customer,
    pub state: CheckoutState,
    /// Set when the widget should open.
    pub payment: Option<PaymentIntent>,
    /// Why online payment is unavailable, for pay-now orders that fell back
    /// to pay later.
    pub payment_notice: Option<String>,
}

/// Fields the widget posts back on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCallback {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub acknowledged: usize,
    pub failed: usize,
}

/// Checkout workflow over a store and a gateway.
pub struct CheckoutService<'a> {
    store: &'a dyn OrderStore,
    gateway: &'a dyn PaymentGateway,
    retry: RetryPolicy,
    offset: FixedOffset,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        store: &'a dyn OrderStore,
        gateway: &'a dyn PaymentGateway,
        retry: RetryPolicy,
        offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            gateway,
            retry,
            offset,
        }
    }

    /// Validate and commit a public order, then request payment if asked.
    ///
    /// The order is always committed unpaid first. A gateway failure after
    /// that leaves it placed for later payment and fills
    /// [`Placement::payment_notice`].
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` for bad input and
    /// `CheckoutError::Repository` if the customer or order cannot be saved.
    #[instrument(skip(self, request), fields(pay_now = request.pay_now))]
    pub async fn place_order(
        &self,
        request: OrderRequest,
        now: DateTime<Utc>,
    ) -> Result<Placement, CheckoutError> {
        let state = CheckoutState::new().apply(CheckoutEvent::Submit {
            pay_now: request.pay_now,
        })?;

        let (choice, menu_item_id, location) =
            validate(&request).map_err(CheckoutError::Validation)?;

        let today = local_today(now, self.offset);
        let Some(item) = self.store.selected_menu_item(today, menu_item_id).await? else {
            return Err(CheckoutError::Validation(
                "That dish is not on today's menu".to_string(),
            ));
        };

        let customer = match choice {
            CustomerChoice::Existing(id) => self
                .store
                .customer(id)
                .await?
                .ok_or_else(|| CheckoutError::Validation("Please pick your name".to_string()))?,
            CustomerChoice::New { name, phone_number } => {
                let input = CustomerInput::new(&name, Some(phone_number.as_str()))
                    .map_err(CheckoutError::Validation)?;
                self.store.create_customer(&input).await?
            }
        };

        let schedule = resolve_delivery(now, today, self.offset);
        let new_order = NewOrder::from_menu_item(
            customer.id,
            &item,
            PaymentStatus::Unpaid,
            Some(location),
            schedule,
        );

        let order = self.store.create_order(&new_order).await.map_err(|e| {
            error!(error = %e, "Failed to save public order");
            CheckoutError::Repository(e)
        })?;
        let state = state.apply(CheckoutEvent::OrderInserted(order.id))?;

        if !request.pay_now {
            let state = state.apply(CheckoutEvent::PayLater)?;
            info!(order_id = %order.id, "Order placed, pay later");
            return Ok(Placement {
                order,
                customer,
                state,
                payment: None,
                payment_notice: None,
            });
        }

        match self.request_payment(&order).await {
            Ok(intent) => {
                let state = state.apply(CheckoutEvent::PaymentOrderCreated {
                    gateway_order_id: intent.gateway_order_id.clone(),
                })?;
                Ok(Placement {
                    order,
                    customer,
                    state,
                    payment: Some(intent),
                    payment_notice: None,
                })
            }
            Err(notice) => {
                let state = state.apply(CheckoutEvent::PaymentOrderFailed)?;
                Ok(Placement {
                    order,
                    customer,
                    state,
                    payment: None,
                    payment_notice: Some(notice),
                })
            }
        }
    }

    /// Create the gateway order and its attempt row. Errors are turned into
    /// payer-facing notices.
    async fn request_payment(&self, order: &Order) -> Result<PaymentIntent, String> {
        let amount_paise = order.amount.to_paise().map_err(|e| {
            warn!(order_id = %order.id, error = %e, "Order amount cannot be paid online");
            "This order has nothing to pay online.".to_string()
        })?;

        let receipt = order.id.to_string();
        let gateway_order = self
            .gateway
            .create_order(amount_paise, &receipt)
            .await
            .map_err(|e| {
                error!(order_id = %order.id, error = %e, "Failed to create gateway order");
                "Online payment is unavailable right now.".to_string()
            })?;

        let attempt = NewPaymentAttempt {
            order_id: order.id,
            gateway_order_id: gateway_order.id.clone(),
            amount_paise,
        };
        self.retry
            .run("record_attempt", || self.store.record_attempt(&attempt))
            .await
            .map_err(|e| {
                error!(order_id = %order.id, error = %e, "Failed to record payment attempt");
                "Online payment is unavailable right now.".to_string()
            })?;

        info!(order_id = %order.id, gateway_order_id = %gateway_order.id, "Payment requested");
        Ok(PaymentIntent {
            key_id: self.gateway.key_id().to_string(),
            gateway_order_id: gateway_order.id,
            amount_paise,
            currency: CURRENCY,
        })
    }

    /// Handle the widget's success callback.
    ///
    /// Returns `PaymentSettled` once the order is marked paid, or
    /// `PaymentPending` if the write is still outstanding after retries.
    /// A verified payment whose attempt cannot be settled because the store
    /// is unreachable is also `PaymentPending`; the gateway's
    /// `payment.captured` webhook settles it once the store is back.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotFound` for an unknown attempt,
    /// `CheckoutError::InvalidSignature` if the signature does not verify,
    /// and `CheckoutError::Repository` if the attempt cannot be read or the
    /// settle write fails permanently.
    #[instrument(skip(self, callback), fields(gateway_order_id = %callback.gateway_order_id))]
    pub async fn confirm_payment(
        &self,
        order_id: OrderId,
        callback: &PaymentCallback,
    ) -> Result<CheckoutState, CheckoutError> {
        let attempt = self.attempt_for(order_id, &callback.gateway_order_id).await?;

        if self
            .gateway
            .verify_checkout_signature(
                &callback.gateway_order_id,
                &callback.payment_id,
                &callback.signature,
            )
            .is_err()
        {
            warn!(%order_id, "Rejected payment callback with bad signature");
            return Err(CheckoutError::InvalidSignature);
        }

        let state = state_from_attempt(&attempt).apply(CheckoutEvent::PaymentSucceeded)?;
        if matches!(state, CheckoutState::PaymentSettled { .. }) {
            return Ok(state);
        }

        let settled = self
            .retry
            .run("settle_attempt", || {
                self.store
                    .settle_attempt(&callback.gateway_order_id, Some(callback.payment_id.as_str()))
            })
            .await;

        match settled {
            Ok(attempt) => Ok(self.acknowledge(state, &attempt).await),
            Err(e) if e.is_transient() => {
                error!(
                    %order_id,
                    payment_id = %callback.payment_id,
                    error = %e,
                    "Verified payment could not be recorded; waiting for webhook"
                );
                sentry::capture_error(&e);
                Ok(state)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Handle a dismissed or failed widget.
    ///
    /// The order stays unpaid. A payment that already settled is left alone.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotFound` for an unknown attempt.
    #[instrument(skip(self))]
    pub async fn abandon_payment(
        &self,
        order_id: OrderId,
        gateway_order_id: &str,
        failed: bool,
    ) -> Result<CheckoutState, CheckoutError> {
        let attempt = self.attempt_for(order_id, gateway_order_id).await?;
        let event = if failed {
            CheckoutEvent::PaymentFailed
        } else {
            CheckoutEvent::PaymentDismissed
        };
        let state = state_from_attempt(&attempt).apply(event)?;

        if matches!(state, CheckoutState::PaymentAbandoned { .. }) {
            let status = if failed {
                PaymentAttemptStatus::Failed
            } else {
                PaymentAttemptStatus::Abandoned
            };
            self.store.close_attempt(gateway_order_id, status).await?;
            info!(%order_id, %status, "Payment not completed, order left unpaid");
        }

        Ok(state)
    }

    /// Current checkout state for an order, from its latest attempt.
    ///
    /// Orders without an attempt are placed unpaid.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotFound` if the order does not exist.
    pub async fn status(&self, order_id: OrderId) -> Result<(Order, CheckoutState), CheckoutError> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or(CheckoutError::NotFound)?;

        let state = match self.store.latest_attempt(order_id).await? {
            Some(attempt) => state_from_attempt(&attempt),
            None if order.payment_status == PaymentStatus::Paid => {
                CheckoutState::PaymentSettled { order_id }
            }
            None => CheckoutState::PlacedUnpaid { order_id },
        };

        Ok((order, state))
    }

    /// Apply a verified webhook.
    ///
    /// Unknown orders and events we do not act on are accepted as handled.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the store is unreachable. The
    /// delivery must then be refused so the gateway sends it again; see
    /// [`CheckoutError::is_transient`].
    #[instrument(skip(self, event), fields(event = %event.event))]
    pub async fn handle_webhook(&self, event: &WebhookEvent) -> Result<(), CheckoutError> {
        let kind = event.kind();
        if kind == WebhookKind::Ignored {
            return Ok(());
        }

        let Some(gateway_order_id) = event.gateway_order_id() else {
            warn!("Webhook without an order ID");
            return Ok(());
        };

        let Some(attempt) = self.store.attempt_by_gateway_order(gateway_order_id).await? else {
            warn!(gateway_order_id, "Webhook for unknown gateway order");
            return Ok(());
        };

        match kind {
            WebhookKind::Settled => {
                let state = state_from_attempt(&attempt).apply(CheckoutEvent::PaymentSucceeded)?;
                if matches!(state, CheckoutState::PaymentSettled { .. }) {
                    return Ok(());
                }
                let attempt = self
                    .retry
                    .run("settle_attempt", || {
                        self.store
                            .settle_attempt(gateway_order_id, event.payment_id())
                    })
                    .await?;
                self.acknowledge(state, &attempt).await;
            }
            WebhookKind::Failed => {
                self.store
                    .close_attempt(gateway_order_id, PaymentAttemptStatus::Failed)
                    .await?;
            }
            WebhookKind::Ignored => {}
        }

        Ok(())
    }

    /// Mark the order paid, retrying transient failures.
    ///
    /// Every failed try is counted on the attempt. If the tries run out the
    /// attempt stays in the outbox and `state` (pending) is returned.
    async fn acknowledge(&self, state: CheckoutState, attempt: &PaymentAttempt) -> CheckoutState {
        if attempt.acknowledged_at.is_some() {
            return state
                .clone()
                .apply(CheckoutEvent::StatusAcknowledged)
                .unwrap_or(state);
        }

        let mut tries = 1;
        loop {
            match self.store.apply_settlement(attempt.id).await {
                Ok(_) => {
                    return state
                        .clone()
                        .apply(CheckoutEvent::StatusAcknowledged)
                        .unwrap_or(state);
                }
                Err(e) => {
                    if let Err(record_err) = self
                        .store
                        .record_apply_failure(attempt.id, &e.to_string())
                        .await
                    {
                        warn!(attempt_id = %attempt.id, error = %record_err, "Failed to record apply failure");
                    }

                    if !e.is_transient() || tries >= self.retry.max_attempts {
                        warn!(
                            attempt_id = %attempt.id,
                            order_id = %attempt.order_id,
                            tries,
                            error = %e,
                            "Payment settled but order not yet marked paid; leaving for reconciliation"
                        );
                        return state;
                    }

                    tokio::time::sleep(self.retry.delay_after(tries)).await;
                    tries += 1;
                }
            }
        }
    }

    /// Look up an attempt and check it belongs to `order_id`.
    async fn attempt_for(
        &self,
        order_id: OrderId,
        gateway_order_id: &str,
    ) -> Result<PaymentAttempt, CheckoutError> {
        match self.store.attempt_by_gateway_order(gateway_order_id).await? {
            Some(attempt) if attempt.order_id == order_id => Ok(attempt),
            _ => Err(CheckoutError::NotFound),
        }
    }
}

/// Rebuild the checkout state a stored attempt represents.
#[must_use]
pub fn state_from_attempt(attempt: &PaymentAttempt) -> CheckoutState {
    let order_id = attempt.order_id;
    let gateway_order_id = attempt.gateway_order_id.clone();
    match attempt.status {
        PaymentAttemptStatus::Created => CheckoutState::PaymentRequested {
            order_id,
            gateway_order_id,
        },
        PaymentAttemptStatus::Abandoned | PaymentAttemptStatus::Failed => {
            CheckoutState::PaymentAbandoned {
                order_id,
                gateway_order_id,
            }
        }
        PaymentAttemptStatus::Settled if attempt.acknowledged_at.is_some() => {
            CheckoutState::PaymentSettled { order_id }
        }
        PaymentAttemptStatus::Settled => CheckoutState::PaymentPending {
            order_id,
            gateway_order_id,
        },
    }
}

/// Mark paid every settled attempt whose order is not yet acknowledged.
///
/// # Errors
///
/// Returns `RepositoryError` if the outbox cannot be read.
pub async fn reconcile_once(store: &dyn OrderStore) -> Result<ReconcileReport, RepositoryError> {
    let pending = store.attempts_awaiting_acknowledgement(RECONCILE_BATCH).await?;
    let mut report = ReconcileReport::default();

    for attempt in pending {
        match store.apply_settlement(attempt.id).await {
            Ok(_) => {
                info!(attempt_id = %attempt.id, order_id = %attempt.order_id, "Reconciled settled payment");
                report.acknowledged += 1;
            }
            Err(e) => {
                warn!(attempt_id = %attempt.id, error = %e, "Reconciliation failed for attempt");
                if let Err(record_err) = store.record_apply_failure(attempt.id, &e.to_string()).await {
                    warn!(attempt_id = %attempt.id, error = %record_err, "Failed to record apply failure");
                }
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Check the required fields, returning the first problem as a message.
fn validate(request: &OrderRequest) -> Result<(CustomerChoice, MenuItemId, DeliveryLocation), String> {
    let choice = match &request.customer {
        None => return Err("Please pick your name or add yourself as a new customer".to_string()),
        Some(CustomerChoice::New { name, phone_number }) => {
            if name.trim().is_empty() {
                return Err("Please enter your name".to_string());
            }
            if phone_number.trim().is_empty() {
                return Err("Please enter your phone number".to_string());
            }
            CustomerChoice::New {
                name: name.clone(),
                phone_number: phone_number.clone(),
            }
        }
        Some(CustomerChoice::Existing(id)) => CustomerChoice::Existing(*id),
    };

    let menu_item_id = request
        .menu_item_id
        .ok_or_else(|| "Please choose a dish".to_string())?;
    let location = request
        .delivery_location
        .ok_or_else(|| "Please choose a delivery location".to_string())?;

    Ok((choice, menu_item_id, location))
}
