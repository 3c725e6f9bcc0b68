//! In-memory store and gateway for checkout tests.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use jmd_tiffins_core::{
    CustomerId, MealCategory, MenuItemId, Money, OrderId, PaymentAttemptId, PaymentAttemptStatus,
    PaymentStatus,
};

use super::{OrderStore, PaymentCallback};
use crate::db::RepositoryError;
use crate::models::{
    Customer, CustomerInput, MenuItem, NewOrder, NewPaymentAttempt, Order, PaymentAttempt,
};
use crate::payments::{GatewayError, GatewayOrder, PaymentGateway, signature};

pub const FAKE_KEY_SECRET: &str = "fake_key_secret";

#[derive(Default)]
struct Tables {
    selection: Vec<(NaiveDate, MenuItem)>,
    customers: Vec<Customer>,
    orders: Vec<Order>,
    attempts: Vec<PaymentAttempt>,
}

/// Store with one customer (id 1) and one dish (id 10, ₹120) on the menu.
#[derive(Default)]
pub struct FakeStore {
    tables: Mutex<Tables>,
    failing_applies: AtomicU32,
    failing_settles: AtomicU32,
    fail_order_insert: AtomicBool,
}

impl FakeStore {
    pub fn with_menu(date: NaiveDate) -> Self {
        let store = Self::default();
        {
            let mut tables = store.tables.lock().unwrap();
            tables.customers.push(Customer {
                id: CustomerId::new(1),
                name: "Asha".to_string(),
                phone_number: Some("98450 12345".to_string()),
                created_at: Utc::now(),
            });
            tables.selection.push((
                date,
                MenuItem {
                    id: MenuItemId::new(10),
                    date,
                    title: "Veg Thali".to_string(),
                    category: MealCategory::Lunch,
                    price: Money::new(Decimal::from(120)),
                    description: None,
                    created_at: Utc::now(),
                },
            ));
        }
        store
    }

    /// Make the next `n` settlement applies fail with a transient error.
    pub fn fail_apply_times(&self, n: u32) {
        self.failing_applies.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` attempt settle writes fail with a transient error.
    pub fn fail_settle_times(&self, n: u32) {
        self.failing_settles.store(n, Ordering::SeqCst);
    }

    pub fn fail_order_insert(&self) {
        self.fail_order_insert.store(true, Ordering::SeqCst);
    }

    pub fn customers(&self) -> Vec<Customer> {
        self.tables.lock().unwrap().customers.clone()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.tables.lock().unwrap().orders.clone()
    }

    pub fn attempts(&self) -> Vec<PaymentAttempt> {
        self.tables.lock().unwrap().attempts.clone()
    }

    fn update_attempt<F>(&self, gateway_order_id: &str, f: F) -> Result<PaymentAttempt, RepositoryError>
    where
        F: FnOnce(&mut PaymentAttempt),
    {
        let mut tables = self.tables.lock().unwrap();
        let attempt = tables
            .attempts
            .iter_mut()
            .find(|a| a.gateway_order_id == gateway_order_id)
            .ok_or(RepositoryError::NotFound)?;
        f(attempt);
        Ok(attempt.clone())
    }
}

fn next_id(len: usize) -> i32 {
    i32::try_from(len).unwrap() + 1
}

#[async_trait]
impl OrderStore for FakeStore {
    async fn selected_menu_item(
        &self,
        date: NaiveDate,
        id: MenuItemId,
    ) -> Result<Option<MenuItem>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .selection
            .iter()
            .find(|(d, item)| *d == date && item.id == id)
            .map(|(_, item)| item.clone()))
    }

    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .customers
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn create_customer(&self, input: &CustomerInput) -> Result<Customer, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        let customer = Customer {
            id: CustomerId::new(next_id(tables.customers.len())),
            name: input.name.clone(),
            phone_number: input.phone_number.clone(),
            created_at: Utc::now(),
        };
        tables.customers.push(customer.clone());
        Ok(customer)
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        if self.fail_order_insert.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }
        let mut tables = self.tables.lock().unwrap();
        let row = Order {
            id: OrderId::new(next_id(tables.orders.len())),
            customer_id: order.customer_id,
            order_details: order.order_details.clone(),
            amount: order.amount,
            payment_status: order.payment_status,
            delivery_location: order.delivery_location,
            delivery_date: order.schedule.delivery_date,
            created_at: order.schedule.created_at,
            updated_at: Utc::now(),
        };
        tables.orders.push(row.clone());
        Ok(row)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .orders
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn record_attempt(
        &self,
        attempt: &NewPaymentAttempt,
    ) -> Result<PaymentAttempt, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        let row = PaymentAttempt {
            id: PaymentAttemptId::new(next_id(tables.attempts.len())),
            order_id: attempt.order_id,
            gateway_order_id: attempt.gateway_order_id.clone(),
            gateway_payment_id: None,
            amount_paise: attempt.amount_paise,
            status: PaymentAttemptStatus::Created,
            apply_failures: 0,
            last_error: None,
            created_at: Utc::now(),
            settled_at: None,
            acknowledged_at: None,
        };
        tables.attempts.push(row.clone());
        Ok(row)
    }

    async fn attempt_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentAttempt>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .attempts
            .iter()
            .find(|a| a.gateway_order_id == gateway_order_id)
            .cloned())
    }

    async fn latest_attempt(&self, order_id: OrderId) -> Result<Option<PaymentAttempt>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .attempts
            .iter()
            .rev()
            .find(|a| a.order_id == order_id)
            .cloned())
    }

    async fn settle_attempt(
        &self,
        gateway_order_id: &str,
        payment_id: Option<&str>,
    ) -> Result<PaymentAttempt, RepositoryError> {
        let remaining = self.failing_settles.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_settles.store(remaining - 1, Ordering::SeqCst);
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }

        self.update_attempt(gateway_order_id, |a| {
            a.status = PaymentAttemptStatus::Settled;
            if let Some(id) = payment_id {
                a.gateway_payment_id = Some(id.to_string());
            }
            a.settled_at.get_or_insert_with(Utc::now);
        })
    }

    async fn close_attempt(
        &self,
        gateway_order_id: &str,
        status: PaymentAttemptStatus,
    ) -> Result<PaymentAttempt, RepositoryError> {
        self.update_attempt(gateway_order_id, |a| {
            if a.status.can_transition_to(status) {
                a.status = status;
            }
        })
    }

    async fn apply_settlement(&self, id: PaymentAttemptId) -> Result<PaymentAttempt, RepositoryError> {
        let remaining = self.failing_applies.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_applies.store(remaining - 1, Ordering::SeqCst);
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut tables = self.tables.lock().unwrap();
        let Tables {
            orders, attempts, ..
        } = &mut *tables;
        let attempt = attempts
            .iter_mut()
            .find(|a| a.id == id && a.status == PaymentAttemptStatus::Settled)
            .ok_or(RepositoryError::NotFound)?;
        let order = orders
            .iter_mut()
            .find(|o| o.id == attempt.order_id)
            .ok_or(RepositoryError::NotFound)?;
        order.payment_status = PaymentStatus::Paid;
        attempt.acknowledged_at.get_or_insert_with(Utc::now);
        Ok(attempt.clone())
    }

    async fn record_apply_failure(
        &self,
        id: PaymentAttemptId,
        error: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(attempt) = tables.attempts.iter_mut().find(|a| a.id == id) {
            attempt.apply_failures += 1;
            attempt.last_error = Some(error.to_string());
        }
        Ok(())
    }

    async fn attempts_awaiting_acknowledgement(
        &self,
        limit: i64,
    ) -> Result<Vec<PaymentAttempt>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .attempts
            .iter()
            .filter(|a| a.awaiting_acknowledgement())
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }
}

/// Gateway that hands out sequential order IDs and signs with a fixed key.
#[derive(Default)]
pub struct FakeGateway {
    failing: bool,
    created: AtomicU32,
    last_receipt: Mutex<Option<String>>,
}

impl FakeGateway {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn orders_created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn last_receipt(&self) -> Option<String> {
        self.last_receipt.lock().unwrap().clone()
    }

    /// A correctly signed success callback.
    pub fn callback(&self, gateway_order_id: &str, payment_id: &str) -> PaymentCallback {
        let message = signature::checkout_message(gateway_order_id, payment_id);
        PaymentCallback {
            gateway_order_id: gateway_order_id.to_string(),
            payment_id: payment_id.to_string(),
            signature: signature::hmac_sha256_hex(FAKE_KEY_SECRET, message.as_bytes()),
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn key_id(&self) -> &str {
        "rzp_test_fake"
    }

    async fn create_order(&self, amount_paise: i64, receipt: &str) -> Result<GatewayOrder, GatewayError> {
        if self.failing {
            return Err(GatewayError::Api {
                status: 500,
                message: "gateway down".to_string(),
            });
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_receipt.lock().unwrap() = Some(receipt.to_string());
        Ok(GatewayOrder {
            id: format!("order_fake{n}"),
            amount: amount_paise,
            currency: "INR".to_string(),
            receipt: Some(receipt.to_string()),
            status: Some("created".to_string()),
        })
    }

    fn verify_checkout_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        sig: &str,
    ) -> Result<(), GatewayError> {
        let message = signature::checkout_message(gateway_order_id, payment_id);
        if signature::verify(FAKE_KEY_SECRET, message.as_bytes(), sig) {
            Ok(())
        } else {
            Err(GatewayError::InvalidSignature("mismatch".to_string()))
        }
    }

    fn verify_webhook_signature(&self, body: &[u8], sig: &str) -> Result<(), GatewayError> {
        if signature::verify(FAKE_KEY_SECRET, body, sig) {
            Ok(())
        } else {
            Err(GatewayError::InvalidSignature("mismatch".to_string()))
        }
    }
}
