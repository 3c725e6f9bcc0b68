//! Storage seam for the checkout workflow.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use jmd_tiffins_core::{CustomerId, MenuItemId, OrderId, PaymentAttemptId, PaymentAttemptStatus};

use crate::db::{
    CustomerRepository, OrderRepository, PaymentAttemptRepository, RepositoryError,
    TodaysMenuRepository,
};
use crate::models::{
    Customer, CustomerInput, MenuItem, NewOrder, NewPaymentAttempt, Order, PaymentAttempt,
};

/// Everything checkout and reconciliation read and write.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// A menu item, only if it is in the selection for `date`.
    async fn selected_menu_item(
        &self,
        date: NaiveDate,
        id: MenuItemId,
    ) -> Result<Option<MenuItem>, RepositoryError>;

    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    async fn create_customer(&self, input: &CustomerInput) -> Result<Customer, RepositoryError>;

    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn record_attempt(
        &self,
        attempt: &NewPaymentAttempt,
    ) -> Result<PaymentAttempt, RepositoryError>;

    async fn attempt_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentAttempt>, RepositoryError>;

    async fn latest_attempt(&self, order_id: OrderId) -> Result<Option<PaymentAttempt>, RepositoryError>;

    async fn settle_attempt(
        &self,
        gateway_order_id: &str,
        payment_id: Option<&str>,
    ) -> Result<PaymentAttempt, RepositoryError>;

    async fn close_attempt(
        &self,
        gateway_order_id: &str,
        status: PaymentAttemptStatus,
    ) -> Result<PaymentAttempt, RepositoryError>;

    /// Mark the attempt's order paid and the attempt acknowledged together.
    async fn apply_settlement(&self, id: PaymentAttemptId) -> Result<PaymentAttempt, RepositoryError>;

    async fn record_apply_failure(
        &self,
        id: PaymentAttemptId,
        error: &str,
    ) -> Result<(), RepositoryError>;

    async fn attempts_awaiting_acknowledgement(
        &self,
        limit: i64,
    ) -> Result<Vec<PaymentAttempt>, RepositoryError>;
}

/// [`OrderStore`] backed by the `PostgreSQL` repositories.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn selected_menu_item(
        &self,
        date: NaiveDate,
        id: MenuItemId,
    ) -> Result<Option<MenuItem>, RepositoryError> {
        TodaysMenuRepository::new(&self.pool)
            .selected_item(date, id)
            .await
    }

    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        CustomerRepository::new(&self.pool).get(id).await
    }

    async fn create_customer(&self, input: &CustomerInput) -> Result<Customer, RepositoryError> {
        CustomerRepository::new(&self.pool).create(input).await
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        OrderRepository::new(&self.pool).create(order).await
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).get(id).await
    }

    async fn record_attempt(
        &self,
        attempt: &NewPaymentAttempt,
    ) -> Result<PaymentAttempt, RepositoryError> {
        PaymentAttemptRepository::new(&self.pool)
            .create(attempt)
            .await
    }

    async fn attempt_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentAttempt>, RepositoryError> {
        PaymentAttemptRepository::new(&self.pool)
            .get_by_gateway_order_id(gateway_order_id)
            .await
    }

    async fn latest_attempt(&self, order_id: OrderId) -> Result<Option<PaymentAttempt>, RepositoryError> {
        PaymentAttemptRepository::new(&self.pool)
            .latest_for_order(order_id)
            .await
    }

    async fn settle_attempt(
        &self,
        gateway_order_id: &str,
        payment_id: Option<&str>,
    ) -> Result<PaymentAttempt, RepositoryError> {
        PaymentAttemptRepository::new(&self.pool)
            .mark_settled(gateway_order_id, payment_id)
            .await
    }

    async fn close_attempt(
        &self,
        gateway_order_id: &str,
        status: PaymentAttemptStatus,
    ) -> Result<PaymentAttempt, RepositoryError> {
        PaymentAttemptRepository::new(&self.pool)
            .mark_closed(gateway_order_id, status)
            .await
    }

    async fn apply_settlement(&self, id: PaymentAttemptId) -> Result<PaymentAttempt, RepositoryError> {
        PaymentAttemptRepository::new(&self.pool)
            .apply_settlement(id)
            .await
    }

    async fn record_apply_failure(
        &self,
        id: PaymentAttemptId,
        error: &str,
    ) -> Result<(), RepositoryError> {
        PaymentAttemptRepository::new(&self.pool)
            .record_apply_failure(id, error)
            .await
    }

    async fn attempts_awaiting_acknowledgement(
        &self,
        limit: i64,
    ) -> Result<Vec<PaymentAttempt>, RepositoryError> {
        PaymentAttemptRepository::new(&self.pool)
            .list_awaiting_acknowledgement(limit)
            .await
    }
}
