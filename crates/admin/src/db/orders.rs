//! Database operations for orders and dashboard figures.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use jmd_tiffins_core::{CustomerId, DeliveryLocation, Money, OrderId, PaymentStatus};

use super::{RepositoryError, map_constraint};
use crate::models::{DashboardStats, NewOrder, Order, OrderFilter, OrderUpdate, OrderWithCustomer};

const CUSTOMER_FK: &str = "orders_customer_id_fkey";
const CUSTOMER_MISSING: &str = "customer does not exist";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_id: CustomerId,
    order_details: String,
    amount: Money,
    payment_status: PaymentStatus,
    delivery_location: Option<DeliveryLocation>,
    delivery_date: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            order_details: row.order_details,
            amount: row.amount,
            payment_status: row.payment_status,
            delivery_location: row.delivery_location,
            delivery_date: row.delivery_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderWithCustomerRow {
    #[sqlx(flatten)]
    order: OrderRow,
    customer_name: String,
}

impl From<OrderWithCustomerRow> for OrderWithCustomer {
    fn from(row: OrderWithCustomerRow) -> Self {
        Self {
            order: row.order.into(),
            customer_name: row.customer_name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    total_sales: Money,
    total_orders: i64,
    total_revenue: Money,
    todays_earnings: Money,
}

const ORDER_COLUMNS: &str = "id, customer_id, order_details, amount, payment_status, \
    delivery_location, delivery_date, created_at, updated_at";

// Shared WHERE clause for the filtered listing and its count.
const FILTER_CLAUSE: &str = r"
    ($1::DATE IS NULL OR o.delivery_date = $1)
    AND ($2::INTEGER IS NULL OR o.customer_id = $2)
    AND ($3::payment_status IS NULL OR o.payment_status = $3)
";

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of orders matching `filter`, newest delivery date first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<OrderWithCustomer>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderWithCustomerRow>(&format!(
            r"
            SELECT
                o.id, o.customer_id, o.order_details, o.amount, o.payment_status,
                o.delivery_location, o.delivery_date, o.created_at, o.updated_at,
                c.name AS customer_name
            FROM orders o
            JOIN customers c ON c.id = o.customer_id
            WHERE {FILTER_CLAUSE}
            ORDER BY o.delivery_date DESC, o.id DESC
            LIMIT $4 OFFSET $5
            "
        ))
        .bind(filter.delivery_date)
        .bind(filter.customer_id)
        .bind(filter.payment_status)
        .bind(filter.limit())
        .bind(filter.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Number of orders matching `filter`, ignoring pagination.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, filter: &OrderFilter) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM orders o WHERE {FILTER_CLAUSE}"
        ))
        .bind(filter.delivery_date)
        .bind(filter.customer_id)
        .bind(filter.payment_status)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Every order for one customer, newest delivery date first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = $1 ORDER BY delivery_date DESC, id DESC"
        ))
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert an order with its resolved delivery date and creation instant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the customer does not exist.
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO orders (
                customer_id, order_details, amount, payment_status,
                delivery_location, delivery_date, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, now())
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.customer_id)
        .bind(&order.order_details)
        .bind(order.amount)
        .bind(order.payment_status)
        .bind(order.delivery_location)
        .bind(order.schedule.delivery_date)
        .bind(order.schedule.created_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_constraint(e, CUSTOMER_FK, CUSTOMER_MISSING))?;

        tracing::info!(
            order_id = %row.id,
            customer_id = %row.customer_id,
            delivery_date = %row.delivery_date,
            "Order created"
        );
        Ok(row.into())
    }

    /// Overwrite the editable fields of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist, or
    /// `RepositoryError::Conflict` if the new customer does not exist.
    pub async fn update(&self, id: OrderId, update: &OrderUpdate) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE orders
            SET customer_id = $2,
                order_details = $3,
                amount = $4,
                payment_status = $5,
                delivery_location = $6,
                delivery_date = $7,
                updated_at = now()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.customer_id)
        .bind(&update.order_details)
        .bind(update.amount)
        .bind(update.payment_status)
        .bind(update.delivery_location)
        .bind(update.delivery_date)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_constraint(e, CUSTOMER_FK, CUSTOMER_MISSING))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Change only the payment status of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_payment_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE orders SET payment_status = $2, updated_at = now()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete an order. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Dashboard stat cards, with `today` as the business-local date.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self, today: NaiveDate) -> Result<DashboardStats, RepositoryError> {
        let row = sqlx::query_as::<_, StatsRow>(
            r"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE payment_status IN ('paid', 'partial')), 0)::NUMERIC(12, 2)
                    AS total_sales,
                COUNT(*) AS total_orders,
                COALESCE(SUM(amount), 0)::NUMERIC(12, 2) AS total_revenue,
                COALESCE(SUM(amount) FILTER (WHERE payment_status = 'paid' AND delivery_date = $1), 0)::NUMERIC(12, 2)
                    AS todays_earnings
            FROM orders
            ",
        )
        .bind(today)
        .fetch_one(self.pool)
        .await?;

        Ok(DashboardStats {
            total_sales: row.total_sales,
            total_orders: row.total_orders,
            total_revenue: row.total_revenue,
            todays_earnings: row.todays_earnings,
        })
    }
}
