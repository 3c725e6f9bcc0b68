//! Database operations for customers.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use jmd_tiffins_core::{CustomerId, Money};

use super::RepositoryError;
use crate::models::{Customer, CustomerInput, CustomerSummary};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    name: String,
    phone_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            phone_number: row.phone_number,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerSummaryRow {
    id: CustomerId,
    name: String,
    phone_number: Option<String>,
    created_at: DateTime<Utc>,
    total_orders: i64,
    amount_paid: Money,
    amount_pending: Money,
}

impl From<CustomerSummaryRow> for CustomerSummary {
    fn from(row: CustomerSummaryRow) -> Self {
        Self {
            customer: Customer {
                id: row.id,
                name: row.name,
                phone_number: row.phone_number,
                created_at: row.created_at,
            },
            total_orders: row.total_orders,
            amount_paid: row.amount_paid,
            amount_pending: row.amount_pending,
        }
    }
}

const CUSTOMER_COLUMNS: &str = "id, name, phone_number, created_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for customer database operations.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all customers ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY lower(name), id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// List all customers with their order count, paid total and pending total.
    ///
    /// Pending is every order not marked paid, so partial payments count in
    /// full until the order is settled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_summaries(&self) -> Result<Vec<CustomerSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerSummaryRow>(
            r"
            SELECT
                c.id, c.name, c.phone_number, c.created_at,
                COUNT(o.id) AS total_orders,
                COALESCE(SUM(o.amount) FILTER (WHERE o.payment_status = 'paid'), 0)::NUMERIC(12, 2)
                    AS amount_paid,
                COALESCE(SUM(o.amount) FILTER (WHERE o.payment_status <> 'paid'), 0)::NUMERIC(12, 2)
                    AS amount_pending
            FROM customers c
            LEFT JOIN orders o ON o.customer_id = c.id
            GROUP BY c.id
            ORDER BY lower(c.name), c.id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &CustomerInput) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "INSERT INTO customers (name, phone_number) VALUES ($1, $2) RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.phone_number)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Update a customer's name and phone number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    pub async fn update(
        &self,
        id: CustomerId,
        input: &CustomerInput,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "UPDATE customers SET name = $2, phone_number = $3 WHERE id = $1 RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.phone_number)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a customer and, by cascade, their orders.
    ///
    /// Returns `false` if the customer did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: CustomerId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
