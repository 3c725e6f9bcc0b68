//! Database operations for payment attempts.
//!
//! A settled attempt without `acknowledged_at` is pending work: the order
//! still has to be marked paid. [`PaymentAttemptRepository::apply_settlement`]
//! does both writes in one transaction so the two never disagree.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use jmd_tiffins_core::{OrderId, PaymentAttemptId, PaymentAttemptStatus};

use super::{RepositoryError, map_constraint};
use crate::models::{NewPaymentAttempt, PaymentAttempt};

#[derive(Debug, sqlx::FromRow)]
struct PaymentAttemptRow {
    id: PaymentAttemptId,
    order_id: OrderId,
    gateway_order_id: String,
    gateway_payment_id: Option<String>,
    amount_paise: i64,
    status: PaymentAttemptStatus,
    apply_failures: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    settled_at: Option<DateTime<Utc>>,
    acknowledged_at: Option<DateTime<Utc>>,
}

impl From<PaymentAttemptRow> for PaymentAttempt {
    fn from(row: PaymentAttemptRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            gateway_order_id: row.gateway_order_id,
            gateway_payment_id: row.gateway_payment_id,
            amount_paise: row.amount_paise,
            status: row.status,
            apply_failures: row.apply_failures,
            last_error: row.last_error,
            created_at: row.created_at,
            settled_at: row.settled_at,
            acknowledged_at: row.acknowledged_at,
        }
    }
}

const ATTEMPT_COLUMNS: &str = "id, order_id, gateway_order_id, gateway_payment_id, amount_paise, \
    status, apply_failures, last_error, created_at, settled_at, acknowledged_at";

/// Repository for payment attempt operations.
pub struct PaymentAttemptRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentAttemptRepository<'a> {
    /// Create a new payment attempt repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a freshly created gateway order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the gateway order ID is already
    /// recorded.
    pub async fn create(&self, attempt: &NewPaymentAttempt) -> Result<PaymentAttempt, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentAttemptRow>(&format!(
            r"
            INSERT INTO payment_attempts (order_id, gateway_order_id, amount_paise)
            VALUES ($1, $2, $3)
            RETURNING {ATTEMPT_COLUMNS}
            "
        ))
        .bind(attempt.order_id)
        .bind(&attempt.gateway_order_id)
        .bind(attempt.amount_paise)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            map_constraint(
                e,
                "payment_attempts_gateway_order_id_key",
                "gateway order already recorded",
            )
        })?;

        Ok(row.into())
    }

    /// Look up an attempt by the gateway's order ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentAttempt>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentAttemptRow>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM payment_attempts WHERE gateway_order_id = $1"
        ))
        .bind(gateway_order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// The most recent attempt for an order, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_for_order(&self, order_id: OrderId) -> Result<Option<PaymentAttempt>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentAttemptRow>(&format!(
            r"
            SELECT {ATTEMPT_COLUMNS} FROM payment_attempts
            WHERE order_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "
        ))
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Mark an attempt settled. Idempotent: the first settlement time and a
    /// known payment ID are kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no attempt has this gateway
    /// order ID.
    pub async fn mark_settled(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<PaymentAttempt, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentAttemptRow>(&format!(
            r"
            UPDATE payment_attempts
            SET status = 'settled',
                gateway_payment_id = COALESCE($2, gateway_payment_id),
                settled_at = COALESCE(settled_at, now())
            WHERE gateway_order_id = $1
            RETURNING {ATTEMPT_COLUMNS}
            "
        ))
        .bind(gateway_order_id)
        .bind(gateway_payment_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Close an attempt as abandoned or failed.
    ///
    /// Only attempts still `created` or `abandoned` change. A settled attempt
    /// is returned untouched so a late dismissal cannot undo a payment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no attempt has this gateway
    /// order ID, or `RepositoryError::DataCorruption` if `status` is not a
    /// closing status.
    pub async fn mark_closed(
        &self,
        gateway_order_id: &str,
        status: PaymentAttemptStatus,
    ) -> Result<PaymentAttempt, RepositoryError> {
        if !matches!(
            status,
            PaymentAttemptStatus::Abandoned | PaymentAttemptStatus::Failed
        ) {
            return Err(RepositoryError::DataCorruption(format!(
                "{status} is not a closing status"
            )));
        }

        let updated = sqlx::query_as::<_, PaymentAttemptRow>(&format!(
            r"
            UPDATE payment_attempts
            SET status = $2
            WHERE gateway_order_id = $1 AND status IN ('created', 'abandoned')
            RETURNING {ATTEMPT_COLUMNS}
            "
        ))
        .bind(gateway_order_id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?;

        match updated {
            Some(row) => Ok(row.into()),
            None => self
                .get_by_gateway_order_id(gateway_order_id)
                .await?
                .ok_or(RepositoryError::NotFound),
        }
    }

    /// Mark the order paid and the attempt acknowledged, atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the attempt or its order is
    /// gone, or `RepositoryError::Database` if the transaction fails.
    pub async fn apply_settlement(&self, id: PaymentAttemptId) -> Result<PaymentAttempt, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order_id: OrderId = sqlx::query_scalar(
            "SELECT order_id FROM payment_attempts WHERE id = $1 AND status = 'settled' FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let orders_updated = sqlx::query(
            "UPDATE orders SET payment_status = 'paid', updated_at = now() WHERE id = $1",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if orders_updated == 0 {
            return Err(RepositoryError::NotFound);
        }

        let row = sqlx::query_as::<_, PaymentAttemptRow>(&format!(
            r"
            UPDATE payment_attempts
            SET acknowledged_at = COALESCE(acknowledged_at, now())
            WHERE id = $1
            RETURNING {ATTEMPT_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(attempt_id = %id, %order_id, "Order marked paid");
        Ok(row.into())
    }

    /// Count a failed attempt to apply the paid status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_apply_failure(&self, id: PaymentAttemptId, error: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE payment_attempts
            SET apply_failures = apply_failures + 1, last_error = $2
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(error)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Settled attempts whose order has not been confirmed paid, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_awaiting_acknowledgement(&self, limit: i64) -> Result<Vec<PaymentAttempt>, RepositoryError> {
        let rows = sqlx::query_as::<_, PaymentAttemptRow>(&format!(
            r"
            SELECT {ATTEMPT_COLUMNS} FROM payment_attempts
            WHERE status = 'settled' AND acknowledged_at IS NULL
            ORDER BY settled_at, id
            LIMIT $1
            "
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
