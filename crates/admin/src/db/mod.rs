//! Database operations for the dashboard `PostgreSQL`.
//!
//! ## Tables
//!
//! - `customers` - People who order
//! - `menu_items` - Dishes offered per date
//! - `todays_menu` - Orderable subset of the menu for a date
//! - `orders` - Orders with snapshotted details and amount
//! - `payment_attempts` - Gateway orders and their settlement progress
//! - `auth.session` - Session storage (tower-sessions)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p jmd-tiffins-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`query_as::<_, Row>`) so the crate builds
//! without a live database.

pub mod customers;
pub mod menu;
pub mod orders;
pub mod payment_attempts;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use customers::CustomerRepository;
pub use menu::{MenuRepository, TodaysMenuRepository};
pub use orders::OrderRepository;
pub use payment_attempts::PaymentAttemptRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., order for a deleted customer).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Whether retrying the same statement might succeed.
    ///
    /// Connection and pool errors are transient; constraint violations and
    /// missing rows are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Database(
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
                    | sqlx::Error::Protocol(_)
                    | sqlx::Error::Tls(_)
            )
        )
    }
}

/// Map a foreign-key or unique violation on `constraint` to `Conflict`.
pub(crate) fn map_constraint(e: sqlx::Error, constraint: &str, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.constraint() == Some(constraint)
    {
        return RepositoryError::Conflict(message.to_string());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
