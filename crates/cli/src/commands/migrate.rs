//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! jmd-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `TIFFIN_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Stored in `crates/admin/migrations/`:
//! ```text
//! migrations/
//! ├── 20240301000001_create_orders_schema.sql
//! ├── 20240301000002_create_payment_attempts.sql
//! └── 20240301000003_create_session_store.sql
//! ```

use secrecy::ExposeSecret;
use sqlx::PgPool;

use super::{CommandError, database_url};

/// Run the dashboard migrations.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../admin/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
