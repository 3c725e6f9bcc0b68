//! One-off payment reconciliation.
//!
//! Runs the same pass as the dashboard's background worker: every payment
//! attempt the gateway settled but whose order is not yet marked paid is
//! applied now.
//!
//! ```bash
//! jmd-cli reconcile-payments
//! ```

use secrecy::ExposeSecret;
use sqlx::PgPool;

use jmd_tiffins_admin::services::{PgOrderStore, reconcile_once};

use super::{CommandError, database_url};

/// Run one reconciliation pass.
pub async fn reconcile() -> Result<(), CommandError> {
    let database_url = database_url()?;
    let pool = PgPool::connect(database_url.expose_secret()).await?;
    let store = PgOrderStore::new(pool);

    let report = reconcile_once(&store).await?;
    tracing::info!(
        acknowledged = report.acknowledged,
        failed = report.failed,
        "Reconciliation pass complete"
    );
    Ok(())
}
