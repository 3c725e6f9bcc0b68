//! Background worker that finishes settled payments.
//!
//! A payment can settle at the gateway while the order row is still unpaid,
//! when the write after the widget callback ran out of retries. Those
//! attempts sit in `payment_attempts` with `acknowledged_at` unset until a
//! pass of [`reconcile_once`] marks their orders paid.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::checkout::{OrderStore, reconcile_once};

/// Periodic reconciliation of the payment outbox.
pub struct Reconciler {
    store: Arc<dyn OrderStore>,
    interval: Duration,
}

impl Reconciler {
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Run on the tokio runtime until the handle is aborted.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        tracing::info!(interval = ?self.interval, "Payment reconciler started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            run_pass(self.store.as_ref()).await;
        }
    }
}

async fn run_pass(store: &dyn OrderStore) {
    match reconcile_once(store).await {
        Ok(report) if report.acknowledged > 0 || report.failed > 0 => {
            tracing::info!(
                acknowledged = report.acknowledged,
                failed = report.failed,
                "Reconciled settled payments"
            );
        }
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "Payment reconciliation pass failed"),
    }
}
