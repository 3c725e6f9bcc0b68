//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use jmd_tiffins_core::business_offset;

use crate::config::AdminConfig;
use crate::payments::{GatewayError, PaymentGateway, RazorpayClient};
use crate::services::{CheckoutService, PgOrderStore, RetryPolicy};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    store: PgOrderStore,
    gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    /// Create a new application state with the Razorpay gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client for the gateway cannot be built.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, GatewayError> {
        let gateway = Arc::new(RazorpayClient::new(&config.razorpay)?);
        Ok(Self::with_gateway(config, pool, gateway))
    }

    /// Create application state around an existing gateway.
    #[must_use]
    pub fn with_gateway(
        config: AdminConfig,
        pool: PgPool,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let store = PgOrderStore::new(pool.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                store,
                gateway,
            }),
        }
    }

    /// Get a reference to the dashboard configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn store(&self) -> &PgOrderStore {
        &self.inner.store
    }

    #[must_use]
    pub fn gateway(&self) -> &dyn PaymentGateway {
        self.inner.gateway.as_ref()
    }

    /// Checkout workflow bound to this state's store and gateway.
    #[must_use]
    pub fn checkout(&self) -> CheckoutService<'_> {
        CheckoutService::new(
            self.store(),
            self.gateway(),
            RetryPolicy::default(),
            business_offset(),
        )
    }
}
