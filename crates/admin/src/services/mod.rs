//! Business logic services for the dashboard.
//!
//! # Services
//!
//! - `auth` - Argon2 staff login
//! - `checkout` - Public order placement and payment workflow
//! - `reconcile` - Background worker for settled-but-unapplied payments

pub mod auth;
pub mod checkout;
pub mod reconcile;

pub use auth::{AdminAuthError, AdminAuthService, hash_password};
pub use checkout::{
    CheckoutError, CheckoutService, CustomerChoice, OrderRequest, OrderStore, PaymentCallback,
    PaymentIntent, PgOrderStore, Placement, ReconcileReport, RetryPolicy, reconcile_once,
    state_from_attempt,
};
pub use reconcile::Reconciler;
