//! Domain models for the dashboard.
//!
//! These are the typed records that flow between repositories, services,
//! and route handlers. Database row structs live next to their queries in
//! [`crate::db`] and convert into these types.

pub mod customer;
pub mod menu;
pub mod order;
pub mod payment;
pub mod session;

pub use customer::{Customer, CustomerInput, CustomerSummary};
pub use menu::{MenuItem, MenuItemInput};
pub use order::{DashboardStats, NewOrder, Order, OrderFilter, OrderUpdate, OrderWithCustomer};
pub use payment::{NewPaymentAttempt, PaymentAttempt};
pub use session::{CurrentAdmin, keys as session_keys};
