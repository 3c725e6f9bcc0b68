//! Integration tests for JMD Tiffins.
//!
//! # Running Tests
//!
//! ```bash
//! # Database tests (sqlx creates a throwaway database per test)
//! DATABASE_URL=postgres://localhost/jmd_test cargo test -p jmd-tiffins-integration-tests -- --ignored
//!
//! # HTTP smoke tests against a running server
//! DASHBOARD_BASE_URL=http://localhost:3000 cargo test -p jmd-tiffins-integration-tests --test http_smoke -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `repositories` - Menu, today's menu, orders and stats against `PostgreSQL`
//! - `payment_outbox` - Checkout, settlement and reconciliation against `PostgreSQL`
//! - `http_smoke` - Public and staff pages over HTTP

use chrono::NaiveDate;
use rust_decimal::Decimal;

use jmd_tiffins_admin::models::{CustomerInput, MenuItemInput};
use jmd_tiffins_core::{MealCategory, Money};

/// A menu item input priced in whole rupees.
#[must_use]
pub fn menu_item(date: NaiveDate, title: &str, category: MealCategory, rupees: i64) -> MenuItemInput {
    MenuItemInput {
        date,
        title: title.to_string(),
        category,
        price: Money::new(Decimal::from(rupees)),
        description: None,
    }
}

/// A customer input with a phone number.
///
/// # Panics
///
/// Panics if `name` is blank.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn customer(name: &str) -> CustomerInput {
    CustomerInput::new(name, Some("9876543210")).unwrap()
}
