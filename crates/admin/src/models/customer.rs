//! Customer records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use jmd_tiffins_core::{CustomerId, Money, PaymentStatus};

use super::Order;

/// A person who orders tiffins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating or editing a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerInput {
    pub name: String,
    pub phone_number: Option<String>,
}

impl CustomerInput {
    /// Normalize raw form values.
    ///
    /// Trims both fields and treats a blank phone number as absent.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message if the name is blank.
    pub fn new(name: &str, phone_number: Option<&str>) -> Result<Self, String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Name is required".to_string());
        }
        let phone_number = phone_number
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from);
        Ok(Self {
            name: name.to_string(),
            phone_number,
        })
    }
}

/// A customer with order totals for the customers table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSummary {
    pub customer: Customer,
    pub total_orders: i64,
    /// Sum of orders marked paid.
    pub amount_paid: Money,
    /// Sum of every order not marked paid (unpaid and partial).
    pub amount_pending: Money,
}

impl CustomerSummary {
    /// Compute totals from a customer's full order history.
    #[must_use]
    pub fn from_orders(customer: Customer, orders: &[Order]) -> Self {
        let (paid, pending): (Vec<&Order>, Vec<&Order>) = orders
            .iter()
            .partition(|o| o.payment_status == PaymentStatus::Paid);
        Self {
            customer,
            total_orders: i64::try_from(orders.len()).unwrap_or(i64::MAX),
            amount_paid: paid.iter().map(|o| o.amount).sum(),
            amount_pending: pending.iter().map(|o| o.amount).sum(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_input_trims_fields() {
        let input = CustomerInput::new("  Asha  ", Some(" 98450 12345 ")).unwrap();
        assert_eq!(input.name, "Asha");
        assert_eq!(input.phone_number.as_deref(), Some("98450 12345"));
    }

    #[test]
    fn test_customer_input_blank_phone_is_none() {
        let input = CustomerInput::new("Ravi", Some("   ")).unwrap();
        assert_eq!(input.phone_number, None);
    }

    #[test]
    fn test_customer_input_requires_name() {
        assert!(CustomerInput::new("   ", None).is_err());
    }

    fn order(amount: i64, payment_status: PaymentStatus) -> Order {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        Order {
            id: jmd_tiffins_core::OrderId::new(1),
            customer_id: CustomerId::new(1),
            order_details: "Veg Thali".to_string(),
            amount: Money::from_paise(amount * 100),
            payment_status,
            delivery_location: None,
            delivery_date: date,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_counts_partial_as_pending() {
        let customer = Customer {
            id: CustomerId::new(1),
            name: "Asha".to_string(),
            phone_number: None,
            created_at: Utc::now(),
        };
        let orders = vec![
            order(120, PaymentStatus::Paid),
            order(100, PaymentStatus::Partial),
            order(80, PaymentStatus::Unpaid),
        ];

        let summary = CustomerSummary::from_orders(customer, &orders);

        assert_eq!(summary.total_orders, 3);
        assert_eq!(summary.amount_paid, Money::from_paise(12_000));
        assert_eq!(summary.amount_pending, Money::from_paise(18_000));
    }
}
