//! Orders and dashboard figures.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use jmd_tiffins_core::{
    CustomerId, DeliveryLocation, DeliverySchedule, Money, OrderId, PaymentStatus,
};

use super::MenuItem;

/// Default page size for order listings.
pub const ORDERS_PER_PAGE: u32 = 20;

/// A recorded order.
///
/// `order_details` and `amount` are copied from the menu item when the order
/// is created. Later edits to the menu never touch existing orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub order_details: String,
    pub amount: Money,
    pub payment_status: PaymentStatus,
    pub delivery_location: Option<DeliveryLocation>,
    pub delivery_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order joined with its customer's name, for tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderWithCustomer {
    pub order: Order,
    pub customer_name: String,
}

/// Everything needed to insert an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub order_details: String,
    pub amount: Money,
    pub payment_status: PaymentStatus,
    pub delivery_location: Option<DeliveryLocation>,
    pub schedule: DeliverySchedule,
}

impl NewOrder {
    /// Snapshot a menu item into a new order.
    #[must_use]
    pub fn from_menu_item(
        customer_id: CustomerId,
        item: &MenuItem,
        payment_status: PaymentStatus,
        delivery_location: Option<DeliveryLocation>,
        schedule: DeliverySchedule,
    ) -> Self {
        Self {
            customer_id,
            order_details: item.title.clone(),
            amount: item.price,
            payment_status,
            delivery_location,
            schedule,
        }
    }
}

/// Editable fields of an existing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
    pub customer_id: CustomerId,
    pub order_details: String,
    pub amount: Money,
    pub payment_status: PaymentStatus,
    pub delivery_location: Option<DeliveryLocation>,
    pub delivery_date: NaiveDate,
}

impl From<&Order> for OrderUpdate {
    fn from(order: &Order) -> Self {
        Self {
            customer_id: order.customer_id,
            order_details: order.order_details.clone(),
            amount: order.amount,
            payment_status: order.payment_status,
            delivery_location: order.delivery_location,
            delivery_date: order.delivery_date,
        }
    }
}

/// Filters and pagination for the order table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFilter {
    pub delivery_date: Option<NaiveDate>,
    pub customer_id: Option<CustomerId>,
    pub payment_status: Option<PaymentStatus>,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            delivery_date: None,
            customer_id: None,
            payment_status: None,
            page: 1,
            per_page: ORDERS_PER_PAGE,
        }
    }
}

impl OrderFilter {
    /// Row offset for the current page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(self.per_page)
    }

    /// Page size as a SQL `LIMIT`.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// Figures for the dashboard stat cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    /// Sum of paid and partially paid orders.
    pub total_sales: Money,
    /// Number of orders.
    pub total_orders: i64,
    /// Sum of all orders regardless of payment.
    pub total_revenue: Money,
    /// Sum of paid orders delivered today.
    pub todays_earnings: Money,
}

/// Number of pages needed to show `total` rows.
#[must_use]
pub fn page_count(total: i64, per_page: u32) -> u32 {
    if total <= 0 || per_page == 0 {
        return 1;
    }
    let per_page = i64::from(per_page);
    u32::try_from((total + per_page - 1) / per_page).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jmd_tiffins_core::{MealCategory, MenuItemId, business_offset, resolve_delivery};
    use rust_decimal::Decimal;

    #[test]
    fn test_new_order_snapshots_menu_item() {
        let item = MenuItem {
            id: MenuItemId::new(3),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            title: "Paneer Thali".to_string(),
            category: MealCategory::Lunch,
            price: Money::new(Decimal::from(150)),
            description: Some("with roti".to_string()),
            created_at: Utc::now(),
        };
        let now = Utc::now();
        let schedule = resolve_delivery(now, item.date, business_offset());

        let order = NewOrder::from_menu_item(
            CustomerId::new(9),
            &item,
            PaymentStatus::Unpaid,
            Some(DeliveryLocation::WeWork),
            schedule,
        );

        assert_eq!(order.order_details, "Paneer Thali");
        assert_eq!(order.amount, Money::new(Decimal::from(150)));
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
    }

    #[test]
    fn test_order_filter_offset() {
        let filter = OrderFilter {
            page: 3,
            ..OrderFilter::default()
        };
        assert_eq!(filter.offset(), 40);
        assert_eq!(filter.limit(), 20);

        let first = OrderFilter {
            page: 0,
            ..OrderFilter::default()
        };
        assert_eq!(first.offset(), 0);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 20), 1);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(21, 20), 2);
    }
}
