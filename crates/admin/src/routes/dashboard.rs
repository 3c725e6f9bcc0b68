//! Dashboard: stat cards, the filtered order table and the add-order form.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::instrument;

use jmd_tiffins_core::{
    CustomerId, DeliveryLocation, MenuItemId, PaymentStatus, business_offset, local_today,
    resolve_delivery,
};

use super::{SelectOption, StaffView, location_options, parse_optional, payment_status_options};
use crate::{
    db::{CustomerRepository, MenuRepository, OrderRepository, RepositoryError},
    error::AppError,
    filters,
    middleware::RequireAdminAuth,
    models::{Customer, DashboardStats, NewOrder, OrderFilter, OrderWithCustomer, order::page_count},
    state::AppState,
};

/// Dashboard query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub date: Option<String>,
    pub customer: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub success: Option<String>,
    pub error: Option<String>,
}

impl DashboardQuery {
    /// Filter for the order table. Unparseable values are ignored.
    fn filter(&self) -> OrderFilter {
        OrderFilter {
            delivery_date: parse_optional::<NaiveDate>(self.date.as_deref())
                .ok()
                .flatten(),
            customer_id: parse_optional::<i32>(self.customer.as_deref())
                .ok()
                .flatten()
                .map(CustomerId::new),
            payment_status: parse_optional::<PaymentStatus>(self.status.as_deref())
                .ok()
                .flatten(),
            page: self.page.unwrap_or(1).max(1),
            ..OrderFilter::default()
        }
    }
}

/// Add-order form input.
#[derive(Debug, Deserialize)]
pub struct OrderForm {
    pub customer_id: Option<String>,
    pub menu_item_id: Option<String>,
    pub target_date: Option<String>,
    pub payment_status: Option<String>,
    pub delivery_location: Option<String>,
}

/// Stat card values.
#[derive(Debug, Clone)]
pub struct StatsView {
    pub total_sales: String,
    pub total_orders: i64,
    pub total_revenue: String,
    pub todays_earnings: String,
}

impl From<DashboardStats> for StatsView {
    fn from(stats: DashboardStats) -> Self {
        Self {
            total_sales: stats.total_sales.to_string(),
            total_orders: stats.total_orders,
            total_revenue: stats.total_revenue.to_string(),
            todays_earnings: stats.todays_earnings.to_string(),
        }
    }
}

/// One row of the order table.
#[derive(Debug, Clone)]
pub struct OrderRowView {
    pub id: i32,
    pub customer_name: String,
    pub order_details: String,
    pub amount: String,
    pub payment_status: String,
    pub status_class: &'static str,
    pub status_options: Vec<SelectOption>,
    pub delivery_location: String,
    pub delivery_date: String,
    pub created_at: String,
}

impl From<&OrderWithCustomer> for OrderRowView {
    fn from(row: &OrderWithCustomer) -> Self {
        let order = &row.order;
        Self {
            id: order.id.as_i32(),
            customer_name: row.customer_name.clone(),
            order_details: order.order_details.clone(),
            amount: order.amount.to_string(),
            payment_status: order.payment_status.to_string(),
            status_class: order.payment_status.as_str(),
            status_options: payment_status_options(Some(order.payment_status)),
            delivery_location: order
                .delivery_location
                .map_or_else(|| "-".to_string(), |l| l.to_string()),
            delivery_date: order.delivery_date.format("%d %b %Y").to_string(),
            created_at: order
                .created_at
                .with_timezone(&business_offset())
                .format("%d %b %Y, %H:%M")
                .to_string(),
        }
    }
}

/// Previous/next links for a paginated table.
#[derive(Debug, Clone, Default)]
pub struct PaginationView {
    pub page: u32,
    pub total_pages: u32,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl PaginationView {
    /// Links for `page` of `total_pages`, built by `url_for(page)`.
    pub fn new(page: u32, total_pages: u32, url_for: impl Fn(u32) -> String) -> Self {
        Self {
            page,
            total_pages,
            prev_url: (page > 1).then(|| url_for(page - 1)),
            next_url: (page < total_pages).then(|| url_for(page + 1)),
        }
    }
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub staff: StaffView,
    pub current_path: String,
    pub success: Option<String>,
    pub error: Option<String>,
    pub stats: StatsView,
    pub orders: Vec<OrderRowView>,
    pub pagination: PaginationView,
    pub filter_date: String,
    pub filter_customers: Vec<SelectOption>,
    pub filter_statuses: Vec<SelectOption>,
    pub customers: Vec<SelectOption>,
    pub menu_items: Vec<SelectOption>,
    pub payment_statuses: Vec<SelectOption>,
    pub locations: Vec<SelectOption>,
    pub today: String,
}

/// Message for a `?success=` code set by the order handlers.
pub(crate) fn success_message(code: &str) -> Option<String> {
    let message = match code {
        "order_added" => "Order added.",
        "order_updated" => "Order updated.",
        "order_deleted" => "Order deleted.",
        "status_updated" => "Payment status updated.",
        _ => return None,
    };
    Some(message.to_string())
}

/// Message for an `?error=` code set by the order handlers.
pub(crate) fn error_message(code: &str) -> String {
    match code {
        "customer" => "Please pick a customer.",
        "menu_item" => "Please pick a menu item.",
        "date" => "Please enter a valid date.",
        "status" => "Please pick a payment status.",
        "location" => "Please pick a valid delivery location.",
        "amount" => "Please enter a valid, non-negative amount.",
        "details" => "Order details are required.",
        "not_found" => "That order no longer exists.",
        _ => "Something went wrong. Please try again.",
    }
    .to_string()
}

fn customer_options(customers: &[Customer], selected: Option<CustomerId>) -> Vec<SelectOption> {
    customers
        .iter()
        .map(|c| SelectOption::new(c.id.to_string(), c.name.clone(), selected == Some(c.id)))
        .collect()
}

/// Query string for a dashboard page that keeps the current filters.
fn dashboard_url(filter: &OrderFilter, page: u32) -> String {
    let mut params = Vec::new();
    if let Some(date) = filter.delivery_date {
        params.push(format!("date={date}"));
    }
    if let Some(customer) = filter.customer_id {
        params.push(format!("customer={customer}"));
    }
    if let Some(status) = filter.payment_status {
        params.push(format!("status={}", status.as_str()));
    }
    params.push(format!("page={page}"));
    format!("/?{}", params.join("&"))
}

/// Dashboard page handler.
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<DashboardTemplate, AppError> {
    let pool = state.pool();
    let today = local_today(Utc::now(), business_offset());
    let filter = query.filter();

    let orders_repo = OrderRepository::new(pool);
    let stats = orders_repo.stats(today).await?;
    let orders = orders_repo.list(&filter).await?;
    let total = orders_repo.count(&filter).await?;
    let customers = CustomerRepository::new(pool).list().await?;
    let menu_items = MenuRepository::new(pool).list_all().await?;

    let total_pages = page_count(total, filter.per_page);
    let pagination = PaginationView::new(filter.page, total_pages, |page| {
        dashboard_url(&filter, page)
    });

    Ok(DashboardTemplate {
        staff: StaffView::from(&admin),
        current_path: "/".to_string(),
        success: query.success.as_deref().and_then(success_message),
        error: query.error.as_deref().map(error_message),
        stats: StatsView::from(stats),
        orders: orders.iter().map(OrderRowView::from).collect(),
        pagination,
        filter_date: filter
            .delivery_date
            .map(|d| d.to_string())
            .unwrap_or_default(),
        filter_customers: customer_options(&customers, filter.customer_id),
        filter_statuses: payment_status_options(filter.payment_status),
        customers: customer_options(&customers, None),
        menu_items: menu_items
            .iter()
            .map(|item| SelectOption::new(item.id.to_string(), item.picker_label(), false))
            .collect(),
        payment_statuses: payment_status_options(Some(PaymentStatus::Unpaid)),
        locations: location_options(None),
        today: today.to_string(),
    })
}

fn redirect_error(code: &str) -> Response {
    Redirect::to(&format!("/?error={code}")).into_response()
}

/// Add an order from the dashboard form.
///
/// Details and amount are copied from the chosen menu item. The target date
/// goes through the delivery-date resolver, so a same-day order entered
/// after the cutoff is delivered tomorrow.
#[instrument(skip_all)]
pub async fn create_order(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Form(form): Form<OrderForm>,
) -> Result<Response, AppError> {
    let Ok(Some(customer_id)) = parse_optional::<i32>(form.customer_id.as_deref()) else {
        return Ok(redirect_error("customer"));
    };
    let Ok(Some(menu_item_id)) = parse_optional::<i32>(form.menu_item_id.as_deref()) else {
        return Ok(redirect_error("menu_item"));
    };
    let Ok(target_date) = parse_optional::<NaiveDate>(form.target_date.as_deref()) else {
        return Ok(redirect_error("date"));
    };
    let Ok(Some(payment_status)) = parse_optional::<PaymentStatus>(form.payment_status.as_deref())
    else {
        return Ok(redirect_error("status"));
    };
    let Ok(delivery_location) = parse_optional::<DeliveryLocation>(form.delivery_location.as_deref())
    else {
        return Ok(redirect_error("location"));
    };

    let pool = state.pool();
    let Some(item) = MenuRepository::new(pool)
        .get(MenuItemId::new(menu_item_id))
        .await?
    else {
        return Ok(redirect_error("menu_item"));
    };

    let now = Utc::now();
    let offset = business_offset();
    let target_date = target_date.unwrap_or_else(|| local_today(now, offset));
    let schedule = resolve_delivery(now, target_date, offset);

    let new_order = NewOrder::from_menu_item(
        CustomerId::new(customer_id),
        &item,
        payment_status,
        delivery_location,
        schedule,
    );

    match OrderRepository::new(pool).create(&new_order).await {
        Ok(_) => Ok(Redirect::to("/?success=order_added").into_response()),
        Err(RepositoryError::Conflict(_)) => Ok(redirect_error("customer")),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_ignores_garbage() {
        let query = DashboardQuery {
            date: Some("yesterday".to_string()),
            customer: Some("3".to_string()),
            status: Some("partial".to_string()),
            page: Some(0),
            ..DashboardQuery::default()
        };
        let filter = query.filter();
        assert_eq!(filter.delivery_date, None);
        assert_eq!(filter.customer_id, Some(CustomerId::new(3)));
        assert_eq!(filter.payment_status, Some(PaymentStatus::Partial));
        assert_eq!(filter.page, 1);
    }

    #[test]
    fn test_dashboard_url_keeps_filters() {
        let filter = OrderFilter {
            delivery_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            payment_status: Some(PaymentStatus::Unpaid),
            ..OrderFilter::default()
        };
        assert_eq!(
            dashboard_url(&filter, 2),
            "/?date=2024-03-01&status=unpaid&page=2"
        );
    }

    #[test]
    fn test_pagination_links() {
        let first = PaginationView::new(1, 3, |p| format!("?page={p}"));
        assert_eq!(first.prev_url, None);
        assert_eq!(first.next_url.as_deref(), Some("?page=2"));

        let last = PaginationView::new(3, 3, |p| format!("?page={p}"));
        assert_eq!(last.prev_url.as_deref(), Some("?page=2"));
        assert_eq!(last.next_url, None);
    }

    #[test]
    fn test_messages() {
        assert_eq!(success_message("order_added").as_deref(), Some("Order added."));
        assert_eq!(success_message("bogus"), None);
        assert_eq!(error_message("customer"), "Please pick a customer.");
    }
}
