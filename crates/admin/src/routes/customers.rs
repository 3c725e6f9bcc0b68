//! Customer management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use jmd_tiffins_core::CustomerId;

use super::StaffView;
use crate::{
    db::{CustomerRepository, OrderRepository, RepositoryError},
    error::AppError,
    filters,
    middleware::RequireAdminAuth,
    models::{Customer, CustomerInput, CustomerSummary, Order},
    state::AppState,
};

/// Message query parameters.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Add/edit customer form input.
#[derive(Debug, Deserialize)]
pub struct CustomerForm {
    pub name: String,
    pub phone_number: Option<String>,
}

/// Customer view for templates.
#[derive(Debug, Clone)]
pub struct CustomerView {
    pub id: i32,
    pub name: String,
    pub phone_number: String,
    pub total_orders: i64,
    pub amount_paid: String,
    pub amount_pending: String,
}

impl From<&CustomerSummary> for CustomerView {
    fn from(summary: &CustomerSummary) -> Self {
        Self {
            id: summary.customer.id.as_i32(),
            name: summary.customer.name.clone(),
            phone_number: summary.customer.phone_number.clone().unwrap_or_default(),
            total_orders: summary.total_orders,
            amount_paid: summary.amount_paid.to_string(),
            amount_pending: summary.amount_pending.to_string(),
        }
    }
}

/// Row of a customer's order history.
#[derive(Debug, Clone)]
pub struct CustomerOrderView {
    pub id: i32,
    pub order_details: String,
    pub amount: String,
    pub payment_status: String,
    pub status_class: &'static str,
    pub delivery_location: String,
    pub delivery_date: String,
}

impl From<&Order> for CustomerOrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i32(),
            order_details: order.order_details.clone(),
            amount: order.amount.to_string(),
            payment_status: order.payment_status.to_string(),
            status_class: order.payment_status.as_str(),
            delivery_location: order
                .delivery_location
                .map_or_else(|| "-".to_string(), |l| l.to_string()),
            delivery_date: order.delivery_date.format("%d %b %Y").to_string(),
        }
    }
}

/// Customers list page template.
#[derive(Template, WebTemplate)]
#[template(path = "customers/index.html")]
pub struct CustomersIndexTemplate {
    pub staff: StaffView,
    pub current_path: String,
    pub success: Option<String>,
    pub error: Option<String>,
    pub customers: Vec<CustomerView>,
}

/// Customer detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "customers/show.html")]
pub struct CustomerShowTemplate {
    pub staff: StaffView,
    pub current_path: String,
    pub customer: CustomerView,
    pub orders: Vec<CustomerOrderView>,
}

/// Edit customer page template.
#[derive(Template, WebTemplate)]
#[template(path = "customers/edit.html")]
pub struct CustomerEditTemplate {
    pub staff: StaffView,
    pub current_path: String,
    pub error: Option<String>,
    pub id: i32,
    pub name: String,
    pub phone_number: String,
}

fn success_message(code: &str) -> Option<String> {
    let message = match code {
        "added" => "Customer added.",
        "updated" => "Customer updated.",
        "deleted" => "Customer and their orders deleted.",
        _ => return None,
    };
    Some(message.to_string())
}

fn error_message(code: &str) -> String {
    match code {
        "name" => "Name is required.",
        "not_found" => "That customer no longer exists.",
        _ => "Something went wrong. Please try again.",
    }
    .to_string()
}

fn edit_view(customer: &Customer) -> (String, String) {
    (
        customer.name.clone(),
        customer.phone_number.clone().unwrap_or_default(),
    )
}

/// Customers list page handler.
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<CustomersIndexTemplate, AppError> {
    let summaries = CustomerRepository::new(state.pool())
        .list_with_summaries()
        .await?;

    Ok(CustomersIndexTemplate {
        staff: StaffView::from(&admin),
        current_path: "/customers".to_string(),
        success: query.success.as_deref().and_then(success_message),
        error: query.error.as_deref().map(error_message),
        customers: summaries.iter().map(CustomerView::from).collect(),
    })
}

/// Add a customer.
#[instrument(skip_all)]
pub async fn create(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Form(form): Form<CustomerForm>,
) -> Result<Response, AppError> {
    let Ok(input) = CustomerInput::new(&form.name, form.phone_number.as_deref()) else {
        return Ok(Redirect::to("/customers?error=name").into_response());
    };

    CustomerRepository::new(state.pool()).create(&input).await?;
    Ok(Redirect::to("/customers?success=added").into_response())
}

/// Customer detail page: totals and order history.
#[instrument(skip(admin, state))]
pub async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let pool = state.pool();
    let id = CustomerId::new(id);
    let Some(customer) = CustomerRepository::new(pool).get(id).await? else {
        return Ok(Redirect::to("/customers?error=not_found").into_response());
    };
    let orders = OrderRepository::new(pool).list_for_customer(id).await?;
    let summary = CustomerSummary::from_orders(customer, &orders);

    Ok(CustomerShowTemplate {
        staff: StaffView::from(&admin),
        current_path: "/customers".to_string(),
        customer: CustomerView::from(&summary),
        orders: orders.iter().map(CustomerOrderView::from).collect(),
    }
    .into_response())
}

/// Edit customer page.
#[instrument(skip(admin, state))]
pub async fn edit_page(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<MessageQuery>,
) -> Result<Response, AppError> {
    let Some(customer) = CustomerRepository::new(state.pool())
        .get(CustomerId::new(id))
        .await?
    else {
        return Ok(Redirect::to("/customers?error=not_found").into_response());
    };
    let (name, phone_number) = edit_view(&customer);

    Ok(CustomerEditTemplate {
        staff: StaffView::from(&admin),
        current_path: "/customers".to_string(),
        error: query.error.as_deref().map(error_message),
        id,
        name,
        phone_number,
    }
    .into_response())
}

/// Update a customer.
#[instrument(skip_all, fields(customer_id = id))]
pub async fn update(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<CustomerForm>,
) -> Result<Response, AppError> {
    let Ok(input) = CustomerInput::new(&form.name, form.phone_number.as_deref()) else {
        return Ok(Redirect::to(&format!("/customers/{id}/edit?error=name")).into_response());
    };

    match CustomerRepository::new(state.pool())
        .update(CustomerId::new(id), &input)
        .await
    {
        Ok(_) => Ok(Redirect::to("/customers?success=updated").into_response()),
        Err(RepositoryError::NotFound) => {
            Ok(Redirect::to("/customers?error=not_found").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete a customer. Their orders are removed by the foreign key cascade.
#[instrument(skip_all, fields(customer_id = id))]
pub async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    if CustomerRepository::new(state.pool())
        .delete(CustomerId::new(id))
        .await?
    {
        Ok(Redirect::to("/customers?success=deleted").into_response())
    } else {
        Ok(Redirect::to("/customers?error=not_found").into_response())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jmd_tiffins_core::Money;

    #[test]
    fn test_customer_view_blank_phone() {
        let summary = CustomerSummary {
            customer: Customer {
                id: CustomerId::new(2),
                name: "Ravi".to_string(),
                phone_number: None,
                created_at: Utc::now(),
            },
            total_orders: 4,
            amount_paid: Money::from_paise(24_000),
            amount_pending: Money::ZERO,
        };
        let view = CustomerView::from(&summary);
        assert_eq!(view.phone_number, "");
        assert_eq!(view.amount_paid, "₹240.00");
        assert_eq!(view.amount_pending, "₹0.00");
    }

    #[test]
    fn test_messages() {
        assert!(success_message("deleted").is_some());
        assert!(success_message("whatever").is_none());
        assert_eq!(error_message("name"), "Name is required.");
    }
}
