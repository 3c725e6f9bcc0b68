//! Order edit, quick status change, and delete.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;

use jmd_tiffins_core::{
    CustomerId, DeliveryLocation, Money, OrderId, PaymentStatus, business_offset,
};

use super::{
    SelectOption, StaffView, location_options, non_empty, parse_optional, payment_status_options,
};
use crate::{
    db::{CustomerRepository, OrderRepository, RepositoryError},
    error::AppError,
    filters,
    middleware::RequireAdminAuth,
    models::OrderUpdate,
    state::AppState,
};

/// Edit-order form input.
#[derive(Debug, Deserialize)]
pub struct OrderEditForm {
    pub customer_id: Option<String>,
    pub order_details: Option<String>,
    pub amount: Option<String>,
    pub payment_status: Option<String>,
    pub delivery_location: Option<String>,
    pub delivery_date: Option<String>,
}

impl OrderEditForm {
    /// Validate into an update, or the error code to redirect with.
    fn into_update(self) -> Result<OrderUpdate, &'static str> {
        let customer_id = parse_optional::<i32>(self.customer_id.as_deref())
            .ok()
            .flatten()
            .ok_or("customer")?;
        let order_details = non_empty(self.order_details.as_deref())
            .ok_or("details")?
            .to_string();
        let amount = non_empty(self.amount.as_deref())
            .and_then(|a| Money::parse(a).ok())
            .ok_or("amount")?;
        let payment_status = parse_optional::<PaymentStatus>(self.payment_status.as_deref())
            .ok()
            .flatten()
            .ok_or("status")?;
        let delivery_location =
            parse_optional::<DeliveryLocation>(self.delivery_location.as_deref())
                .map_err(|()| "location")?;
        let delivery_date = parse_optional::<NaiveDate>(self.delivery_date.as_deref())
            .ok()
            .flatten()
            .ok_or("date")?;

        Ok(OrderUpdate {
            customer_id: CustomerId::new(customer_id),
            order_details,
            amount,
            payment_status,
            delivery_location,
            delivery_date,
        })
    }
}

/// Quick status form input.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub payment_status: String,
}

/// Edit-order page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/edit.html")]
pub struct OrderEditTemplate {
    pub staff: StaffView,
    pub current_path: String,
    pub error: Option<String>,
    pub id: i32,
    pub order_details: String,
    pub amount: String,
    pub delivery_date: String,
    pub created_at: String,
    pub customers: Vec<SelectOption>,
    pub payment_statuses: Vec<SelectOption>,
    pub locations: Vec<SelectOption>,
}

/// Error query on the edit page.
#[derive(Debug, Deserialize)]
pub struct EditQuery {
    pub error: Option<String>,
}

/// Edit-order page handler.
#[instrument(skip(admin, state))]
pub async fn edit_page(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<EditQuery>,
) -> Result<Response, AppError> {
    let pool = state.pool();
    let Some(order) = OrderRepository::new(pool).get(OrderId::new(id)).await? else {
        return Ok(Redirect::to("/?error=not_found").into_response());
    };
    let customers = CustomerRepository::new(pool).list().await?;

    Ok(OrderEditTemplate {
        staff: StaffView::from(&admin),
        current_path: "/".to_string(),
        error: query.error.as_deref().map(super::dashboard::error_message),
        id,
        order_details: order.order_details.clone(),
        amount: order.amount.amount().to_string(),
        delivery_date: order.delivery_date.to_string(),
        created_at: order
            .created_at
            .with_timezone(&business_offset())
            .format("%d %b %Y, %H:%M")
            .to_string(),
        customers: customers
            .iter()
            .map(|c| {
                SelectOption::new(c.id.to_string(), c.name.clone(), c.id == order.customer_id)
            })
            .collect(),
        payment_statuses: payment_status_options(Some(order.payment_status)),
        locations: location_options(order.delivery_location),
    }
    .into_response())
}

/// Update an order from the edit page.
#[instrument(skip_all, fields(order_id = id))]
pub async fn update(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<OrderEditForm>,
) -> Result<Response, AppError> {
    let update = match form.into_update() {
        Ok(update) => update,
        Err(code) => {
            return Ok(Redirect::to(&format!("/orders/{id}/edit?error={code}")).into_response());
        }
    };

    match OrderRepository::new(state.pool())
        .update(OrderId::new(id), &update)
        .await
    {
        Ok(_) => Ok(Redirect::to("/?success=order_updated").into_response()),
        Err(RepositoryError::NotFound) => Ok(Redirect::to("/?error=not_found").into_response()),
        Err(RepositoryError::Conflict(_)) => {
            Ok(Redirect::to(&format!("/orders/{id}/edit?error=customer")).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Change only the payment status of an order.
#[instrument(skip_all, fields(order_id = id))]
pub async fn update_status(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<StatusForm>,
) -> Result<Response, AppError> {
    let Ok(status) = form.payment_status.parse::<PaymentStatus>() else {
        return Ok(Redirect::to("/?error=status").into_response());
    };

    match OrderRepository::new(state.pool())
        .set_payment_status(OrderId::new(id), status)
        .await
    {
        Ok(_) => Ok(Redirect::to("/?success=status_updated").into_response()),
        Err(RepositoryError::NotFound) => Ok(Redirect::to("/?error=not_found").into_response()),
        Err(e) => Err(e.into()),
    }
}

/// Delete an order.
#[instrument(skip_all, fields(order_id = id))]
pub async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    if OrderRepository::new(state.pool())
        .delete(OrderId::new(id))
        .await?
    {
        Ok(Redirect::to("/?success=order_deleted").into_response())
    } else {
        Ok(Redirect::to("/?error=not_found").into_response())
    }
}
