//! Public same-day order form and payment callbacks.
//!
//! No login is required. Customers pick their name (or add themselves),
//! choose a dish from today's menu and a drop-off point, then either pay
//! later or pay now through the Razorpay widget. The widget script posts
//! back to the `payment/*` endpoints and follows the returned redirect.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use jmd_tiffins_core::{
    CheckoutState, CustomerId, DeliveryLocation, MenuItemId, OrderId, business_offset,
    local_today,
};

use super::{SelectOption, location_options, non_empty, parse_optional};
use crate::{
    db::{CustomerRepository, TodaysMenuRepository},
    error::AppError,
    filters,
    models::{Customer, Order},
    routes::menu::{MenuGroupView, menu_groups},
    services::{CheckoutError, CustomerChoice, OrderRequest, PaymentCallback, Placement},
    state::AppState,
};

/// Customer select value for "I'm new".
const NEW_CUSTOMER: &str = "new";

/// Submit button value for paying online.
const PAY_NOW: &str = "pay_now";

/// Public order form input.
#[derive(Debug, Default, Deserialize)]
pub struct PublicOrderForm {
    pub customer_id: Option<String>,
    pub new_name: Option<String>,
    pub new_phone: Option<String>,
    pub menu_item_id: Option<String>,
    pub delivery_location: Option<String>,
    pub action: Option<String>,
}

impl PublicOrderForm {
    fn customer_choice(&self) -> Option<CustomerChoice> {
        match non_empty(self.customer_id.as_deref())? {
            NEW_CUSTOMER => Some(CustomerChoice::New {
                name: self.new_name.clone().unwrap_or_default(),
                phone_number: self.new_phone.clone().unwrap_or_default(),
            }),
            id => id
                .parse::<i32>()
                .ok()
                .map(|id| CustomerChoice::Existing(CustomerId::new(id))),
        }
    }

    fn menu_item_id(&self) -> Option<MenuItemId> {
        parse_optional::<i32>(self.menu_item_id.as_deref())
            .ok()
            .flatten()
            .map(MenuItemId::new)
    }

    fn location(&self) -> Option<DeliveryLocation> {
        parse_optional::<DeliveryLocation>(self.delivery_location.as_deref())
            .ok()
            .flatten()
    }

    /// Build the checkout request. Missing or unparseable fields become
    /// `None` and are reported by validation.
    fn to_request(&self) -> OrderRequest {
        OrderRequest {
            customer: self.customer_choice(),
            menu_item_id: self.menu_item_id(),
            delivery_location: self.location(),
            pay_now: self.action.as_deref() == Some(PAY_NOW),
        }
    }
}

/// Public order form template.
#[derive(Template, WebTemplate)]
#[template(path = "order_today/form.html")]
pub struct OrderFormTemplate {
    pub business_name: String,
    pub today: String,
    pub error: Option<String>,
    pub customers: Vec<SelectOption>,
    pub new_selected: bool,
    pub new_name: String,
    pub new_phone: String,
    pub groups: Vec<MenuGroupView>,
    pub locations: Vec<SelectOption>,
}

/// Widget launch page template.
///
/// The payment parameters are rendered as data attributes read by
/// `static/js/checkout.js`.
#[derive(Template, WebTemplate)]
#[template(path = "order_today/pay.html")]
pub struct PayTemplate {
    pub business_name: String,
    pub order_id: i32,
    pub order_details: String,
    pub amount: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub key_id: String,
    pub gateway_order_id: String,
    pub amount_paise: i64,
    pub currency: String,
    pub success_url: String,
    pub abandon_url: String,
    pub placed_url: String,
}

/// Outcome page template.
#[derive(Template, WebTemplate)]
#[template(path = "order_today/placed.html")]
pub struct PlacedTemplate {
    pub business_name: String,
    pub order_id: i32,
    pub order_details: String,
    pub amount: String,
    pub delivery_date: String,
    pub delivery_location: String,
    pub headline: String,
    pub message: String,
    pub notice: Option<String>,
    pub paid: bool,
}

/// Success callback fields posted by the widget script.
#[derive(Debug, Deserialize)]
pub struct PaymentSuccessForm {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

/// Dismiss / failure callback fields.
#[derive(Debug, Deserialize)]
pub struct PaymentAbandonForm {
    pub razorpay_order_id: String,
    /// `failed` when the widget reported a failed payment, anything else
    /// for a plain dismissal.
    pub reason: Option<String>,
}

/// Outcome page query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PlacedQuery {
    /// `received` after a successful widget callback.
    pub payment: Option<String>,
}

/// JSON answer to a widget callback.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallbackResponse {
    pub state: String,
    pub redirect: String,
}

fn placed_url(order_id: OrderId) -> String {
    format!("/order/today/{order_id}/placed")
}

/// Outcome page after the widget reported a successful payment.
fn received_url(order_id: OrderId) -> String {
    format!("{}?payment=received", placed_url(order_id))
}

/// State to show on the outcome page.
///
/// After a successful widget payment the stored attempt can still read as
/// requested (the settle write is waiting for the webhook). The payer has
/// paid, so that is shown as pending rather than as an open payment.
fn shown_state(state: CheckoutState, payment_received: bool) -> CheckoutState {
    match state {
        CheckoutState::PaymentRequested {
            order_id,
            gateway_order_id,
        } if payment_received => CheckoutState::PaymentPending {
            order_id,
            gateway_order_id,
        },
        state => state,
    }
}

/// Headline, message and paid flag for an order's checkout state.
fn outcome(state: &CheckoutState) -> (&'static str, &'static str, bool) {
    match state {
        CheckoutState::PaymentSettled { .. } => (
            "Order placed and paid",
            "Thank you! Your payment was received.",
            true,
        ),
        CheckoutState::PaymentPending { .. } => (
            "Payment received",
            "We received your payment and are confirming it. No need to pay again.",
            true,
        ),
        CheckoutState::PaymentRequested { .. } => (
            "Waiting for payment",
            "Complete the payment in the Razorpay window, or pay on delivery.",
            false,
        ),
        _ => (
            "Order placed",
            "Your order is placed. You can pay on delivery.",
            false,
        ),
    }
}

fn placed_template(
    business_name: &str,
    order: &Order,
    state: &CheckoutState,
    notice: Option<String>,
) -> PlacedTemplate {
    let (headline, message, paid) = outcome(state);
    PlacedTemplate {
        business_name: business_name.to_string(),
        order_id: order.id.as_i32(),
        order_details: order.order_details.clone(),
        amount: order.amount.to_string(),
        delivery_date: order.delivery_date.format("%A, %d %b %Y").to_string(),
        delivery_location: order
            .delivery_location
            .map_or_else(|| "-".to_string(), |l| l.to_string()),
        headline: headline.to_string(),
        message: message.to_string(),
        notice,
        paid,
    }
}

fn pay_template(business_name: &str, placement: Placement) -> Response {
    let Placement {
        order,
        customer,
        state,
        payment,
        payment_notice,
    } = placement;

    let Some(intent) = payment else {
        return placed_template(business_name, &order, &state, payment_notice).into_response();
    };

    PayTemplate {
        business_name: business_name.to_string(),
        order_id: order.id.as_i32(),
        order_details: order.order_details.clone(),
        amount: order.amount.to_string(),
        customer_name: customer.name.clone(),
        customer_phone: customer.phone_number.clone().unwrap_or_default(),
        key_id: intent.key_id,
        gateway_order_id: intent.gateway_order_id,
        amount_paise: intent.amount_paise,
        currency: intent.currency.to_string(),
        success_url: format!("/order/today/{}/payment/success", order.id),
        abandon_url: format!("/order/today/{}/payment/abandon", order.id),
        placed_url: placed_url(order.id),
    }
    .into_response()
}

/// Form template with the submitted values kept.
async fn form_template(
    state: &AppState,
    form: &PublicOrderForm,
    error: Option<String>,
) -> Result<OrderFormTemplate, AppError> {
    let pool = state.pool();
    let today = local_today(Utc::now(), business_offset());
    let customers = CustomerRepository::new(pool).list().await?;
    let items = TodaysMenuRepository::new(pool).items_for(today).await?;

    let chosen_customer = non_empty(form.customer_id.as_deref());
    let chosen_item: Vec<MenuItemId> = form.menu_item_id().into_iter().collect();

    Ok(OrderFormTemplate {
        business_name: state.config().business_name.clone(),
        today: today.format("%A, %d %b %Y").to_string(),
        error,
        customers: customer_options(&customers, chosen_customer),
        new_selected: chosen_customer == Some(NEW_CUSTOMER),
        new_name: form.new_name.clone().unwrap_or_default(),
        new_phone: form.new_phone.clone().unwrap_or_default(),
        groups: menu_groups(items, &chosen_item),
        locations: location_options(form.location()),
    })
}

fn customer_options(customers: &[Customer], chosen: Option<&str>) -> Vec<SelectOption> {
    customers
        .iter()
        .map(|c| {
            let value = c.id.to_string();
            let selected = chosen == Some(value.as_str());
            SelectOption::new(value, c.name.clone(), selected)
        })
        .collect()
}

/// Public order form page.
#[instrument(skip(state))]
pub async fn form_page(State(state): State<AppState>) -> Result<OrderFormTemplate, AppError> {
    form_template(&state, &PublicOrderForm::default(), None).await
}

/// Place an order from the public form.
#[instrument(skip_all)]
pub async fn submit(State(state): State<AppState>, Form(form): Form<PublicOrderForm>) -> Response {
    let result = state
        .checkout()
        .place_order(form.to_request(), Utc::now())
        .await;
    let business_name = state.config().business_name.as_str();

    let (status, message) = match result {
        Ok(placement) => return pay_template(business_name, placement),
        Err(CheckoutError::Validation(message)) => (StatusCode::UNPROCESSABLE_ENTITY, message),
        Err(e) => {
            tracing::error!(error = %e, "Failed to place public order");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "We could not place your order. Please try again.".to_string(),
            )
        }
    };

    match form_template(&state, &form, Some(message)).await {
        Ok(template) => (status, template).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Widget success callback.
#[instrument(skip_all, fields(order_id = id))]
pub async fn payment_success(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<PaymentSuccessForm>,
) -> Result<Json<CallbackResponse>, AppError> {
    let order_id = OrderId::new(id);
    let callback = PaymentCallback {
        gateway_order_id: form.razorpay_order_id,
        payment_id: form.razorpay_payment_id,
        signature: form.razorpay_signature,
    };

    let checkout_state = state
        .checkout()
        .confirm_payment(order_id, &callback)
        .await?;

    Ok(Json(CallbackResponse {
        state: checkout_state.name().to_string(),
        redirect: received_url(order_id),
    }))
}

/// Widget dismissal or failure callback. The order stays placed unpaid.
#[instrument(skip_all, fields(order_id = id))]
pub async fn payment_abandon(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<PaymentAbandonForm>,
) -> Result<Json<CallbackResponse>, AppError> {
    let order_id = OrderId::new(id);
    let failed = form.reason.as_deref() == Some("failed");

    let checkout_state = state
        .checkout()
        .abandon_payment(order_id, &form.razorpay_order_id, failed)
        .await?;

    Ok(Json(CallbackResponse {
        state: checkout_state.name().to_string(),
        redirect: placed_url(order_id),
    }))
}

/// Outcome page for a placed order.
#[instrument(skip(state))]
pub async fn placed(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<PlacedQuery>,
) -> Result<PlacedTemplate, AppError> {
    let (order, checkout_state) = state.checkout().status(OrderId::new(id)).await?;
    let received = query.payment.as_deref() == Some("received");
    Ok(placed_template(
        &state.config().business_name,
        &order,
        &shown_state(checkout_state, received),
        None,
    ))
}
