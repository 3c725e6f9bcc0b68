//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (database)
//!
//! # Auth
//! GET  /login                           - Login page
//! POST /login                           - Verify username + password
//! POST /logout                          - End session
//!
//! # Dashboard and orders (staff)
//! GET  /                                - Stats, filters, order table, add form
//! POST /orders                          - Add order
//! GET  /orders/{id}/edit                - Edit order page
//! POST /orders/{id}                     - Update order
//! POST /orders/{id}/status              - Quick payment status change
//! POST /orders/{id}/delete              - Delete order
//!
//! # Customers (staff)
//! GET  /customers                       - Customers with totals
//! POST /customers                       - Add customer
//! GET  /customers/{id}                  - Customer detail and order history
//! GET  /customers/{id}/edit             - Edit customer page
//! POST /customers/{id}                  - Update customer
//! POST /customers/{id}/delete           - Delete customer and their orders
//!
//! # Menu (staff)
//! GET  /menu                            - Paginated menu items
//! POST /menu                            - Add menu item
//! GET  /menu/{id}/edit                  - Edit menu item page
//! POST /menu/{id}                       - Update menu item
//! POST /menu/{id}/delete                - Delete menu item
//! GET  /menu/share                      - Pick today's menu, public link
//! POST /menu/share                      - Replace today's selection
//!
//! # Public ordering
//! GET  /order/today                     - Order form
//! POST /order/today                     - Place order (pay later / pay now)
//! POST /order/today/{id}/payment/success - Widget success callback
//! POST /order/today/{id}/payment/abandon - Widget dismiss / failure
//! GET  /order/today/{id}/placed         - Outcome page
//!
//! # Gateway
//! POST /api/payments/webhook            - Razorpay webhook
//! ```

pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod health;
pub mod menu;
pub mod order_today;
pub mod orders;
pub mod webhook;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use jmd_tiffins_core::{DeliveryLocation, PaymentStatus};

use crate::middleware::{
    create_session_layer, request_id_middleware, security_headers_middleware,
};
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Directory served under `/static`.
pub const STATIC_DIR: &str = "crates/admin/static";

/// All application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        // Auth
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        // Dashboard and orders
        .route("/", get(dashboard::index))
        .route("/orders", post(dashboard::create_order))
        .route("/orders/{id}/edit", get(orders::edit_page))
        .route("/orders/{id}", post(orders::update))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/orders/{id}/delete", post(orders::delete))
        // Customers
        .route("/customers", get(customers::index).post(customers::create))
        .route("/customers/{id}", get(customers::show).post(customers::update))
        .route("/customers/{id}/edit", get(customers::edit_page))
        .route("/customers/{id}/delete", post(customers::delete))
        // Menu
        .route("/menu", get(menu::index).post(menu::create))
        .route("/menu/share", get(menu::share_page).post(menu::save_share))
        .route("/menu/{id}/edit", get(menu::edit_page))
        .route("/menu/{id}", post(menu::update))
        .route("/menu/{id}/delete", post(menu::delete))
        // Public ordering
        .route(
            "/order/today",
            get(order_today::form_page).post(order_today::submit),
        )
        .route(
            "/order/today/{id}/payment/success",
            post(order_today::payment_success),
        )
        .route(
            "/order/today/{id}/payment/abandon",
            post(order_today::payment_abandon),
        )
        .route("/order/today/{id}/placed", get(order_today::placed))
        // Gateway
        .route("/api/payments/webhook", post(webhook::razorpay))
}

/// The complete application with static files, sessions, request IDs,
/// security headers and request tracing.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());

    Router::new()
        .merge(routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

// =============================================================================
// Shared view models
// =============================================================================

/// Signed-in staff member, shown in the top bar.
#[derive(Debug, Clone)]
pub struct StaffView {
    pub username: String,
}

impl From<&CurrentAdmin> for StaffView {
    fn from(admin: &CurrentAdmin) -> Self {
        Self {
            username: admin.username.clone(),
        }
    }
}

/// One `<option>` in a select box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected,
        }
    }
}

/// Payment status options, with `current` preselected.
#[must_use]
pub fn payment_status_options(current: Option<PaymentStatus>) -> Vec<SelectOption> {
    PaymentStatus::ALL
        .iter()
        .map(|s| SelectOption::new(s.as_str(), s.to_string(), current == Some(*s)))
        .collect()
}

/// Delivery location options, with `current` preselected.
#[must_use]
pub fn location_options(current: Option<DeliveryLocation>) -> Vec<SelectOption> {
    DeliveryLocation::ALL
        .iter()
        .map(|l| SelectOption::new(l.as_str(), l.to_string(), current == Some(*l)))
        .collect()
}

/// Treat empty form fields as absent.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an optional form field, treating blanks as absent.
///
/// # Errors
///
/// Returns `Err(())` when a non-blank value fails to parse.
pub(crate) fn parse_optional<T: std::str::FromStr>(value: Option<&str>) -> Result<Option<T>, ()> {
    non_empty(value)
        .map(|v| v.parse::<T>().map_err(|_| ()))
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::config::AdminConfig;
    use crate::services::checkout::fake::FakeGateway;

    /// Router over a pool that never connects. Only routes that stay off
    /// the database can be exercised.
    fn test_app() -> Router {
        let config = AdminConfig::sample();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        app(AppState::with_gateway(
            config,
            pool,
            Arc::new(FakeGateway::default()),
        ))
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("content-security-policy"));
    }

    #[tokio::test]
    async fn test_dashboard_redirects_to_login() {
        let response = test_app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_login_page_renders() {
        let response = test_app()
            .oneshot(Request::get("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("name=\"password\""));
        assert!(html.contains("JMD Tiffins"));
    }

    #[tokio::test]
    async fn test_webhook_rejects_bad_signature() {
        let request = Request::post("/api/payments/webhook")
            .header("x-razorpay-signature", "deadbeef")
            .body(Body::from(r#"{"event":"payment.captured","payload":{}}"#))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_webhook_ignored_event_is_acknowledged() {
        let body = r#"{"event":"refund.created","payload":{}}"#;
        let signature = crate::payments::signature::hmac_sha256_hex(
            crate::services::checkout::fake::FAKE_KEY_SECRET,
            body.as_bytes(),
        );
        let request = Request::post("/api/payments/webhook")
            .header("x-razorpay-signature", signature)
            .body(Body::from(body))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_parse_optional_blank_is_none() {
        assert_eq!(parse_optional::<i32>(None), Ok(None));
        assert_eq!(parse_optional::<i32>(Some("  ")), Ok(None));
        assert_eq!(parse_optional::<i32>(Some(" 7 ")), Ok(Some(7)));
        assert_eq!(parse_optional::<i32>(Some("seven")), Err(()));
    }

    #[test]
    fn test_status_options_preselect_current() {
        let options = payment_status_options(Some(PaymentStatus::Partial));
        assert_eq!(options.len(), 3);
        let selected: Vec<_> = options.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value, "partial");
    }

    #[test]
    fn test_location_options_labels() {
        let options = location_options(None);
        assert_eq!(options[1].value, "p1_hostel");
        assert_eq!(options[1].label, "P1 Hostel");
        assert!(options.iter().all(|o| !o.selected));
    }
}
