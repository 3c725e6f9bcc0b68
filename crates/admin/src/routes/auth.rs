//! Staff login and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::{
    error::{clear_sentry_user, set_sentry_user},
    filters,
    middleware::{LOGIN_PATH, OptionalAdminAuth, clear_current_admin, set_current_admin},
    services::{AdminAuthError, AdminAuthService},
    state::AppState,
};

/// Message query parameters.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Login form input.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub business_name: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

fn error_message(code: &str) -> String {
    match code {
        "credentials" => "Invalid username or password.",
        "session" => "Could not start a session. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
    .to_string()
}

fn success_message(code: &str) -> Option<String> {
    match code {
        "logged_out" => Some("You have been logged out.".to_string()),
        _ => None,
    }
}

/// Display the login page, or go to the dashboard if already signed in.
pub async fn login_page(
    State(state): State<AppState>,
    OptionalAdminAuth(admin): OptionalAdminAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    if admin.is_some() {
        return Redirect::to("/").into_response();
    }

    LoginTemplate {
        business_name: state.config().business_name.clone(),
        error: query.error.as_deref().map(error_message),
        success: query.success.as_deref().and_then(success_message),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let credentials = state.config().credentials.clone();

    // Argon2 verification is CPU-bound
    let result = tokio::task::spawn_blocking(move || {
        AdminAuthService::new(&credentials).login(&form.username, &form.password)
    })
    .await
    .unwrap_or(Err(AdminAuthError::PasswordHash));

    let admin = match result {
        Ok(admin) => admin,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            return Redirect::to(&format!("{LOGIN_PATH}?error=credentials")).into_response();
        }
    };

    if let Err(e) = set_current_admin(&session, &admin).await {
        tracing::error!(error = %e, "Failed to set session");
        return Redirect::to(&format!("{LOGIN_PATH}?error=session")).into_response();
    }

    set_sentry_user(&admin.username);
    tracing::info!(username = %admin.username, "Staff logged in");
    Redirect::to("/").into_response()
}

/// Handle logout.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_admin(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    clear_sentry_user();
    Redirect::to(&format!("{LOGIN_PATH}?success=logged_out")).into_response()
}
