//! Handles the login form page and the password reset page

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum_template::RenderHtml;
use minijinja::context;
use serde::Deserialize;

use super::context::AppState;

/// Flags appended by the login flow (`?error`, `?logout`)
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
    pub logout: Option<String>,
}

/// GET {login page}
pub async fn handle_login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    let policy = state.security_tiers.policy();
    RenderHtml(
        "login.html",
        state.template_env.clone(),
        context! {
            login_page => policy.login_page(),
            default_success_url => policy.default_success_url(),
            error => query.error.is_some(),
            logout => query.logout.is_some(),
        },
    )
}

/// GET /reset
pub async fn handle_reset_page(State(state): State<AppState>) -> impl IntoResponse {
    RenderHtml(
        "reset.html",
        state.template_env.clone(),
        context! {
            login_page => state.security_tiers.policy().login_page(),
        },
    )
}
