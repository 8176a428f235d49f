//! Handles GET / - Renders the main index page of the application

use axum::{extract::State, response::IntoResponse};
use axum_template::RenderHtml;
use minijinja::context;

use super::context::AppState;

/// Handle requests to the index page
pub async fn handle_index(State(state): State<AppState>) -> impl IntoResponse {
    RenderHtml(
        "index.html",
        state.template_env.clone(),
        context! {
            login_page => state.security_tiers.policy().login_page(),
        },
    )
}
