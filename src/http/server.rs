//! Main router configuration placing every route behind the access gate.

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use super::{
    context::AppState,
    handler_health::handle_health,
    handler_index::handle_index,
    handler_login::{handle_login_page, handle_reset_page},
    handler_signout::handle_signout,
    handler_user::get_user_handler,
    middleware_gate::enforce_security_tiers,
};
use crate::security::policy::normalize_context_path;

/// Build the application router
///
/// `protocol_routes` are the token issuer's endpoints (token exchange, login
/// form processing, authorization and consent). They are merged into this
/// router and gated like every other path, so they must not redefine the
/// routes registered here.
pub fn build_router(ctx: AppState, protocol_routes: Router<AppState>) -> Router {
    let login_page = ctx.security_tiers.policy().login_page().to_string();

    let mut router = Router::new()
        .route("/", get(handle_index))
        .route("/reset", get(handle_reset_page))
        .route("/signout", get(handle_signout).post(handle_signout))
        .route("/user", get(get_user_handler))
        .route(&login_page, get(handle_login_page));

    if let Some(context_path) = normalize_context_path(&ctx.config.management_context_path) {
        router = router.route(&format!("{}/health", context_path), get(handle_health));
    }

    router
        .merge(protocol_routes)
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            enforce_security_tiers,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
