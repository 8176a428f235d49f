//! Handles GET/POST /signout

use axum::response::Redirect;

use crate::security::policy::LOGOUT_SUCCESS_URL;

/// Sessions are not held server-side, so signing out only redirects
pub async fn handle_signout() -> Redirect {
    Redirect::to(LOGOUT_SUCCESS_URL)
}
