//! Handles GET /user - the caller's identity merged with their profile

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};

use super::context::AppState;
use crate::http::middleware_gate::ExtractedAuth;
use crate::oauth::principal::{AuthenticatedIdentity, EnrichedPrincipal, enrich};

/// Get the current principal
/// GET /user
///
/// Returns one flat JSON object: the identity established from the access
/// token followed by the fields of the matching user profile.
pub async fn get_user_handler(
    State(state): State<AppState>,
    ExtractedAuth(access_token): ExtractedAuth,
) -> Result<Json<EnrichedPrincipal>, (StatusCode, Json<Value>)> {
    let identity = AuthenticatedIdentity::from(&access_token);

    if identity.is_client_only() {
        let error_response = json!({
            "error": "profile_not_found",
            "error_description": "Access token is not bound to a user"
        });
        return Err((StatusCode::NOT_FOUND, Json(error_response)));
    }

    let login = identity.name.clone();
    match state.profile_storage.find_profile_by_login(&login).await {
        Ok(Some(profile)) => Ok(Json(enrich(identity, profile))),
        Ok(None) => {
            tracing::debug!(login = %login, "no profile for authenticated user");
            let error_response = json!({
                "error": "profile_not_found",
                "error_description": "No profile exists for the authenticated user"
            });
            Err((StatusCode::NOT_FOUND, Json(error_response)))
        }
        Err(err) => {
            tracing::error!(error = ?err, "profile lookup failed");
            let error_response = json!({
                "error": "server_error",
                "error_description": "Internal error generating response"
            });
            Err((StatusCode::INTERNAL_SERVER_ERROR, Json(error_response)))
        }
    }
}
