//! Access gate applying the security tiers to every request.
//!
//! PUBLIC paths pass untouched. The login tier redirects anonymous requests to
//! the login page. The authorization-server tier requires HTTP Basic client
//! credentials for a reconciled client. The resource tier requires a Bearer
//! access token known to the token store. Authenticated clients and tokens are
//! placed in request extensions for [`AuthenticatedClient`] and [`ExtractedAuth`].

use axum::extract::{FromRequestParts, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use base64::prelude::*;
use http::request::Parts;
use serde_json::json;

use crate::http::context::AppState;
use crate::oauth::types::{AccessToken, ClientRegistration};
use crate::security::policy::Decision;
use crate::security::tiers::Tier;

const CLIENT_REALM: &str = "oauth2/client";

/// Access token of the caller, available behind the resource tier
#[derive(Clone, Debug)]
pub struct ExtractedAuth(pub AccessToken);

/// Client authenticated by the authorization-server tier
#[derive(Clone, Debug)]
pub struct AuthenticatedClient(pub ClientRegistration);

/// Create a standard OAuth 2.0 error response
pub(crate) fn create_oauth_error_response(
    status: StatusCode,
    error: &str,
    error_description: &str,
) -> Response {
    let body = json!({
        "error": error,
        "error_description": error_description
    });

    (status, axum::Json(body)).into_response()
}

fn challenge(mut response: Response, value: String) -> Response {
    if let Ok(value) = HeaderValue::from_str(&value) {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, value);
    }
    response
}

fn authorization_header(request: &Request) -> Option<(String, String)> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let (scheme, credentials) = value.split_once(' ')?;
    Some((scheme.to_lowercase(), credentials.trim().to_string()))
}

/// Decode `Basic` credentials into (client id, secret)
pub(crate) fn parse_basic_credentials(encoded: &str) -> Option<(String, String)> {
    let decoded = BASE64_STANDARD.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (client_id, secret) = credentials.split_once(':')?;
    Some((client_id.to_string(), secret.to_string()))
}

/// Middleware evaluating the security tiers for the request path
pub async fn enforce_security_tiers(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let verdict = state.security_tiers.classify(&path);

    match (verdict.tier, verdict.decision) {
        (_, Decision::Public) => next.run(request).await,
        (Tier::Login, Decision::Authenticated) => {
            tracing::debug!(path = %path, "anonymous request redirected to login page");
            Redirect::to(state.security_tiers.policy().login_page()).into_response()
        }
        (Tier::AuthorizationServer, Decision::Authenticated) => {
            authenticate_client(&state, request, next).await
        }
        (Tier::Resource, Decision::Authenticated) => {
            authenticate_bearer(&state, request, next).await
        }
    }
}

async fn authenticate_client(state: &AppState, mut request: Request, next: Next) -> Response {
    let unauthorized = |description: &str| {
        challenge(
            create_oauth_error_response(StatusCode::UNAUTHORIZED, "invalid_client", description),
            format!("Basic realm=\"{}\"", CLIENT_REALM),
        )
    };

    let credentials = match authorization_header(&request) {
        Some((scheme, encoded)) if scheme == "basic" => parse_basic_credentials(&encoded),
        _ => None,
    };
    let Some((client_id, secret)) = credentials else {
        tracing::debug!(path = %request.uri().path(), "missing client credentials");
        return unauthorized("Client authentication is required");
    };

    match state.client_registry.authenticate(&client_id, &secret).await {
        Ok(Some(client)) => {
            request.extensions_mut().insert(AuthenticatedClient(client));
            next.run(request).await
        }
        Ok(None) => {
            tracing::debug!(client_id = %client_id, "client authentication failed");
            unauthorized("Bad client credentials")
        }
        Err(err) => {
            tracing::error!(error = ?err, "client lookup failed");
            create_oauth_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "Client lookup failed",
            )
        }
    }
}

async fn authenticate_bearer(state: &AppState, mut request: Request, next: Next) -> Response {
    let token = match authorization_header(&request) {
        Some((scheme, token)) if scheme == "bearer" && !token.is_empty() => token,
        _ => {
            tracing::debug!(path = %request.uri().path(), "missing bearer token");
            return challenge(
                create_oauth_error_response(
                    StatusCode::UNAUTHORIZED,
                    "unauthorized",
                    "Full authentication is required to access this resource",
                ),
                "Bearer".to_string(),
            );
        }
    };

    match state.oauth_storage.read_access_token(&token).await {
        Ok(Some(access_token)) => {
            request.extensions_mut().insert(ExtractedAuth(access_token));
            next.run(request).await
        }
        Ok(None) => {
            tracing::debug!(path = %request.uri().path(), "unknown or expired access token");
            challenge(
                create_oauth_error_response(
                    StatusCode::UNAUTHORIZED,
                    "invalid_token",
                    "Access token not found or expired",
                ),
                "Bearer error=\"invalid_token\"".to_string(),
            )
        }
        Err(err) => {
            tracing::error!(error = ?err, "access token lookup failed");
            create_oauth_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "Access token lookup failed",
            )
        }
    }
}

impl<S> FromRequestParts<S> for ExtractedAuth
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<ExtractedAuth>().cloned().ok_or_else(|| {
            create_oauth_error_response(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Full authentication is required to access this resource",
            )
        })
    }
}

impl<S> FromRequestParts<S> for AuthenticatedClient
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedClient>()
            .cloned()
            .ok_or_else(|| {
                create_oauth_error_response(
                    StatusCode::UNAUTHORIZED,
                    "invalid_client",
                    "Client authentication is required",
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_credentials() {
        let encoded = BASE64_STANDARD.encode("web_app:s3cr:et");
        assert_eq!(
            parse_basic_credentials(&encoded),
            Some(("web_app".to_string(), "s3cr:et".to_string()))
        );
        assert_eq!(parse_basic_credentials("!!not-base64"), None);
        assert_eq!(
            parse_basic_credentials(&BASE64_STANDARD.encode("no-colon")),
            None
        );
    }
}
