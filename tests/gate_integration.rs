//! Access gate integration tests
//!
//! These tests drive the full router, security tiers included, with in-memory
//! storage and a stand-in protocol route for the token endpoint.

use authgate::config::Config;
use authgate::http::{AppEngine, AppState, AuthenticatedClient, build_router};
use authgate::oauth::clients::reconcile;
use authgate::oauth::principal::UserProfile;
use authgate::oauth::types::{AccessToken, ClientRegistration};
use authgate::security::{PolicyTable, SecurityTiers};
use authgate::storage::{MemoryOAuthStorage, MemoryUserProfileStore, OAuthStorage};
use authgate::templates::build_env;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use base64::prelude::*;
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

const CLIENTS: &str = r#"[
    {"clientId": "web_app", "secret": "changeit", "authorizedGrantTypes": ["password"]}
]"#;

async fn issue_token_stub(AuthenticatedClient(client): AuthenticatedClient) -> Json<Value> {
    Json(json!({ "client": client.client_id }))
}

async fn app(vars: &[(&str, &str)]) -> (Router, Arc<dyn OAuthStorage>) {
    let mut vars: HashMap<String, String> = vars
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    vars.entry("OAUTH_CLIENTS".to_string())
        .or_insert_with(|| CLIENTS.to_string());
    let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();

    let oauth_storage: Arc<dyn OAuthStorage> = Arc::new(MemoryOAuthStorage::new());
    let configured: &Vec<ClientRegistration> = config.oauth_clients.as_ref();
    let client_registry = reconcile(
        configured,
        config.client_persistence(),
        oauth_storage.clone(),
    )
    .await
    .unwrap();

    let profiles = MemoryUserProfileStore::new();
    profiles
        .insert_profile(UserProfile {
            login: Some("alice".to_string()),
            first_name: Some("Alice".to_string()),
            email: Some("alice@example.com".to_string()),
            activated: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();

    let policy = PolicyTable::build(&config.login_tier_settings());
    let security_tiers = SecurityTiers::new(policy, config.tier_precedence()).unwrap();

    let state = AppState {
        config: Arc::new(config),
        template_env: AppEngine::from(build_env("test".to_string()).unwrap()),
        oauth_storage: oauth_storage.clone(),
        client_registry,
        profile_storage: Arc::new(profiles),
        security_tiers: Arc::new(security_tiers),
    };

    let protocol_routes = Router::new().route("/oauth/token", post(issue_token_stub));
    (build_router(state, protocol_routes), oauth_storage)
}

fn access_token(token: &str, user_name: Option<&str>) -> AccessToken {
    let now = Utc::now();
    AccessToken {
        token: token.to_string(),
        client_id: "web_app".to_string(),
        user_name: user_name.map(str::to_string),
        scope: ["read".to_string()].into_iter().collect(),
        authorities: ["ROLE_USER".to_string()].into_iter().collect(),
        refresh_token: None,
        created_at: now,
        expires_at: now + Duration::hours(1),
    }
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_public_pages_are_served_anonymously() {
    let (app, _) = app(&[]).await;

    for uri in ["/", "/login", "/login?error", "/reset"] {
        let response = send(&app, get(uri)).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn test_signout_redirects_to_login() {
    let (app, _) = app(&[]).await;

    let response = send(&app, get("/signout")).await;
    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn test_user_requires_bearer_token() {
    let (app, _) = app(&[]).await;

    let response = send(&app, get("/user")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    assert_eq!(json_body(response).await["error"], "unauthorized");

    let response = send(&app, get_with_bearer("/user", "unknown")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "invalid_token");
}

#[tokio::test]
async fn test_user_returns_enriched_principal() {
    let (app, storage) = app(&[]).await;
    storage
        .store_access_token(&access_token("alice-token", Some("alice")))
        .await
        .unwrap();

    let response = send(&app, get_with_bearer("/user", "alice-token")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["name"], "alice");
    assert_eq!(body["clientId"], "web_app");
    assert_eq!(body["firstName"], "Alice");
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["activated"], true);
    // identity authorities shadow the (empty) profile authorities
    assert_eq!(body["authorities"], json!(["ROLE_USER"]));
}

#[tokio::test]
async fn test_user_without_profile_is_not_found() {
    let (app, storage) = app(&[]).await;
    storage
        .store_access_token(&access_token("bob-token", Some("bob")))
        .await
        .unwrap();
    storage
        .store_access_token(&access_token("client-token", None))
        .await
        .unwrap();

    for token in ["bob-token", "client-token"] {
        let response = send(&app, get_with_bearer("/user", token)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{token}");
        assert_eq!(json_body(response).await["error"], "profile_not_found");
    }
}

#[tokio::test]
async fn test_token_endpoint_requires_client_credentials() {
    let (app, _) = app(&[]).await;

    let token_request = |authorization: Option<String>| {
        let mut builder = Request::builder().method("POST").uri("/oauth/token");
        if let Some(authorization) = authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }
        builder.body(Body::empty()).unwrap()
    };

    let response = send(&app, token_request(None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::WWW_AUTHENTICATE],
        "Basic realm=\"oauth2/client\""
    );

    let wrong = BASE64_STANDARD.encode("web_app:wrong");
    let response = send(&app, token_request(Some(format!("Basic {wrong}")))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "invalid_client");

    let valid = BASE64_STANDARD.encode("web_app:changeit");
    let response = send(&app, token_request(Some(format!("Basic {valid}")))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["client"], "web_app");
}

#[tokio::test]
async fn test_unclaimed_paths_fall_to_resource_tier() {
    let (app, storage) = app(&[]).await;
    storage
        .store_access_token(&access_token("alice-token", Some("alice")))
        .await
        .unwrap();

    let response = send(&app, get("/api/anything")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // authenticated but unrouted
    let response = send(&app, get_with_bearer("/api/anything", "alice-token")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_management_health_open_when_management_security_disabled() {
    let (app, _) = app(&[
        ("MANAGEMENT_SECURITY_ENABLED", "false"),
        ("MANAGEMENT_CONTEXT_PATH", "/manage"),
    ])
    .await;

    let response = send(&app, get("/manage/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "UP");
}

#[tokio::test]
async fn test_management_health_secured_when_management_security_enabled() {
    let (app, storage) = app(&[
        ("MANAGEMENT_SECURITY_ENABLED", "true"),
        ("MANAGEMENT_CONTEXT_PATH", "/manage"),
    ])
    .await;

    let response = send(&app, get("/manage/health")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    storage
        .store_access_token(&access_token("alice-token", Some("alice")))
        .await
        .unwrap();
    let response = send(&app, get_with_bearer("/manage/health", "alice-token")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_custom_login_page_is_public_and_rendered() {
    let (app, _) = app(&[("LOGIN_PAGE", "/sso/login")]).await;

    let response = send(&app, get("/sso/login")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains(r#"action="&#x2f;sso&#x2f;login""#));
}
