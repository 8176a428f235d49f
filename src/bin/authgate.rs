//! authgate server binary.
//!
//! Reconciles configured OAuth clients, builds the security tiers and starts
//! the HTTP server with graceful shutdown.

use anyhow::{Context, Result};
use authgate::{
    config::Config,
    http::{AppEngine, AppState, build_router},
    oauth::{clients::reconcile, principal::UserProfile, types::ClientRegistration},
    security::{PolicyTable, SecurityTiers},
    storage::{MemoryUserProfileStore, create_storage_backend, parse_storage_backend},
    templates::build_env,
};
use std::{env, sync::Arc};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing_subscriber::prelude::*;

async fn load_profiles(path: Option<&str>) -> Result<MemoryUserProfileStore> {
    let store = MemoryUserProfileStore::new();
    let Some(path) = path else {
        return Ok(store);
    };

    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("unable to read user profiles from {path}"))?;
    let profiles: Vec<UserProfile> = serde_json::from_str(&contents)
        .with_context(|| format!("unable to parse user profiles from {path}"))?;
    let count = profiles.len();
    for profile in profiles {
        store.insert_profile(profile).await?;
    }
    tracing::info!(count, "loaded user profiles");
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "authgate=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();

    let version = authgate::config::version()?;

    env::args().for_each(|arg| {
        if arg == "--version" {
            println!("{version}");
            std::process::exit(0);
        }
    });

    tracing::info!(?version, "Starting authgate");

    let config = Config::new()?;

    let template_env = AppEngine::from(build_env(version.clone())?);

    // Parse storage backend configuration
    let storage_backend =
        parse_storage_backend(&config.storage_backend, config.database_url.as_deref())?;
    let oauth_storage = create_storage_backend(storage_backend).await?;

    // Configuration is the source of truth for clients; failures abort startup
    let configured: &Vec<ClientRegistration> = config.oauth_clients.as_ref();
    let client_registry = reconcile(
        configured,
        config.client_persistence(),
        oauth_storage.clone(),
    )
    .await?;

    let policy = PolicyTable::build(&config.login_tier_settings());
    let security_tiers = SecurityTiers::new(policy, config.tier_precedence())?;
    tracing::info!(order = ?security_tiers.order(), "security tiers ready");

    let profile_storage = load_profiles(config.user_profiles_file.as_deref()).await?;

    let token_storage = oauth_storage.clone();
    let app_context = AppState {
        config: Arc::new(config.clone()),
        template_env,
        oauth_storage,
        client_registry,
        profile_storage: Arc::new(profile_storage),
        security_tiers: Arc::new(security_tiers),
    };

    // Protocol endpoints are provided by the external token issuer
    let app = build_router(app_context, axum::Router::new());

    // Setup graceful shutdown
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    {
        let tracker = tracker.clone();
        let inner_token = token.clone();

        let ctrl_c = async {
            if let Err(err) = signal::ctrl_c().await {
                tracing::error!(error = ?err, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(err) => {
                    tracing::error!(error = ?err, "failed to install signal handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::spawn(async move {
            tokio::select! {
                () = inner_token.cancelled() => { },
                _ = terminate => {},
                _ = ctrl_c => {},
            }

            tracker.close();
            inner_token.cancel();
        });
    }

    if let Some(period) = config.token_cleanup_interval.period() {
        let inner_token = token.clone();
        tracker.spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    () = inner_token.cancelled() => break,
                    _ = interval.tick() => {
                        match token_storage.remove_expired_tokens().await {
                            Ok(0) => {}
                            Ok(removed) => tracing::info!(removed, "removed expired tokens"),
                            Err(err) => tracing::warn!(error = ?err, "expired token sweep failed"),
                        }
                    }
                }
            }
        });
    }

    // Start HTTP server
    let http_port = *config.http_port.as_ref();
    let bind_address = format!("0.0.0.0:{http_port}");
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("unable to bind {bind_address}"))?;

    {
        let inner_token = token.clone();
        tracker.spawn(async move {
            tracing::info!("Starting server on {bind_address}");

            let shutdown_token = inner_token.clone();
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    tokio::select! {
                        () = shutdown_token.cancelled() => { }
                    }
                    tracing::info!("axum graceful shutdown complete");
                })
                .await;
            if let Err(err) = result {
                tracing::error!("axum task failed: {}", err);
            }

            inner_token.cancel();
        });
    }

    tracker.wait().await;

    Ok(())
}
