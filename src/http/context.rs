//! Application state and request context management.

use axum_template::engine::Engine;
use minijinja::Environment;
use std::sync::Arc;

use crate::config::Config;
use crate::oauth::clients::ClientRegistry;
use crate::security::tiers::SecurityTiers;
use crate::storage::traits::{OAuthStorage, UserProfileStore};

/// Template engine for rendering HTML responses.
pub type AppEngine = Engine<Environment<'static>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Template engine for rendering HTML responses.
    pub template_env: AppEngine,
    /// OAuth storage for tokens and clients
    pub oauth_storage: Arc<dyn OAuthStorage>,
    /// Clients recognized after startup reconciliation
    pub client_registry: ClientRegistry,
    /// Profiles owned by user management
    pub profile_storage: Arc<dyn UserProfileStore>,
    /// Immutable per-path security decisions
    pub security_tiers: Arc<SecurityTiers>,
}
