//! Environment-based configuration types for the authgate server runtime settings.

use anyhow::Result;
use std::collections::HashSet;

use crate::errors::ConfigError;
use crate::oauth::clients::ClientPersistence;
use crate::oauth::types::ClientRegistration;
use crate::security::policy::{
    FIXED_PUBLIC_PATHS, LoginTierSettings, ManagementSecurity, normalize_context_path,
};
use crate::security::tiers::{
    AUTHORIZATION_SERVER_ENDPOINTS, DEFAULT_AUTHORIZATION_SERVER_ORDER,
    DEFAULT_MANAGEMENT_BASIC_AUTH_ORDER, TierPrecedence,
};

/// Routes served by this process that the login page must not shadow
const RESERVED_PATHS: [&str; 2] = ["/user", "/signout"];

/// HTTP server port configuration
#[derive(Clone, Debug)]
pub struct HttpPort(u16);

/// Login page path
#[derive(Clone, Debug)]
pub struct LoginPage(String);

/// Redirect target after a successful login
#[derive(Clone, Debug)]
pub struct DefaultSuccessUrl(String);

/// Whether configured clients are written to the database
#[derive(Clone, Debug)]
pub struct ClientsUseDatabase(bool);

/// Whether the management layer secures its own endpoints
#[derive(Clone, Debug)]
pub struct ManagementSecurityEnabled(bool);

/// A security tier precedence integer
#[derive(Clone, Copy, Debug)]
pub struct TierOrder(i32);

/// Seconds between expired token sweeps, zero disables them
#[derive(Clone, Copy, Debug)]
pub struct TokenCleanupInterval(u64);

/// Client registrations declared in configuration
#[derive(Clone, Debug, Default)]
pub struct ConfiguredClients(Vec<ClientRegistration>);

/// Main application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub version: String,
    pub http_port: HttpPort,
    pub storage_backend: String,
    pub database_url: Option<String>,
    pub oauth_clients: ConfiguredClients,
    pub clients_use_database: ClientsUseDatabase,
    pub login_page: LoginPage,
    pub default_success_url: DefaultSuccessUrl,
    pub management_security_enabled: ManagementSecurityEnabled,
    pub management_context_path: String,
    pub management_basic_auth_order: TierOrder,
    pub authorization_server_order: TierOrder,
    /// JSON file seeding the in-process profile store
    pub user_profiles_file: Option<String>,
    pub token_cleanup_interval: TokenCleanupInterval,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_env = |name: &str, default_value: &str| {
            lookup(name).unwrap_or_else(|| default_value.to_string())
        };

        let http_port: HttpPort = default_env("HTTP_PORT", "8080").try_into()?;
        let storage_backend = default_env("STORAGE_BACKEND", "memory");
        let database_url = lookup("DATABASE_URL");
        let oauth_clients = match lookup("OAUTH_CLIENTS_FILE") {
            Some(path) => ConfiguredClients::from_file(&path)?,
            None => default_env("OAUTH_CLIENTS", "[]").try_into()?,
        };
        let clients_use_database: ClientsUseDatabase =
            default_env("OAUTH_CLIENTS_USE_DATABASE", "false").try_into()?;
        let login_page: LoginPage = default_env("LOGIN_PAGE", "/login").try_into()?;
        let default_success_url: DefaultSuccessUrl =
            default_env("DEFAULT_SUCCESS_URL", "/").try_into()?;
        let management_security_enabled: ManagementSecurityEnabled =
            default_env("MANAGEMENT_SECURITY_ENABLED", "true").try_into()?;
        let management_context_path = default_env("MANAGEMENT_CONTEXT_PATH", "");
        if let Some(context_path) = normalize_context_path(&management_context_path) {
            let health_path = format!("{context_path}/health");
            if *login_page.as_ref() == health_path {
                return Err(ConfigError::ReservedPath(health_path).into());
            }
        }
        let management_basic_auth_order = TierOrder::parse(
            default_env(
                "MANAGEMENT_BASIC_AUTH_ORDER",
                &DEFAULT_MANAGEMENT_BASIC_AUTH_ORDER.to_string(),
            ),
        )?;
        let authorization_server_order = TierOrder::parse(default_env(
            "AUTHORIZATION_SERVER_ORDER",
            &DEFAULT_AUTHORIZATION_SERVER_ORDER.to_string(),
        ))?;
        let user_profiles_file =
            lookup("USER_PROFILES_FILE").filter(|path| !path.trim().is_empty());
        let token_cleanup_interval: TokenCleanupInterval =
            default_env("TOKEN_CLEANUP_INTERVAL_SECONDS", "3600").try_into()?;

        let config = Self {
            version: version()?,
            http_port,
            storage_backend,
            database_url,
            oauth_clients,
            clients_use_database,
            login_page,
            default_success_url,
            management_security_enabled,
            management_context_path,
            management_basic_auth_order,
            authorization_server_order,
            user_profiles_file,
            token_cleanup_interval,
        };
        config.tier_precedence().validate()?;
        Ok(config)
    }

    pub fn client_persistence(&self) -> ClientPersistence {
        ClientPersistence::from_use_database(*self.clients_use_database.as_ref())
    }

    pub fn management_security(&self) -> ManagementSecurity {
        ManagementSecurity {
            enabled: *self.management_security_enabled.as_ref(),
            context_path: self.management_context_path.clone(),
        }
    }

    pub fn login_tier_settings(&self) -> LoginTierSettings {
        LoginTierSettings {
            login_page: self.login_page.as_ref().clone(),
            default_success_url: self.default_success_url.as_ref().clone(),
            management: self.management_security(),
        }
    }

    pub fn tier_precedence(&self) -> TierPrecedence {
        TierPrecedence {
            management_basic_auth_order: *self.management_basic_auth_order.as_ref(),
            authorization_server_order: *self.authorization_server_order.as_ref(),
        }
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

fn parse_bool(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::BoolParsingFailed(value.to_string())),
    }
}

fn validate_path(name: &str, value: String) -> Result<String, ConfigError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ConfigError::BlankPath(name.to_string()));
    }
    if !value.starts_with('/') {
        return Err(ConfigError::RelativePath(name.to_string(), value));
    }
    Ok(value)
}

impl TryFrom<String> for HttpPort {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Ok(Self(8080))
        } else {
            value
                .parse::<u16>()
                .map(Self)
                .map_err(|err| ConfigError::PortParsingFailed(err).into())
        }
    }
}

impl AsRef<u16> for HttpPort {
    fn as_ref(&self) -> &u16 {
        &self.0
    }
}

impl TryFrom<String> for LoginPage {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = validate_path("LOGIN_PAGE", value)?;
        let reserved = RESERVED_PATHS
            .iter()
            .chain(AUTHORIZATION_SERVER_ENDPOINTS.iter())
            .chain(FIXED_PUBLIC_PATHS.iter().filter(|path| **path != "/login"));
        if reserved.into_iter().any(|path| *path == value) {
            return Err(ConfigError::ReservedPath(value));
        }
        Ok(Self(value))
    }
}

impl AsRef<String> for LoginPage {
    fn as_ref(&self) -> &String {
        &self.0
    }
}

impl TryFrom<String> for DefaultSuccessUrl {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_path("DEFAULT_SUCCESS_URL", value).map(Self)
    }
}

impl AsRef<String> for DefaultSuccessUrl {
    fn as_ref(&self) -> &String {
        &self.0
    }
}

impl TryFrom<String> for ClientsUseDatabase {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_bool(&value).map(Self)
    }
}

impl AsRef<bool> for ClientsUseDatabase {
    fn as_ref(&self) -> &bool {
        &self.0
    }
}

impl TryFrom<String> for ManagementSecurityEnabled {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_bool(&value).map(Self)
    }
}

impl AsRef<bool> for ManagementSecurityEnabled {
    fn as_ref(&self) -> &bool {
        &self.0
    }
}

impl TierOrder {
    fn parse(value: String) -> Result<Self, ConfigError> {
        value
            .trim()
            .parse::<i32>()
            .map(Self)
            .map_err(|err| ConfigError::OrderParsingFailed(value, err))
    }
}

impl AsRef<i32> for TierOrder {
    fn as_ref(&self) -> &i32 {
        &self.0
    }
}

impl TryFrom<String> for TokenCleanupInterval {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|err| ConfigError::IntervalParsingFailed(value, err))
    }
}

impl TokenCleanupInterval {
    pub fn period(&self) -> Option<std::time::Duration> {
        (self.0 > 0).then(|| std::time::Duration::from_secs(self.0))
    }
}

impl ConfiguredClients {
    /// Read the client list from a JSON file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::ClientsFileUnreadable(path.to_string(), err))?;
        contents.try_into()
    }
}

impl TryFrom<String> for ConfiguredClients {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Ok(Self::default());
        }

        let clients: Vec<ClientRegistration> = serde_json::from_str(&value)
            .map_err(|err| ConfigError::ClientsParsingFailed(err.to_string()))?;

        let mut seen = HashSet::new();
        for (position, client) in clients.iter().enumerate() {
            if client.client_id.trim().is_empty() {
                return Err(ConfigError::BlankClientId(position));
            }
            if !seen.insert(client.client_id.as_str()) {
                return Err(ConfigError::DuplicateClientId(client.client_id.clone()));
            }
        }

        Ok(Self(clients))
    }
}

impl AsRef<Vec<ClientRegistration>> for ConfiguredClients {
    fn as_ref(&self) -> &Vec<ClientRegistration> {
        &self.0
    }
}
