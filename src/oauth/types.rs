//! OAuth2 client registration and token records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Access token lifetime applied when a configured client omits one
pub const DEFAULT_ACCESS_TOKEN_VALIDITY_SECONDS: u32 = 43_200;

fn default_access_token_validity() -> u32 {
    DEFAULT_ACCESS_TOKEN_VALIDITY_SECONDS
}

/// One OAuth2 client application as declared in configuration.
///
/// Field names follow the configuration file format (`clientId`,
/// `authorizedGrantTypes`, ...). The legacy spellings `clientid` and
/// `tokenValidityInSeconds` are accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRegistration {
    /// Unique client identifier
    #[serde(alias = "clientid")]
    pub client_id: String,
    /// Client secret
    #[serde(default)]
    pub secret: String,
    /// Scopes the client may request
    #[serde(default)]
    pub scopes: BTreeSet<String>,
    /// Roles granted to the client itself
    #[serde(default)]
    pub authorities: BTreeSet<String>,
    /// OAuth2 grant flows the client may use
    #[serde(default, rename = "authorizedGrantTypes")]
    pub grant_types: BTreeSet<String>,
    /// Scopes granted without interactive consent
    #[serde(default)]
    pub auto_approve_scopes: BTreeSet<String>,
    /// Lifetime of access tokens issued to the client
    #[serde(
        default = "default_access_token_validity",
        alias = "tokenValidityInSeconds"
    )]
    pub access_token_validity_seconds: u32,
}

impl ClientRegistration {
    /// Compare a presented secret with the registered one
    pub fn secret_matches(&self, presented: &str) -> bool {
        let expected = self.secret.as_bytes();
        let presented = presented.as_bytes();
        if expected.len() != presented.len() {
            return false;
        }
        expected
            .iter()
            .zip(presented)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// Issued access token as persisted by the token store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// The token value
    pub token: String,
    /// Client the token was issued to
    pub client_id: String,
    /// Resource owner, absent for client-only grants
    pub user_name: Option<String>,
    /// Granted scopes
    pub scope: BTreeSet<String>,
    /// Authorities of the authenticated party
    pub authorities: BTreeSet<String>,
    /// Refresh token issued alongside, if any
    pub refresh_token: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Issued refresh token as persisted by the token store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    /// The token value
    pub token: String,
    /// Client the token was issued to
    pub client_id: String,
    /// Resource owner
    pub user_name: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Expiration timestamp (optional, can be long-lived)
    pub expires_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Parse scope string into a set
pub fn parse_scope(scope: &str) -> BTreeSet<String> {
    scope.split_whitespace().map(|s| s.to_string()).collect()
}

/// Join scopes into a space-separated string
pub fn join_scopes(scopes: &BTreeSet<String>) -> String {
    scopes.iter().cloned().collect::<Vec<_>>().join(" ")
}
