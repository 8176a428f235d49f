//! "Who am I" responses: an authenticated identity merged with the caller's profile.
//!
//! The serialized [`EnrichedPrincipal`] is a single flat JSON object. Identity
//! fields come first and win on a name collision; profile fields with a name
//! already used by the identity are dropped.

use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::oauth::types::AccessToken;

/// Who is calling, as established by the authentication layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    /// Subject name
    pub name: String,
    /// Additional claims attached by the authentication layer
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl AuthenticatedIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            claims: Map::new(),
        }
    }

    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(key.into(), value.into());
        self
    }

    /// Whether the token was issued to a client acting on its own behalf
    pub fn is_client_only(&self) -> bool {
        self.claims
            .get("clientOnly")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

impl From<&AccessToken> for AuthenticatedIdentity {
    fn from(token: &AccessToken) -> Self {
        let name = token
            .user_name
            .clone()
            .unwrap_or_else(|| token.client_id.clone());
        Self::new(name)
            .with_claim("authorities", token.authorities.iter().cloned().collect::<Vec<_>>())
            .with_claim("clientId", token.client_id.clone())
            .with_claim("scope", token.scope.iter().cloned().collect::<Vec<_>>())
            .with_claim("clientOnly", token.user_name.is_none())
    }
}

/// User account details owned by the user-management collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture_key: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub authorities: Vec<String>,
    /// Profile attributes without a dedicated field
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request-scoped response value combining identity and profile
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPrincipal {
    identity: AuthenticatedIdentity,
    profile: UserProfile,
}

impl EnrichedPrincipal {
    pub fn identity(&self) -> &AuthenticatedIdentity {
        &self.identity
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Flatten both parts into one JSON object
    pub fn to_map(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut merged = to_object(&self.identity)?;
        for (key, value) in to_object(&self.profile)? {
            if merged.contains_key(&key) {
                tracing::debug!(field = %key, "profile field shadowed by identity field");
                continue;
            }
            merged.insert(key, value);
        }
        Ok(merged)
    }
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(serde_json::Error::custom(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

impl Serialize for EnrichedPrincipal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let merged = self.to_map().map_err(S::Error::custom)?;
        let mut map = serializer.serialize_map(Some(merged.len()))?;
        for (key, value) in &merged {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Combine an authenticated identity with the matching user profile
pub fn enrich(identity: AuthenticatedIdentity, profile: UserProfile) -> EnrichedPrincipal {
    EnrichedPrincipal { identity, profile }
}
