//! Security tiers evaluated per request.
//!
//! Two ordered tiers compete for each path: the authorization-server tier
//! (token endpoints, client authentication) and the login tier backed by
//! [`PolicyTable`]. Lower order values are evaluated first. Their orders are
//! configuration inputs relative to the external management basic-auth
//! baseline. A path neither tier claims belongs to the resource tier, which
//! always requires an access token.

use serde::Serialize;

use super::pattern::PathPattern;
use super::policy::{Decision, PolicyTable};
use crate::errors::ConfigError;

/// Token endpoints owned by the external token issuer
pub const AUTHORIZATION_SERVER_ENDPOINTS: [&str; 3] =
    ["/oauth/token", "/oauth/token_key", "/oauth/check_token"];

/// Lowest possible precedence
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// Default external management basic-auth order
pub const DEFAULT_MANAGEMENT_BASIC_AUTH_ORDER: i32 = LOWEST_PRECEDENCE - 10;

/// Default order of the authorization-server tier
pub const DEFAULT_AUTHORIZATION_SERVER_ORDER: i32 = LOWEST_PRECEDENCE - 2;

/// Which tier governs a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    AuthorizationServer,
    Login,
    Resource,
}

/// Outcome of classifying a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub tier: Tier,
    pub decision: Decision,
}

/// Precedence inputs for the ordered tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPrecedence {
    pub management_basic_auth_order: i32,
    pub authorization_server_order: i32,
}

impl Default for TierPrecedence {
    fn default() -> Self {
        Self {
            management_basic_auth_order: DEFAULT_MANAGEMENT_BASIC_AUTH_ORDER,
            authorization_server_order: DEFAULT_AUTHORIZATION_SERVER_ORDER,
        }
    }
}

impl TierPrecedence {
    /// The login tier sits directly after the management baseline
    pub fn login_order(&self) -> i32 {
        self.management_basic_auth_order.saturating_add(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.login_order() == self.authorization_server_order {
            return Err(ConfigError::AmbiguousTierOrder(self.login_order()));
        }
        Ok(())
    }
}

/// All tiers in evaluation order
#[derive(Debug)]
pub struct SecurityTiers {
    order: Vec<(i32, Tier)>,
    endpoints: Vec<PathPattern>,
    policy: PolicyTable,
}

impl SecurityTiers {
    pub fn new(policy: PolicyTable, precedence: TierPrecedence) -> Result<Self, ConfigError> {
        precedence.validate()?;

        let mut order = vec![
            (precedence.authorization_server_order, Tier::AuthorizationServer),
            (precedence.login_order(), Tier::Login),
        ];
        order.sort_by_key(|(order, _)| *order);

        Ok(Self {
            order,
            endpoints: AUTHORIZATION_SERVER_ENDPOINTS
                .iter()
                .map(|endpoint| PathPattern::new(*endpoint))
                .collect(),
            policy,
        })
    }

    /// The login-tier policy table
    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// Ordered tiers in evaluation order
    pub fn order(&self) -> &[(i32, Tier)] {
        &self.order
    }

    /// Decide which tier governs `path` and what it requires
    pub fn classify(&self, path: &str) -> Verdict {
        self.order
            .iter()
            .find_map(|(_, tier)| self.evaluate(*tier, path))
            .unwrap_or(Verdict {
                tier: Tier::Resource,
                decision: Decision::Authenticated,
            })
    }

    fn evaluate(&self, tier: Tier, path: &str) -> Option<Verdict> {
        match tier {
            Tier::AuthorizationServer => self
                .endpoints
                .iter()
                .any(|endpoint| endpoint.matches(path))
                .then_some(Verdict {
                    tier,
                    decision: Decision::Authenticated,
                }),
            Tier::Login => self
                .policy
                .evaluate(path)
                .map(|decision| Verdict { tier, decision }),
            Tier::Resource => None,
        }
    }
}
