//! Login-tier access policy.
//!
//! The table is built once at startup and never mutated afterwards, so it can
//! be shared across request handlers without locking.

use serde::Serialize;

use super::pattern::PathPattern;

/// Paths the login tier always serves without authentication
pub const FIXED_PUBLIC_PATHS: [&str; 6] = [
    "/login",
    "/signout",
    "/reset",
    "/",
    "/oauth/authorize",
    "/oauth/confirm_access",
];

/// Where users are sent after signing out
pub const LOGOUT_SUCCESS_URL: &str = "/login";

/// Access decision attached to a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Public,
    Authenticated,
}

/// Management endpoint posture supplied by the management layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagementSecurity {
    pub enabled: bool,
    pub context_path: String,
}

impl ManagementSecurity {
    /// Context path whose subtree is opened up, if any
    pub fn public_context_path(&self) -> Option<String> {
        if self.enabled {
            return None;
        }
        normalize_context_path(&self.context_path)
    }
}

/// Inputs for building the login-tier policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginTierSettings {
    pub login_page: String,
    pub default_success_url: String,
    pub management: ManagementSecurity,
}

/// One (pattern, decision) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    pattern: PathPattern,
    decision: Decision,
}

impl PolicyRule {
    pub fn new(pattern: PathPattern, decision: Decision) -> Self {
        Self { pattern, decision }
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }
}

/// Ordered, first-match rule list for the login tier
#[derive(Debug, Clone)]
pub struct PolicyTable {
    request_matchers: Vec<PathPattern>,
    rules: Vec<PolicyRule>,
    login_page: String,
    default_success_url: String,
}

impl PolicyTable {
    pub fn build(settings: &LoginTierSettings) -> Self {
        let mut public_paths: Vec<String> =
            FIXED_PUBLIC_PATHS.iter().map(|path| path.to_string()).collect();
        if !public_paths.contains(&settings.login_page) {
            public_paths.push(settings.login_page.clone());
        }
        if let Some(context_path) = settings.management.public_context_path() {
            public_paths.push(format!("{context_path}/**"));
        }

        let request_matchers: Vec<PathPattern> =
            public_paths.iter().map(PathPattern::new).collect();
        let mut rules: Vec<PolicyRule> = request_matchers
            .iter()
            .cloned()
            .map(|pattern| PolicyRule::new(pattern, Decision::Public))
            .collect();
        rules.push(PolicyRule::new(PathPattern::any(), Decision::Authenticated));

        tracing::debug!(
            rules = ?rules
                .iter()
                .map(|rule| format!("{} -> {:?}", rule.pattern(), rule.decision()))
                .collect::<Vec<_>>(),
            "login tier policy built"
        );

        Self {
            request_matchers,
            rules,
            login_page: settings.login_page.clone(),
            default_success_url: settings.default_success_url.clone(),
        }
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn login_page(&self) -> &str {
        &self.login_page
    }

    pub fn default_success_url(&self) -> &str {
        &self.default_success_url
    }

    /// Whether the login tier is responsible for this path at all
    pub fn claims(&self, path: &str) -> bool {
        self.request_matchers
            .iter()
            .any(|pattern| pattern.matches(path))
    }

    /// First matching rule's decision; the trailing catch-all always matches
    pub fn decide(&self, path: &str) -> Decision {
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map(PolicyRule::decision)
            .unwrap_or(Decision::Authenticated)
    }

    /// Decision for a path this tier claims, `None` when another tier governs it
    pub fn evaluate(&self, path: &str) -> Option<Decision> {
        self.claims(path).then(|| self.decide(path))
    }
}

/// Strip trailing slashes and ensure a leading one; blank or root-only paths yield `None`
pub fn normalize_context_path(context_path: &str) -> Option<String> {
    let trimmed = context_path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("/{trimmed}"))
    }
}
