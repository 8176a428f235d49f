//! Request path security: Ant-style patterns, the login-tier policy table and
//! the ordered security tiers.

pub mod pattern;
pub mod policy;
pub mod tiers;

pub use pattern::PathPattern;
pub use policy::{Decision, LoginTierSettings, ManagementSecurity, PolicyRule, PolicyTable};
pub use tiers::{SecurityTiers, Tier, TierPrecedence, Verdict};
