//! OAuth2 client registrations, issued tokens and the "who am I" principal.

pub mod clients;
pub mod principal;
pub mod types;

// Re-export frequently used items from each module
pub use crate::storage::traits::{ClientStore, OAuthStorage, TokenStore, UserProfileStore};
pub use clients::{ClientPersistence, ClientRegistry, reconcile};
pub use principal::{AuthenticatedIdentity, EnrichedPrincipal, UserProfile, enrich};
pub use types::{AccessToken, ClientRegistration, RefreshToken, parse_scope};
