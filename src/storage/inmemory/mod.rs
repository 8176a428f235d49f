//! In-memory storage implementations
//!
//! These implementations are suitable for development and testing.

mod oauth;
mod profiles;

pub use oauth::MemoryOAuthStorage;
pub use profiles::MemoryUserProfileStore;
