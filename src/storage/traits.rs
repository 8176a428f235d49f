//! Storage trait definitions for client registrations, tokens and user profiles.
//!
//! Defines async storage interfaces that can be implemented by various
//! backend providers.

use crate::errors::StorageError;
use crate::oauth::principal::UserProfile;
use crate::oauth::types::*;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Persisted client registrations keyed by client id
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Ids of every stored client
    async fn list_client_ids(&self) -> Result<Vec<String>>;

    /// Every stored client, ordered by id
    async fn list_clients(&self) -> Result<Vec<ClientRegistration>>;

    /// Retrieve a client by ID
    async fn get_client(&self, client_id: &str) -> Result<Option<ClientRegistration>>;

    /// Insert a new client; fails with [`StorageError::Conflict`] when the id exists
    async fn insert_client(&self, client: &ClientRegistration) -> Result<()>;

    /// Delete a client; fails with [`StorageError::NotFound`] when the id is unknown
    async fn delete_client(&self, client_id: &str) -> Result<()>;
}

/// Issued access and refresh tokens
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store an access token, replacing any token with the same value
    async fn store_access_token(&self, token: &AccessToken) -> Result<()>;

    /// Retrieve an unexpired access token
    async fn read_access_token(&self, token: &str) -> Result<Option<AccessToken>>;

    /// Remove an access token
    async fn remove_access_token(&self, token: &str) -> Result<()>;

    /// All unexpired tokens issued to a client
    async fn find_tokens_by_client_id(&self, client_id: &str) -> Result<Vec<AccessToken>>;

    /// All unexpired tokens issued for a user
    async fn find_tokens_by_user_name(&self, user_name: &str) -> Result<Vec<AccessToken>>;

    /// Store a refresh token, replacing any token with the same value
    async fn store_refresh_token(&self, token: &RefreshToken) -> Result<()>;

    /// Retrieve an unexpired refresh token
    async fn read_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>>;

    /// Remove a refresh token
    async fn remove_refresh_token(&self, token: &str) -> Result<()>;

    /// Remove every access token issued alongside a refresh token
    async fn remove_access_token_using_refresh_token(&self, refresh_token: &str) -> Result<usize>;

    /// Clean up expired access and refresh tokens
    async fn remove_expired_tokens(&self) -> Result<usize>;
}

/// Read access to user profiles owned by user management
#[async_trait]
pub trait UserProfileStore: Send + Sync {
    /// Retrieve a profile by login
    async fn find_profile_by_login(&self, login: &str) -> Result<Option<UserProfile>>;
}

// ===== Combined Storage Trait =====

/// Combined OAuth storage trait
pub trait OAuthStorage: ClientStore + TokenStore + Send + Sync {}
