use crate::errors::StorageError;
use crate::oauth::principal::UserProfile;
use crate::storage::traits::*;
use async_trait::async_trait;
use std::collections::HashMap;

/// In-memory user profiles keyed by login
#[derive(Default)]
pub struct MemoryUserProfileStore {
    profiles: tokio::sync::RwLock<HashMap<String, UserProfile>>,
}

impl MemoryUserProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a profile; the profile must carry a login
    pub async fn insert_profile(&self, profile: UserProfile) -> Result<()> {
        let login = profile
            .login
            .clone()
            .filter(|login| !login.trim().is_empty())
            .ok_or_else(|| StorageError::InvalidData("profile has no login".to_string()))?;
        self.profiles.write().await.insert(login, profile);
        Ok(())
    }
}

#[async_trait]
impl UserProfileStore for MemoryUserProfileStore {
    async fn find_profile_by_login(&self, login: &str) -> Result<Option<UserProfile>> {
        Ok(self.profiles.read().await.get(login).cloned())
    }
}
