//! In-memory OAuth storage implementation

use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::traits::*;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// In-memory implementation for OAuth storage
#[derive(Default)]
pub struct MemoryOAuthStorage {
    clients: Mutex<BTreeMap<String, ClientRegistration>>,
    access_tokens: Mutex<HashMap<String, AccessToken>>,
    refresh_tokens: Mutex<HashMap<String, RefreshToken>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| StorageError::SerializationFailed(format!("Lock error: {}", e)))
}

impl MemoryOAuthStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for MemoryOAuthStorage {
    async fn list_client_ids(&self) -> Result<Vec<String>> {
        let clients = lock(&self.clients)?;
        Ok(clients.keys().cloned().collect())
    }

    async fn list_clients(&self) -> Result<Vec<ClientRegistration>> {
        let clients = lock(&self.clients)?;
        Ok(clients.values().cloned().collect())
    }

    async fn get_client(&self, client_id: &str) -> Result<Option<ClientRegistration>> {
        let clients = lock(&self.clients)?;
        Ok(clients.get(client_id).cloned())
    }

    async fn insert_client(&self, client: &ClientRegistration) -> Result<()> {
        let mut clients = lock(&self.clients)?;
        if clients.contains_key(&client.client_id) {
            return Err(StorageError::Conflict(format!(
                "client '{}' already exists",
                client.client_id
            )));
        }
        clients.insert(client.client_id.clone(), client.clone());
        Ok(())
    }

    async fn delete_client(&self, client_id: &str) -> Result<()> {
        let mut clients = lock(&self.clients)?;
        match clients.remove(client_id) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(format!(
                "client '{}' does not exist",
                client_id
            ))),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryOAuthStorage {
    async fn store_access_token(&self, token: &AccessToken) -> Result<()> {
        let mut tokens = lock(&self.access_tokens)?;
        tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn read_access_token(&self, token: &str) -> Result<Option<AccessToken>> {
        let tokens = lock(&self.access_tokens)?;
        let now = Utc::now();
        Ok(tokens
            .get(token)
            .filter(|access_token| !access_token.is_expired(now))
            .cloned())
    }

    async fn remove_access_token(&self, token: &str) -> Result<()> {
        let mut tokens = lock(&self.access_tokens)?;
        tokens.remove(token);
        Ok(())
    }

    async fn find_tokens_by_client_id(&self, client_id: &str) -> Result<Vec<AccessToken>> {
        let tokens = lock(&self.access_tokens)?;
        let now = Utc::now();
        let mut result: Vec<_> = tokens
            .values()
            .filter(|token| token.client_id == client_id && !token.is_expired(now))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }

    async fn find_tokens_by_user_name(&self, user_name: &str) -> Result<Vec<AccessToken>> {
        let tokens = lock(&self.access_tokens)?;
        let now = Utc::now();
        let mut result: Vec<_> = tokens
            .values()
            .filter(|token| {
                token.user_name.as_deref() == Some(user_name) && !token.is_expired(now)
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }

    async fn store_refresh_token(&self, token: &RefreshToken) -> Result<()> {
        let mut tokens = lock(&self.refresh_tokens)?;
        tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn read_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let tokens = lock(&self.refresh_tokens)?;
        let now = Utc::now();
        Ok(tokens
            .get(token)
            .filter(|refresh_token| !refresh_token.is_expired(now))
            .cloned())
    }

    async fn remove_refresh_token(&self, token: &str) -> Result<()> {
        let mut tokens = lock(&self.refresh_tokens)?;
        tokens.remove(token);
        Ok(())
    }

    async fn remove_access_token_using_refresh_token(&self, refresh_token: &str) -> Result<usize> {
        let mut tokens = lock(&self.access_tokens)?;
        let initial_count = tokens.len();
        tokens.retain(|_, token| token.refresh_token.as_deref() != Some(refresh_token));
        Ok(initial_count - tokens.len())
    }

    async fn remove_expired_tokens(&self) -> Result<usize> {
        let now = Utc::now();

        let mut access_tokens = lock(&self.access_tokens)?;
        let initial_access = access_tokens.len();
        access_tokens.retain(|_, token| !token.is_expired(now));
        let removed_access = initial_access - access_tokens.len();
        drop(access_tokens);

        let mut refresh_tokens = lock(&self.refresh_tokens)?;
        let initial_refresh = refresh_tokens.len();
        refresh_tokens.retain(|_, token| !token.is_expired(now));

        Ok(removed_access + (initial_refresh - refresh_tokens.len()))
    }
}

impl OAuthStorage for MemoryOAuthStorage {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::BTreeSet;

    fn client(client_id: &str) -> ClientRegistration {
        ClientRegistration {
            client_id: client_id.to_string(),
            secret: "secret".to_string(),
            scopes: BTreeSet::from(["read".to_string()]),
            authorities: BTreeSet::new(),
            grant_types: BTreeSet::from(["password".to_string()]),
            auto_approve_scopes: BTreeSet::new(),
            access_token_validity_seconds: DEFAULT_ACCESS_TOKEN_VALIDITY_SECONDS,
        }
    }

    fn access_token(token: &str, user_name: Option<&str>, expires_in: Duration) -> AccessToken {
        AccessToken {
            token: token.to_string(),
            client_id: "web_app".to_string(),
            user_name: user_name.map(str::to_string),
            scope: parse_scope("read"),
            authorities: BTreeSet::from(["ROLE_USER".to_string()]),
            refresh_token: None,
            created_at: Utc::now(),
            expires_at: Utc::now() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_client_insert_and_delete() {
        let storage = MemoryOAuthStorage::new();

        storage.insert_client(&client("b")).await.unwrap();
        storage.insert_client(&client("a")).await.unwrap();
        assert_eq!(storage.list_client_ids().await.unwrap(), vec!["a", "b"]);

        let duplicate = storage.insert_client(&client("a")).await;
        assert!(matches!(duplicate, Err(StorageError::Conflict(_))));

        storage.delete_client("a").await.unwrap();
        assert!(storage.get_client("a").await.unwrap().is_none());
        assert!(matches!(
            storage.delete_client("a").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_token_expiry() {
        let storage = MemoryOAuthStorage::new();

        let token = access_token("expired", Some("bob"), Duration::minutes(-1));
        storage.store_access_token(&token).await.unwrap();

        assert!(storage.read_access_token("expired").await.unwrap().is_none());
        assert!(
            storage
                .find_tokens_by_user_name("bob")
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(storage.remove_expired_tokens().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_access_token_replaces_existing() {
        let storage = MemoryOAuthStorage::new();

        let mut token = access_token("t1", Some("bob"), Duration::hours(1));
        storage.store_access_token(&token).await.unwrap();
        token.scope = parse_scope("read write");
        storage.store_access_token(&token).await.unwrap();

        let stored = storage.read_access_token("t1").await.unwrap().unwrap();
        assert_eq!(join_scopes(&stored.scope), "read write");
        assert_eq!(storage.find_tokens_by_client_id("web_app").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_access_token_using_refresh_token() {
        let storage = MemoryOAuthStorage::new();

        let mut first = access_token("t1", Some("bob"), Duration::hours(1));
        first.refresh_token = Some("r1".to_string());
        let second = access_token("t2", Some("bob"), Duration::hours(1));
        storage.store_access_token(&first).await.unwrap();
        storage.store_access_token(&second).await.unwrap();

        let refresh = RefreshToken {
            token: "r1".to_string(),
            client_id: "web_app".to_string(),
            user_name: Some("bob".to_string()),
            created_at: Utc::now(),
            expires_at: None,
        };
        storage.store_refresh_token(&refresh).await.unwrap();

        assert_eq!(
            storage
                .remove_access_token_using_refresh_token("r1")
                .await
                .unwrap(),
            1
        );
        assert!(storage.read_access_token("t1").await.unwrap().is_none());
        assert!(storage.read_access_token("t2").await.unwrap().is_some());

        assert!(storage.read_refresh_token("r1").await.unwrap().is_some());
        storage.remove_refresh_token("r1").await.unwrap();
        assert!(storage.read_refresh_token("r1").await.unwrap().is_none());
    }
}
