//! PostgreSQL storage implementations
//!
//! PostgreSQL is suitable for production deployments where several instances
//! share one client registry.

mod clients;
mod tokens;

use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::columns::connection_failed;
use crate::storage::traits::*;
use async_trait::async_trait;
use sqlx::postgres::PgPool;
use std::sync::Arc;

pub use clients::PostgresClientStore;
pub use tokens::PostgresTokenStore;

/// Combined PostgreSQL OAuth storage implementation
pub struct PostgresOAuthStorage {
    pool: PgPool,
    client_store: Arc<PostgresClientStore>,
    token_store: Arc<PostgresTokenStore>,
}

impl PostgresOAuthStorage {
    /// Create a new PostgreSQL OAuth storage instance
    pub fn new(pool: PgPool) -> Self {
        let client_store = Arc::new(PostgresClientStore::new(pool.clone()));
        let token_store = Arc::new(PostgresTokenStore::new(pool.clone()));

        Self {
            pool,
            client_store,
            token_store,
        }
    }

    /// Connect to the database at `database_url` and migrate it
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| connection_failed("PostgreSQL connection failed", e))?;

        let storage = Self::new(pool);
        storage.migrate().await?;
        Ok(storage)
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/postgres")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Migration failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl ClientStore for PostgresOAuthStorage {
    async fn list_client_ids(&self) -> Result<Vec<String>> {
        self.client_store.list_client_ids().await
    }

    async fn list_clients(&self) -> Result<Vec<ClientRegistration>> {
        self.client_store.list_clients().await
    }

    async fn get_client(&self, client_id: &str) -> Result<Option<ClientRegistration>> {
        self.client_store.get_client(client_id).await
    }

    async fn insert_client(&self, client: &ClientRegistration) -> Result<()> {
        self.client_store.insert_client(client).await
    }

    async fn delete_client(&self, client_id: &str) -> Result<()> {
        self.client_store.delete_client(client_id).await
    }
}

#[async_trait]
impl TokenStore for PostgresOAuthStorage {
    async fn store_access_token(&self, token: &AccessToken) -> Result<()> {
        self.token_store.store_access_token(token).await
    }

    async fn read_access_token(&self, token: &str) -> Result<Option<AccessToken>> {
        self.token_store.read_access_token(token).await
    }

    async fn remove_access_token(&self, token: &str) -> Result<()> {
        self.token_store.remove_access_token(token).await
    }

    async fn find_tokens_by_client_id(&self, client_id: &str) -> Result<Vec<AccessToken>> {
        self.token_store.find_tokens_by_client_id(client_id).await
    }

    async fn find_tokens_by_user_name(&self, user_name: &str) -> Result<Vec<AccessToken>> {
        self.token_store.find_tokens_by_user_name(user_name).await
    }

    async fn store_refresh_token(&self, token: &RefreshToken) -> Result<()> {
        self.token_store.store_refresh_token(token).await
    }

    async fn read_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        self.token_store.read_refresh_token(token).await
    }

    async fn remove_refresh_token(&self, token: &str) -> Result<()> {
        self.token_store.remove_refresh_token(token).await
    }

    async fn remove_access_token_using_refresh_token(&self, refresh_token: &str) -> Result<usize> {
        self.token_store
            .remove_access_token_using_refresh_token(refresh_token)
            .await
    }

    async fn remove_expired_tokens(&self) -> Result<usize> {
        self.token_store.remove_expired_tokens().await
    }
}

impl OAuthStorage for PostgresOAuthStorage {}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    // Requires a reachable server in DATABASE_URL
    #[tokio::test]
    #[ignore]
    async fn test_client_round_trip() {
        let database_url = std::env::var("DATABASE_URL").unwrap();
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&database_url)
            .await
            .unwrap();
        let storage = PostgresOAuthStorage::new(pool);
        storage.migrate().await.unwrap();

        let client = ClientRegistration {
            client_id: "postgres-round-trip".to_string(),
            secret: "changeit".to_string(),
            scopes: parse_scope("read"),
            authorities: Default::default(),
            grant_types: parse_scope("password"),
            auto_approve_scopes: Default::default(),
            access_token_validity_seconds: DEFAULT_ACCESS_TOKEN_VALIDITY_SECONDS,
        };
        let _ = storage.delete_client(&client.client_id).await;
        storage.insert_client(&client).await.unwrap();
        assert_eq!(
            storage.get_client(&client.client_id).await.unwrap(),
            Some(client.clone())
        );
        assert!(matches!(
            storage.insert_client(&client).await,
            Err(StorageError::Conflict(_))
        ));
        storage.delete_client(&client.client_id).await.unwrap();
    }
}
