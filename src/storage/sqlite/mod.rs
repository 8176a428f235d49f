//! SQLite storage implementations
//!
//! SQLite is suitable for single-instance deployments and development.

mod clients;
mod tokens;

use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::columns::connection_failed;
use crate::storage::traits::*;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::sync::Arc;

pub use clients::SqliteClientStore;
pub use tokens::SqliteTokenStore;

/// Combined SQLite OAuth storage implementation
pub struct SqliteOAuthStorage {
    pool: SqlitePool,
    client_store: Arc<SqliteClientStore>,
    token_store: Arc<SqliteTokenStore>,
}

impl SqliteOAuthStorage {
    /// Create a new SQLite OAuth storage instance
    pub fn new(pool: SqlitePool) -> Self {
        let client_store = Arc::new(SqliteClientStore::new(pool.clone()));
        let token_store = Arc::new(SqliteTokenStore::new(pool.clone()));

        Self {
            pool,
            client_store,
            token_store,
        }
    }

    /// Open (creating if missing) the database at `database_url` and migrate it
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = database_url
            .parse::<SqliteConnectOptions>()
            .map_err(|e| connection_failed("Invalid SQLite URL", e))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| connection_failed("SQLite connection failed", e))?;

        let storage = Self::new(pool);
        storage.migrate().await?;
        Ok(storage)
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/sqlite")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Migration failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl ClientStore for SqliteOAuthStorage {
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
impl TokenStore for SqliteOAuthStorage {
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

impl OAuthStorage for SqliteOAuthStorage {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::BTreeSet;

    async fn storage() -> SqliteOAuthStorage {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let storage = SqliteOAuthStorage::new(pool);
        storage.migrate().await.unwrap();
        storage
    }

    fn client(client_id: &str) -> ClientRegistration {
        ClientRegistration {
            client_id: client_id.to_string(),
            secret: "changeit".to_string(),
            scopes: parse_scope("openid read"),
            authorities: BTreeSet::from(["ROLE_CLIENT".to_string()]),
            grant_types: parse_scope("password refresh_token"),
            auto_approve_scopes: parse_scope("openid"),
            access_token_validity_seconds: 1800,
        }
    }

    fn access_token(token: &str, refresh_token: Option<&str>, expires_in: Duration) -> AccessToken {
        AccessToken {
            token: token.to_string(),
            client_id: "web_app".to_string(),
            user_name: Some("bob".to_string()),
            scope: parse_scope("read"),
            authorities: BTreeSet::from(["ROLE_USER".to_string()]),
            refresh_token: refresh_token.map(str::to_string),
            created_at: Utc::now(),
            expires_at: Utc::now() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_connect_creates_and_migrates_database() {
        let path = std::env::temp_dir()
            .join(format!("authgate-connect-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let database_url = format!("sqlite:{}", path.display());

        let storage = SqliteOAuthStorage::connect(&database_url).await.unwrap();
        storage.insert_client(&client("web_app")).await.unwrap();
        drop(storage);

        // reopening runs the already-applied migrations again
        let storage = SqliteOAuthStorage::connect(&database_url).await.unwrap();
        assert_eq!(storage.list_client_ids().await.unwrap(), vec!["web_app"]);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_client_round_trip_and_conflicts() {
        let storage = storage().await;

        storage.insert_client(&client("web_app")).await.unwrap();
        storage.insert_client(&client("cli")).await.unwrap();

        assert_eq!(
            storage.list_client_ids().await.unwrap(),
            vec!["cli", "web_app"]
        );
        assert_eq!(
            storage.get_client("web_app").await.unwrap(),
            Some(client("web_app"))
        );

        assert!(matches!(
            storage.insert_client(&client("web_app")).await,
            Err(StorageError::Conflict(_))
        ));

        storage.delete_client("web_app").await.unwrap();
        assert!(matches!(
            storage.delete_client("web_app").await,
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(storage.list_clients().await.unwrap(), vec![client("cli")]);
    }

    #[tokio::test]
    async fn test_access_token_lifecycle() {
        let storage = storage().await;

        let live = access_token("live", Some("r1"), Duration::hours(1));
        let expired = access_token("expired", None, Duration::minutes(-5));
        storage.store_access_token(&live).await.unwrap();
        storage.store_access_token(&expired).await.unwrap();

        assert_eq!(
            storage.read_access_token("live").await.unwrap().map(|t| t.token),
            Some("live".to_string())
        );
        assert!(storage.read_access_token("expired").await.unwrap().is_none());
        assert_eq!(storage.find_tokens_by_user_name("bob").await.unwrap().len(), 1);
        assert_eq!(storage.find_tokens_by_client_id("web_app").await.unwrap().len(), 1);

        assert_eq!(storage.remove_expired_tokens().await.unwrap(), 1);
        assert_eq!(
            storage
                .remove_access_token_using_refresh_token("r1")
                .await
                .unwrap(),
            1
        );
        assert!(storage.read_access_token("live").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_lifecycle() {
        let storage = storage().await;

        let refresh = RefreshToken {
            token: "r1".to_string(),
            client_id: "web_app".to_string(),
            user_name: Some("bob".to_string()),
            created_at: Utc::now(),
            expires_at: None,
        };
        storage.store_refresh_token(&refresh).await.unwrap();
        assert!(storage.read_refresh_token("r1").await.unwrap().is_some());

        let mut expired = refresh.clone();
        expired.token = "r2".to_string();
        expired.expires_at = Some(Utc::now() - Duration::minutes(1));
        storage.store_refresh_token(&expired).await.unwrap();
        assert!(storage.read_refresh_token("r2").await.unwrap().is_none());

        storage.remove_refresh_token("r1").await.unwrap();
        assert!(storage.read_refresh_token("r1").await.unwrap().is_none());
    }
}
