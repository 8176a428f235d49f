//! PostgreSQL implementation for access and refresh token storage

use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::columns::{column_error, decode_set, encode_set};
use crate::storage::traits::{Result, TokenStore};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};

/// PostgreSQL implementation of token storage
pub struct PostgresTokenStore {
    pool: PgPool,
}

impl PostgresTokenStore {
    /// Create a new PostgreSQL token store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_access_token(row: &PgRow) -> Result<AccessToken> {
        let scope: String = row.try_get("scope").map_err(column_error("scope"))?;
        let authorities: String = row
            .try_get("authorities")
            .map_err(column_error("authorities"))?;

        Ok(AccessToken {
            token: row.try_get("token").map_err(column_error("token"))?,
            client_id: row.try_get("client_id").map_err(column_error("client_id"))?,
            user_name: row.try_get("user_name").map_err(column_error("user_name"))?,
            scope: decode_set("scope", &scope)?,
            authorities: decode_set("authorities", &authorities)?,
            refresh_token: row
                .try_get("refresh_token")
                .map_err(column_error("refresh_token"))?,
            created_at: row
                .try_get("created_at")
                .map_err(column_error("created_at"))?,
            expires_at: row
                .try_get("expires_at")
                .map_err(column_error("expires_at"))?,
        })
    }

    fn row_to_refresh_token(row: &PgRow) -> Result<RefreshToken> {
        Ok(RefreshToken {
            token: row.try_get("token").map_err(column_error("token"))?,
            client_id: row.try_get("client_id").map_err(column_error("client_id"))?,
            user_name: row.try_get("user_name").map_err(column_error("user_name"))?,
            created_at: row
                .try_get("created_at")
                .map_err(column_error("created_at"))?,
            expires_at: row
                .try_get("expires_at")
                .map_err(column_error("expires_at"))?,
        })
    }

    async fn unexpired_access_tokens(&self, column: &str, value: &str) -> Result<Vec<AccessToken>> {
        let query = format!(
            "SELECT * FROM oauth_access_token WHERE {} = $1 AND expires_at > $2 ORDER BY created_at",
            column
        );
        let rows = sqlx::query(&query)
            .bind(value)
            .bind(Utc::now())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        rows.iter().map(Self::row_to_access_token).collect()
    }
}

#[async_trait]
impl TokenStore for PostgresTokenStore {
    async fn store_access_token(&self, token: &AccessToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO oauth_access_token (
                token, client_id, user_name, scope, authorities,
                refresh_token, created_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (token) DO UPDATE SET
                client_id = EXCLUDED.client_id,
                user_name = EXCLUDED.user_name,
                scope = EXCLUDED.scope,
                authorities = EXCLUDED.authorities,
                refresh_token = EXCLUDED.refresh_token,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&token.token)
        .bind(&token.client_id)
        .bind(&token.user_name)
        .bind(encode_set(&token.scope)?)
        .bind(encode_set(&token.authorities)?)
        .bind(&token.refresh_token)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn read_access_token(&self, token: &str) -> Result<Option<AccessToken>> {
        let row = sqlx::query("SELECT * FROM oauth_access_token WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let access_token = row.as_ref().map(Self::row_to_access_token).transpose()?;
        Ok(access_token.filter(|access_token| !access_token.is_expired(Utc::now())))
    }

    async fn remove_access_token(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM oauth_access_token WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    async fn find_tokens_by_client_id(&self, client_id: &str) -> Result<Vec<AccessToken>> {
        self.unexpired_access_tokens("client_id", client_id).await
    }

    async fn find_tokens_by_user_name(&self, user_name: &str) -> Result<Vec<AccessToken>> {
        self.unexpired_access_tokens("user_name", user_name).await
    }

    async fn store_refresh_token(&self, token: &RefreshToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO oauth_refresh_token (token, client_id, user_name, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (token) DO UPDATE SET
                client_id = EXCLUDED.client_id,
                user_name = EXCLUDED.user_name,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&token.token)
        .bind(&token.client_id)
        .bind(&token.user_name)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn read_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let row = sqlx::query("SELECT * FROM oauth_refresh_token WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let refresh_token = row.as_ref().map(Self::row_to_refresh_token).transpose()?;
        Ok(refresh_token.filter(|refresh_token| !refresh_token.is_expired(Utc::now())))
    }

    async fn remove_refresh_token(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM oauth_refresh_token WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    async fn remove_access_token_using_refresh_token(&self, refresh_token: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM oauth_access_token WHERE refresh_token = $1")
            .bind(refresh_token)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() as usize)
    }

    async fn remove_expired_tokens(&self) -> Result<usize> {
        let now = Utc::now();

        let access = sqlx::query("DELETE FROM oauth_access_token WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let refresh = sqlx::query(
            "DELETE FROM oauth_refresh_token WHERE expires_at IS NOT NULL AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok((access.rows_affected() + refresh.rows_affected()) as usize)
    }
}
