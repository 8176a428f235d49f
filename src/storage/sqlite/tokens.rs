//! SQLite implementation for access and refresh token storage

use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::columns::{
    column_error, decode_set, decode_timestamp, encode_set, encode_timestamp,
};
use crate::storage::traits::{Result, TokenStore};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

/// SQLite implementation of token storage
pub struct SqliteTokenStore {
    pool: SqlitePool,
}

impl SqliteTokenStore {
    /// Create a new SQLite token store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_access_token(row: &SqliteRow) -> Result<AccessToken> {
        let scope: String = row.try_get("scope").map_err(column_error("scope"))?;
        let authorities: String = row
            .try_get("authorities")
            .map_err(column_error("authorities"))?;
        let created_at: String = row
            .try_get("created_at")
            .map_err(column_error("created_at"))?;
        let expires_at: String = row
            .try_get("expires_at")
            .map_err(column_error("expires_at"))?;

        Ok(AccessToken {
            token: row.try_get("token").map_err(column_error("token"))?,
            client_id: row.try_get("client_id").map_err(column_error("client_id"))?,
            user_name: row.try_get("user_name").map_err(column_error("user_name"))?,
            scope: decode_set("scope", &scope)?,
            authorities: decode_set("authorities", &authorities)?,
            refresh_token: row
                .try_get("refresh_token")
                .map_err(column_error("refresh_token"))?,
            created_at: decode_timestamp("created_at", &created_at)?,
            expires_at: decode_timestamp("expires_at", &expires_at)?,
        })
    }

    fn row_to_refresh_token(row: &SqliteRow) -> Result<RefreshToken> {
        let created_at: String = row
            .try_get("created_at")
            .map_err(column_error("created_at"))?;
        let expires_at: Option<String> = row
            .try_get("expires_at")
            .map_err(column_error("expires_at"))?;

        Ok(RefreshToken {
            token: row.try_get("token").map_err(column_error("token"))?,
            client_id: row.try_get("client_id").map_err(column_error("client_id"))?,
            user_name: row.try_get("user_name").map_err(column_error("user_name"))?,
            created_at: decode_timestamp("created_at", &created_at)?,
            expires_at: expires_at
                .as_deref()
                .map(|value| decode_timestamp("expires_at", value))
                .transpose()?,
        })
    }

    async fn unexpired_access_tokens(&self, column: &str, value: &str) -> Result<Vec<AccessToken>> {
        let query = format!(
            "SELECT * FROM oauth_access_token WHERE {} = ? AND expires_at > ? ORDER BY created_at",
            column
        );
        let rows = sqlx::query(&query)
            .bind(value)
            .bind(encode_timestamp(&Utc::now()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        rows.iter().map(Self::row_to_access_token).collect()
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn store_access_token(&self, token: &AccessToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO oauth_access_token (
                token, client_id, user_name, scope, authorities,
                refresh_token, created_at, expires_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(token) DO UPDATE SET
                client_id = excluded.client_id,
                user_name = excluded.user_name,
                scope = excluded.scope,
                authorities = excluded.authorities,
                refresh_token = excluded.refresh_token,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&token.token)
        .bind(&token.client_id)
        .bind(&token.user_name)
        .bind(encode_set(&token.scope)?)
        .bind(encode_set(&token.authorities)?)
        .bind(&token.refresh_token)
        .bind(encode_timestamp(&token.created_at))
        .bind(encode_timestamp(&token.expires_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn read_access_token(&self, token: &str) -> Result<Option<AccessToken>> {
        let row = sqlx::query("SELECT * FROM oauth_access_token WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let access_token = row.as_ref().map(Self::row_to_access_token).transpose()?;
        Ok(access_token.filter(|access_token| !access_token.is_expired(Utc::now())))
    }

    async fn remove_access_token(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM oauth_access_token WHERE token = ?")
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
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(token) DO UPDATE SET
                client_id = excluded.client_id,
                user_name = excluded.user_name,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&token.token)
        .bind(&token.client_id)
        .bind(&token.user_name)
        .bind(encode_timestamp(&token.created_at))
        .bind(token.expires_at.as_ref().map(encode_timestamp))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn read_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let row = sqlx::query("SELECT * FROM oauth_refresh_token WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let refresh_token = row.as_ref().map(Self::row_to_refresh_token).transpose()?;
        Ok(refresh_token.filter(|refresh_token| !refresh_token.is_expired(Utc::now())))
    }

    async fn remove_refresh_token(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM oauth_refresh_token WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    async fn remove_access_token_using_refresh_token(&self, refresh_token: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM oauth_access_token WHERE refresh_token = ?")
            .bind(refresh_token)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() as usize)
    }

    async fn remove_expired_tokens(&self) -> Result<usize> {
        let now = encode_timestamp(&Utc::now());

        let access = sqlx::query("DELETE FROM oauth_access_token WHERE expires_at <= ?")
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let refresh = sqlx::query(
            "DELETE FROM oauth_refresh_token WHERE expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok((access.rows_affected() + refresh.rows_affected()) as usize)
    }
}
