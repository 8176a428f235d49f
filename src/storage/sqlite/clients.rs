//! SQLite implementation for client registration storage

use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::columns::{
    column_error, decode_set, decode_validity, encode_set, insert_error,
};
use crate::storage::traits::{ClientStore, Result};
use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

/// SQLite implementation of client registration storage
pub struct SqliteClientStore {
    pool: SqlitePool,
}

impl SqliteClientStore {
    /// Create a new SQLite client store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Convert SQLite row to ClientRegistration
    fn row_to_client(row: &SqliteRow) -> Result<ClientRegistration> {
        let scope: String = row.try_get("scope").map_err(column_error("scope"))?;
        let authorities: String = row
            .try_get("authorities")
            .map_err(column_error("authorities"))?;
        let grant_types: String = row
            .try_get("authorized_grant_types")
            .map_err(column_error("authorized_grant_types"))?;
        let auto_approve: String = row
            .try_get("autoapprove")
            .map_err(column_error("autoapprove"))?;
        let validity: i64 = row
            .try_get("access_token_validity")
            .map_err(column_error("access_token_validity"))?;

        Ok(ClientRegistration {
            client_id: row.try_get("client_id").map_err(column_error("client_id"))?,
            secret: row
                .try_get("client_secret")
                .map_err(column_error("client_secret"))?,
            scopes: decode_set("scope", &scope)?,
            authorities: decode_set("authorities", &authorities)?,
            grant_types: decode_set("authorized_grant_types", &grant_types)?,
            auto_approve_scopes: decode_set("autoapprove", &auto_approve)?,
            access_token_validity_seconds: decode_validity(validity)?,
        })
    }
}

#[async_trait]
impl ClientStore for SqliteClientStore {
    async fn list_client_ids(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT client_id FROM oauth_client_details ORDER BY client_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        rows.iter()
            .map(|row| row.try_get("client_id").map_err(column_error("client_id")))
            .collect()
    }

    async fn list_clients(&self) -> Result<Vec<ClientRegistration>> {
        let rows = sqlx::query("SELECT * FROM oauth_client_details ORDER BY client_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        rows.iter().map(Self::row_to_client).collect()
    }

    async fn get_client(&self, client_id: &str) -> Result<Option<ClientRegistration>> {
        let row = sqlx::query("SELECT * FROM oauth_client_details WHERE client_id = ?")
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        row.as_ref().map(Self::row_to_client).transpose()
    }

    async fn insert_client(&self, client: &ClientRegistration) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO oauth_client_details (
                client_id, client_secret, scope, authorities,
                authorized_grant_types, autoapprove, access_token_validity
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&client.client_id)
        .bind(&client.secret)
        .bind(encode_set(&client.scopes)?)
        .bind(encode_set(&client.authorities)?)
        .bind(encode_set(&client.grant_types)?)
        .bind(encode_set(&client.auto_approve_scopes)?)
        .bind(i64::from(client.access_token_validity_seconds))
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(&client.client_id, e))?;

        Ok(())
    }

    async fn delete_client(&self, client_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM oauth_client_details WHERE client_id = ?")
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "Client not found: {}",
                client_id
            )));
        }

        Ok(())
    }
}
