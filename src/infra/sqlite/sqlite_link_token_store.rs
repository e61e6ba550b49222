// SQLite-backed one-time tokens for linking a group to the user who created it.
//
// Table:
// - link_tokens: token -> (user_id, expires_at)

use super::{from_millis, to_millis};
use crate::core::duration::add_to;
use crate::core::errors::StoreError;
use crate::core::moderation::{LinkToken, LinkTokenStore};
use async_trait::async_trait;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::{Pool, Sqlite};
use std::time::Duration;

pub const TOKEN_LENGTH: usize = 32;

pub struct SqliteLinkTokenStore {
    pool: Pool<Sqlite>,
}

#[derive(sqlx::FromRow)]
struct LinkTokenRow {
    token: String,
    user_id: i64,
    expires_at: i64,
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

impl SqliteLinkTokenStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS link_tokens (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::context("failed to migrate link_tokens"))?;
        Ok(())
    }
}

#[async_trait]
impl LinkTokenStore for SqliteLinkTokenStore {
    async fn create(&self, user_id: i64, ttl: Duration) -> Result<String, StoreError> {
        // ThreadRng is not Send; generate before the first await
        let token = generate_token();
        let expires_at = to_millis(add_to(Utc::now(), ttl));

        sqlx::query("INSERT INTO link_tokens (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(StoreError::context("failed to create link token"))?;
        Ok(token)
    }

    async fn get(&self, token: &str) -> Result<Option<LinkToken>, StoreError> {
        let row = sqlx::query_as::<_, LinkTokenRow>(
            "SELECT token, user_id, expires_at FROM link_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::context("failed to get link token"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let link = LinkToken {
            token: row.token,
            user_id: row.user_id,
            expires_at: from_millis(row.expires_at)?,
        };
        if link.expires_at <= Utc::now() {
            self.delete(token).await?;
            return Ok(None);
        }
        Ok(Some(link))
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM link_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(StoreError::context("failed to delete link token"))?;
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM link_tokens WHERE expires_at <= ?")
            .bind(to_millis(Utc::now()))
            .execute(&self.pool)
            .await
            .map_err(StoreError::context("failed to delete expired link tokens"))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sqlite::memory_pool;

    async fn store() -> SqliteLinkTokenStore {
        let store = SqliteLinkTokenStore::new(memory_pool().await);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = store().await;
        let token = store.create(9, Duration::from_secs(3600)).await.unwrap();

        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));

        let link = store.get(&token).await.unwrap().unwrap();
        assert_eq!(link.user_id, 9);

        store.delete(&token).await.unwrap();
        assert!(store.get(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_removed_on_read() {
        let store = store().await;
        let token = store.create(9, Duration::from_millis(5)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(store.get(&token).await.unwrap().is_none());
        assert_eq!(store.delete_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let store = store().await;
        store.create(1, Duration::from_millis(5)).await.unwrap();
        store.create(2, Duration::from_millis(5)).await.unwrap();
        let live = store.create(3, Duration::from_secs(3600)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.delete_expired().await.unwrap(), 2);
        assert!(store.get(&live).await.unwrap().is_some());
    }
}
