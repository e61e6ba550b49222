// SQLite-backed list of bot admins per chat.
//
// Table:
// - chat_admins: (chat_id, user_id) pairs

use crate::core::errors::StoreError;
use crate::core::moderation::ChatAdminStore;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

pub struct SqliteChatAdminStore {
    pool: Pool<Sqlite>,
}

impl SqliteChatAdminStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_admins (
                chat_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (chat_id, user_id)
            );
            CREATE INDEX IF NOT EXISTS idx_chat_admins_user ON chat_admins(user_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::context("failed to migrate chat_admins"))?;
        Ok(())
    }
}

#[async_trait]
impl ChatAdminStore for SqliteChatAdminStore {
    async fn is_admin(&self, chat_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM chat_admins WHERE chat_id = ? AND user_id = ?")
                .bind(chat_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::context("failed to check chat admin"))?;
        Ok(found.is_some())
    }

    async fn add_admin(&self, chat_id: i64, user_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO chat_admins (chat_id, user_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(chat_id, user_id) DO NOTHING
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(StoreError::context("failed to add chat admin"))?;
        Ok(())
    }

    async fn remove_admin(&self, chat_id: i64, user_id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM chat_admins WHERE chat_id = ? AND user_id = ?")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::context("failed to remove chat admin"))?;
        Ok(())
    }

    async fn managed_chats(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
        sqlx::query_scalar("SELECT chat_id FROM chat_admins WHERE user_id = ? ORDER BY chat_id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::context("failed to list managed chats"))
    }

    async fn managed_chats_paginated(
        &self,
        user_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<i64>, u64), StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_admins WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::context("failed to count managed chats"))?;

        let chats = sqlx::query_scalar(
            "SELECT chat_id FROM chat_admins WHERE user_id = ? ORDER BY chat_id LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::context("failed to list managed chats"))?;

        Ok((chats, total as u64))
    }
}
