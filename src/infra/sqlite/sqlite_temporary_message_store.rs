// SQLite-backed schedule of bot messages awaiting deletion.
//
// Table:
// - temporary_messages: one row per scheduled deletion

use super::{from_millis, to_millis};
use crate::core::duration::add_to;
use crate::core::errors::StoreError;
use crate::core::moderation::{TemporaryMessage, TemporaryMessageStore};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::time::Duration;

pub struct SqliteTemporaryMessageStore {
    pool: Pool<Sqlite>,
}

#[derive(sqlx::FromRow)]
struct TemporaryMessageRow {
    id: i64,
    chat_id: i64,
    message_id: String,
    delete_at: i64,
    created_at: i64,
}

impl TryFrom<TemporaryMessageRow> for TemporaryMessage {
    type Error = StoreError;

    fn try_from(row: TemporaryMessageRow) -> Result<Self, StoreError> {
        Ok(TemporaryMessage {
            id: row.id,
            chat_id: row.chat_id,
            message_id: row.message_id,
            delete_at: from_millis(row.delete_at)?,
            created_at: from_millis(row.created_at)?,
        })
    }
}

impl SqliteTemporaryMessageStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS temporary_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL,
                message_id TEXT NOT NULL,
                delete_at INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_temporary_messages_delete_at
                ON temporary_messages(delete_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::context("failed to migrate temporary_messages"))?;
        Ok(())
    }
}

#[async_trait]
impl TemporaryMessageStore for SqliteTemporaryMessageStore {
    async fn add(&self, chat_id: i64, message_id: &str, after: Duration) -> Result<(), StoreError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO temporary_messages (chat_id, message_id, delete_at, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(chat_id)
        .bind(message_id)
        .bind(to_millis(add_to(now, after)))
        .bind(to_millis(now))
        .execute(&self.pool)
        .await
        .map_err(StoreError::context("failed to add temporary message"))?;
        Ok(())
    }

    async fn expired(&self, limit: u64) -> Result<Vec<TemporaryMessage>, StoreError> {
        let rows = sqlx::query_as::<_, TemporaryMessageRow>(
            r#"
            SELECT id, chat_id, message_id, delete_at, created_at
            FROM temporary_messages
            WHERE delete_at <= ?
            ORDER BY delete_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(to_millis(Utc::now()))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::context("failed to get expired messages"))?;

        rows.into_iter().map(TemporaryMessage::try_from).collect()
    }

    async fn delete(&self, ids: &[i64]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM temporary_messages WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        query
            .build()
            .execute(&self.pool)
            .await
            .map_err(StoreError::context("failed to delete temporary messages"))?;
        Ok(())
    }
}
