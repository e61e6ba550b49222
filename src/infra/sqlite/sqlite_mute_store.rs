// SQLite-backed mutes.
//
// Table:
// - mutes: at most one row per (chat_id, user_id). Expired rows are left in
//   place and ignored by every "active" query.

use super::{from_millis, to_millis};
use crate::core::duration::add_to;
use crate::core::errors::StoreError;
use crate::core::moderation::{Mute, MuteStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use std::time::Duration;

pub struct SqliteMuteStore {
    pool: Pool<Sqlite>,
}

#[derive(sqlx::FromRow)]
struct MuteRow {
    chat_id: i64,
    user_id: i64,
    user_name: String,
    expires_at: i64,
}

impl TryFrom<MuteRow> for Mute {
    type Error = StoreError;

    fn try_from(row: MuteRow) -> Result<Self, StoreError> {
        Ok(Mute {
            chat_id: row.chat_id,
            user_id: row.user_id,
            user_name: row.user_name,
            expires_at: from_millis(row.expires_at)?,
        })
    }
}

impl SqliteMuteStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mutes (
                chat_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                user_name TEXT NOT NULL DEFAULT '',
                expires_at INTEGER NOT NULL,
                PRIMARY KEY (chat_id, user_id)
            );
            CREATE INDEX IF NOT EXISTS idx_mutes_expires_at ON mutes(expires_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::context("failed to migrate mutes"))?;
        Ok(())
    }
}

#[async_trait]
impl MuteStore for SqliteMuteStore {
    async fn mute_user(
        &self,
        chat_id: i64,
        user_id: i64,
        user_name: &str,
        duration: Duration,
    ) -> Result<(), StoreError> {
        let expires_at = to_millis(add_to(Utc::now(), duration));

        // Expiry only moves forward; a blank name never overwrites a known one
        sqlx::query(
            r#"
            INSERT INTO mutes (chat_id, user_id, user_name, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(chat_id, user_id) DO UPDATE SET
                expires_at = MAX(mutes.expires_at, excluded.expires_at),
                user_name = CASE
                    WHEN excluded.user_name <> '' THEN excluded.user_name
                    ELSE mutes.user_name
                END
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(user_name)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::context("failed to mute user"))?;
        Ok(())
    }

    async fn unmute_user(&self, chat_id: i64, user_id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM mutes WHERE chat_id = ? AND user_id = ?")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::context("failed to unmute user"))?;
        Ok(())
    }

    async fn is_muted(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let expires_at: Option<i64> = sqlx::query_scalar(
            "SELECT expires_at FROM mutes WHERE chat_id = ? AND user_id = ? AND expires_at > ?",
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(to_millis(Utc::now()))
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::context("failed to check mute"))?;

        expires_at.map(from_millis).transpose()
    }

    async fn get_mute(&self, chat_id: i64, user_id: i64) -> Result<Option<Mute>, StoreError> {
        let row = sqlx::query_as::<_, MuteRow>(
            "SELECT chat_id, user_id, user_name, expires_at FROM mutes WHERE chat_id = ? AND user_id = ?",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::context("failed to get mute"))?;

        row.map(Mute::try_from).transpose()
    }

    async fn active_mutes_paginated(
        &self,
        chat_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Mute>, u64), StoreError> {
        let now = to_millis(Utc::now());

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM mutes WHERE chat_id = ? AND expires_at > ?")
                .bind(chat_id)
                .bind(now)
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::context("failed to count chat mutes"))?;

        let rows = sqlx::query_as::<_, MuteRow>(
            r#"
            SELECT chat_id, user_id, user_name, expires_at
            FROM mutes
            WHERE chat_id = ? AND expires_at > ?
            ORDER BY expires_at ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(chat_id)
        .bind(now)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::context("failed to list active mutes"))?;

        let mutes = rows
            .into_iter()
            .map(Mute::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((mutes, total as u64))
    }

    async fn count_active_mutes(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mutes WHERE expires_at > ?")
            .bind(to_millis(Utc::now()))
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::context("failed to count active mutes"))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sqlite::memory_pool;

    const HOUR: Duration = Duration::from_secs(3600);

    async fn store() -> SqliteMuteStore {
        let store = SqliteMuteStore::new(memory_pool().await);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_mute_and_unmute() {
        let store = store().await;
        store.mute_user(1, 2, "alice", HOUR).await.unwrap();
        assert!(store.is_muted(1, 2).await.unwrap().is_some());
        assert!(store.is_muted(1, 3).await.unwrap().is_none());

        store.unmute_user(1, 2).await.unwrap();
        assert!(store.is_muted(1, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shorter_mute_never_shortens() {
        let store = store().await;
        let start = Utc::now();

        store.mute_user(1, 2, "alice", HOUR).await.unwrap();
        store.mute_user(1, 2, "", HOUR / 2).await.unwrap();

        let mute = store.get_mute(1, 2).await.unwrap().unwrap();
        assert!(mute.expires_at >= start + chrono::Duration::minutes(59));
        assert_eq!(mute.user_name, "alice");

        store.mute_user(1, 2, "alicia", HOUR * 2).await.unwrap();
        let mute = store.get_mute(1, 2).await.unwrap().unwrap();
        assert!(mute.expires_at >= start + chrono::Duration::minutes(119));
        assert_eq!(mute.user_name, "alicia");
    }

    #[tokio::test]
    async fn test_expired_mute_is_inactive_but_kept() {
        let store = store().await;
        store.mute_user(1, 2, "", Duration::from_millis(5)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(store.is_muted(1, 2).await.unwrap().is_none());
        assert!(store.get_mute(1, 2).await.unwrap().is_some());
        assert_eq!(store.count_active_mutes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_active_mutes_paginated() {
        let store = store().await;
        for user in 1..=12 {
            store
                .mute_user(7, user, "", Duration::from_secs(60 * user as u64))
                .await
                .unwrap();
        }
        store.mute_user(8, 1, "", HOUR).await.unwrap();

        let (page, total) = store.active_mutes_paginated(7, 10, 10).await.unwrap();
        assert_eq!(total, 12);
        assert_eq!(
            page.iter().map(|m| m.user_id).collect::<Vec<_>>(),
            vec![11, 12]
        );
        assert_eq!(store.count_active_mutes().await.unwrap(), 13);
    }
}
