// SQLite-backed violation log and per-day chat stats.
//
// Tables:
// - user_violations: append-only event log
// - chat_stats: one counter row per (chat_id, day)

use super::to_millis;
use crate::core::errors::StoreError;
use crate::core::moderation::{ChatStats, StatField, ViolationStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

pub struct SqliteViolationStore {
    pool: Pool<Sqlite>,
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    word_violations: i64,
    link_violations: i64,
    image_violations: i64,
    video_violations: i64,
    audio_violations: i64,
    file_violations: i64,
    mute_count: i64,
}

impl SqliteViolationStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_violations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                violation_type TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_user_violations_lookup
                ON user_violations(chat_id, user_id, created_at);

            CREATE TABLE IF NOT EXISTS chat_stats (
                chat_id INTEGER NOT NULL,
                day TEXT NOT NULL,
                word_violations INTEGER NOT NULL DEFAULT 0,
                link_violations INTEGER NOT NULL DEFAULT 0,
                image_violations INTEGER NOT NULL DEFAULT 0,
                video_violations INTEGER NOT NULL DEFAULT 0,
                audio_violations INTEGER NOT NULL DEFAULT 0,
                file_violations INTEGER NOT NULL DEFAULT 0,
                mute_count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (chat_id, day)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::context("failed to migrate violation tables"))?;
        Ok(())
    }

    async fn increment_on(&self, chat_id: i64, day: &str, field: StatField) -> Result<(), StoreError> {
        // The column name comes from a closed enum, never from input
        let column = field.column();
        let sql = format!(
            "INSERT INTO chat_stats (chat_id, day, {column}) VALUES (?, ?, 1) \
             ON CONFLICT(chat_id, day) DO UPDATE SET {column} = {column} + 1"
        );
        sqlx::query(&sql)
            .bind(chat_id)
            .bind(day)
            .execute(&self.pool)
            .await
            .map_err(StoreError::context("failed to increment chat stat"))?;
        Ok(())
    }
}

#[async_trait]
impl ViolationStore for SqliteViolationStore {
    async fn add_violation(
        &self,
        chat_id: i64,
        user_id: i64,
        violation_type: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_violations (chat_id, user_id, violation_type, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(violation_type)
        .bind(to_millis(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(StoreError::context("failed to add violation"))?;
        Ok(())
    }

    async fn count_violations_since(
        &self,
        chat_id: i64,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_violations WHERE chat_id = ? AND user_id = ? AND created_at >= ?",
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(to_millis(since))
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::context("failed to count violations"))?;
        Ok(count as u64)
    }

    async fn increment_chat_stat(&self, chat_id: i64, field: StatField) -> Result<(), StoreError> {
        let day = Utc::now().format("%Y-%m-%d").to_string();
        self.increment_on(chat_id, &day, field).await
    }

    async fn chat_total_stats(&self, chat_id: i64) -> Result<ChatStats, StoreError> {
        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT
                COALESCE(SUM(word_violations), 0) AS word_violations,
                COALESCE(SUM(link_violations), 0) AS link_violations,
                COALESCE(SUM(image_violations), 0) AS image_violations,
                COALESCE(SUM(video_violations), 0) AS video_violations,
                COALESCE(SUM(audio_violations), 0) AS audio_violations,
                COALESCE(SUM(file_violations), 0) AS file_violations,
                COALESCE(SUM(mute_count), 0) AS mute_count
            FROM chat_stats
            WHERE chat_id = ?
            "#,
        )
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::context("failed to get chat stats"))?;

        Ok(ChatStats {
            chat_id,
            word_violations: row.word_violations as u64,
            link_violations: row.link_violations as u64,
            image_violations: row.image_violations as u64,
            video_violations: row.video_violations as u64,
            audio_violations: row.audio_violations as u64,
            file_violations: row.file_violations as u64,
            mute_count: row.mute_count as u64,
        })
    }
}
