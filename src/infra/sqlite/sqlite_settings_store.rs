// SQLite-backed chat settings.
//
// Table:
// - chat_settings: one row per chat, lists as JSON arrays

use super::{from_millis, to_millis};
use crate::core::errors::StoreError;
use crate::core::settings::{ChatSettings, SettingsStore};
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

pub struct SqliteSettingsStore {
    pool: Pool<Sqlite>,
}

#[derive(sqlx::FromRow)]
struct SettingsRow {
    chat_id: i64,
    blocked_words: String,
    blocked_domains: String,
    restrict_image: bool,
    restrict_video: bool,
    restrict_audio: bool,
    restrict_file: bool,
    enable_word_filter: bool,
    enable_link_filter: bool,
    enable_mute: bool,
    enable_auto_delete: bool,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<SettingsRow> for ChatSettings {
    type Error = StoreError;

    fn try_from(row: SettingsRow) -> Result<Self, StoreError> {
        let decode = |raw: &str| -> Result<Vec<String>, StoreError> {
            serde_json::from_str(raw).map_err(|e| {
                StoreError::Corrupt(format!("chat {} blocked list: {}", row.chat_id, e))
            })
        };
        Ok(ChatSettings {
            chat_id: row.chat_id,
            blocked_words: decode(&row.blocked_words)?,
            blocked_domains: decode(&row.blocked_domains)?,
            restrict_image: row.restrict_image,
            restrict_video: row.restrict_video,
            restrict_audio: row.restrict_audio,
            restrict_file: row.restrict_file,
            enable_word_filter: row.enable_word_filter,
            enable_link_filter: row.enable_link_filter,
            enable_mute: row.enable_mute,
            enable_auto_delete: row.enable_auto_delete,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

impl SqliteSettingsStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_settings (
                chat_id INTEGER PRIMARY KEY,
                blocked_words TEXT NOT NULL DEFAULT '[]',
                blocked_domains TEXT NOT NULL DEFAULT '[]',
                restrict_image BOOLEAN NOT NULL DEFAULT 0,
                restrict_video BOOLEAN NOT NULL DEFAULT 0,
                restrict_audio BOOLEAN NOT NULL DEFAULT 0,
                restrict_file BOOLEAN NOT NULL DEFAULT 0,
                enable_word_filter BOOLEAN NOT NULL DEFAULT 1,
                enable_link_filter BOOLEAN NOT NULL DEFAULT 1,
                enable_mute BOOLEAN NOT NULL DEFAULT 1,
                enable_auto_delete BOOLEAN NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::context("failed to migrate chat_settings"))?;
        Ok(())
    }
}

fn encode_list(list: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(list).map_err(StoreError::context("failed to encode blocked list"))
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get_settings(&self, chat_id: i64) -> Result<Option<ChatSettings>, StoreError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            SELECT chat_id, blocked_words, blocked_domains,
                   restrict_image, restrict_video, restrict_audio, restrict_file,
                   enable_word_filter, enable_link_filter, enable_mute, enable_auto_delete,
                   created_at, updated_at
            FROM chat_settings
            WHERE chat_id = ?
            "#,
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::context("failed to get settings"))?;

        row.map(ChatSettings::try_from).transpose()
    }

    async fn init_settings(&self, chat_id: i64) -> Result<(), StoreError> {
        let now = to_millis(chrono::Utc::now());
        sqlx::query(
            r#"
            INSERT INTO chat_settings (chat_id, created_at, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(chat_id) DO NOTHING
            "#,
        )
        .bind(chat_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StoreError::context("failed to init settings"))?;
        Ok(())
    }

    async fn update_settings(&self, settings: &ChatSettings) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO chat_settings (
                chat_id, blocked_words, blocked_domains,
                restrict_image, restrict_video, restrict_audio, restrict_file,
                enable_word_filter, enable_link_filter, enable_mute, enable_auto_delete,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(chat_id) DO UPDATE SET
                blocked_words = excluded.blocked_words,
                blocked_domains = excluded.blocked_domains,
                restrict_image = excluded.restrict_image,
                restrict_video = excluded.restrict_video,
                restrict_audio = excluded.restrict_audio,
                restrict_file = excluded.restrict_file,
                enable_word_filter = excluded.enable_word_filter,
                enable_link_filter = excluded.enable_link_filter,
                enable_mute = excluded.enable_mute,
                enable_auto_delete = excluded.enable_auto_delete,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(settings.chat_id)
        .bind(encode_list(&settings.blocked_words)?)
        .bind(encode_list(&settings.blocked_domains)?)
        .bind(settings.restrict_image)
        .bind(settings.restrict_video)
        .bind(settings.restrict_audio)
        .bind(settings.restrict_file)
        .bind(settings.enable_word_filter)
        .bind(settings.enable_link_filter)
        .bind(settings.enable_mute)
        .bind(settings.enable_auto_delete)
        .bind(to_millis(settings.created_at))
        .bind(to_millis(settings.updated_at))
        .execute(&self.pool)
        .await
        .map_err(StoreError::context("failed to update settings"))?;
        Ok(())
    }
}
