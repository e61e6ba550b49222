// SQLite implementations of the core storage ports.
//
// Timestamps are stored as UTC unix milliseconds so range comparisons in SQL
// are plain integer comparisons. Lists are stored as JSON text.

pub mod sqlite_chat_admin_store;
pub mod sqlite_link_token_store;
pub mod sqlite_mute_store;
pub mod sqlite_settings_store;
pub mod sqlite_temporary_message_store;
pub mod sqlite_violation_store;

pub use sqlite_chat_admin_store::SqliteChatAdminStore;
pub use sqlite_link_token_store::SqliteLinkTokenStore;
pub use sqlite_mute_store::SqliteMuteStore;
pub use sqlite_settings_store::SqliteSettingsStore;
pub use sqlite_temporary_message_store::SqliteTemporaryMessageStore;
pub use sqlite_violation_store::SqliteViolationStore;

use crate::core::errors::StoreError;
use crate::core::moderation::ModerationStores;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Open (and create if needed) the database behind `database_url`.
pub async fn connect(database_url: &str) -> Result<SqlitePool, StoreError> {
    if let Some(path) = database_file(database_url) {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(StoreError::context("failed to create database directory"))?;
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(StoreError::context("invalid database url"))?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(StoreError::context("failed to connect to database"))
}

/// Build every store on `pool` and create their tables.
pub async fn open_stores(pool: SqlitePool) -> Result<ModerationStores, StoreError> {
    let settings = SqliteSettingsStore::new(pool.clone());
    let mutes = SqliteMuteStore::new(pool.clone());
    let violations = SqliteViolationStore::new(pool.clone());
    let temporary_messages = SqliteTemporaryMessageStore::new(pool.clone());
    let admins = SqliteChatAdminStore::new(pool.clone());
    let link_tokens = SqliteLinkTokenStore::new(pool);

    settings.migrate().await?;
    mutes.migrate().await?;
    violations.migrate().await?;
    temporary_messages.migrate().await?;
    admins.migrate().await?;
    link_tokens.migrate().await?;

    Ok(ModerationStores {
        settings: Arc::new(settings),
        mutes: Arc::new(mutes),
        violations: Arc::new(violations),
        temporary_messages: Arc::new(temporary_messages),
        admins: Arc::new(admins),
        link_tokens: Arc::new(link_tokens),
    })
}

/// The file path part of a `sqlite:` url, if it names a file.
fn database_file(database_url: &str) -> Option<&str> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(path)
    }
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {}", millis)))
}

/// Single-connection in-memory pool; every connection would otherwise get
/// its own empty database.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::SettingsStore;

    #[test]
    fn test_database_file() {
        assert_eq!(database_file("sqlite://data/moderation.db"), Some("data/moderation.db"));
        assert_eq!(database_file("sqlite:bot.db?mode=rwc"), Some("bot.db"));
        assert_eq!(database_file("sqlite::memory:"), None);
        assert_eq!(database_file("postgres://localhost/db"), None);
    }

    #[tokio::test]
    async fn test_connect_creates_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("moderation.db");
        let url = format!("sqlite://{}", path.display());

        let pool = connect(&url).await.unwrap();
        let stores = open_stores(pool).await.unwrap();
        stores.settings.init_settings(1).await.unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_millis_round_trip_keeps_precision() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(from_millis(to_millis(at)).unwrap(), at);
        assert!(from_millis(i64::MAX).is_err());
    }
}
