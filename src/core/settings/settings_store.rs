use super::settings_models::ChatSettings;
use crate::core::errors::StoreError;
use async_trait::async_trait;

/// Durable storage for chat settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load a chat's settings, or `None` if the chat has never been seen.
    async fn get_settings(&self, chat_id: i64) -> Result<Option<ChatSettings>, StoreError>;

    /// Create the default record for a chat if none exists. Idempotent.
    async fn init_settings(&self, chat_id: i64) -> Result<(), StoreError>;

    /// Insert or replace a chat's settings.
    async fn update_settings(&self, settings: &ChatSettings) -> Result<(), StoreError>;
}
