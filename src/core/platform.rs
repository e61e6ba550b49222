// Enforcement sink - the narrow slice of the chat platform API the core needs.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform request failed: {0}")]
    Request(String),

    #[error("platform API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("unexpected platform response: {0}")]
    Decode(String),
}

/// Actions the moderation core performs on the chat platform.
///
/// Failures are never fatal to moderation: callers log them and move on.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Remove a message from its chat.
    async fn delete_message(&self, message_id: &str) -> Result<(), PlatformError>;

    /// Post a text message to a chat. Returns the platform's id for the new message.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<String, PlatformError>;
}
