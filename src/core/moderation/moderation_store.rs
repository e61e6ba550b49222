// Storage ports for the moderation core.
//
// The core defines WHAT it needs from durable storage; `infra::sqlite`
// provides the real implementations and the tests use in-memory fakes.

use super::moderation_models::{ChatStats, LinkToken, Mute, StatField, TemporaryMessage};
use crate::core::errors::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[async_trait]
pub trait MuteStore: Send + Sync {
    /// Mute a user for `duration` from now.
    ///
    /// If a mute row already exists the expiry only moves forward, and the
    /// stored name is only replaced by a non-empty `user_name`.
    async fn mute_user(
        &self,
        chat_id: i64,
        user_id: i64,
        user_name: &str,
        duration: Duration,
    ) -> Result<(), StoreError>;

    async fn unmute_user(&self, chat_id: i64, user_id: i64) -> Result<(), StoreError>;

    /// `Some(expires_at)` if the user has a mute that has not expired yet.
    async fn is_muted(&self, chat_id: i64, user_id: i64)
        -> Result<Option<DateTime<Utc>>, StoreError>;

    /// The mute row for a user, expired or not.
    async fn get_mute(&self, chat_id: i64, user_id: i64) -> Result<Option<Mute>, StoreError>;

    /// Unexpired mutes of a chat, soonest expiry first, plus the total count.
    async fn active_mutes_paginated(
        &self,
        chat_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Mute>, u64), StoreError>;

    /// Unexpired mutes across all chats.
    async fn count_active_mutes(&self) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait ViolationStore: Send + Sync {
    async fn add_violation(
        &self,
        chat_id: i64,
        user_id: i64,
        violation_type: &str,
    ) -> Result<(), StoreError>;

    async fn count_violations_since(
        &self,
        chat_id: i64,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Bump today's counter for `field`.
    async fn increment_chat_stat(&self, chat_id: i64, field: StatField) -> Result<(), StoreError>;

    async fn chat_total_stats(&self, chat_id: i64) -> Result<ChatStats, StoreError>;
}

#[async_trait]
pub trait TemporaryMessageStore: Send + Sync {
    /// Schedule `message_id` for deletion `after` from now.
    async fn add(&self, chat_id: i64, message_id: &str, after: Duration)
        -> Result<(), StoreError>;

    /// Up to `limit` rows whose deletion time has passed.
    async fn expired(&self, limit: u64) -> Result<Vec<TemporaryMessage>, StoreError>;

    async fn delete(&self, ids: &[i64]) -> Result<(), StoreError>;
}

/// The bot's own list of chat admins (not the platform's live admin list).
#[async_trait]
pub trait ChatAdminStore: Send + Sync {
    async fn is_admin(&self, chat_id: i64, user_id: i64) -> Result<bool, StoreError>;

    /// Idempotent.
    async fn add_admin(&self, chat_id: i64, user_id: i64) -> Result<(), StoreError>;

    async fn remove_admin(&self, chat_id: i64, user_id: i64) -> Result<(), StoreError>;

    async fn managed_chats(&self, user_id: i64) -> Result<Vec<i64>, StoreError>;

    async fn managed_chats_paginated(
        &self,
        user_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<i64>, u64), StoreError>;
}

#[async_trait]
pub trait LinkTokenStore: Send + Sync {
    /// Issue a new token for `user_id`, valid for `ttl`.
    async fn create(&self, user_id: i64, ttl: Duration) -> Result<String, StoreError>;

    /// Look a token up. Expired tokens are deleted and reported as `None`.
    async fn get(&self, token: &str) -> Result<Option<LinkToken>, StoreError>;

    async fn delete(&self, token: &str) -> Result<(), StoreError>;

    async fn delete_expired(&self) -> Result<u64, StoreError>;
}
