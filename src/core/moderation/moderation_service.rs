// Moderation service - the facade the chat layer talks to.
//
// This service handles:
// - Running the filter pipeline for every group message
// - Violation tracking and escalation
// - Mute administration (admin-gated and system mutes)
// - Settings mutation (admin-gated)
// - Group linking via one-time tokens
//
// NO platform dependencies here - just domain logic over the storage ports.

use super::moderation_models::{ChatStats, Escalation, Mute, StatField};
use super::moderation_store::{
    ChatAdminStore, LinkTokenStore, MuteStore, TemporaryMessageStore, ViolationStore,
};
use super::stat_recorder::StatRecorder;
use super::violation_tracker::ViolationTracker;
use crate::core::errors::StoreError;
use crate::core::metrics::ModerationMetrics;
use crate::core::pipeline::filters::{standard_pipeline, RateLimitFilter};
use crate::core::pipeline::{FilterResult, Payload, PipelineError, PipelineManager};
use crate::core::settings::{
    merge_normalized, normalize_domain, normalize_word, ChatSettings, SettingToggle,
    SettingsRepository, SettingsStore,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Lifetime of a group-link token.
pub const LINK_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Items per page for the paginated admin listings.
pub const PAGE_SIZE: u64 = 10;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("user {user_id} is not an admin of chat {chat_id}")]
    Unauthorized { chat_id: i64, user_id: i64 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unknown setting: {0}")]
    UnknownSetting(String),

    #[error("link token is invalid or expired")]
    InvalidLinkToken,

    #[error("link token was issued to another user (presented by {0})")]
    LinkTokenOwnerMismatch(i64),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

// ============================================================================
// WIRING
// ============================================================================

/// The storage ports the service is built from.
#[derive(Clone)]
pub struct ModerationStores {
    pub settings: Arc<dyn SettingsStore>,
    pub mutes: Arc<dyn MuteStore>,
    pub violations: Arc<dyn ViolationStore>,
    pub temporary_messages: Arc<dyn TemporaryMessageStore>,
    pub admins: Arc<dyn ChatAdminStore>,
    pub link_tokens: Arc<dyn LinkTokenStore>,
}

#[derive(Debug, Clone, Copy)]
pub struct ModerationOptions {
    pub enable_cache: bool,
    pub rate_limit: usize,
    pub rate_limit_window: Duration,
}

impl Default for ModerationOptions {
    fn default() -> Self {
        Self {
            enable_cache: false,
            rate_limit: 5,
            rate_limit_window: Duration::from_secs(1),
        }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService {
    settings: Arc<SettingsRepository>,
    pipeline: PipelineManager,
    rate_limiter: Arc<RateLimitFilter>,
    tracker: ViolationTracker,
    stats: StatRecorder,
    mutes: Arc<dyn MuteStore>,
    violations: Arc<dyn ViolationStore>,
    temporary_messages: Arc<dyn TemporaryMessageStore>,
    admins: Arc<dyn ChatAdminStore>,
    link_tokens: Arc<dyn LinkTokenStore>,
    metrics: Arc<dyn ModerationMetrics>,
}

impl ModerationService {
    pub fn new(
        stores: ModerationStores,
        options: ModerationOptions,
        metrics: Arc<dyn ModerationMetrics>,
    ) -> Self {
        let settings = Arc::new(SettingsRepository::new(
            stores.settings,
            options.enable_cache,
        ));
        let rate_limiter = Arc::new(RateLimitFilter::new(
            options.rate_limit,
            options.rate_limit_window,
        ));
        let stats = StatRecorder::new(Arc::clone(&stores.violations));
        let pipeline = standard_pipeline(
            Arc::clone(&rate_limiter),
            Arc::clone(&settings),
            Arc::clone(&stores.mutes),
            stats.clone(),
        );

        Self {
            settings,
            pipeline,
            rate_limiter,
            tracker: ViolationTracker::new(Arc::clone(&stores.violations)),
            stats,
            mutes: stores.mutes,
            violations: stores.violations,
            temporary_messages: stores.temporary_messages,
            admins: stores.admins,
            link_tokens: stores.link_tokens,
            metrics,
        }
    }

    /// The shared rate limiter, for the housekeeping loop.
    pub fn rate_limiter(&self) -> Arc<RateLimitFilter> {
        Arc::clone(&self.rate_limiter)
    }

    // ------------------------------------------------------------------------
    // Message moderation
    // ------------------------------------------------------------------------

    /// Run the filter pipeline over one message.
    ///
    /// Side effects of a denial (mute, deletion, warnings) are the caller's job.
    pub async fn moderate_message(&self, payload: &Payload) -> Result<FilterResult, ModerationError> {
        let result = self.pipeline.process(payload).await?;
        if !result.is_allowed {
            tracing::debug!(
                chat_id = payload.chat_id,
                user_id = payload.sender_id,
                filter = %result.filter_name,
                reason = %result.reason,
                "Message denied"
            );
        }
        Ok(result)
    }

    /// Record a violation and report whether the user should now be muted.
    pub async fn track_violation(
        &self,
        chat_id: i64,
        user_id: i64,
        violation_type: &str,
    ) -> Result<Escalation, ModerationError> {
        Ok(self.tracker.track(chat_id, user_id, violation_type).await?)
    }

    /// Schedule one of our messages for removal after `after`.
    pub async fn schedule_deletion(
        &self,
        chat_id: i64,
        message_id: &str,
        after: Duration,
    ) -> Result<(), ModerationError> {
        Ok(self
            .temporary_messages
            .add(chat_id, message_id, after)
            .await?)
    }

    // ------------------------------------------------------------------------
    // Group linking
    // ------------------------------------------------------------------------

    /// Issue a one-time token the user can present in a group to link it.
    pub async fn generate_link_token(&self, user_id: i64) -> Result<String, ModerationError> {
        Ok(self.link_tokens.create(user_id, LINK_TOKEN_TTL).await?)
    }

    /// Consume a link token: the presenting user becomes a bot admin of the chat.
    pub async fn link_group(
        &self,
        token: &str,
        chat_id: i64,
        user_id: i64,
    ) -> Result<(), ModerationError> {
        let link = self
            .link_tokens
            .get(token)
            .await?
            .ok_or(ModerationError::InvalidLinkToken)?;

        if link.user_id != user_id {
            return Err(ModerationError::LinkTokenOwnerMismatch(user_id));
        }

        self.admins.add_admin(chat_id, user_id).await?;
        self.settings.init_settings(chat_id).await?;
        self.link_tokens.delete(token).await?;

        tracing::info!(chat_id, user_id, "Group linked");
        Ok(())
    }

    pub async fn managed_chats(&self, user_id: i64) -> Result<Vec<i64>, ModerationError> {
        Ok(self.admins.managed_chats(user_id).await?)
    }

    /// One page (1-based) of the chats a user administers, plus the total.
    pub async fn managed_chats_page(
        &self,
        user_id: i64,
        page: u64,
    ) -> Result<(Vec<i64>, u64), ModerationError> {
        Ok(self
            .admins
            .managed_chats_paginated(user_id, page_offset(page), PAGE_SIZE)
            .await?)
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    pub async fn initialize_chat(&self, chat_id: i64) -> Result<(), ModerationError> {
        Ok(self.settings.init_settings(chat_id).await?)
    }

    pub async fn chat_settings(&self, chat_id: i64) -> Result<Arc<ChatSettings>, ModerationError> {
        Ok(self.settings.get_settings(chat_id).await?)
    }

    /// Flip a boolean setting by name and return its new value.
    pub async fn toggle_setting(
        &self,
        chat_id: i64,
        actor_id: i64,
        setting: &str,
    ) -> Result<bool, ModerationError> {
        self.require_admin(chat_id, actor_id).await?;
        let toggle = SettingToggle::from_name(setting)
            .ok_or_else(|| ModerationError::UnknownSetting(setting.to_string()))?;

        let mut settings = (*self.settings.get_settings(chat_id).await?).clone();
        let value = toggle.apply(&mut settings);
        self.settings.update_settings(settings).await?;

        tracing::info!(chat_id, actor_id, setting, value, "Setting toggled");
        Ok(value)
    }

    pub async fn add_blocked_words(
        &self,
        chat_id: i64,
        actor_id: i64,
        words: &[String],
    ) -> Result<Arc<ChatSettings>, ModerationError> {
        self.update_list(chat_id, actor_id, words, ListKind::Words, ListMode::Add)
            .await
    }

    pub async fn set_blocked_words(
        &self,
        chat_id: i64,
        actor_id: i64,
        words: &[String],
    ) -> Result<Arc<ChatSettings>, ModerationError> {
        self.update_list(chat_id, actor_id, words, ListKind::Words, ListMode::Replace)
            .await
    }

    pub async fn add_blocked_domains(
        &self,
        chat_id: i64,
        actor_id: i64,
        domains: &[String],
    ) -> Result<Arc<ChatSettings>, ModerationError> {
        self.update_list(chat_id, actor_id, domains, ListKind::Domains, ListMode::Add)
            .await
    }

    pub async fn set_blocked_domains(
        &self,
        chat_id: i64,
        actor_id: i64,
        domains: &[String],
    ) -> Result<Arc<ChatSettings>, ModerationError> {
        self.update_list(chat_id, actor_id, domains, ListKind::Domains, ListMode::Replace)
            .await
    }

    async fn update_list(
        &self,
        chat_id: i64,
        actor_id: i64,
        raw: &[String],
        kind: ListKind,
        mode: ListMode,
    ) -> Result<Arc<ChatSettings>, ModerationError> {
        self.require_admin(chat_id, actor_id).await?;

        let normalize = kind.normalizer();
        let incoming = merge_normalized(&[], raw, normalize);
        if incoming.is_empty() {
            return Err(ModerationError::Validation(format!(
                "no {} given",
                kind.label()
            )));
        }

        let mut settings = (*self.settings.get_settings(chat_id).await?).clone();
        let list = match kind {
            ListKind::Words => &mut settings.blocked_words,
            ListKind::Domains => &mut settings.blocked_domains,
        };
        *list = match mode {
            ListMode::Add => merge_normalized(list, &incoming, normalize),
            ListMode::Replace => incoming,
        };

        let updated = self.settings.update_settings(settings).await?;
        tracing::info!(chat_id, actor_id, list = kind.label(), "Blocked list updated");
        Ok(updated)
    }

    // ------------------------------------------------------------------------
    // Mutes
    // ------------------------------------------------------------------------

    /// Admin-invoked mute.
    pub async fn mute_user(
        &self,
        chat_id: i64,
        admin_id: i64,
        user_id: i64,
        user_name: &str,
        duration: Duration,
    ) -> Result<(), ModerationError> {
        self.require_admin(chat_id, admin_id).await?;
        validate_mute_duration(duration)?;

        self.mutes
            .mute_user(chat_id, user_id, user_name, duration)
            .await?;
        tracing::info!(chat_id, admin_id, user_id, ?duration, "User muted by admin");
        Ok(())
    }

    pub async fn unmute_user(
        &self,
        chat_id: i64,
        admin_id: i64,
        user_id: i64,
    ) -> Result<(), ModerationError> {
        self.require_admin(chat_id, admin_id).await?;
        self.mutes.unmute_user(chat_id, user_id).await?;
        tracing::info!(chat_id, admin_id, user_id, "User unmuted");
        Ok(())
    }

    /// Mute applied by automatic enforcement. No admin check.
    pub async fn system_mute_user(
        &self,
        chat_id: i64,
        user_id: i64,
        user_name: &str,
        duration: Duration,
    ) -> Result<(), ModerationError> {
        validate_mute_duration(duration)?;

        self.mutes
            .mute_user(chat_id, user_id, user_name, duration)
            .await?;
        self.stats.record(chat_id, StatField::MuteCount);
        self.metrics.inc_bot_action("mute");
        tracing::info!(chat_id, user_id, ?duration, "User muted automatically");
        Ok(())
    }

    pub async fn get_mute(&self, chat_id: i64, user_id: i64) -> Result<Option<Mute>, ModerationError> {
        Ok(self.mutes.get_mute(chat_id, user_id).await?)
    }

    /// One page (1-based) of a chat's active mutes, soonest expiry first, plus the total.
    pub async fn active_mutes_page(
        &self,
        chat_id: i64,
        page: u64,
    ) -> Result<(Vec<Mute>, u64), ModerationError> {
        Ok(self
            .mutes
            .active_mutes_paginated(chat_id, page_offset(page), PAGE_SIZE)
            .await?)
    }

    // ------------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------------

    pub async fn chat_stats(&self, chat_id: i64) -> Result<ChatStats, ModerationError> {
        Ok(self.violations.chat_total_stats(chat_id).await?)
    }

    async fn require_admin(&self, chat_id: i64, user_id: i64) -> Result<(), ModerationError> {
        if self.admins.is_admin(chat_id, user_id).await? {
            Ok(())
        } else {
            tracing::warn!(chat_id, user_id, "Rejected admin operation from non-admin");
            Err(ModerationError::Unauthorized { chat_id, user_id })
        }
    }
}

#[derive(Clone, Copy)]
enum ListKind {
    Words,
    Domains,
}

impl ListKind {
    fn normalizer(self) -> fn(&str) -> String {
        match self {
            ListKind::Words => normalize_word,
            ListKind::Domains => normalize_domain,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ListKind::Words => "words",
            ListKind::Domains => "domains",
        }
    }
}

#[derive(Clone, Copy)]
enum ListMode {
    Add,
    Replace,
}

fn page_offset(page: u64) -> u64 {
    (page.max(1) - 1) * PAGE_SIZE
}

fn validate_mute_duration(duration: Duration) -> Result<(), ModerationError> {
    if duration.is_zero() {
        return Err(ModerationError::Validation(
            "mute duration must be positive".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
