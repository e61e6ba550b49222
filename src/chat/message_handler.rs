// Group message handling - translates pipeline decisions into platform actions.
//
// The decision is made inline; enforcement (mute, warning, deletion) runs on
// its own task so a slow platform call never delays the next message.

use super::commands::{parse_group_command, parse_mute_duration, GroupCommand};
use super::responses;
use crate::core::metrics::ModerationMetrics;
use crate::core::moderation::{ModerationError, ModerationService};
use crate::core::pipeline::{reasons, FilterResult, Payload};
use crate::core::platform::ChatPlatform;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// How long warnings and command replies stay in the chat.
pub const WARNING_TTL: Duration = Duration::from_secs(60);

/// Filters whose denials carry their own enforcement and never count as violations.
const SELF_ENFORCING_FILTERS: [&str; 2] = ["mute_filter", "rate_limit_filter"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageAuthor {
    pub user_id: i64,
    pub name: String,
}

/// A group message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub message_id: String,
    pub sender: MessageAuthor,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attachment_types: Vec<String>,
    /// Author of the message this one replies to, if any.
    #[serde(default)]
    pub reply_to: Option<MessageAuthor>,
}

impl IncomingMessage {
    fn payload(&self) -> Payload {
        Payload::new(self.chat_id, self.sender.user_id, self.text.clone())
            .with_attachments(self.attachment_types.iter().cloned())
    }
}

pub struct MessageHandler {
    enforcer: Enforcer,
    default_mute: Duration,
}

impl MessageHandler {
    pub fn new(
        service: Arc<ModerationService>,
        platform: Arc<dyn ChatPlatform>,
        metrics: Arc<dyn ModerationMetrics>,
        default_mute: Duration,
    ) -> Self {
        Self {
            enforcer: Enforcer {
                service,
                platform,
                metrics,
            },
            default_mute,
        }
    }

    /// Handle one group message.
    ///
    /// Returns the enforcement task when the message was denied. Callers are
    /// free to drop it.
    pub async fn handle_group_message(&self, message: IncomingMessage) -> Option<JoinHandle<()>> {
        match parse_group_command(&message.text) {
            Some(GroupCommand::Mute { duration }) => {
                if let Ok(applied) = self.handle_mute_command(&message, duration).await {
                    tracing::info!(
                        chat_id = message.chat_id,
                        admin_id = message.sender.user_id,
                        duration = ?applied,
                        "/mute applied"
                    );
                }
                return None;
            }
            Some(GroupCommand::Link { token }) => {
                self.handle_link_command(&message, token).await;
                return None;
            }
            None => {}
        }

        let started = Instant::now();
        let outcome = self.enforcer.service.moderate_message(&message.payload()).await;
        self.enforcer.metrics.observe_update_processing(
            "message",
            started.elapsed().as_secs_f64(),
            outcome.is_ok(),
        );

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(chat_id = message.chat_id, error = %e, "Failed to moderate message");
                return None;
            }
        };
        if result.is_allowed {
            return None;
        }

        tracing::info!(
            chat_id = message.chat_id,
            user_id = message.sender.user_id,
            filter = %result.filter_name,
            reason = %result.reason,
            "Message blocked"
        );

        let enforcer = self.enforcer.clone();
        Some(tokio::spawn(async move {
            enforcer.enforce(&message, &result).await;
        }))
    }

    /// `/mute [duration]`, sent as a reply to the target's message.
    ///
    /// Returns the applied duration. Every failure is also reported in the
    /// chat, and the command message is removed either way.
    pub async fn handle_mute_command(
        &self,
        message: &IncomingMessage,
        duration_arg: Option<&str>,
    ) -> Result<Duration, ModerationError> {
        let outcome = self.apply_mute_command(message, duration_arg).await;

        match &outcome {
            Ok(_) => {}
            Err(ModerationError::Unauthorized { .. }) => {
                tracing::info!(
                    chat_id = message.chat_id,
                    user_id = message.sender.user_id,
                    "Non-admin tried to use /mute"
                );
                self.enforcer
                    .send_temporary(message.chat_id, responses::MUTE_NOT_ADMIN)
                    .await;
            }
            Err(ModerationError::Validation(_)) if message.reply_to.is_none() => {
                tracing::info!(chat_id = message.chat_id, "/mute used without a reply target");
                self.enforcer
                    .send_temporary(message.chat_id, responses::MUTE_USAGE)
                    .await;
            }
            Err(ModerationError::Validation(reason)) => {
                tracing::info!(chat_id = message.chat_id, %reason, "/mute rejected");
                self.enforcer
                    .send_temporary(message.chat_id, responses::MUTE_BAD_DURATION)
                    .await;
            }
            Err(e) => {
                tracing::error!(chat_id = message.chat_id, error = %e, "Failed to mute user");
                self.enforcer
                    .send_temporary(message.chat_id, responses::MUTE_FAILED)
                    .await;
            }
        }

        self.enforcer
            .delete_message(&message.message_id, "mute_command_cleanup")
            .await;
        outcome
    }

    async fn apply_mute_command(
        &self,
        message: &IncomingMessage,
        duration_arg: Option<&str>,
    ) -> Result<Duration, ModerationError> {
        let target = message.reply_to.as_ref().ok_or_else(|| {
            ModerationError::Validation("/mute must reply to a message".to_string())
        })?;
        let duration = parse_mute_duration(duration_arg, self.default_mute)?;

        self.enforcer
            .service
            .mute_user(
                message.chat_id,
                message.sender.user_id,
                target.user_id,
                &target.name,
                duration,
            )
            .await?;

        self.enforcer
            .send_temporary(message.chat_id, &responses::user_muted(&target.name, duration))
            .await;
        Ok(duration)
    }

    /// `/link <token>`: bind this group to the user who requested the token.
    pub async fn handle_link_command(&self, message: &IncomingMessage, token: Option<&str>) {
        self.enforcer
            .delete_message(&message.message_id, "link_command_cleanup")
            .await;

        let Some(token) = token else {
            self.enforcer
                .send_temporary(message.chat_id, responses::LINK_USAGE)
                .await;
            return;
        };

        match self
            .enforcer
            .service
            .link_group(token, message.chat_id, message.sender.user_id)
            .await
        {
            Ok(()) => {
                if let Err(e) = self
                    .enforcer
                    .platform
                    .send_message(message.chat_id, responses::LINK_SUCCESS)
                    .await
                {
                    tracing::warn!(chat_id = message.chat_id, error = %e, "Failed to confirm group link");
                }
            }
            Err(e) => {
                tracing::info!(chat_id = message.chat_id, error = %e, "Group link rejected");
                self.enforcer
                    .send_temporary(message.chat_id, &responses::link_failed(&e.to_string()))
                    .await;
            }
        }
    }
}

/// Carries out the platform side of a denial. Failures are logged, never returned.
#[derive(Clone)]
struct Enforcer {
    service: Arc<ModerationService>,
    platform: Arc<dyn ChatPlatform>,
    metrics: Arc<dyn ModerationMetrics>,
}

impl Enforcer {
    async fn enforce(&self, message: &IncomingMessage, result: &FilterResult) {
        tokio::join!(self.punish(message, result), self.remove(message, result));
    }

    async fn punish(&self, message: &IncomingMessage, result: &FilterResult) {
        let chat_id = message.chat_id;
        let user = &message.sender;

        if result.should_mute {
            if let Some(duration) = result.mute_duration {
                self.system_mute(chat_id, user, duration).await;
            }
            self.warn(chat_id, user, &result.reason).await;
            return;
        }

        if SELF_ENFORCING_FILTERS.contains(&result.filter_name.as_str()) {
            return;
        }

        let escalation = match self
            .service
            .track_violation(chat_id, user.user_id, &result.filter_name)
            .await
        {
            Ok(escalation) => escalation,
            Err(e) => {
                tracing::error!(chat_id, user_id = user.user_id, error = %e, "Failed to track violation");
                self.warn(chat_id, user, &result.reason).await;
                return;
            }
        };

        match escalation.mute_duration() {
            Some(duration) => {
                tracing::info!(chat_id, user_id = user.user_id, "Muting user for persistent violations");
                self.system_mute(chat_id, user, duration).await;
                self.warn(chat_id, user, reasons::PERSISTENT_VIOLATION).await;
            }
            None => self.warn(chat_id, user, &result.reason).await,
        }
    }

    async fn remove(&self, message: &IncomingMessage, result: &FilterResult) {
        if result.should_delete {
            self.delete_message(&message.message_id, &result.filter_name)
                .await;
            return;
        }

        match self.service.chat_settings(message.chat_id).await {
            Ok(settings) if settings.enable_auto_delete => {
                self.delete_message(&message.message_id, &result.filter_name)
                    .await
            }
            Ok(_) => tracing::debug!(chat_id = message.chat_id, "Auto-delete disabled, keeping message"),
            Err(e) => {
                tracing::error!(chat_id = message.chat_id, error = %e, "Failed to load settings for auto-delete")
            }
        }
    }

    async fn system_mute(&self, chat_id: i64, user: &MessageAuthor, duration: Duration) {
        if let Err(e) = self
            .service
            .system_mute_user(chat_id, user.user_id, &user.name, duration)
            .await
        {
            tracing::error!(chat_id, user_id = user.user_id, error = %e, "Failed to system mute user");
        }
    }

    async fn warn(&self, chat_id: i64, user: &MessageAuthor, reason: &str) {
        if self
            .send_temporary(chat_id, &responses::warning(&user.name, reason))
            .await
        {
            self.metrics.inc_bot_action("warning");
        }
    }

    /// Post a message that the sweeper removes after `WARNING_TTL`. Returns
    /// whether the message was posted.
    async fn send_temporary(&self, chat_id: i64, text: &str) -> bool {
        let message_id = match self.platform.send_message(chat_id, text).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(chat_id, error = %e, "Failed to send message");
                return false;
            }
        };

        if let Err(e) = self
            .service
            .schedule_deletion(chat_id, &message_id, WARNING_TTL)
            .await
        {
            tracing::error!(chat_id, error = %e, "Failed to schedule message deletion");
        }
        true
    }

    async fn delete_message(&self, message_id: &str, reason: &str) {
        match self.platform.delete_message(message_id).await {
            Ok(()) => {
                tracing::debug!(message_id, reason, "Deleted message");
                self.metrics.inc_deleted_messages(reason);
            }
            Err(e) => tracing::warn!(message_id, reason, error = %e, "Failed to delete message"),
        }
    }
}
