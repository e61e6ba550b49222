use crate::core::moderation::{StatField, StatRecorder};
use crate::core::pipeline::pipeline_manager::{Filter, FilterError};
use crate::core::pipeline::pipeline_models::{AttachmentKind, FilterResult, Payload};
use crate::core::settings::{ChatSettings, SettingsRepository};
use async_trait::async_trait;
use std::sync::Arc;

/// Denies messages carrying an attachment type the chat restricts.
///
/// The denial is attributed to a per-kind name (`image_filter`, ...) rather
/// than to `attachment_filter`, so stats and warnings say what was blocked.
pub struct AttachmentFilter {
    settings: Arc<SettingsRepository>,
    stats: StatRecorder,
}

impl AttachmentFilter {
    pub fn new(settings: Arc<SettingsRepository>, stats: StatRecorder) -> Self {
        Self { settings, stats }
    }
}

fn is_restricted(settings: &ChatSettings, kind: AttachmentKind) -> bool {
    match kind {
        AttachmentKind::Image => settings.restrict_image,
        AttachmentKind::Video => settings.restrict_video,
        AttachmentKind::Audio => settings.restrict_audio,
        AttachmentKind::File => settings.restrict_file,
    }
}

fn stat_for(kind: AttachmentKind) -> StatField {
    match kind {
        AttachmentKind::Image => StatField::ImageViolations,
        AttachmentKind::Video => StatField::VideoViolations,
        AttachmentKind::Audio => StatField::AudioViolations,
        AttachmentKind::File => StatField::FileViolations,
    }
}

#[async_trait]
impl Filter for AttachmentFilter {
    fn name(&self) -> &'static str {
        "attachment_filter"
    }

    async fn process(&self, payload: &Payload) -> Result<FilterResult, FilterError> {
        if payload.attachment_types.is_empty() {
            return Ok(FilterResult::allow());
        }

        let settings = match self.settings.get_settings(payload.chat_id).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(chat_id = payload.chat_id, error = %e, "Attachment filter could not load settings, allowing");
                return Ok(FilterResult::allow());
            }
        };

        for raw in &payload.attachment_types {
            let Some(kind) = AttachmentKind::from_type(raw) else {
                continue;
            };
            if is_restricted(&settings, kind) {
                self.stats.record(payload.chat_id, stat_for(kind));
                return Ok(FilterResult::deny(kind.filter_name(), kind.reason()));
            }
        }

        Ok(FilterResult::allow())
    }
}
