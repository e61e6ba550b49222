use crate::core::moderation::{StatField, StatRecorder};
use crate::core::pipeline::pipeline_manager::{Filter, FilterError};
use crate::core::pipeline::pipeline_models::{reasons, FilterResult, Payload};
use crate::core::settings::SettingsRepository;
use async_trait::async_trait;
use std::sync::Arc;

/// Denies messages containing any blocked word.
///
/// Matching is a case-insensitive substring test, so `bad` also catches
/// `badword`. Stored words are already lower-cased by the settings mutators.
pub struct WordFilter {
    settings: Arc<SettingsRepository>,
    stats: StatRecorder,
}

impl WordFilter {
    pub fn new(settings: Arc<SettingsRepository>, stats: StatRecorder) -> Self {
        Self { settings, stats }
    }
}

#[async_trait]
impl Filter for WordFilter {
    fn name(&self) -> &'static str {
        "word_filter"
    }

    async fn process(&self, payload: &Payload) -> Result<FilterResult, FilterError> {
        let settings = match self.settings.get_settings(payload.chat_id).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(chat_id = payload.chat_id, error = %e, "Word filter could not load settings, allowing");
                return Ok(FilterResult::allow());
            }
        };
        if !settings.enable_word_filter || settings.blocked_words.is_empty() {
            return Ok(FilterResult::allow());
        }

        let text = payload.text.to_lowercase();
        let hit = settings
            .blocked_words
            .iter()
            .filter(|word| !word.is_empty())
            .any(|word| text.contains(word.as_str()));

        if hit {
            self.stats.record(payload.chat_id, StatField::WordViolations);
            return Ok(FilterResult::deny(self.name(), reasons::PROHIBITED_WORD));
        }

        Ok(FilterResult::allow())
    }
}
