use crate::core::moderation::MuteStore;
use crate::core::pipeline::pipeline_manager::{Filter, FilterError};
use crate::core::pipeline::pipeline_models::{reasons, FilterResult, Payload};
use crate::core::settings::SettingsRepository;
use async_trait::async_trait;
use std::sync::Arc;

/// Removes every message from a muted sender, whatever it contains.
pub struct MuteFilter {
    settings: Arc<SettingsRepository>,
    mutes: Arc<dyn MuteStore>,
}

impl MuteFilter {
    pub fn new(settings: Arc<SettingsRepository>, mutes: Arc<dyn MuteStore>) -> Self {
        Self { settings, mutes }
    }
}

#[async_trait]
impl Filter for MuteFilter {
    fn name(&self) -> &'static str {
        "mute_filter"
    }

    async fn process(&self, payload: &Payload) -> Result<FilterResult, FilterError> {
        let settings = match self.settings.get_settings(payload.chat_id).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(chat_id = payload.chat_id, error = %e, "Mute filter could not load settings, allowing");
                return Ok(FilterResult::allow());
            }
        };
        if !settings.enable_mute {
            return Ok(FilterResult::allow());
        }

        match self.mutes.is_muted(payload.chat_id, payload.sender_id).await {
            Ok(Some(expires_at)) => Ok(FilterResult::deny(
                self.name(),
                reasons::user_muted(expires_at),
            )
            .with_delete()),
            Ok(None) => Ok(FilterResult::allow()),
            Err(e) => {
                tracing::warn!(
                    chat_id = payload.chat_id,
                    user_id = payload.sender_id,
                    error = %e,
                    "Mute lookup failed, allowing"
                );
                Ok(FilterResult::allow())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::ChatSettings;
    use crate::core::test_support::{InMemoryMuteStore, InMemorySettingsStore};
    use std::time::Duration;

    fn setup(enable_mute: bool) -> (MuteFilter, Arc<InMemoryMuteStore>, Arc<InMemorySettingsStore>) {
        let settings_store = Arc::new(InMemorySettingsStore::new());
        let mut settings = ChatSettings::with_defaults(1);
        settings.enable_mute = enable_mute;
        settings_store.put(settings);

        let mutes = Arc::new(InMemoryMuteStore::new());
        let filter = MuteFilter::new(
            Arc::new(SettingsRepository::new(settings_store.clone(), false)),
            mutes.clone(),
        );
        (filter, mutes, settings_store)
    }

    #[tokio::test]
    async fn test_muted_user_denied_with_delete() {
        let (filter, mutes, _) = setup(true);
        mutes
            .mute_user(1, 42, "spammer", Duration::from_secs(600))
            .await
            .unwrap();

        let result = filter.process(&Payload::new(1, 42, "hello")).await.unwrap();

        assert!(!result.is_allowed);
        assert!(result.should_delete);
        assert!(!result.should_mute);
        assert_eq!(result.filter_name, "mute_filter");
        assert!(result.reason.contains("muted until"));
    }

    #[tokio::test]
    async fn test_unmuted_user_allowed() {
        let (filter, _, _) = setup(true);
        let result = filter.process(&Payload::new(1, 42, "hello")).await.unwrap();
        assert!(result.is_allowed);
    }

    #[tokio::test]
    async fn test_expired_mute_is_ignored() {
        let (filter, mutes, _) = setup(true);
        mutes.mute_user(1, 42, "", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let result = filter.process(&Payload::new(1, 42, "hello")).await.unwrap();
        assert!(result.is_allowed);
    }

    #[tokio::test]
    async fn test_disabled_mute_enforcement_allows() {
        let (filter, mutes, _) = setup(false);
        mutes
            .mute_user(1, 42, "spammer", Duration::from_secs(600))
            .await
            .unwrap();

        let result = filter.process(&Payload::new(1, 42, "hello")).await.unwrap();
        assert!(result.is_allowed);
    }

    #[tokio::test]
    async fn test_settings_failure_degrades_to_allow() {
        let (filter, mutes, settings_store) = setup(true);
        mutes
            .mute_user(1, 42, "spammer", Duration::from_secs(600))
            .await
            .unwrap();
        settings_store.fail_reads(true);

        let result = filter.process(&Payload::new(1, 42, "hello")).await.unwrap();
        assert!(result.is_allowed);
    }

    #[tokio::test]
    async fn test_mute_lookup_failure_degrades_to_allow() {
        let (filter, mutes, _) = setup(true);
        mutes.fail_reads(true);

        let result = filter.process(&Payload::new(1, 42, "hello")).await.unwrap();
        assert!(result.is_allowed);
    }
}
