// Link filter - blocks messages that mention a blocked domain.
//
// URL candidates are pulled out of the text with a permissive domain pattern
// (scheme optional, Unicode letters allowed). A candidate matches a blocked
// domain by substring, so `sub.bad.com` and `bad.com/path` both hit `bad.com`.

use crate::core::moderation::{StatField, StatRecorder};
use crate::core::pipeline::pipeline_manager::{Filter, FilterError};
use crate::core::pipeline::pipeline_models::{reasons, FilterResult, Payload};
use crate::core::settings::{normalize_domain, SettingsRepository};
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:https?://)?(?:[\p{L}0-9](?:[\p{L}0-9-]*[\p{L}0-9])?\.)+[\p{L}0-9][\p{L}0-9-]*[\p{L}0-9]",
    )
    .expect("URL pattern is a valid regex")
});

/// Every URL-like substring of `text`, in order of appearance.
pub fn extract_urls(text: &str) -> Vec<&str> {
    URL_PATTERN.find_iter(text).map(|m| m.as_str()).collect()
}

pub struct LinkFilter {
    settings: Arc<SettingsRepository>,
    stats: StatRecorder,
}

impl LinkFilter {
    pub fn new(settings: Arc<SettingsRepository>, stats: StatRecorder) -> Self {
        Self { settings, stats }
    }
}

#[async_trait]
impl Filter for LinkFilter {
    fn name(&self) -> &'static str {
        "link_filter"
    }

    async fn process(&self, payload: &Payload) -> Result<FilterResult, FilterError> {
        let settings = match self.settings.get_settings(payload.chat_id).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(chat_id = payload.chat_id, error = %e, "Link filter could not load settings, allowing");
                return Ok(FilterResult::allow());
            }
        };
        if !settings.enable_link_filter {
            return Ok(FilterResult::allow());
        }

        let urls = extract_urls(&payload.text);
        if urls.is_empty() {
            return Ok(FilterResult::allow());
        }

        for url in urls {
            let url = url.to_lowercase();
            for domain in &settings.blocked_domains {
                let domain = normalize_domain(domain);
                if domain.is_empty() {
                    continue;
                }
                if url.contains(&domain) {
                    self.stats
                        .record(payload.chat_id, StatField::LinkViolations);
                    return Ok(FilterResult::deny(self.name(), reasons::PROHIBITED_DOMAIN));
                }
            }
        }

        Ok(FilterResult::allow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::ViolationStore;
    use crate::core::settings::ChatSettings;
    use crate::core::test_support::{InMemorySettingsStore, InMemoryViolationStore};
    use std::time::Duration;

    fn setup(
        domains: &[&str],
        enabled: bool,
    ) -> (LinkFilter, Arc<InMemoryViolationStore>, Arc<InMemorySettingsStore>) {
        let settings_store = Arc::new(InMemorySettingsStore::new());
        let mut settings = ChatSettings::with_defaults(1);
        settings.blocked_domains = domains.iter().map(|d| d.to_string()).collect();
        settings.enable_link_filter = enabled;
        settings_store.put(settings);

        let violations = Arc::new(InMemoryViolationStore::new());
        let filter = LinkFilter::new(
            Arc::new(SettingsRepository::new(settings_store.clone(), false)),
            StatRecorder::new(violations.clone()),
        );
        (filter, violations, settings_store)
    }

    #[test]
    fn test_extract_urls() {
        assert_eq!(
            extract_urls("check https://sub.bad.com/page and www.example.org"),
            vec!["https://sub.bad.com", "www.example.org"]
        );
        assert_eq!(extract_urls("пример.рф is here"), vec!["пример.рф"]);
        assert!(extract_urls("no links at all.").is_empty());
    }

    #[tokio::test]
    async fn test_subdomain_is_blocked() {
        let (filter, _, _) = setup(&["bad.com"], true);
        let result = filter
            .process(&Payload::new(1, 2, "check https://sub.bad.com/page"))
            .await
            .unwrap();

        assert!(!result.is_allowed);
        assert_eq!(result.filter_name, "link_filter");
        assert!(!result.should_delete);
    }

    #[tokio::test]
    async fn test_other_domain_allowed() {
        let (filter, _, _) = setup(&["bad.com"], true);
        let result = filter
            .process(&Payload::new(1, 2, "see good.com"))
            .await
            .unwrap();
        assert!(result.is_allowed);
    }

    #[tokio::test]
    async fn test_matching_is_case_insensitive() {
        let (filter, _, _) = setup(&["bad.com"], true);
        let result = filter
            .process(&Payload::new(1, 2, "Visit HTTP://WWW.BAD.COM now"))
            .await
            .unwrap();
        assert!(!result.is_allowed);
    }

    #[tokio::test]
    async fn test_unnormalized_stored_domain_still_matches() {
        let (filter, _, _) = setup(&["https://Bad.com/"], true);
        let result = filter
            .process(&Payload::new(1, 2, "bad.com/path"))
            .await
            .unwrap();
        assert!(!result.is_allowed);
    }

    #[tokio::test]
    async fn test_disabled_filter_allows() {
        let (filter, _, _) = setup(&["bad.com"], false);
        let result = filter
            .process(&Payload::new(1, 2, "https://bad.com"))
            .await
            .unwrap();
        assert!(result.is_allowed);
    }

    #[tokio::test]
    async fn test_settings_failure_degrades_to_allow() {
        let (filter, _, settings_store) = setup(&["bad.com"], true);
        settings_store.fail_reads(true);
        let result = filter
            .process(&Payload::new(1, 2, "https://bad.com"))
            .await
            .unwrap();
        assert!(result.is_allowed);
    }

    #[tokio::test]
    async fn test_denial_bumps_link_stat() {
        let (filter, violations, _) = setup(&["bad.com"], true);
        filter
            .process(&Payload::new(1, 2, "bad.com"))
            .await
            .unwrap();

        // The increment runs on a detached task
        tokio::time::sleep(Duration::from_millis(20)).await;
        let stats = violations.chat_total_stats(1).await.unwrap();
        assert_eq!(stats.link_violations, 1);
    }

    #[tokio::test]
    async fn test_stat_failure_does_not_change_decision() {
        let (filter, violations, _) = setup(&["bad.com"], true);
        violations.fail_stats(true);
        let result = filter
            .process(&Payload::new(1, 2, "bad.com"))
            .await
            .unwrap();
        assert!(!result.is_allowed);
    }
}
