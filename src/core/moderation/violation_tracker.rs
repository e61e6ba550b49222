// Violation tracking and escalation.
//
// Every content denial is appended to the violation log. Once a user reaches
// the threshold within the trailing window they get a long mute. Purely
// count-based: no decay, no per-type weighting.

use super::moderation_models::Escalation;
use super::moderation_store::ViolationStore;
use crate::core::duration::subtract_from;
use crate::core::errors::StoreError;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Trailing window violations are counted over.
pub const VIOLATION_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
/// Violations within the window that trigger a mute.
pub const VIOLATIONS_BEFORE_MUTE: u64 = 5;
/// Mute applied on escalation.
pub const ESCALATION_MUTE_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

pub struct ViolationTracker {
    store: Arc<dyn ViolationStore>,
}

impl ViolationTracker {
    pub fn new(store: Arc<dyn ViolationStore>) -> Self {
        Self { store }
    }

    /// Record a violation and decide whether the user should now be muted.
    pub async fn track(
        &self,
        chat_id: i64,
        user_id: i64,
        violation_type: &str,
    ) -> Result<Escalation, StoreError> {
        self.store
            .add_violation(chat_id, user_id, violation_type)
            .await?;

        let since = subtract_from(Utc::now(), VIOLATION_WINDOW);
        let count = self
            .store
            .count_violations_since(chat_id, user_id, since)
            .await?;

        if count >= VIOLATIONS_BEFORE_MUTE {
            tracing::info!(
                chat_id,
                user_id,
                count,
                violation_type,
                "Violation threshold reached"
            );
            Ok(Escalation::Mute(ESCALATION_MUTE_DURATION))
        } else {
            Ok(Escalation::None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::InMemoryViolationStore;

    #[tokio::test]
    async fn test_fifth_violation_escalates() {
        let store = Arc::new(InMemoryViolationStore::new());
        let tracker = ViolationTracker::new(store.clone());

        for i in 1..=4 {
            let escalation = tracker.track(123, 456, "word_filter").await.unwrap();
            assert_eq!(escalation, Escalation::None, "violation {} should not mute", i);
        }

        let escalation = tracker.track(123, 456, "link_filter").await.unwrap();
        assert_eq!(escalation, Escalation::Mute(Duration::from_secs(24 * 3600)));
        assert!(escalation.should_mute());
    }

    #[tokio::test]
    async fn test_violations_are_per_chat_and_user() {
        let store = Arc::new(InMemoryViolationStore::new());
        let tracker = ViolationTracker::new(store.clone());

        for _ in 0..4 {
            tracker.track(1, 1, "word_filter").await.unwrap();
        }
        // Other chat and other user start from zero
        assert_eq!(
            tracker.track(2, 1, "word_filter").await.unwrap(),
            Escalation::None
        );
        assert_eq!(
            tracker.track(1, 2, "word_filter").await.unwrap(),
            Escalation::None
        );
    }

    #[tokio::test]
    async fn test_old_violations_fall_out_of_window() {
        let store = Arc::new(InMemoryViolationStore::new());
        let old = Utc::now() - chrono::Duration::hours(25);
        for _ in 0..10 {
            store.insert_violation_at(1, 1, "word_filter", old);
        }
        let tracker = ViolationTracker::new(store);

        assert_eq!(
            tracker.track(1, 1, "word_filter").await.unwrap(),
            Escalation::None
        );
    }

    #[tokio::test]
    async fn test_storage_error_propagates() {
        let store = Arc::new(InMemoryViolationStore::new());
        store.fail_violations(true);
        let tracker = ViolationTracker::new(store);

        assert!(tracker.track(1, 1, "word_filter").await.is_err());
    }
}
