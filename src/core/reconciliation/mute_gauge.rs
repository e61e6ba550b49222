use crate::core::metrics::ModerationMetrics;
use crate::core::moderation::MuteStore;
use std::sync::Arc;
use std::time::Duration;

pub const MUTE_GAUGE_INTERVAL: Duration = Duration::from_secs(60);

/// Republishes the number of unexpired mutes as a gauge.
pub struct MuteGaugeUpdater {
    mutes: Arc<dyn MuteStore>,
    metrics: Arc<dyn ModerationMetrics>,
}

impl MuteGaugeUpdater {
    pub fn new(mutes: Arc<dyn MuteStore>, metrics: Arc<dyn ModerationMetrics>) -> Self {
        Self { mutes, metrics }
    }

    pub async fn update_once(&self) {
        match self.mutes.count_active_mutes().await {
            Ok(count) => self.metrics.set_active_mutes(count),
            Err(e) => tracing::warn!(error = %e, "Failed to count active mutes"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{InMemoryMuteStore, RecordingMetrics};

    #[tokio::test]
    async fn test_publishes_active_count() {
        let mutes = Arc::new(InMemoryMuteStore::new());
        mutes.mute_user(1, 1, "", Duration::from_secs(60)).await.unwrap();
        mutes.mute_user(2, 1, "", Duration::from_secs(60)).await.unwrap();
        let metrics = Arc::new(RecordingMetrics::new());

        MuteGaugeUpdater::new(mutes, metrics.clone()).update_once().await;
        assert_eq!(metrics.active_mutes(), Some(2));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_value() {
        let mutes = Arc::new(InMemoryMuteStore::new());
        let metrics = Arc::new(RecordingMetrics::new());
        let updater = MuteGaugeUpdater::new(mutes.clone(), metrics.clone());

        updater.update_once().await;
        assert_eq!(metrics.active_mutes(), Some(0));

        mutes.fail_reads(true);
        mutes.mute_user(1, 1, "", Duration::from_secs(60)).await.unwrap();
        updater.update_once().await;
        assert_eq!(metrics.active_mutes(), Some(0));
    }
}
