// Temporary-message sweeper.
//
// Warnings and other bot messages are scheduled for removal. Every tick the
// sweeper deletes a batch of due messages from the platform and then drops
// their rows. A row is dropped even when the platform delete fails; the
// message is most likely already gone and retrying forever helps nobody.

use crate::core::metrics::ModerationMetrics;
use crate::core::moderation::TemporaryMessageStore;
use crate::core::platform::ChatPlatform;
use std::sync::Arc;
use std::time::Duration;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(2);
/// Rows handled per tick.
pub const SWEEP_BATCH_SIZE: u64 = 50;

pub struct TemporaryMessageSweeper {
    store: Arc<dyn TemporaryMessageStore>,
    platform: Arc<dyn ChatPlatform>,
    metrics: Arc<dyn ModerationMetrics>,
}

impl TemporaryMessageSweeper {
    pub fn new(
        store: Arc<dyn TemporaryMessageStore>,
        platform: Arc<dyn ChatPlatform>,
        metrics: Arc<dyn ModerationMetrics>,
    ) -> Self {
        Self {
            store,
            platform,
            metrics,
        }
    }

    /// Process one batch. Returns how many rows were removed.
    pub async fn sweep_once(&self) -> usize {
        let expired = match self.store.expired(SWEEP_BATCH_SIZE).await {
            Ok(expired) => expired,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load expired temporary messages");
                return 0;
            }
        };
        if expired.is_empty() {
            return 0;
        }

        let mut ids = Vec::with_capacity(expired.len());
        for message in &expired {
            match self.platform.delete_message(&message.message_id).await {
                Ok(()) => self.metrics.inc_deleted_messages("temp_expired"),
                Err(e) => tracing::warn!(
                    chat_id = message.chat_id,
                    message_id = %message.message_id,
                    error = %e,
                    "Failed to delete temporary message"
                ),
            }
            ids.push(message.id);
        }

        if let Err(e) = self.store.delete(&ids).await {
            tracing::error!(count = ids.len(), error = %e, "Failed to drop swept temporary messages");
            return 0;
        }
        ids.len()
    }
}
