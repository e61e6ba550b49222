// Fire-and-forget chat stat increments.
//
// Stats are observability only. An increment runs on its own task, is never
// awaited by the caller, and a failure ends in a log line.

use super::moderation_models::StatField;
use super::moderation_store::ViolationStore;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct StatRecorder {
    store: Arc<dyn ViolationStore>,
}

impl StatRecorder {
    pub fn new(store: Arc<dyn ViolationStore>) -> Self {
        Self { store }
    }

    /// Bump `field` for `chat_id` in the background.
    ///
    /// Must be called from within a Tokio runtime. The handle is only useful
    /// to tests; production callers drop it.
    pub fn record(&self, chat_id: i64, field: StatField) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.increment_chat_stat(chat_id, field).await {
                tracing::warn!(chat_id, stat = %field, error = %e, "Failed to increment chat stat");
            }
        })
    }
}
