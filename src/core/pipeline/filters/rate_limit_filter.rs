// Sliding-window rate limiter.
//
// In-memory only: the window state is lost on restart, which is fine since it
// only has to suppress bursts. Prune, append and the limit check happen under
// one lock so concurrent messages from the same sender are counted exactly.

use crate::core::pipeline::pipeline_manager::{Filter, FilterError};
use crate::core::pipeline::pipeline_models::{reasons, FilterResult, Payload};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Mute applied to a sender who exceeds the limit.
pub const RATE_LIMIT_MUTE_DURATION: Duration = Duration::from_secs(60 * 60);

pub struct RateLimitFilter {
    /// (chat_id, sender_id) -> timestamps of recent messages, oldest first
    windows: Mutex<HashMap<(i64, i64), Vec<Instant>>>,
    limit: usize,
    window: Duration,
}

impl RateLimitFilter {
    /// Allow at most `limit` messages per `window` from each sender in each chat.
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            limit,
            window,
        }
    }

    /// Drop senders whose newest message is already outside the window.
    /// Returns how many keys were removed.
    pub async fn purge_idle(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, stamps| {
            stamps
                .last()
                .is_some_and(|newest| now.duration_since(*newest) <= self.window)
        });
        before - windows.len()
    }

    /// Number of senders currently tracked.
    pub async fn tracked_senders(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[async_trait]
impl Filter for RateLimitFilter {
    fn name(&self) -> &'static str {
        "rate_limit_filter"
    }

    async fn process(&self, payload: &Payload) -> Result<FilterResult, FilterError> {
        let now = Instant::now();

        let count = {
            let mut windows = self.windows.lock().await;
            let stamps = windows.entry(payload.sender_key()).or_default();
            stamps.retain(|t| now.duration_since(*t) <= self.window);
            stamps.push(now);
            stamps.len()
        };

        if count > self.limit {
            tracing::debug!(
                chat_id = payload.chat_id,
                user_id = payload.sender_id,
                count,
                "Rate limit exceeded"
            );
            return Ok(FilterResult::deny(self.name(), reasons::RATE_LIMIT)
                .with_delete()
                .with_mute(RATE_LIMIT_MUTE_DURATION));
        }

        Ok(FilterResult::allow())
    }
}
