use crate::core::moderation::LinkTokenStore;
use crate::core::pipeline::filters::RateLimitFilter;
use std::sync::Arc;
use std::time::Duration;

pub const JANITOR_INTERVAL: Duration = Duration::from_secs(60);

/// Drops idle rate-limit windows and expired link tokens.
pub struct Janitor {
    rate_limiter: Arc<RateLimitFilter>,
    link_tokens: Arc<dyn LinkTokenStore>,
}

impl Janitor {
    pub fn new(rate_limiter: Arc<RateLimitFilter>, link_tokens: Arc<dyn LinkTokenStore>) -> Self {
        Self {
            rate_limiter,
            link_tokens,
        }
    }

    /// One cleanup pass. Returns (purged windows, deleted tokens).
    pub async fn purge_once(&self) -> (usize, u64) {
        let windows = self.rate_limiter.purge_idle().await;

        let tokens = match self.link_tokens.delete_expired().await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to delete expired link tokens");
                0
            }
        };

        if windows > 0 || tokens > 0 {
            tracing::debug!(windows, tokens, "Janitor pass finished");
        }
        (windows, tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::Payload;
    use crate::core::pipeline::Filter;
    use crate::core::test_support::InMemoryLinkTokenStore;

    #[tokio::test]
    async fn test_purges_idle_windows_and_expired_tokens() {
        let limiter = Arc::new(RateLimitFilter::new(5, Duration::from_millis(20)));
        let tokens = Arc::new(InMemoryLinkTokenStore::new());
        let janitor = Janitor::new(limiter.clone(), tokens.clone());

        limiter.process(&Payload::new(1, 2, "hi")).await.unwrap();
        tokens.create(2, Duration::ZERO).await.unwrap();
        tokens.create(3, Duration::from_secs(3600)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(janitor.purge_once().await, (1, 1));
        assert_eq!(limiter.tracked_senders().await, 0);
        assert_eq!(tokens.len(), 1);

        // Nothing left to do
        assert_eq!(janitor.purge_once().await, (0, 0));
    }
}
