// Pipeline manager - runs filters in a fixed order and stops at the first denial.
//
// The manager knows nothing about what a filter checks. It only relies on the
// `Filter` contract: a name and an async decision over a payload.

use super::pipeline_models::{FilterResult, Payload};
use crate::core::errors::StoreError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("filter {filter} failed: {source}")]
    Filter {
        filter: &'static str,
        #[source]
        source: FilterError,
    },
}

// ============================================================================
// FILTER TRAIT
// ============================================================================

/// A single moderation rule.
#[async_trait]
pub trait Filter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Decide whether `payload` may stay in the chat.
    async fn process(&self, payload: &Payload) -> Result<FilterResult, FilterError>;
}

// ============================================================================
// MANAGER
// ============================================================================

pub struct PipelineManager {
    filters: Vec<Arc<dyn Filter>>,
}

impl PipelineManager {
    pub fn new(filters: Vec<Arc<dyn Filter>>) -> Self {
        Self { filters }
    }

    /// Names of the filters in evaluation order.
    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run every filter in order.
    ///
    /// The first denial is returned verbatim and the remaining filters are not
    /// invoked. A filter error aborts the run. If everything allows, the result
    /// is a bare `FilterResult::allow()`.
    pub async fn process(&self, payload: &Payload) -> Result<FilterResult, PipelineError> {
        for filter in &self.filters {
            let result = filter
                .process(payload)
                .await
                .map_err(|source| PipelineError::Filter {
                    filter: filter.name(),
                    source,
                })?;

            if !result.is_allowed {
                tracing::debug!(
                    chat_id = payload.chat_id,
                    user_id = payload.sender_id,
                    filter = filter.name(),
                    "Message denied"
                );
                return Ok(result);
            }
        }

        Ok(FilterResult::allow())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Allow,
        Deny(&'static str),
        Fail,
    }

    struct MockFilter {
        name: &'static str,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl MockFilter {
        fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                name,
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Filter for MockFilter {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn process(&self, _payload: &Payload) -> Result<FilterResult, FilterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Allow => Ok(FilterResult::allow()),
                Behavior::Deny(reason) => Ok(FilterResult::deny(self.name, reason)),
                Behavior::Fail => Err(FilterError::Other("deadline exceeded".to_string())),
            }
        }
    }

    fn payload() -> Payload {
        Payload::new(123, 1, "hello")
    }

    #[tokio::test]
    async fn test_no_filters_allows() {
        let manager = PipelineManager::new(Vec::new());
        let result = manager.process(&payload()).await.unwrap();
        assert_eq!(result, FilterResult::allow());
    }

    #[tokio::test]
    async fn test_all_pass() {
        let manager = PipelineManager::new(vec![
            MockFilter::new("f1", Behavior::Allow),
            MockFilter::new("f2", Behavior::Allow),
        ]);
        let result = manager.process(&payload()).await.unwrap();
        assert!(result.is_allowed);
        assert!(result.filter_name.is_empty());
    }

    #[tokio::test]
    async fn test_second_filter_denies() {
        let manager = PipelineManager::new(vec![
            MockFilter::new("a", Behavior::Allow),
            MockFilter::new("b", Behavior::Deny("x")),
        ]);
        let result = manager.process(&payload()).await.unwrap();
        assert_eq!(result, FilterResult::deny("b", "x"));
    }

    #[tokio::test]
    async fn test_first_denial_short_circuits() {
        let first = MockFilter::new("a", Behavior::Deny("x"));
        let second = MockFilter::new("b", Behavior::Allow);
        let manager = PipelineManager::new(vec![first.clone(), second.clone()]);

        let result = manager.process(&payload()).await.unwrap();

        assert_eq!(result, FilterResult::deny("a", "x"));
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_filter_error_aborts() {
        let after = MockFilter::new("after", Behavior::Allow);
        let manager = PipelineManager::new(vec![
            MockFilter::new("broken", Behavior::Fail),
            after.clone(),
        ]);

        let err = manager.process(&payload()).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Filter {
                filter: "broken",
                ..
            }
        ));
        assert_eq!(after.calls(), 0);
    }
}
