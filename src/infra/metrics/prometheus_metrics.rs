// Prometheus-backed implementation of the core metrics port.

use crate::core::metrics::ModerationMetrics;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ActionLabels {
    action: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ReasonLabels {
    reason: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct UpdateLabels {
    update_type: String,
    status: String,
}

fn processing_histogram() -> Histogram {
    // 5ms .. ~10s
    Histogram::new(exponential_buckets(0.005, 2.0, 12))
}

pub struct PrometheusMetrics {
    registry: Registry,
    bot_actions: Family<ActionLabels, Counter>,
    deleted_messages: Family<ReasonLabels, Counter>,
    active_mutes: Gauge,
    update_processing: Family<UpdateLabels, Histogram, fn() -> Histogram>,
}

impl PrometheusMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("moderation");

        let bot_actions = Family::<ActionLabels, Counter>::default();
        registry.register(
            "bot_actions",
            "Actions taken by the bot",
            bot_actions.clone(),
        );

        let deleted_messages = Family::<ReasonLabels, Counter>::default();
        registry.register(
            "deleted_messages",
            "Messages deleted, by reason",
            deleted_messages.clone(),
        );

        let active_mutes = Gauge::default();
        registry.register(
            "active_mutes",
            "Currently unexpired mutes across all chats",
            active_mutes.clone(),
        );

        let update_processing =
            Family::<UpdateLabels, Histogram, fn() -> Histogram>::new_with_constructor(
                processing_histogram,
            );
        registry.register(
            "update_processing_duration_seconds",
            "Time spent processing one inbound update",
            update_processing.clone(),
        );

        Self {
            registry,
            bot_actions,
            deleted_messages,
            active_mutes,
            update_processing,
        }
    }

    /// Text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for PrometheusMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ModerationMetrics for PrometheusMetrics {
    fn inc_bot_action(&self, action: &str) {
        self.bot_actions
            .get_or_create(&ActionLabels {
                action: action.to_string(),
            })
            .inc();
    }

    fn inc_deleted_messages(&self, reason: &str) {
        self.deleted_messages
            .get_or_create(&ReasonLabels {
                reason: reason.to_string(),
            })
            .inc();
    }

    fn set_active_mutes(&self, count: u64) {
        self.active_mutes
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    fn observe_update_processing(&self, update_type: &str, seconds: f64, success: bool) {
        let status = if success { "success" } else { "error" };
        self.update_processing
            .get_or_create(&UpdateLabels {
                update_type: update_type.to_string(),
                status: status.to_string(),
            })
            .observe(seconds);
    }
}
