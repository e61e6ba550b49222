// Observability sink - the write-only metrics port.
//
// Components receive an `Arc<dyn ModerationMetrics>` at construction; the
// entry point decides which implementation backs it. Nothing in the core ever
// reads a metric back.

/// Counters, gauge and histogram the moderation core publishes.
pub trait ModerationMetrics: Send + Sync {
    /// A bot action was taken (`mute`, `warning`, `delete`, ...).
    fn inc_bot_action(&self, action: &str);

    /// A message was removed from the platform. `reason` is usually the filter name.
    fn inc_deleted_messages(&self, reason: &str);

    /// Publish the number of currently unexpired mutes.
    fn set_active_mutes(&self, count: u64);

    /// Record how long processing one inbound update took.
    fn observe_update_processing(&self, update_type: &str, seconds: f64, success: bool);
}

/// Sink that drops everything. Handy for tests and tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl ModerationMetrics for NoopMetrics {
    fn inc_bot_action(&self, _action: &str) {}

    fn inc_deleted_messages(&self, _reason: &str) {}

    fn set_active_mutes(&self, _count: u64) {}

    fn observe_update_processing(&self, _update_type: &str, _seconds: f64, _success: bool) {}
}
