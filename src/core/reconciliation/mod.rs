// Background reconciliation - the periodic loops that run beside message handling.

pub mod janitor;
pub mod mute_gauge;
pub mod reconciler;
pub mod temporary_message_sweeper;

pub use janitor::{Janitor, JANITOR_INTERVAL};
pub use mute_gauge::{MuteGaugeUpdater, MUTE_GAUGE_INTERVAL};
pub use reconciler::Reconciler;
pub use temporary_message_sweeper::{TemporaryMessageSweeper, SWEEP_BATCH_SIZE, SWEEP_INTERVAL};

use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Run `tick` every `period` until `shutdown` fires.
///
/// With `immediate` the first run happens right away, otherwise after one
/// period. A tick in progress is finished, but no new one starts once the
/// token is cancelled.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    immediate: bool,
    shutdown: CancellationToken,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let start = if immediate {
        tokio::time::Instant::now()
    } else {
        tokio::time::Instant::now() + period
    };
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(task = name, ?period, "Background loop started");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => tick().await,
        }
    }
    tracing::debug!(task = name, "Background loop stopped");
}
