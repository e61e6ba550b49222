// Owns the three background loops: temporary-message sweeper, active-mute
// gauge and the janitor (idle rate-limit windows, expired link tokens). They are started at most once per process
// and all stop on the shared cancellation token.

use super::janitor::{Janitor, JANITOR_INTERVAL};
use super::mute_gauge::{MuteGaugeUpdater, MUTE_GAUGE_INTERVAL};
use super::run_periodic;
use super::temporary_message_sweeper::{TemporaryMessageSweeper, SWEEP_INTERVAL};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Reconciler {
    sweeper: Arc<TemporaryMessageSweeper>,
    mute_gauge: Arc<MuteGaugeUpdater>,
    janitor: Arc<Janitor>,
    started: AtomicBool,
}

impl Reconciler {
    pub fn new(
        sweeper: TemporaryMessageSweeper,
        mute_gauge: MuteGaugeUpdater,
        janitor: Janitor,
    ) -> Self {
        Self {
            sweeper: Arc::new(sweeper),
            mute_gauge: Arc::new(mute_gauge),
            janitor: Arc::new(janitor),
            started: AtomicBool::new(false),
        }
    }

    /// Spawn the loops. A second call logs and returns no handles.
    pub fn start(&self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!("Background reconciliation already started");
            return Vec::new();
        }

        let sweeper = Arc::clone(&self.sweeper);
        let sweep = tokio::spawn(run_periodic(
            "temporary_message_sweeper",
            SWEEP_INTERVAL,
            false,
            shutdown.clone(),
            move || {
                let sweeper = Arc::clone(&sweeper);
                async move {
                    let removed = sweeper.sweep_once().await;
                    if removed > 0 {
                        tracing::debug!(removed, "Swept temporary messages");
                    }
                }
            },
        ));

        let gauge = Arc::clone(&self.mute_gauge);
        let mutes = tokio::spawn(run_periodic(
            "mute_gauge",
            MUTE_GAUGE_INTERVAL,
            true,
            shutdown.clone(),
            move || {
                let gauge = Arc::clone(&gauge);
                async move { gauge.update_once().await }
            },
        ));

        let cleaner = Arc::clone(&self.janitor);
        let janitor = tokio::spawn(run_periodic(
            "janitor",
            JANITOR_INTERVAL,
            false,
            shutdown,
            move || {
                let cleaner = Arc::clone(&cleaner);
                async move {
                    cleaner.purge_once().await;
                }
            },
        ));

        tracing::info!("Background reconciliation started");
        vec![sweep, mutes, janitor]
    }
}
