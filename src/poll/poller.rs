use crate::metrics::{self, PollTimer};
use crate::poll::types::{PollConfig, PollOutcome, PollSnapshot};
use crate::rpc::RpcGateway;
use crate::session::SessionTracker;
use crate::store::DownloadStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodically refreshes the store from the active daemon.
///
/// At most one background task runs per loop. Ticks while logged out do
/// nothing, so disconnecting never needs to stop the task.
#[derive(Clone)]
pub struct PollLoop {
    gateway: RpcGateway,
    tracker: SessionTracker,
    store: DownloadStore,
    config: PollConfig,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PollLoop {
    pub fn new(
        gateway: RpcGateway,
        tracker: SessionTracker,
        store: DownloadStore,
        config: PollConfig,
    ) -> Self {
        Self {
            gateway,
            tracker,
            store,
            config,
            task: Arc::new(Mutex::new(None)),
        }
    }

    /// Interval and page size this loop was built with
    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Spawn the periodic task unless it is already running. The first tick
    /// fires immediately.
    ///
    /// Returns `false` when a task was already running, in which case no
    /// tick is scheduled for now.
    pub fn start(&self) -> bool {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let poller = self.clone();
        let period = self.config.interval;
        *task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                poller.tick().await;
            }
        }));

        tracing::debug!(interval_ms = period.as_millis() as u64, "poll loop started");
        true
    }

    /// Abort the background task if one is running.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            tracing::debug!("poll loop stopped");
        }
    }

    /// Whether the background task is alive
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Fetch one snapshot and apply it if the session it was requested under
    /// is still the live one.
    pub async fn tick(&self) -> PollOutcome {
        let outcome = self.poll_once().await;
        metrics::record_poll(outcome.label());
        outcome
    }

    async fn poll_once(&self) -> PollOutcome {
        let Some(ticket) = self.tracker.ticket() else {
            return PollOutcome::Skipped;
        };

        let timer = PollTimer::start();
        let result = self
            .gateway
            .multicall(&ticket.server, PollSnapshot::batch(self.config.page_size))
            .await
            .and_then(PollSnapshot::from_results);

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(server = %ticket.server, error = %e, "poll failed");
                return PollOutcome::Failed(e);
            }
        };

        let stat = snapshot.stat;
        let downloads = snapshot.downloads.len();
        let applied = self.tracker.apply_if_current(&ticket, || {
            self.store.replace(snapshot.stat, snapshot.downloads);
        });

        if !applied {
            tracing::debug!(server = %ticket.server, epoch = ticket.epoch, "discarding stale poll result");
            return PollOutcome::Discarded;
        }

        timer.stop();
        metrics::record_snapshot(&stat, downloads);
        tracing::debug!(downloads, "poll applied");
        PollOutcome::Applied { downloads }
    }
}
