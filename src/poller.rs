//! Periodic refresh.
//!
//! A [`Poller`] fires its callback once on start, then every `period`, and
//! whenever [`Poller::trigger`] is called (focus regained, manual refresh).
//! Cycles are numbered; overlapping cycles are neither cancelled nor merged.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default refresh period (30 seconds).
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(30);

/// Why a cycle fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReason {
    Interval,
    Triggered,
}

pub struct Poller {
    cancel: CancellationToken,
    trigger: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Start polling on `runtime`. `on_tick` receives the cycle number
    /// (starting at 1) and the reason it fired.
    pub fn spawn<F>(runtime: &Handle, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(u64, TickReason) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let trigger = Arc::new(Notify::new());

        let task_cancel = cancel.clone();
        let task_trigger = trigger.clone();
        let handle = runtime.spawn(async move {
            info!("poller started ({}s period)", period.as_secs());
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut cycle = 0u64;

            loop {
                let reason = tokio::select! {
                    biased;
                    _ = task_cancel.cancelled() => break,
                    _ = task_trigger.notified() => TickReason::Triggered,
                    _ = interval.tick() => TickReason::Interval,
                };
                cycle += 1;
                debug!("poll cycle {} ({:?})", cycle, reason);
                on_tick(cycle, reason);
            }
            info!("poller stopped after {} cycles", cycle);
        });

        Self {
            cancel,
            trigger,
            handle: Some(handle),
        }
    }

    /// Run a cycle now without waiting for the period
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Stop polling. No callback runs after the task observes the cancel.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.handle = None;
    }

    /// Stop and wait for the task to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
