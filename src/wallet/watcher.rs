//! Background polling for wallet account and network changes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::lifecycle::shutdown::{join_task, Shutdown};
use crate::wallet::session::{SessionMonitor, SessionProbe};

pub struct WalletWatcher {
    monitor: Arc<SessionMonitor>,
    interval: Duration,
}

/// Running watcher. Stops on [`WatcherHandle::stop`] or when dropped.
pub struct WatcherHandle {
    shutdown: Shutdown,
    task: Option<JoinHandle<()>>,
}

impl WalletWatcher {
    pub fn new(monitor: Arc<SessionMonitor>, interval: Duration) -> Self {
        Self { monitor, interval }
    }

    /// Refresh once immediately, then on every tick where the probed address
    /// or network differs from the last one seen.
    pub fn spawn(self) -> WatcherHandle {
        let shutdown = Shutdown::new();
        let receiver = shutdown.subscribe();
        let task = tokio::spawn(self.run(receiver));
        WatcherHandle {
            shutdown,
            task: Some(task),
        }
    }

    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Wallet watcher starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<SessionProbe> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let probe = self.monitor.probe().await;
                    if last.as_ref() == Some(&probe) {
                        continue;
                    }
                    if last.is_some() {
                        tracing::debug!(
                            address = probe.address.as_deref().unwrap_or("-"),
                            "Wallet account or network changed"
                        );
                    }
                    last = Some(probe);
                    self.monitor.refresh().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Wallet watcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

impl WatcherHandle {
    /// Signal the loop and wait for it to exit.
    pub async fn stop(mut self) {
        self.shutdown.trigger();
        if let Some(task) = self.task.take() {
            join_task("wallet_watcher", task).await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.shutdown.trigger();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
