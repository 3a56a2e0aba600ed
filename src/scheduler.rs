//! Periodic task runner with cooperative shutdown.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct Scheduler {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Scheduler {
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    /// Run `task` every `period` until shutdown. Ticks missed while a pass is
    /// still running are coalesced rather than bursted.
    pub fn spawn_periodic<F, Fut>(&mut self, name: &'static str, period: Duration, mut task: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!(task = name, "tick");
                        task().await;
                    }
                    _ = shutdown_rx.changed() => {
                        info!(task = name, "stopped");
                        return;
                    }
                }
            }
        });
        self.handles.push(handle);
    }

    /// Signal all tasks and wait for them to finish their current pass
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
