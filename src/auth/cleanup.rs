//! Periodic removal of expired bearer tokens.
//!
//! Lazy expiry in [`TokenManager::validate`] only catches tokens that are
//! presented again; this task deletes the rest. The first sweep runs one
//! interval after start.

use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use super::tokens::TokenManager;

pub struct CleanupScheduler;

impl CleanupScheduler {
    /// Spawn the sweep loop on the current runtime.
    #[must_use]
    pub fn start(tokens: TokenManager, period: Duration) -> CleanupHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_secs = period.as_secs(), "token cleanup scheduled");

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        match tokens.sweep_expired().await {
                            Ok(removed) => debug!(removed, "expired tokens removed"),
                            // retried on the next tick
                            Err(err) => error!("token cleanup failed: {err}"),
                        }
                    }
                }
            }
            debug!("token cleanup stopped");
        });

        CleanupHandle {
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }
}

/// Owner of the running sweep task. Dropping it aborts the task.
pub struct CleanupHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CleanupHandle {
    /// Ask the loop to exit and wait for it. A sweep in progress finishes first.
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                error!("token cleanup task ended abnormally: {err}");
            }
        }
    }
}

impl Drop for CleanupHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
