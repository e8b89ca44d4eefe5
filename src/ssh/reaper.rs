//! Periodic eviction of idle and torn-down sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::registry::SessionRegistry;

/// Evict every expired session once. Returns how many were evicted.
pub(crate) async fn sweep(registry: &SessionRegistry, idle_timeout: Duration) -> usize {
    let mut evicted = 0;
    for session_id in registry.expired(idle_timeout) {
        if registry.evict(&session_id).await {
            evicted += 1;
        }
    }

    if evicted > 0 {
        info!(
            "Reaper evicted {} session(s), {} remaining",
            evicted,
            registry.count()
        );
    }
    evicted
}

/// Background task sweeping the registry on a fixed period.
pub struct Reaper {
    cancel_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Reaper {
    /// Start sweeping every `period`. The first sweep runs one period from now.
    pub fn spawn(
        registry: Arc<SessionRegistry>,
        period: Duration,
        idle_timeout: Duration,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        sweep(&registry, idle_timeout).await;
                    }
                }
            }
            debug!("Reaper stopped");
        });

        Self {
            cancel_token,
            task: Mutex::new(Some(task)),
        }
    }

    /// Stop the task and wait for an in-progress sweep to finish.
    pub async fn stop(&self) {
        self.cancel_token.cancel();
        if let Some(task) = self.task.lock().await.take()
            && let Err(e) = task.await
        {
            warn!("Reaper task ended abnormally: {}", e);
        }
    }
}
