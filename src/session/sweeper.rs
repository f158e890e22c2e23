//! Background eviction of idle session records.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::SessionStore;

/// Default interval between sweeps. Materially shorter than the idle TTL so
/// peak memory stays bounded.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic task reclaiming records the access path never revisits (a user
/// who disappears mid-conversation).
///
/// Purely advisory: `resolve` and `is_live` re-check liveness themselves,
/// so the sweeper only bounds worst-case memory.
pub struct CleanupSweeper {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl CleanupSweeper {
    /// Spawn the sweep loop on the current runtime.
    pub fn spawn(store: Arc<SessionStore>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // skip immediate tick
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = store.evict_expired();
                        if removed > 0 {
                            info!(
                                removed,
                                remaining = store.stats().count,
                                "Idle session sweep complete"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("Sweeper shutting down");
                        break;
                    }
                }
            }
        });

        Self {
            handle,
            shutdown_tx,
        }
    }

    /// Signal the loop to stop and wait for it to finish.
    pub async fn shutdown(self) {
        if self.shutdown_tx.send(true).is_err() {
            warn!("Sweeper already stopped");
            return;
        }
        if let Err(e) = self.handle.await {
            warn!(error = ?e, "Sweeper task panicked during shutdown");
        }
    }
}
