use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{AdmissionController, Clock};

/// Periodic sweep that evicts idle client buckets.
pub struct ReclaimTask;

impl ReclaimTask {
    /// Spawn the sweep on the current runtime. Returns `None` when the
    /// controller's settings disable reclamation; its buckets then live for
    /// the lifetime of the process.
    pub fn spawn<C: Clock>(
        controller: Arc<AdmissionController<C>>,
        shutdown_token: CancellationToken,
    ) -> Option<ReclaimHandle> {
        let settings = controller.settings();
        if !settings.reclamation_enabled() {
            info!(
                target: "catalog::admission",
                "Bucket reclamation disabled; client buckets persist for process lifetime"
            );
            return None;
        }

        let period = settings.reclaim_interval;
        let ttl = settings.ttl;
        let token = shutdown_token.clone();

        let join = tokio::spawn(async move {
            info!(
                target: "catalog::admission",
                interval = ?period,
                ttl = ?ttl,
                "Bucket reclamation worker started"
            );

            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        controller.reclaim();
                    }
                    _ = token.cancelled() => {
                        info!(target: "catalog::admission", "Bucket reclamation worker shutting down");
                        break;
                    }
                }
            }
        });

        Some(ReclaimHandle {
            shutdown_token,
            join,
        })
    }
}

/// Owner handle for a running sweep.
pub struct ReclaimHandle {
    shutdown_token: CancellationToken,
    join: JoinHandle<()>,
}

impl ReclaimHandle {
    /// Stop the sweep and wait for it to exit.
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();
        if let Err(e) = self.join.await {
            warn!(target: "catalog::admission", error = %e, "Bucket reclamation worker ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
