//! Fixed-cadence status polling with deterministic cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::transport::ConvertApi;

use super::types::{ResultRef, TaskPhase, TaskSnapshot};

/// Cancellable handle to a running poll loop.
///
/// Cancelling (or dropping) the handle guarantees that no further status
/// requests are dispatched and no further snapshots are emitted.
#[derive(Debug)]
pub struct PollHandle {
    cancel_tx: watch::Sender<bool>,
}

impl PollHandle {
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        let _ = self.cancel_tx.send(true);
    }
}

/// Start polling `task_id` once per `interval` until a terminal snapshot is
/// observed, emitting each observation on `snapshot_tx`.
///
/// The first poll fires immediately.  A failed poll is logged and the
/// schedule continues unchanged, so a transient network blip self-heals on
/// the next tick; there is deliberately no failure ceiling.  The loop exits
/// after emitting the first terminal snapshot.
pub fn start<A: ConvertApi + ?Sized>(
    api: Arc<A>,
    task_id: String,
    interval: Duration,
    snapshot_tx: mpsc::Sender<TaskSnapshot>,
) -> PollHandle {
    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancel_rx.changed() => {
                    debug!(task_id = %task_id, "poll loop cancelled");
                    return;
                }
            }
            // Cancellation is honored before every dispatch.
            if *cancel_rx.borrow() {
                return;
            }

            let resp = match api.status(&task_id).await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(task_id = %task_id, error = %e, "status poll failed; retrying on next tick");
                    continue;
                }
            };

            let result = matches!(resp.status, TaskPhase::Completed)
                .then(|| ResultRef::new(api.download_url(&task_id)));
            let snapshot = TaskSnapshot::new(resp.status, resp.progress, resp.message, result);
            let terminal = snapshot.is_terminal();

            // And again before every emission: a cancel issued while the
            // request was in flight must not leak a stale snapshot.
            if *cancel_rx.borrow() {
                return;
            }
            if snapshot_tx.send(snapshot).await.is_err() {
                // Subscriber went away; nothing left to report to.
                return;
            }
            if terminal {
                debug!(task_id = %task_id, "terminal snapshot observed; polling stopped");
                return;
            }
        }
    });

    PollHandle { cancel_tx }
}
