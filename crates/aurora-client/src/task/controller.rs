//! The client-side task orchestrator.
//!
//! Owns the task state machine, the operational log, and the history cache;
//! wires the submitter, the status poller, and the history store together
//! and exposes the current state to presentation.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ClientError;
use crate::history::{HistoryItem, HistoryStore};
use crate::transport::ConvertApi;

use super::log::{LogAccumulator, LogEntry};
use super::poller::{self, PollHandle};
use super::submit;
use super::types::{Engine, Job, ResultRef, TaskPhase, TaskSnapshot, TaskState};

/// Everything the controller guards behind its lock.
struct Inner {
    state: TaskState,
    log: LogAccumulator,
    history: HistoryStore,
    /// Incremented on reset and clear.  Snapshot applications carrying an
    /// older epoch are discarded: a cancelled poll must never mutate state.
    epoch: u64,
    poll: Option<PollHandle>,
    last_error: Option<ClientError>,
}

/// Outcome of folding one poll observation into controller state.
enum Applied {
    /// Still queued or processing; keep listening.
    Progress,
    /// Terminal success; history should be refreshed once.
    Completed,
    /// Terminal failure, or the observation arrived after the job was
    /// superseded; stop listening either way.
    Done,
}

/// Client-side orchestrator for one conversion at a time.
///
/// All methods take `&self`; state lives behind an async `RwLock` so the
/// controller stays responsive (a `reset` is accepted while a submit or
/// poll is outstanding).  At most one job is actively polled per instance.
pub struct TaskController<A: ConvertApi + ?Sized> {
    api: Arc<A>,
    poll_interval: Duration,
    inner: Arc<RwLock<Inner>>,
}

impl<A: ConvertApi + ?Sized> TaskController<A> {
    pub fn new(api: Arc<A>, config: &Config) -> Self {
        Self {
            api,
            poll_interval: config.poll_interval,
            inner: Arc::new(RwLock::new(Inner {
                state: TaskState::Idle,
                log: LogAccumulator::new(),
                history: HistoryStore::new(),
                epoch: 0,
                poll: None,
                last_error: None,
            })),
        }
    }

    // ── State observation ────────────────────────────────────────────────────

    /// Snapshot of the current task state.
    pub async fn state(&self) -> TaskState {
        self.inner.read().await.state.clone()
    }

    /// The conversion trace for the current job.
    pub async fn log(&self) -> Vec<LogEntry> {
        self.inner.read().await.log.entries().to_vec()
    }

    /// Cached history items.
    pub async fn history(&self) -> Vec<HistoryItem> {
        self.inner.read().await.history.items().to_vec()
    }

    /// The most recent failure exposed for presentation, if any.
    pub async fn last_error(&self) -> Option<ClientError> {
        self.inner.read().await.last_error.clone()
    }

    // ── Transitions ──────────────────────────────────────────────────────────

    /// Submit a document for conversion and begin polling its status.
    ///
    /// Only valid from `Idle`; a tracked job must be `reset` first.  If a
    /// reset lands while the upload is in flight, the job is returned but
    /// not tracked.
    pub async fn submit(
        &self,
        file_name: &str,
        payload: Bytes,
        engine: Engine,
    ) -> Result<Job, ClientError> {
        let epoch = {
            let mut inner = self.inner.write().await;
            if !matches!(inner.state, TaskState::Idle) {
                return Err(ClientError::AlreadyTracking);
            }
            inner.state = TaskState::Submitting {
                input_name: file_name.to_owned(),
                engine,
            };
            inner.last_error = None;
            inner.epoch
        };

        match submit::submit(self.api.as_ref(), file_name, payload, engine).await {
            Ok(job) => {
                let mut inner = self.inner.write().await;
                if inner.epoch != epoch {
                    info!(task_id = %job.task_id, "reset during submission; job left untracked");
                    return Ok(job);
                }
                inner.log.reset();
                inner
                    .log
                    .record(&format!("Upload accepted; tracking task {}", job.task_id));
                inner.state = TaskState::Tracking {
                    job: job.clone(),
                    snapshot: TaskSnapshot::new(TaskPhase::Queued, 0, "", None),
                };
                inner.poll = Some(self.start_polling(job.task_id.clone(), epoch));
                Ok(job)
            }
            Err(e) => {
                let mut inner = self.inner.write().await;
                if inner.epoch == epoch {
                    inner.state = TaskState::Idle;
                    inner.last_error = Some(e.clone());
                }
                Err(e)
            }
        }
    }

    /// Replay a previously completed conversion.
    ///
    /// Forces progress to 100 with an informational message; this path never
    /// touches the poller.  Rejected while a submission or job is active.
    pub async fn select_history(&self, item: &HistoryItem) -> Result<ResultRef, ClientError> {
        let result = item.result_ref(self.api.as_ref());
        let mut inner = self.inner.write().await;
        if inner.state.is_active() {
            return Err(ClientError::AlreadyTracking);
        }
        info!(id = %item.id, file = %item.filename, "loaded conversion from history");
        inner.state = TaskState::Replaying {
            item: item.clone(),
            result: result.clone(),
        };
        inner.last_error = None;
        Ok(result)
    }

    /// Abandon any tracked job and return to `Idle`, clearing the job,
    /// snapshot, log, and any result reference.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        Self::reset_locked(&mut inner);
    }

    /// Delete every server-side artifact for this caller, then discard all
    /// local state (active job, polling, history cache, displayed result).
    ///
    /// Destructive and irreversible; callers must obtain explicit
    /// confirmation first.  On service rejection nothing is discarded,
    /// locally or remotely.
    pub async fn clear_session(&self) -> Result<(), ClientError> {
        self.api.clear_session().await.map_err(|e| match e {
            ClientError::Request { server_message, .. } => ClientError::Clear {
                message: server_message,
            },
            other => ClientError::Clear {
                message: other.to_string(),
            },
        })?;

        let mut inner = self.inner.write().await;
        inner.history.purge();
        Self::reset_locked(&mut inner);
        info!("session cleared");
        Ok(())
    }

    /// Re-fetch the caller's history.  A failure keeps the cached items and
    /// is reported as a non-fatal warning.
    pub async fn refresh_history(&self) -> Result<Vec<HistoryItem>, ClientError> {
        // Fetch outside the lock so observers stay responsive.
        let fetched = self.api.history().await;
        let mut inner = self.inner.write().await;
        match fetched {
            Ok(items) => {
                inner.history.replace(items);
                Ok(inner.history.items().to_vec())
            }
            Err(e) => {
                warn!(error = %e, "history refresh failed; keeping cached items");
                Err(e)
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn reset_locked(inner: &mut Inner) {
        if let Some(poll) = inner.poll.take() {
            poll.cancel();
        }
        inner.epoch += 1;
        inner.state = TaskState::Idle;
        inner.log.reset();
        inner.last_error = None;
    }

    /// Spawn the poll loop plus the task that folds its snapshots into
    /// controller state.
    fn start_polling(&self, task_id: String, epoch: u64) -> PollHandle {
        let (snapshot_tx, mut snapshot_rx) = mpsc::channel::<TaskSnapshot>(8);
        let handle = poller::start(
            Arc::clone(&self.api),
            task_id,
            self.poll_interval,
            snapshot_tx,
        );

        let api = Arc::clone(&self.api);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            while let Some(snapshot) = snapshot_rx.recv().await {
                let applied = {
                    let mut guard = inner.write().await;
                    if guard.epoch != epoch {
                        // A reset or clear superseded this subscription.
                        return;
                    }
                    Self::apply_locked(&mut guard, api.as_ref(), snapshot)
                };

                match applied {
                    Applied::Progress => {}
                    Applied::Done => return,
                    Applied::Completed => {
                        // Refresh history exactly once per completion, outside
                        // the lock; a failure here is non-fatal.
                        match api.history().await {
                            Ok(items) => {
                                let mut guard = inner.write().await;
                                if guard.epoch == epoch {
                                    guard.history.replace(items);
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "history refresh after completion failed");
                            }
                        }
                        return;
                    }
                }
            }
        });

        handle
    }

    /// Fold one poll observation into state.  Caller holds the write lock
    /// and has already verified the epoch.
    fn apply_locked(inner: &mut Inner, api: &A, snapshot: TaskSnapshot) -> Applied {
        let TaskState::Tracking { job, snapshot: prev } = &inner.state else {
            // Terminal state already applied or the job went away; late
            // observations are discarded.
            return Applied::Done;
        };
        let job = job.clone();
        let snapshot = snapshot.clamped_over(prev);

        if let Some(entry) = inner.log.record(snapshot.message()) {
            debug!(task_id = %job.task_id, line = %entry.text, "status message");
        }

        match snapshot.status() {
            TaskPhase::Queued | TaskPhase::Processing => {
                inner.state = TaskState::Tracking { job, snapshot };
                Applied::Progress
            }
            TaskPhase::Completed => {
                if let Some(poll) = inner.poll.take() {
                    poll.cancel();
                }
                let message = snapshot.message().to_owned();
                let result = snapshot
                    .result()
                    .cloned()
                    .unwrap_or_else(|| ResultRef::new(api.download_url(&job.task_id)));
                info!(task_id = %job.task_id, result = %result, "conversion completed");
                inner.state = TaskState::Completed {
                    job,
                    result,
                    message,
                };
                Applied::Completed
            }
            TaskPhase::Failed => {
                if let Some(poll) = inner.poll.take() {
                    poll.cancel();
                }
                let message = snapshot.message().to_owned();
                warn!(task_id = %job.task_id, error = %message, "conversion failed");
                inner.last_error = Some(ClientError::Task {
                    message: message.clone(),
                });
                inner.state = TaskState::Failed { job, message };
                Applied::Done
            }
        }
    }
}
