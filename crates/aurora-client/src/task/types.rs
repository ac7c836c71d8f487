use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::history::HistoryItem;

/// Processing mode offered by the conversion service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Engine {
    /// Default neural voice.
    Edge,
    /// Premium voice pipeline.
    Google,
}

/// Lifecycle state of a job as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPhase {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl TaskPhase {
    /// Returns `true` if no further transitions follow without a new
    /// submission.
    ///
    /// Pollers should use this rather than matching individual variants so
    /// that every terminal phase stops the schedule.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskPhase::Completed | TaskPhase::Failed)
    }
}

/// One submitted conversion.  Immutable once created; the anchor every
/// snapshot refers back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Opaque identifier assigned by the service.
    pub task_id: String,
    /// Display name of the submitted document.
    pub input_name: String,
    /// Processing mode selected at submission.
    pub engine: Engine,
}

/// Opaque reference resolvable to a playable resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRef(String);

impl ResultRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_url(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Wire shapes ──────────────────────────────────────────────────────────────

/// Response body of a successful upload.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub task_id: String,
}

/// Raw status observation, superseded wholesale by every poll.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: TaskPhase,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub message: String,
}

// ── Snapshot ─────────────────────────────────────────────────────────────────

/// The latest observed state of a [`Job`].
///
/// Constructed only through [`TaskSnapshot::new`], which attaches a result
/// reference exclusively to completed observations, so "completed without a
/// result" and "result while still running" are unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    status: TaskPhase,
    progress: u8,
    message: String,
    result: Option<ResultRef>,
}

impl TaskSnapshot {
    pub fn new(
        status: TaskPhase,
        progress: u8,
        message: impl Into<String>,
        result: Option<ResultRef>,
    ) -> Self {
        let result = match status {
            TaskPhase::Completed => result,
            _ => None,
        };
        Self {
            status,
            progress: progress.min(100),
            message: message.into(),
            result,
        }
    }

    pub fn status(&self) -> TaskPhase {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn result(&self) -> Option<&ResultRef> {
        self.result.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Supersede `prev` wholesale, except that progress never decreases
    /// while the job has not failed.  Once failed, progress is stale and
    /// left as reported.
    pub fn clamped_over(mut self, prev: &TaskSnapshot) -> Self {
        if self.status != TaskPhase::Failed {
            self.progress = self.progress.max(prev.progress);
        }
        self
    }
}

// ── Controller state ─────────────────────────────────────────────────────────

/// Message exposed when a prior conversion is loaded from history.
pub const REPLAY_MESSAGE: &str = "Loaded from history";

/// The controller's state machine, one tagged value instead of loose fields.
#[derive(Debug, Clone, Default)]
pub enum TaskState {
    /// Nothing tracked; ready for a submission.
    #[default]
    Idle,
    /// Upload in flight; no job handle yet.
    Submitting { input_name: String, engine: Engine },
    /// A job exists and is being polled.
    Tracking { job: Job, snapshot: TaskSnapshot },
    /// The job finished and its result is playable.
    Completed {
        job: Job,
        result: ResultRef,
        message: String,
    },
    /// The service reported a terminal failure.
    Failed { job: Job, message: String },
    /// A prior completed job was loaded from history; polling never ran.
    Replaying {
        item: HistoryItem,
        result: ResultRef,
    },
}

impl TaskState {
    /// A submission or tracked job is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskState::Submitting { .. } | TaskState::Tracking { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed { .. } | TaskState::Failed { .. })
    }

    /// Percentage shown to the caller.  Meaningless once failed.
    pub fn progress(&self) -> u8 {
        match self {
            TaskState::Idle | TaskState::Submitting { .. } | TaskState::Failed { .. } => 0,
            TaskState::Tracking { snapshot, .. } => snapshot.progress(),
            TaskState::Completed { .. } | TaskState::Replaying { .. } => 100,
        }
    }

    /// Latest human-readable status text.
    pub fn message(&self) -> &str {
        match self {
            TaskState::Idle | TaskState::Submitting { .. } => "",
            TaskState::Tracking { snapshot, .. } => snapshot.message(),
            TaskState::Completed { message, .. } | TaskState::Failed { message, .. } => message,
            TaskState::Replaying { .. } => REPLAY_MESSAGE,
        }
    }

    /// Playable reference, present only for completed or replayed jobs.
    pub fn result(&self) -> Option<&ResultRef> {
        match self {
            TaskState::Completed { result, .. } | TaskState::Replaying { result, .. } => {
                Some(result)
            }
            _ => None,
        }
    }

    /// The tracked job, if one exists.
    pub fn job(&self) -> Option<&Job> {
        match self {
            TaskState::Tracking { job, .. }
            | TaskState::Completed { job, .. }
            | TaskState::Failed { job, .. } => Some(job),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_wire_roundtrip() {
        assert_eq!(Engine::Edge.to_string(), "edge");
        assert_eq!(Engine::Google.to_string(), "google");
        assert_eq!("edge".parse::<Engine>().unwrap(), Engine::Edge);
        assert_eq!("google".parse::<Engine>().unwrap(), Engine::Google);
        assert!("premium".parse::<Engine>().is_err());
    }

    #[test]
    fn phase_terminality() {
        assert!(!TaskPhase::Queued.is_terminal());
        assert!(!TaskPhase::Processing.is_terminal());
        assert!(TaskPhase::Completed.is_terminal());
        assert!(TaskPhase::Failed.is_terminal());
    }

    #[test]
    fn status_response_deserializes_service_shape() {
        let resp: StatusResponse =
            serde_json::from_str(r#"{"status":"processing","progress":45,"message":"Extracting text"}"#)
                .unwrap();
        assert_eq!(resp.status, TaskPhase::Processing);
        assert_eq!(resp.progress, 45);
        assert_eq!(resp.message, "Extracting text");

        // Missing optional fields default rather than fail.
        let bare: StatusResponse = serde_json::from_str(r#"{"status":"queued"}"#).unwrap();
        assert_eq!(bare.status, TaskPhase::Queued);
        assert_eq!(bare.progress, 0);
        assert!(bare.message.is_empty());
    }

    #[test]
    fn snapshot_drops_result_unless_completed() {
        let running = TaskSnapshot::new(
            TaskPhase::Processing,
            50,
            "working",
            Some(ResultRef::new("http://x/download/1")),
        );
        assert!(running.result().is_none());

        let done = TaskSnapshot::new(
            TaskPhase::Completed,
            100,
            "Done",
            Some(ResultRef::new("http://x/download/1")),
        );
        assert_eq!(done.result().unwrap().as_url(), "http://x/download/1");
    }

    #[test]
    fn snapshot_progress_never_regresses_unless_failed() {
        let prev = TaskSnapshot::new(TaskPhase::Processing, 60, "a", None);
        let regressed = TaskSnapshot::new(TaskPhase::Processing, 40, "b", None).clamped_over(&prev);
        assert_eq!(regressed.progress(), 60);

        let advanced = TaskSnapshot::new(TaskPhase::Processing, 80, "c", None).clamped_over(&prev);
        assert_eq!(advanced.progress(), 80);

        // A failed observation keeps whatever it reported; the value is stale
        // and ignored by presentation anyway.
        let failed = TaskSnapshot::new(TaskPhase::Failed, 10, "boom", None).clamped_over(&prev);
        assert_eq!(failed.progress(), 10);
    }

    #[test]
    fn state_exposes_result_only_when_playable() {
        assert!(TaskState::Idle.result().is_none());
        let job = Job {
            task_id: "t1".into(),
            input_name: "a.pdf".into(),
            engine: Engine::Edge,
        };
        let state = TaskState::Completed {
            job,
            result: ResultRef::new("http://x/download/t1"),
            message: "Done".into(),
        };
        assert_eq!(state.progress(), 100);
        assert!(state.result().is_some());
        assert!(state.is_terminal());
    }
}
