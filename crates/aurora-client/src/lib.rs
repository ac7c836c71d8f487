//! Client library for the Aurora document-to-speech conversion service.
//!
//! Submits a PDF to the remote converter, polls the resulting job to a
//! terminal state, reconciles progress and status messages into an ordered
//! log, and hands completed conversions off to playback or the session
//! history.  The service itself is an opaque HTTP API; audio playback is a
//! black box driven by the returned URL.
//!
//! # Quick-start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use aurora_client::{Config, Engine, IdentityProvider, TaskController, TaskState, Transport};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), aurora_client::ClientError> {
//! let config = Config::from_env();
//! let transport = Transport::new(&config, IdentityProvider::in_memory())?;
//! let controller = TaskController::new(Arc::new(transport), &config);
//!
//! let document = std::fs::read("report.pdf").expect("readable input");
//! controller
//!     .submit("report.pdf", document.into(), Engine::Edge)
//!     .await?;
//!
//! loop {
//!     match controller.state().await {
//!         TaskState::Completed { result, .. } => {
//!             println!("play {result}");
//!             break;
//!         }
//!         TaskState::Failed { message, .. } => {
//!             eprintln!("conversion failed: {message}");
//!             break;
//!         }
//!         _ => tokio::time::sleep(std::time::Duration::from_millis(200)).await,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod identity;
pub mod task;
pub mod transport;

pub use config::Config;
pub use error::ClientError;
pub use history::{HistoryItem, HistoryStore};
pub use identity::{
    CallerIdentity, FileSessionStore, IdentityProvider, MemorySessionStore, SessionStore,
};
pub use task::controller::TaskController;
pub use task::log::{LogAccumulator, LogEntry};
pub use task::poller::PollHandle;
pub use task::types::{Engine, Job, ResultRef, TaskPhase, TaskSnapshot, TaskState};
pub use transport::{ConvertApi, SESSION_HEADER, Transport};
