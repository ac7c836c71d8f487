use thiserror::Error;

/// Errors surfaced by the Aurora client.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The document was rejected before or during submission.  Terminal for
    /// that attempt; the caller must fix the input and resubmit.
    #[error("submission rejected: {reason}")]
    Submission { reason: String },

    /// A transport failure or non-2xx response on any call.
    ///
    /// `http_status` is `None` when the request never produced a response
    /// (DNS failure, refused connection, timeout).  Inside the poll loop
    /// these are absorbed and retried on the next tick; everywhere else they
    /// propagate to the caller.
    #[error("request failed: {server_message}")]
    Request {
        http_status: Option<u16>,
        server_message: String,
    },

    /// The service reported a terminal `failed` status for the tracked job.
    /// No automatic retry.
    #[error("conversion failed: {message}")]
    Task { message: String },

    /// The service rejected the session cleanup.  The local history cache is
    /// left untouched so client and server state stay consistent.
    #[error("session cleanup rejected: {message}")]
    Clear { message: String },

    /// A conversion is already being tracked; only one job may be tracked at
    /// a time.  Reset the controller before submitting again.
    #[error("a conversion is already being tracked; reset first")]
    AlreadyTracking,

    /// The session identity could not be read or persisted.
    #[error("session identity storage failed: {message}")]
    Identity { message: String },
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Request {
            http_status: e.status().map(|s| s.as_u16()),
            server_message: e.to_string(),
        }
    }
}
