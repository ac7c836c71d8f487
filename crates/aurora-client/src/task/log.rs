use chrono::{DateTime, Utc};

/// One line of the caller-visible conversion trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

/// Collects status messages into an ordered, append-only log.
///
/// Consecutive polls usually repeat the same message; only transitions
/// produce entries, so the trace stays readable without requiring the
/// service to deduplicate.
#[derive(Debug, Default)]
pub struct LogAccumulator {
    entries: Vec<LogEntry>,
    previous: Option<String>,
}

impl LogAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a timestamped entry if `message` differs from the previously
    /// recorded one.  The first non-empty message always records; empty
    /// messages are ignored (the service omits a message on some phases).
    pub fn record(&mut self, message: &str) -> Option<&LogEntry> {
        if message.is_empty() || self.previous.as_deref() == Some(message) {
            return None;
        }
        self.previous = Some(message.to_owned());
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            text: message.to_owned(),
        });
        self.entries.last()
    }

    /// Drop every entry; called when a new job begins.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.previous = None;
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
