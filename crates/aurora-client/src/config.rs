//! Client configuration, loaded from environment variables at startup.

use std::time::Duration;

/// Runtime configuration for the Aurora client.
///
/// Every field has a sensible default so the client works out-of-the-box
/// against a local service without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the conversion service (default: `http://localhost:5000`).
    pub base_url: String,

    /// Delay between status polls (default: 1000 ms).
    pub poll_interval: Duration,

    /// Per-request timeout.  Defensive only; the service contract does not
    /// require one (default: 30 s).
    pub request_timeout: Duration,

    /// `tracing` filter string, e.g. `"info"` or `"debug,reqwest=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            base_url: env_or("AURORA_API_URL", "http://localhost:5000"),
            poll_interval: Duration::from_millis(parse_env("AURORA_POLL_INTERVAL_MS", 1000)),
            request_timeout: Duration::from_secs(parse_env("AURORA_REQUEST_TIMEOUT_SECS", 30)),
            log_level: env_or("AURORA_LOG", "info"),
            log_json: std::env::var("AURORA_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Build a [`Config`] with defaults for everything except the base URL.
    /// Mostly useful for embedding and tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            poll_interval: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(30),
            log_level: "info".to_owned(),
            log_json: false,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
