//! Cache of the caller's previously completed conversions.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ClientError;
use crate::task::types::ResultRef;
use crate::transport::ConvertApi;

/// Summary record of one previously completed conversion, as returned by the
/// service's history listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub filename: String,
    /// Creation time as reported by the service, e.g. `2026-08-07 21:15:04`.
    #[serde(rename = "date")]
    pub created_at: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Full playable URL, when the service provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl HistoryItem {
    /// Date portion of the creation time, for compact listings.
    pub fn date(&self) -> &str {
        self.created_at
            .split_whitespace()
            .next()
            .unwrap_or(&self.created_at)
    }

    /// Size in mebibytes, as presented to the caller.
    pub fn size_mib(&self) -> f64 {
        self.size_bytes as f64 / 1024.0 / 1024.0
    }

    /// Resolve the playable reference for this item: the service-provided
    /// URL when present, otherwise the canonical download location.
    pub fn result_ref<A: ConvertApi + ?Sized>(&self, api: &A) -> ResultRef {
        match &self.url {
            Some(url) => ResultRef::new(url.clone()),
            None => ResultRef::new(api.download_url(&self.id)),
        }
    }
}

/// Cached view of the caller's prior completed jobs.
///
/// The cache is replaced wholesale on every successful refresh; it is never
/// merged with stale entries.
#[derive(Debug, Default)]
pub struct HistoryStore {
    items: Vec<HistoryItem>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn find(&self, id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Replace the cached items with an already-fetched listing.
    pub fn replace(&mut self, items: Vec<HistoryItem>) {
        self.items = items;
    }

    /// Drop the cached items without contacting the service.  Only call this
    /// after the service has confirmed a cleanup.
    pub fn purge(&mut self) {
        self.items.clear();
    }

    /// Re-fetch the caller's history and replace the cache.
    ///
    /// A failed refresh keeps the previous cache intact and returns the
    /// error; callers treat it as a non-fatal warning.
    pub async fn refresh<A: ConvertApi + ?Sized>(
        &mut self,
        api: &A,
    ) -> Result<&[HistoryItem], ClientError> {
        match api.history().await {
            Ok(items) => {
                self.items = items;
                Ok(&self.items)
            }
            Err(e) => {
                warn!(error = %e, "history refresh failed; keeping cached items");
                Err(e)
            }
        }
    }

    /// Ask the service to delete every artifact scoped to the caller, then
    /// empty the local cache.
    ///
    /// Destructive and irreversible; callers must obtain explicit
    /// confirmation first.  On rejection the cache is left untouched so the
    /// local view never claims artifacts are gone while the server still
    /// holds them.
    pub async fn clear<A: ConvertApi + ?Sized>(&mut self, api: &A) -> Result<(), ClientError> {
        api.clear_session().await.map_err(|e| match e {
            ClientError::Request { server_message, .. } => ClientError::Clear {
                message: server_message,
            },
            other => ClientError::Clear {
                message: other.to_string(),
            },
        })?;
        self.items.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> HistoryItem {
        HistoryItem {
            id: id.to_owned(),
            filename: format!("{id}.wav"),
            created_at: "2026-08-07 21:15:04".to_owned(),
            size_bytes: 3 * 1024 * 1024,
            url: None,
        }
    }

    #[test]
    fn wire_shape_roundtrip() {
        let parsed: HistoryItem = serde_json::from_str(
            r#"{"id":"abc","filename":"report.wav","date":"2026-08-07 21:15:04","size":1048576,"url":"http://svc/download/abc"}"#,
        )
        .unwrap();
        assert_eq!(parsed.id, "abc");
        assert_eq!(parsed.created_at, "2026-08-07 21:15:04");
        assert_eq!(parsed.size_bytes, 1_048_576);
        assert_eq!(parsed.url.as_deref(), Some("http://svc/download/abc"));

        // `url` is optional on the wire.
        let bare: HistoryItem = serde_json::from_str(
            r#"{"id":"abc","filename":"report.wav","date":"2026-08-07 21:15:04","size":1048576}"#,
        )
        .unwrap();
        assert!(bare.url.is_none());
    }

    #[test]
    fn date_and_size_presentation() {
        let it = item("x");
        assert_eq!(it.date(), "2026-08-07");
        assert!((it.size_mib() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn replace_is_wholesale() {
        let mut store = HistoryStore::new();
        store.replace(vec![item("a"), item("b")]);
        assert_eq!(store.items().len(), 2);
        store.replace(vec![item("c")]);
        assert_eq!(store.items().len(), 1);
        assert!(store.find("a").is_none());
        assert!(store.find("c").is_some());
    }
}
