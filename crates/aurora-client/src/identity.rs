//! Stable per-session caller identity.
//!
//! The service correlates uploads, status queries, and history by an opaque
//! token rather than authenticated accounts.  The token is generated lazily
//! on first use, persisted in session-scoped storage under a fixed key, and
//! returned unchanged for the rest of the session.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::error::ClientError;

/// Opaque caller identity token.
pub type CallerIdentity = String;

/// Fixed storage key for the caller identity token.
pub const SESSION_KEY: &str = "aurora_session_id";

/// Session-scoped key/value storage backing the identity provider.
///
/// Implementations must survive a "reload" (a new provider over the same
/// store) but are not expected to survive the session itself.
pub trait SessionStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn put(&self, key: &str, value: &str) -> Result<(), ClientError>;
}

/// In-process store for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.values.lock().expect("session store poisoned").get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.values
            .lock()
            .expect("session store poisoned")
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// File-backed store: one file per key under `dir`.
///
/// Lets separate CLI invocations inside the same shell session share an
/// identity; point `dir` at a temp location so the scope ends with the
/// machine session.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(v) => Ok(Some(v.trim().to_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClientError::Identity {
                message: format!("failed to read {key}: {e}"),
            }),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), ClientError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ClientError::Identity {
            message: format!("failed to create session dir: {e}"),
        })?;
        std::fs::write(self.path_for(key), value).map_err(|e| ClientError::Identity {
            message: format!("failed to persist {key}: {e}"),
        })
    }
}

/// Produces and persists the stable caller identity.
///
/// No network I/O.  Storage failures are not expected to be recoverable and
/// propagate to the caller as [`ClientError::Identity`].
#[derive(Clone)]
pub struct IdentityProvider {
    store: Arc<dyn SessionStore>,
}

impl IdentityProvider {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Provider over a fresh in-memory store (one identity per process).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    /// Return the caller identity for this session, generating and
    /// persisting a new random token on first use.
    pub fn identity(&self) -> Result<CallerIdentity, ClientError> {
        if let Some(existing) = self.store.get(SESSION_KEY)? {
            return Ok(existing);
        }
        let token = Uuid::new_v4().to_string();
        self.store.put(SESSION_KEY, &token)?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_stable_within_a_session() {
        let provider = IdentityProvider::in_memory();
        let first = provider.identity().expect("identity");
        let second = provider.identity().expect("identity");
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn identity_survives_a_simulated_reload() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let before = IdentityProvider::new(Arc::clone(&store))
            .identity()
            .expect("identity");
        // A reload constructs a fresh provider over the same session store.
        let after = IdentityProvider::new(store).identity().expect("identity");
        assert_eq!(before, after);
    }

    #[test]
    fn fresh_sessions_get_distinct_identities() {
        let a = IdentityProvider::in_memory().identity().expect("identity");
        let b = IdentityProvider::in_memory().identity().expect("identity");
        assert_ne!(a, b);
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("aurora-identity-test-{}", Uuid::new_v4()));
        let provider = IdentityProvider::new(Arc::new(FileSessionStore::new(&dir)));
        let first = provider.identity().expect("identity");

        let reloaded = IdentityProvider::new(Arc::new(FileSessionStore::new(&dir)))
            .identity()
            .expect("identity");
        assert_eq!(first, reloaded);

        std::fs::remove_dir_all(dir).ok();
    }
}
