//! In-memory unlocked-key cache with lazy inactivity expiry.
//!
//! Contract: no secret byte outlives its eviction in readable memory. The
//! table holds the serialized envelope payload in a zeroizing buffer; every
//! eviction path drops (and thus wipes) it before the caller observes the
//! state change.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};

use crate::backend::KeyBackend;
use crate::config;
use crate::error::{KeyError, Result};
use crate::keyset::KeySet;

struct SessionEntry {
    payload: Secret<Vec<u8>>,
    created_at: DateTime<Utc>,
    last_accessed: Instant,
}

pub struct SessionManager {
    table: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionManager {
    /// TTL comes from `LUX_KEY_SESSION_TIMEOUT` (default 30 s).
    pub fn new() -> Self {
        Self::with_ttl(config::session_timeout())
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        SessionManager {
            table: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Decrypt through the backend and cache the secrets.
    pub fn unlock(
        &self,
        backend: &dyn KeyBackend,
        name: &str,
        password: Option<&str>,
    ) -> Result<()> {
        let keyset = backend.load_key(name, password)?;
        if keyset.is_locked() {
            return Err(KeyError::PasswordRequired);
        }
        let payload = keyset.to_payload()?;
        let bytes = postcard::to_stdvec(&payload)
            .map_err(|_| KeyError::InternalInvariant("session encode".to_string()))?;
        let mut table = self.table.lock().expect("session table poisoned");
        table.insert(
            name.to_string(),
            SessionEntry {
                payload: Secret::new(bytes),
                created_at: keyset.created_at,
                last_accessed: Instant::now(),
            },
        );
        tracing::debug!(name, "session unlocked");
        Ok(())
    }

    /// Fetch the unlocked set. Expiry is lazy: a stale entry is evicted
    /// first and this access reports `Expired`; the next one sees `Locked`.
    pub fn get(&self, name: &str) -> Result<KeySet> {
        let mut table = self.table.lock().expect("session table poisoned");
        let Some(entry) = table.get_mut(name) else {
            return Err(KeyError::Locked(name.to_string()));
        };
        if entry.last_accessed.elapsed() > self.ttl {
            table.remove(name);
            tracing::debug!(name, "session entry expired");
            return Err(KeyError::Expired(name.to_string()));
        }
        entry.last_accessed = Instant::now();
        let payload = postcard::from_bytes(entry.payload.expose_secret())
            .map_err(|_| KeyError::InternalInvariant("session decode".to_string()))?;
        let created_at = entry.created_at;
        drop(table);
        KeySet::from_payload(payload, created_at)
    }

    pub fn lock(&self, name: &str) {
        let mut table = self.table.lock().expect("session table poisoned");
        if table.remove(name).is_some() {
            tracing::debug!(name, "session locked");
        }
    }

    pub fn lock_all(&self) {
        let mut table = self.table.lock().expect("session table poisoned");
        let count = table.len();
        table.clear();
        if count > 0 {
            tracing::debug!(count, "all sessions locked");
        }
    }

    pub fn is_locked(&self, name: &str) -> bool {
        let table = self.table.lock().expect("session table poisoned");
        !table.contains_key(name)
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        SessionManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::software::{KdfCost, SoftwareBackend};
    use crate::backend::KeyBackend as _;
    use crate::config::Paths;

    const VECTOR: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn fixture() -> (tempfile::TempDir, SoftwareBackend) {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_roots(dir.path().to_path_buf(), dir.path().join("keys"));
        let be = SoftwareBackend::with_cost(paths, KdfCost::FAST_INSECURE);
        be.initialize().unwrap();
        let ks = KeySet::derive("v1", VECTOR, 0).unwrap();
        be.save_key(&ks, Some("pw")).unwrap();
        (dir, be)
    }

    #[test]
    fn unlock_get_lock_cycle() {
        let (_dir, be) = fixture();
        let sessions = SessionManager::with_ttl(Duration::from_secs(60));
        assert!(sessions.is_locked("v1"));

        sessions.unlock(&be, "v1", Some("pw")).unwrap();
        assert!(!sessions.is_locked("v1"));
        let ks = sessions.get("v1").unwrap();
        assert_eq!(ks.name, "v1");

        sessions.lock("v1");
        assert!(sessions.is_locked("v1"));
        assert!(matches!(sessions.get("v1"), Err(KeyError::Locked(_))));
    }

    #[test]
    fn expiry_is_lazy_and_one_shot() {
        let (_dir, be) = fixture();
        let sessions = SessionManager::with_ttl(Duration::from_millis(50));
        sessions.unlock(&be, "v1", Some("pw")).unwrap();

        // Within TTL the entry stays warm and the timestamp refreshes.
        std::thread::sleep(Duration::from_millis(10));
        assert!(sessions.get("v1").is_ok());

        std::thread::sleep(Duration::from_millis(120));
        assert!(matches!(sessions.get("v1"), Err(KeyError::Expired(_))));
        // Evicted now; the caller-visible state returns to Locked.
        assert!(matches!(sessions.get("v1"), Err(KeyError::Locked(_))));
    }

    #[test]
    fn access_refreshes_ttl() {
        let (_dir, be) = fixture();
        let sessions = SessionManager::with_ttl(Duration::from_millis(80));
        sessions.unlock(&be, "v1", Some("pw")).unwrap();
        for _ in 0..4 {
            std::thread::sleep(Duration::from_millis(40));
            assert!(sessions.get("v1").is_ok(), "access must reset the timer");
        }
    }

    #[test]
    fn wrong_password_does_not_populate() {
        let (_dir, be) = fixture();
        let sessions = SessionManager::with_ttl(Duration::from_secs(60));
        assert!(matches!(
            sessions.unlock(&be, "v1", Some("wrong")),
            Err(KeyError::InvalidPassword)
        ));
        assert!(sessions.is_locked("v1"));
    }

    #[test]
    fn lock_all_clears_everything() {
        let (_dir, be) = fixture();
        let ks2 = KeySet::derive("v2", VECTOR, 1).unwrap();
        be.save_key(&ks2, Some("pw")).unwrap();

        let sessions = SessionManager::with_ttl(Duration::from_secs(60));
        sessions.unlock(&be, "v1", Some("pw")).unwrap();
        sessions.unlock(&be, "v2", Some("pw")).unwrap();
        sessions.lock_all();
        assert!(sessions.is_locked("v1"));
        assert!(sessions.is_locked("v2"));
    }
}
