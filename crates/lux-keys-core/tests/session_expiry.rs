//! Session TTL behavior end-to-end: unlock, access inside the window,
//! lazy expiry after it.

use std::time::Duration;

use lux_keys_core::backend::software::KdfCost;
use lux_keys_core::backend::KeyBackend;
use lux_keys_core::session::SessionManager;
use lux_keys_core::{backend::software::SoftwareBackend, KeyError, KeySet, Paths};

const VECTOR: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn fixture() -> (tempfile::TempDir, SoftwareBackend) {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::with_roots(dir.path().to_path_buf(), dir.path().join("keys"));
    let backend = SoftwareBackend::with_cost(paths, KdfCost::FAST_INSECURE);
    backend.initialize().unwrap();
    let ks = KeySet::derive("v1", VECTOR, 0).unwrap();
    backend.save_key(&ks, Some("pw")).unwrap();
    (dir, backend)
}

#[test]
fn material_available_within_ttl_then_expired_then_locked() {
    let (_dir, backend) = fixture();
    let sessions = SessionManager::with_ttl(Duration::from_secs(1));

    sessions.unlock(&backend, "v1", Some("pw")).unwrap();

    std::thread::sleep(Duration::from_millis(100));
    let ks = sessions.get("v1").unwrap();
    assert_eq!(ks.mnemonic().unwrap(), VECTOR);

    std::thread::sleep(Duration::from_secs(2));
    assert!(matches!(sessions.get("v1"), Err(KeyError::Expired(_))));
    assert!(matches!(sessions.get("v1"), Err(KeyError::Locked(_))));
    assert!(sessions.is_locked("v1"));
}

#[test]
fn timeout_env_knob_parses_standard_forms() {
    use lux_keys_core::config::parse_duration;
    assert_eq!(parse_duration("1s"), Some(Duration::from_secs(1)));
    assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
    assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
}

#[test]
fn relock_after_explicit_lock_requires_unlock() {
    let (_dir, backend) = fixture();
    let sessions = SessionManager::with_ttl(Duration::from_secs(60));

    sessions.unlock(&backend, "v1", Some("pw")).unwrap();
    assert!(sessions.get("v1").is_ok());

    sessions.lock("v1");
    assert!(matches!(sessions.get("v1"), Err(KeyError::Locked(_))));

    sessions.unlock(&backend, "v1", Some("pw")).unwrap();
    assert!(sessions.get("v1").is_ok());
}
