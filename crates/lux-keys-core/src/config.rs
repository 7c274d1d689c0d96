//! Filesystem roots, environment knobs and the default-backend selection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{KeyError, Result};

/// Mnemonic for `derive` / `export-signer` when not passed explicitly.
pub const ENV_MNEMONIC: &str = "LUX_MNEMONIC";
/// Keystore password; bypasses the interactive prompt.
pub const ENV_PASSWORD: &str = "LUX_KEY_PASSWORD";
/// Session inactivity timeout, e.g. `30s` or `5m`.
pub const ENV_SESSION_TIMEOUT: &str = "LUX_KEY_SESSION_TIMEOUT";
/// Forces non-interactive mode (no prompts).
pub const ENV_NON_INTERACTIVE: &str = "LUX_NON_INTERACTIVE";

pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_THRESHOLD_URL: &str = "http://localhost:9630";

/// Where key material and configuration live on disk.
///
/// `keys_root` holds one directory per key set; `config_root` holds
/// `backend.json`. Both default under `~/.lux` and are overridable so tests
/// can run against a tempdir.
#[derive(Debug, Clone)]
pub struct Paths {
    pub config_root: PathBuf,
    pub keys_root: PathBuf,
}

impl Paths {
    pub fn default_roots() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| KeyError::FileError("cannot find home directory".to_string()))?;
        let config_root = home.join(".lux");
        let keys_root = config_root.join("keys");
        Ok(Paths {
            config_root,
            keys_root,
        })
    }

    pub fn with_roots(config_root: impl Into<PathBuf>, keys_root: impl Into<PathBuf>) -> Self {
        Paths {
            config_root: config_root.into(),
            keys_root: keys_root.into(),
        }
    }

    /// Directory of a single key set.
    pub fn keyset_dir(&self, name: &str) -> PathBuf {
        self.keys_root.join(name)
    }

    pub fn backend_config(&self) -> PathBuf {
        self.config_root.join("backend.json")
    }

    pub fn validators_file(&self) -> PathBuf {
        self.keys_root.join("mainnet_validators.json")
    }
}

/// Persisted default-backend selection, `<config_root>/backend.json`.
/// Read-through with last-write-wins semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub default_backend: String,
}

impl BackendConfig {
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        let cfg = serde_json::from_str(&data)?;
        Ok(Some(cfg))
    }

    pub fn store(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            crate::security::create_private_dir(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        crate::security::set_secure_permissions(path)?;
        Ok(())
    }
}

/// True when the process must not prompt (no terminal, `CI`, or
/// `LUX_NON_INTERACTIVE` set).
pub fn non_interactive() -> bool {
    std::env::var_os(ENV_NON_INTERACTIVE).is_some() || std::env::var_os("CI").is_some()
}

/// Session TTL from `LUX_KEY_SESSION_TIMEOUT`, defaulting to 30 s.
/// Unparseable values fall back to the default rather than erroring;
/// a bad knob must not lock the operator out of their keys.
pub fn session_timeout() -> Duration {
    match std::env::var(ENV_SESSION_TIMEOUT) {
        Ok(raw) => parse_duration(&raw).unwrap_or(DEFAULT_SESSION_TIMEOUT),
        Err(_) => DEFAULT_SESSION_TIMEOUT,
    }
}

/// Parses `30s`, `5m`, `1h`, or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (value, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let value: u64 = value.parse().ok()?;
    let secs = match unit.trim() {
        "s" | "sec" | "" => value,
        "m" | "min" => value * 60,
        "h" => value * 3600,
        "ms" => return Some(Duration::from_millis(value)),
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_formats() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("45"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("100ms"), Some(Duration::from_millis(100)));
        assert_eq!(parse_duration("junk"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn backend_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backend.json");
        let cfg = BackendConfig {
            default_backend: "software".to_string(),
        };
        cfg.store(&path).unwrap();
        let loaded = BackendConfig::load(&path).unwrap().unwrap();
        assert_eq!(loaded.default_backend, "software");

        assert!(BackendConfig::load(&dir.path().join("missing.json"))
            .unwrap()
            .is_none());
    }
}
