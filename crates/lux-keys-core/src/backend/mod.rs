//! Pluggable key storage. The software backend is the reference
//! implementation; other kinds are discovered by capability probing and may
//! decline to hand out private bytes.

pub mod envvar;
#[cfg(feature = "keychain")]
pub mod keychain;
pub mod software;

use serde::{Deserialize, Serialize};

use crate::config::{BackendConfig, Paths};
use crate::error::{KeyError, Result};
use crate::keyset::KeySet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    Software,
    Keychain,
    SecretService,
    Yubikey,
    Zymbit,
    Walletconnect,
    Ledger,
    Env,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Software => "software",
            BackendKind::Keychain => "keychain",
            BackendKind::SecretService => "secret-service",
            BackendKind::Yubikey => "yubikey",
            BackendKind::Zymbit => "zymbit",
            BackendKind::Walletconnect => "walletconnect",
            BackendKind::Ledger => "ledger",
            BackendKind::Env => "env",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "software" => Some(BackendKind::Software),
            "keychain" => Some(BackendKind::Keychain),
            "secret-service" => Some(BackendKind::SecretService),
            "yubikey" => Some(BackendKind::Yubikey),
            "zymbit" => Some(BackendKind::Zymbit),
            "walletconnect" => Some(BackendKind::Walletconnect),
            "ledger" => Some(BackendKind::Ledger),
            "env" => Some(BackendKind::Env),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability row shown by discovery; `available` is a live probe.
#[derive(Debug, Clone, Serialize)]
pub struct BackendDescriptor {
    pub kind: BackendKind,
    pub requires_password: bool,
    pub requires_hardware: bool,
    pub supports_remote_signing: bool,
    pub available: bool,
    pub default: bool,
}

/// Storage backend contract. `load_key` with no password returns the locked
/// metadata-only form when the backend needs one.
pub trait KeyBackend: Send + Sync {
    fn kind(&self) -> BackendKind;
    fn available(&self) -> bool;
    fn requires_password(&self) -> bool;
    fn requires_hardware(&self) -> bool {
        false
    }
    fn supports_remote_signing(&self) -> bool {
        false
    }
    fn initialize(&self) -> Result<()>;
    fn save_key(&self, keyset: &KeySet, password: Option<&str>) -> Result<()>;
    fn load_key(&self, name: &str, password: Option<&str>) -> Result<KeySet>;
    fn delete_key(&self, name: &str) -> Result<()>;
    fn list_keys(&self) -> Result<Vec<String>>;
}

/// The set of constructible backends plus the persisted default selection.
/// Keys stay in the backend they were created under; only new keys follow
/// the default.
pub struct BackendRegistry {
    backends: Vec<Box<dyn KeyBackend>>,
    default_kind: BackendKind,
    paths: Paths,
}

impl BackendRegistry {
    pub fn open(paths: &Paths) -> Result<Self> {
        Self::open_with_cost(paths, software::KdfCost::DEFAULT)
    }

    /// Same as [`open`](Self::open) with a tuned Argon2 cost for the
    /// software backend (operators on constrained hardware, test fixtures).
    pub fn open_with_cost(paths: &Paths, cost: software::KdfCost) -> Result<Self> {
        let mut backends: Vec<Box<dyn KeyBackend>> =
            vec![Box::new(software::SoftwareBackend::with_cost(
                paths.clone(),
                cost,
            ))];
        #[cfg(feature = "keychain")]
        backends.push(Box::new(keychain::KeychainBackend::new(paths.clone())));
        backends.push(Box::new(envvar::EnvBackend::new()));

        let default_kind = match BackendConfig::load(&paths.backend_config())? {
            Some(cfg) => BackendKind::from_name(&cfg.default_backend)
                .ok_or_else(|| KeyError::BadUsage(format!(
                    "unknown backend in backend.json: {}",
                    cfg.default_backend
                )))?,
            None => BackendKind::Software,
        };

        let registry = BackendRegistry {
            backends,
            default_kind,
            paths: paths.clone(),
        };
        if registry.get(default_kind).is_none() {
            return Err(KeyError::BadUsage(format!(
                "default backend {default_kind} is not constructible in this build"
            )));
        }
        Ok(registry)
    }

    pub fn default_kind(&self) -> BackendKind {
        self.default_kind
    }

    pub fn default_backend(&self) -> &dyn KeyBackend {
        self.get(self.default_kind)
            .expect("default kind checked at open")
    }

    pub fn get(&self, kind: BackendKind) -> Option<&dyn KeyBackend> {
        self.backends
            .iter()
            .find(|b| b.kind() == kind)
            .map(|b| b.as_ref())
    }

    /// Change and persist the default. The target must be constructible and
    /// report itself available.
    pub fn set_default(&mut self, kind: BackendKind) -> Result<()> {
        let backend = self
            .get(kind)
            .ok_or_else(|| KeyError::BadUsage(format!("backend {kind} is not supported here")))?;
        if !backend.available() {
            return Err(KeyError::BadUsage(format!("backend {kind} is not available")));
        }
        BackendConfig {
            default_backend: kind.name().to_string(),
        }
        .store(&self.paths.backend_config())?;
        self.default_kind = kind;
        tracing::info!(backend = %kind, "default backend changed");
        Ok(())
    }

    /// Discovery table: constructible backends probed live, known hardware
    /// and remote kinds listed as unavailable until their integration ships.
    pub fn descriptors(&self) -> Vec<BackendDescriptor> {
        let mut rows: Vec<BackendDescriptor> = self
            .backends
            .iter()
            .map(|b| BackendDescriptor {
                kind: b.kind(),
                requires_password: b.requires_password(),
                requires_hardware: b.requires_hardware(),
                supports_remote_signing: b.supports_remote_signing(),
                available: b.available(),
                default: b.kind() == self.default_kind,
            })
            .collect();
        for (kind, hardware, remote) in [
            (BackendKind::SecretService, false, false),
            (BackendKind::Yubikey, true, false),
            (BackendKind::Zymbit, true, false),
            (BackendKind::Ledger, true, true),
            (BackendKind::Walletconnect, false, true),
        ] {
            if self.get(kind).is_none() {
                rows.push(BackendDescriptor {
                    kind,
                    requires_password: false,
                    requires_hardware: hardware,
                    supports_remote_signing: remote,
                    available: false,
                    default: false,
                });
            }
        }
        rows
    }
}
