//! Key-management core for Lux operator workstations.
//!
//! Everything hangs off an explicit [`Core`] context: the backend registry,
//! the in-memory session table and the filesystem roots. There is no global
//! state, so the library embeds and tests cleanly.

pub mod backend;
pub mod batch;
pub mod config;
pub mod derive;
pub mod error;
pub mod export;
pub mod keyset;
pub mod migrate;
pub mod primitives;
pub mod ring;
pub mod security;
pub mod session;
pub mod threshold;

pub use config::Paths;
pub use error::{KeyError, Result};
pub use keyset::KeySet;

use crate::backend::{BackendKind, BackendRegistry, KeyBackend};
use crate::session::SessionManager;

/// Context handle owning the backend registry and the session table.
pub struct Core {
    paths: Paths,
    registry: BackendRegistry,
    sessions: SessionManager,
}

impl Core {
    /// Open against the default roots under `~/.lux`.
    pub fn open() -> Result<Self> {
        Self::with_paths(Paths::default_roots()?)
    }

    pub fn with_paths(paths: Paths) -> Result<Self> {
        Self::with_paths_and_cost(paths, backend::software::KdfCost::DEFAULT)
    }

    /// Open with a tuned Argon2 cost for the software backend.
    pub fn with_paths_and_cost(paths: Paths, cost: backend::software::KdfCost) -> Result<Self> {
        let registry = BackendRegistry::open_with_cost(&paths, cost)?;
        registry.default_backend().initialize()?;
        Ok(Core {
            paths,
            registry,
            sessions: SessionManager::new(),
        })
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BackendRegistry {
        &mut self.registry
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    fn backend(&self) -> &dyn KeyBackend {
        self.registry.default_backend()
    }

    fn require_password<'a>(&self, password: Option<&'a str>) -> Result<Option<&'a str>> {
        if self.backend().requires_password() && password.is_none() {
            return Err(KeyError::PasswordRequired);
        }
        Ok(password)
    }

    /// Create a key set: fresh mnemonic when none is given, derivation from
    /// the provided one otherwise. Fails with `NameTaken` if the name is in
    /// use under the default backend.
    pub fn create(
        &self,
        name: &str,
        mnemonic: Option<&str>,
        account_index: u32,
        password: Option<&str>,
    ) -> Result<KeySet> {
        keyset::validate_name(name)?;
        if self.backend().list_keys()?.iter().any(|n| n == name) {
            return Err(KeyError::NameTaken(name.to_string()));
        }
        let keyset = match mnemonic {
            Some(phrase) => KeySet::derive(name, phrase, account_index)?,
            None => KeySet::generate(name)?,
        };
        self.save(&keyset, password)?;
        Ok(keyset)
    }

    /// Load a set. Without a password (on a password-requiring backend)
    /// this returns the locked, metadata-only form.
    pub fn load(&self, name: &str, password: Option<&str>) -> Result<KeySet> {
        self.backend().load_key(name, password)
    }

    /// Persist through the default backend and refresh the aggregated
    /// validator list.
    pub fn save(&self, keyset: &KeySet, password: Option<&str>) -> Result<()> {
        let password = self.require_password(password)?;
        self.backend().save_key(keyset, password)?;
        if let Ok(publics) = keyset.publics() {
            export::update_validators_file(
                &self.paths.validators_file(),
                Some(export::ValidatorEntry {
                    name: keyset.name.clone(),
                    ec_address: publics.ec_address.clone(),
                    bls_public_key: hex::encode(publics.bls_public),
                    node_id: keyset.node_id.clone(),
                }),
                None,
            )?;
        }
        Ok(())
    }

    /// Remove the on-disk envelope, evict any session entry, drop the
    /// validator row.
    pub fn delete(&self, name: &str) -> Result<()> {
        self.backend().delete_key(name)?;
        self.sessions.lock(name);
        export::update_validators_file(&self.paths.validators_file(), None, Some(name))?;
        Ok(())
    }

    /// Names under the default backend, lexicographic.
    pub fn list(&self) -> Result<Vec<String>> {
        self.backend().list_keys()
    }

    pub fn unlock(&self, name: &str, password: Option<&str>) -> Result<()> {
        let password = self.require_password(password)?;
        self.sessions.unlock(self.backend(), name, password)
    }

    pub fn lock(&self, name: &str) {
        self.sessions.lock(name);
    }

    pub fn lock_all(&self) {
        self.sessions.lock_all();
    }

    /// Session-cached set, or `Locked`/`Expired`.
    pub fn session_get(&self, name: &str) -> Result<KeySet> {
        self.sessions.get(name)
    }

    /// Generate the staking certificate for `name`, persist the node ID
    /// into the set, and return it.
    pub fn generate_staker(&self, name: &str, password: Option<&str>) -> Result<String> {
        let password = self.require_password(password)?;
        let mut keyset = self.backend().load_key(name, password)?;
        if keyset.is_locked() {
            return Err(KeyError::Locked(name.to_string()));
        }
        let node_id = export::generate_staker_cert(&self.paths.keyset_dir(name))?;
        keyset.node_id = Some(node_id.clone());
        self.save(&keyset, password)?;
        Ok(node_id)
    }

    /// Migrate one name from the legacy plaintext layout.
    pub fn migrate(
        &self,
        name: &str,
        password: Option<&str>,
        opts: migrate::MigrationOptions,
    ) -> Result<migrate::MigrationOutcome> {
        let password = self.require_password(password)?;
        migrate::migrate(&self.paths, self.backend(), name, password, opts)
    }

    /// Client for the external threshold service.
    pub fn threshold_client(&self, base_url: Option<&str>) -> Result<threshold::ThresholdClient> {
        threshold::ThresholdClient::connect(base_url)
    }

    /// Switch the default backend for newly created keys.
    pub fn set_default_backend(&mut self, kind: BackendKind) -> Result<()> {
        self.registry.set_default(kind)?;
        self.registry.default_backend().initialize()
    }
}
