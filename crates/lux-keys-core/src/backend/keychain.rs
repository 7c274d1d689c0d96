//! OS keyring backend. The payload is handed to the platform secret store
//! (Keychain on macOS, Secret Service on Linux, Credential Manager on
//! Windows) which owns the at-rest protection, so no password is required.
//!
//! Platform keyrings cannot enumerate entries, so a name index lives at
//! `<config_root>/keychain-index.json`.

use std::collections::BTreeSet;
use std::path::PathBuf;

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use zeroize::Zeroizing;

use super::{BackendKind, KeyBackend};
use crate::config::Paths;
use crate::error::{KeyError, Result};
use crate::keyset::{EnvelopePayload, KeySet};
use crate::security;

const SERVICE: &str = "network.lux.keys";

pub struct KeychainBackend {
    paths: Paths,
}

impl KeychainBackend {
    pub fn new(paths: Paths) -> Self {
        KeychainBackend { paths }
    }

    fn index_path(&self) -> PathBuf {
        self.paths.config_root.join("keychain-index.json")
    }

    fn read_index(&self) -> Result<BTreeSet<String>> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(BTreeSet::new());
        }
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn write_index(&self, index: &BTreeSet<String>) -> Result<()> {
        security::create_private_dir(&self.paths.config_root)?;
        let data = serde_json::to_string_pretty(index)?;
        std::fs::write(self.index_path(), data)?;
        security::set_secure_permissions(&self.index_path())?;
        Ok(())
    }

    fn entry(&self, name: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(SERVICE, name)
            .map_err(|e| KeyError::FileError(format!("keyring entry: {e}")))
    }
}

impl KeyBackend for KeychainBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Keychain
    }

    fn available(&self) -> bool {
        // Constructing an entry probes for a usable platform store without
        // touching it.
        keyring::Entry::new(SERVICE, "__probe__").is_ok()
    }

    fn requires_password(&self) -> bool {
        false
    }

    fn initialize(&self) -> Result<()> {
        security::create_private_dir(&self.paths.config_root)
    }

    fn save_key(&self, keyset: &KeySet, _password: Option<&str>) -> Result<()> {
        let payload = keyset.to_payload()?;
        let encoded = Zeroizing::new(
            postcard::to_stdvec(&payload)
                .map_err(|_| KeyError::InternalInvariant("payload encode".to_string()))?,
        );
        let armored = Zeroizing::new(general_purpose::STANDARD.encode(encoded.as_slice()));
        self.entry(&keyset.name)?
            .set_password(&armored)
            .map_err(|e| KeyError::FileError(format!("keyring store: {e}")))?;

        let mut index = self.read_index()?;
        index.insert(keyset.name.clone());
        self.write_index(&index)?;
        tracing::debug!(name = %keyset.name, "key set stored in OS keyring");
        Ok(())
    }

    fn load_key(&self, name: &str, _password: Option<&str>) -> Result<KeySet> {
        let armored = match self.entry(name)?.get_password() {
            Ok(v) => Zeroizing::new(v),
            Err(keyring::Error::NoEntry) => return Err(KeyError::NotFound(name.to_string())),
            Err(e) => return Err(KeyError::FileError(format!("keyring read: {e}"))),
        };
        let raw = Zeroizing::new(
            general_purpose::STANDARD
                .decode(armored.as_bytes())
                .map_err(|_| KeyError::CorruptKeystore)?,
        );
        let payload: EnvelopePayload = postcard::from_bytes(&raw)?;
        if payload.name != name {
            return Err(KeyError::CorruptKeystore);
        }
        KeySet::from_payload(payload, Utc::now())
    }

    fn delete_key(&self, name: &str) -> Result<()> {
        match self.entry(name)?.delete_password() {
            Ok(()) => {}
            Err(keyring::Error::NoEntry) => return Err(KeyError::NotFound(name.to_string())),
            Err(e) => return Err(KeyError::FileError(format!("keyring delete: {e}"))),
        }
        let mut index = self.read_index()?;
        index.remove(name);
        self.write_index(&index)?;
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.read_index()?.into_iter().collect())
    }
}
