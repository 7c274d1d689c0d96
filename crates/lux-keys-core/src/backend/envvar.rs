//! Ephemeral backend over `LUX_MNEMONIC`: key sets are derived on demand
//! and nothing is persisted. Useful in CI and for one-shot exports.

use super::{BackendKind, KeyBackend};
use crate::config;
use crate::error::{KeyError, Result};
use crate::keyset::KeySet;

pub struct EnvBackend;

impl EnvBackend {
    pub fn new() -> Self {
        EnvBackend
    }
}

impl Default for EnvBackend {
    fn default() -> Self {
        EnvBackend::new()
    }
}

impl KeyBackend for EnvBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Env
    }

    fn available(&self) -> bool {
        std::env::var_os(config::ENV_MNEMONIC).is_some()
    }

    fn requires_password(&self) -> bool {
        false
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn save_key(&self, _keyset: &KeySet, _password: Option<&str>) -> Result<()> {
        Err(KeyError::BadUsage(
            "the env backend derives keys from LUX_MNEMONIC and cannot persist them".to_string(),
        ))
    }

    fn load_key(&self, name: &str, _password: Option<&str>) -> Result<KeySet> {
        let phrase = std::env::var(config::ENV_MNEMONIC)
            .map_err(|_| KeyError::NotFound(name.to_string()))?;
        KeySet::derive(name, &phrase, 0)
    }

    fn delete_key(&self, name: &str) -> Result<()> {
        Err(KeyError::NotFound(name.to_string()))
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
