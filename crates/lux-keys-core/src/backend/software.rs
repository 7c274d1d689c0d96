//! Reference backend: one `keystore.enc` envelope per key set under
//! `<keys_root>/<name>/`, Argon2id-derived AES-256-GCM.
//!
//! Envelope layout (little-endian integers):
//!
//! ```text
//! magic        : 4 B  = "LKS1"
//! kdf          : 1 B  = 0x01 (Argon2id)
//! salt         : 16 B
//! argon_params : 6 B  = m_cost (u32, KiB) || t_cost (u16)   [p fixed at 1]
//! aead         : 1 B  = 0x01 (AES-256-GCM)
//! nonce        : 12 B
//! ct_len       : 4 B  (u32, |plaintext| + 16-byte GCM tag)
//! ct || tag    : ct_len B
//! ```
//!
//! A wrong password and a tampered ciphertext are indistinguishable at this
//! boundary: both are a GCM tag failure and both surface as
//! `InvalidPassword` through the same branch.

use std::fs;
use std::path::PathBuf;

use aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm as ArgonAlgorithm, Argon2, Params, Version};
use chrono::{DateTime, Utc};
use rand::RngCore;
use zeroize::Zeroizing;

use super::{BackendKind, KeyBackend};
use crate::config::Paths;
use crate::error::{KeyError, Result};
use crate::keyset::{EnvelopePayload, KeySet};
use crate::security;

pub const ENVELOPE_FILE: &str = "keystore.enc";
pub const MAGIC: &[u8; 4] = b"LKS1";
pub const KDF_ARGON2ID: u8 = 0x01;
pub const AEAD_AES256GCM: u8 = 0x01;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 4 + 1 + SALT_LEN + 6 + 1 + NONCE_LEN + 4;

/// Argon2id cost parameters carried in the envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfCost {
    /// Memory in KiB.
    pub m_cost: u32,
    pub t_cost: u16,
}

impl KdfCost {
    /// 64 MiB, three passes.
    pub const DEFAULT: KdfCost = KdfCost {
        m_cost: 64 * 1024,
        t_cost: 3,
    };

    /// Cheap parameters for test fixtures; never the default.
    pub const FAST_INSECURE: KdfCost = KdfCost {
        m_cost: 8,
        t_cost: 1,
    };
}

pub struct SoftwareBackend {
    paths: Paths,
    cost: KdfCost,
}

impl SoftwareBackend {
    pub fn new(paths: Paths) -> Self {
        SoftwareBackend {
            paths,
            cost: KdfCost::DEFAULT,
        }
    }

    pub fn with_cost(paths: Paths, cost: KdfCost) -> Self {
        SoftwareBackend { paths, cost }
    }

    fn envelope_path(&self, name: &str) -> PathBuf {
        self.paths.keyset_dir(name).join(ENVELOPE_FILE)
    }

    /// Seal `payload` into envelope bytes.
    fn seal(&self, payload: &EnvelopePayload, password: &str) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        let key = derive_key(password.as_bytes(), &salt, self.cost)?;
        let plaintext = Zeroizing::new(
            postcard::to_stdvec(payload)
                .map_err(|_| KeyError::InternalInvariant("payload encode".to_string()))?,
        );

        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|_| KeyError::InternalInvariant("aead key size".to_string()))?;
        let ct = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| KeyError::InternalInvariant("aead seal".to_string()))?;

        let mut blob = Vec::with_capacity(HEADER_LEN + ct.len());
        blob.extend_from_slice(MAGIC);
        blob.push(KDF_ARGON2ID);
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&self.cost.m_cost.to_le_bytes());
        blob.extend_from_slice(&self.cost.t_cost.to_le_bytes());
        blob.push(AEAD_AES256GCM);
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&(ct.len() as u32).to_le_bytes());
        blob.extend_from_slice(&ct);
        Ok(blob)
    }

    /// Open envelope bytes. Structural defects are `CorruptKeystore`; a tag
    /// failure is `InvalidPassword`.
    fn open(&self, blob: &[u8], password: &str) -> Result<EnvelopePayload> {
        if blob.len() < HEADER_LEN {
            return Err(KeyError::CorruptKeystore);
        }
        if !security::constant_time_eq(&blob[..4], MAGIC) {
            return Err(KeyError::CorruptKeystore);
        }
        if blob[4] != KDF_ARGON2ID {
            return Err(KeyError::CorruptKeystore);
        }
        let salt = &blob[5..5 + SALT_LEN];
        let m_cost = u32::from_le_bytes(blob[21..25].try_into().expect("sliced"));
        let t_cost = u16::from_le_bytes(blob[25..27].try_into().expect("sliced"));
        if blob[27] != AEAD_AES256GCM {
            return Err(KeyError::CorruptKeystore);
        }
        let nonce = &blob[28..28 + NONCE_LEN];
        let ct_len = u32::from_le_bytes(blob[40..44].try_into().expect("sliced")) as usize;
        let ct = &blob[HEADER_LEN..];
        if ct.len() != ct_len || ct_len < 16 {
            return Err(KeyError::CorruptKeystore);
        }

        let key = derive_key(password.as_bytes(), salt, KdfCost { m_cost, t_cost })?;
        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|_| KeyError::InternalInvariant("aead key size".to_string()))?;
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(nonce), ct)
                .map_err(|_| KeyError::InvalidPassword)?,
        );

        postcard::from_bytes(&plaintext).map_err(|_| KeyError::CorruptKeystore)
    }

    fn created_at(&self, name: &str) -> DateTime<Utc> {
        fs::metadata(self.envelope_path(name))
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now())
    }
}

impl KeyBackend for SoftwareBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Software
    }

    fn available(&self) -> bool {
        true
    }

    fn requires_password(&self) -> bool {
        true
    }

    fn initialize(&self) -> Result<()> {
        security::create_private_dir(&self.paths.keys_root)
    }

    fn save_key(&self, keyset: &KeySet, password: Option<&str>) -> Result<()> {
        let password = password.ok_or(KeyError::PasswordRequired)?;
        let dir = self.paths.keyset_dir(&keyset.name);
        let _lock = security::DirLock::acquire(&dir, &keyset.name)?;

        let payload = keyset.to_payload()?;
        let blob = self.seal(&payload, password)?;
        security::atomic_write(&self.envelope_path(&keyset.name), &blob)?;
        tracing::debug!(name = %keyset.name, bytes = blob.len(), "envelope written");
        Ok(())
    }

    fn load_key(&self, name: &str, password: Option<&str>) -> Result<KeySet> {
        let path = self.envelope_path(name);
        if !path.exists() {
            return Err(KeyError::NotFound(name.to_string()));
        }
        let created_at = self.created_at(name);
        let Some(password) = password else {
            // Metadata-only view; node_id, if present, comes from info.json.
            let node_id = crate::export::read_node_id(&self.paths.keyset_dir(name));
            return Ok(KeySet::locked(name, created_at, node_id));
        };
        let blob = fs::read(&path)?;
        let payload = self.open(&blob, password)?;
        if payload.name != name {
            return Err(KeyError::CorruptKeystore);
        }
        KeySet::from_payload(payload, created_at)
    }

    fn delete_key(&self, name: &str) -> Result<()> {
        let dir = self.paths.keyset_dir(name);
        if !dir.exists() {
            return Err(KeyError::NotFound(name.to_string()));
        }
        // Rename-to-trash first so a crash mid-delete never leaves a
        // half-removed key directory under its live name.
        let trash = self.paths.keys_root.join(format!(".trash-{name}"));
        if trash.exists() {
            fs::remove_dir_all(&trash)?;
        }
        fs::rename(&dir, &trash)?;
        fs::remove_dir_all(&trash)?;
        tracing::info!(name, "key set deleted");
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let root = &self.paths.keys_root;
        if !root.exists() {
            return Ok(names);
        }
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            if entry.path().join(ENVELOPE_FILE).exists() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn derive_key(password: &[u8], salt: &[u8], cost: KdfCost) -> Result<Zeroizing<[u8; 32]>> {
    let params = Params::new(cost.m_cost, cost.t_cost as u32, 1, Some(32))
        .map_err(|_| KeyError::CorruptKeystore)?;
    let argon = Argon2::new(ArgonAlgorithm::Argon2id, Version::V0x13, params);
    let mut out = Zeroizing::new([0u8; 32]);
    argon
        .hash_password_into(password, salt, out.as_mut())
        .map_err(|_| KeyError::InternalInvariant("argon2 derive".to_string()))?;
    Ok(out)
}
