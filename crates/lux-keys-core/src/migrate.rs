//! Migration of the legacy plaintext key layout into the encrypted
//! envelope, with optional secure wipe of the originals.
//!
//! Legacy layout under `<keys_root>/<name>/`:
//!
//! ```text
//! ec/private.key   hex-encoded 32-byte scalar
//! bls/secret.key   base64 32-byte scalar
//! bls/signer.key   base64, hex, or raw 32 bytes
//! staker.key       PEM (left in place)
//! info.json        { "nodeID": "..." }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};

use crate::backend::KeyBackend;
use crate::config::Paths;
use crate::error::{KeyError, Result};
use crate::export;
use crate::keyset::KeySet;
use crate::security;

/// Per-name migration state, as found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    LegacyOnly,
    Both,
    EncryptedOnly,
}

#[derive(Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    Migrated,
    /// An envelope already existed and `force` was not given; nothing was
    /// touched.
    Skipped,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationOptions {
    /// Overwrite an existing envelope.
    pub force: bool,
    /// Zero-fill and unlink the legacy private files afterwards.
    pub secure_wipe: bool,
}

const LEGACY_EC_FILE: &str = "ec/private.key";
const LEGACY_BLS_SECRET: &str = "bls/secret.key";
const LEGACY_BLS_SIGNER: &str = "bls/signer.key";

/// Classify a key-set directory, or `None` when neither layout is present.
pub fn detect_state(keyset_dir: &Path) -> Option<MigrationState> {
    let legacy = legacy_private_files(keyset_dir)
        .iter()
        .any(|p| p.exists());
    let encrypted = keyset_dir
        .join(crate::backend::software::ENVELOPE_FILE)
        .exists();
    match (legacy, encrypted) {
        (true, true) => Some(MigrationState::Both),
        (true, false) => Some(MigrationState::LegacyOnly),
        (false, true) => Some(MigrationState::EncryptedOnly),
        (false, false) => None,
    }
}

fn legacy_private_files(keyset_dir: &Path) -> Vec<PathBuf> {
    vec![
        keyset_dir.join(LEGACY_EC_FILE),
        keyset_dir.join(LEGACY_BLS_SECRET),
        keyset_dir.join(LEGACY_BLS_SIGNER),
    ]
}

/// Read and decode the legacy private material into a key set.
pub fn read_legacy(paths: &Paths, name: &str) -> Result<KeySet> {
    let dir = paths.keyset_dir(name);

    let ec_path = dir.join(LEGACY_EC_FILE);
    let bls_secret_path = dir.join(LEGACY_BLS_SECRET);
    let bls_signer_path = dir.join(LEGACY_BLS_SIGNER);

    if !ec_path.exists() && !bls_secret_path.exists() && !bls_signer_path.exists() {
        // NoSource: nothing to migrate under this name.
        return Err(KeyError::NotFound(format!(
            "{name}: no legacy private key files"
        )));
    }
    if !ec_path.exists() {
        return Err(KeyError::InvalidLegacy(format!(
            "{name}: BLS material present but {LEGACY_EC_FILE} is missing"
        )));
    }

    let ec_scalar = read_hex_32(&ec_path)?;

    let bls_scalar = if bls_secret_path.exists() {
        Some(read_b64_32(&bls_secret_path)?)
    } else if bls_signer_path.exists() {
        Some(read_flexible_32(&bls_signer_path)?)
    } else {
        None
    };

    let node_id = export::read_node_id(&dir);
    KeySet::from_imported_parts(name, &ec_scalar, bls_scalar.as_ref(), node_id)
}

/// Run migration for one name through the given (software) backend.
pub fn migrate(
    paths: &Paths,
    backend: &dyn KeyBackend,
    name: &str,
    password: Option<&str>,
    opts: MigrationOptions,
) -> Result<MigrationOutcome> {
    let dir = paths.keyset_dir(name);
    let state = detect_state(&dir).ok_or_else(|| KeyError::NotFound(name.to_string()))?;

    if state == MigrationState::EncryptedOnly {
        return Err(KeyError::NotFound(format!(
            "{name}: no legacy private key files"
        )));
    }
    if state == MigrationState::Both && !opts.force {
        tracing::debug!(name, "envelope already present; migration skipped");
        return Ok(MigrationOutcome::Skipped);
    }

    let keyset = read_legacy(paths, name)?;
    backend.save_key(&keyset, password)?;
    tracing::info!(name, "legacy key material migrated into envelope");

    if opts.secure_wipe {
        for path in legacy_private_files(&dir) {
            if path.exists() {
                security::secure_overwrite(&path)?;
                tracing::warn!(file = %path.display(), "legacy key file wiped");
            }
        }
        for sub in ["ec", "bls", "mldsa", "rt"] {
            let subdir = dir.join(sub);
            if subdir.exists() && fs::read_dir(&subdir)?.next().is_none() {
                fs::remove_dir(&subdir)?;
            }
        }
    }
    Ok(MigrationOutcome::Migrated)
}

fn read_hex_32(path: &Path) -> Result<[u8; 32]> {
    let raw = fs::read_to_string(path)?;
    let cleaned = raw.trim().trim_start_matches("0x");
    let bytes = hex::decode(cleaned)
        .map_err(|_| KeyError::InvalidLegacy(format!("{}: not hex", path.display())))?;
    to_32(&bytes, path)
}

fn read_b64_32(path: &Path) -> Result<[u8; 32]> {
    let raw = fs::read_to_string(path)?;
    let bytes = general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|_| KeyError::InvalidLegacy(format!("{}: not base64", path.display())))?;
    to_32(&bytes, path)
}

/// `signer.key` appeared in three historical encodings; accept all of them.
fn read_flexible_32(path: &Path) -> Result<[u8; 32]> {
    let raw = fs::read(path)?;
    if raw.len() == 32 {
        return to_32(&raw, path);
    }
    let text = String::from_utf8_lossy(&raw);
    let text = text.trim();
    if let Ok(bytes) = general_purpose::STANDARD.decode(text) {
        return to_32(&bytes, path);
    }
    if let Ok(bytes) = hex::decode(text.trim_start_matches("0x")) {
        return to_32(&bytes, path);
    }
    Err(KeyError::InvalidLegacy(format!(
        "{}: not raw, base64 or hex",
        path.display()
    )))
}

fn to_32(bytes: &[u8], path: &Path) -> Result<[u8; 32]> {
    let arr: [u8; 32] = bytes.try_into().map_err(|_| {
        KeyError::InvalidLegacy(format!(
            "{}: expected 32 bytes, got {}",
            path.display(),
            bytes.len()
        ))
    })?;
    Ok(arr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::software::{KdfCost, SoftwareBackend};

    fn fixture() -> (tempfile::TempDir, Paths, SoftwareBackend) {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_roots(dir.path().to_path_buf(), dir.path().join("keys"));
        let backend = SoftwareBackend::with_cost(paths.clone(), KdfCost::FAST_INSECURE);
        backend.initialize().unwrap();
        (dir, paths, backend)
    }

    fn seed_legacy(paths: &Paths, name: &str, ec_scalar: [u8; 32], bls_scalar: [u8; 32]) {
        let dir = paths.keyset_dir(name);
        fs::create_dir_all(dir.join("ec")).unwrap();
        fs::create_dir_all(dir.join("bls")).unwrap();
        fs::write(dir.join(LEGACY_EC_FILE), hex::encode(ec_scalar)).unwrap();
        fs::write(
            dir.join(LEGACY_BLS_SECRET),
            general_purpose::STANDARD.encode(bls_scalar),
        )
        .unwrap();
    }

    #[test]
    fn migrate_then_reload_preserves_address() {
        let (_tmp, paths, backend) = fixture();
        let mut ec_scalar = [0u8; 32];
        ec_scalar[31] = 5;
        let mut bls_scalar = [0u8; 32];
        bls_scalar[31] = 1;
        seed_legacy(&paths, "v1", ec_scalar, bls_scalar);

        let before = read_legacy(&paths, "v1").unwrap();
        let address = before.publics().unwrap().ec_address.clone();

        let outcome = migrate(
            &paths,
            &backend,
            "v1",
            Some("pw"),
            MigrationOptions {
                force: false,
                secure_wipe: true,
            },
        )
        .unwrap();
        assert_eq!(outcome, MigrationOutcome::Migrated);

        // Sources wiped, envelope present, address preserved.
        assert!(!paths.keyset_dir("v1").join(LEGACY_EC_FILE).exists());
        assert!(!paths.keyset_dir("v1").join(LEGACY_BLS_SECRET).exists());
        assert_eq!(
            detect_state(&paths.keyset_dir("v1")),
            Some(MigrationState::EncryptedOnly)
        );

        let reloaded = backend.load_key("v1", Some("pw")).unwrap();
        assert_eq!(reloaded.publics().unwrap().ec_address, address);
        assert_eq!(*reloaded.bls_scalar().unwrap(), bls_scalar);
    }

    #[test]
    fn second_run_without_force_is_skipped() {
        let (_tmp, paths, backend) = fixture();
        seed_legacy(&paths, "v1", [9u8; 32], {
            let mut s = [0u8; 32];
            s[31] = 2;
            s
        });

        assert_eq!(
            migrate(&paths, &backend, "v1", Some("pw"), MigrationOptions::default()).unwrap(),
            MigrationOutcome::Migrated
        );
        let envelope = paths
            .keyset_dir("v1")
            .join(crate::backend::software::ENVELOPE_FILE);
        let first = fs::read(&envelope).unwrap();

        // Legacy files are still there (no secure wipe): state is Both and
        // a re-run leaves the envelope byte-identical.
        assert_eq!(
            detect_state(&paths.keyset_dir("v1")),
            Some(MigrationState::Both)
        );
        assert_eq!(
            migrate(&paths, &backend, "v1", Some("pw"), MigrationOptions::default()).unwrap(),
            MigrationOutcome::Skipped
        );
        assert_eq!(fs::read(&envelope).unwrap(), first);

        // Force rewrites.
        assert_eq!(
            migrate(
                &paths,
                &backend,
                "v1",
                Some("pw"),
                MigrationOptions {
                    force: true,
                    secure_wipe: false,
                },
            )
            .unwrap(),
            MigrationOutcome::Migrated
        );
    }

    #[test]
    fn missing_sources_and_bad_decodes() {
        let (_tmp, paths, backend) = fixture();

        assert!(matches!(
            migrate(&paths, &backend, "ghost", Some("pw"), MigrationOptions::default()),
            Err(KeyError::NotFound(_))
        ));

        let dir = paths.keyset_dir("bad");
        fs::create_dir_all(dir.join("ec")).unwrap();
        fs::write(dir.join(LEGACY_EC_FILE), "zz-not-hex").unwrap();
        assert!(matches!(
            read_legacy(&paths, "bad"),
            Err(KeyError::InvalidLegacy(_))
        ));

        fs::write(dir.join(LEGACY_EC_FILE), hex::encode([1u8; 16])).unwrap();
        assert!(matches!(
            read_legacy(&paths, "bad"),
            Err(KeyError::InvalidLegacy(_))
        ));
    }

    #[test]
    fn signer_key_accepts_raw_base64_and_hex() {
        let (_tmp, paths, _backend) = fixture();
        let mut scalar = [0u8; 32];
        scalar[31] = 3;
        let dir = paths.keyset_dir("v1");
        fs::create_dir_all(dir.join("ec")).unwrap();
        fs::create_dir_all(dir.join("bls")).unwrap();
        fs::write(dir.join(LEGACY_EC_FILE), hex::encode([4u8; 32])).unwrap();

        for encoding in [
            scalar.to_vec(),
            general_purpose::STANDARD.encode(scalar).into_bytes(),
            hex::encode(scalar).into_bytes(),
        ] {
            fs::write(dir.join(LEGACY_BLS_SIGNER), &encoding).unwrap();
            let ks = read_legacy(&paths, "v1").unwrap();
            assert_eq!(*ks.bls_scalar().unwrap(), scalar);
        }
    }
}
