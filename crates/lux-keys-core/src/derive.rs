//! Deterministic derivation: BIP-39 mnemonic -> BIP-32 path -> per-algorithm
//! key material with HKDF domain separation.
//!
//! The path and the domain-separation strings are part of the interop
//! contract; changing any of them silently forks every derived key.

use bip32::{DerivationPath, XPrv};
use bip39::{Language, Mnemonic};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{KeyError, Result};

/// Coin type fixed by the network.
pub const COIN_TYPE: u32 = 9000;

const BLS_SALT: &[u8] = b"BLS-KEYGEN-SALT";
const BLS_INFO_PREFIX: &str = "bls12_381/";
const MLDSA_SALT: &[u8] = b"MLDSA-SALT";
const MLDSA_INFO_PREFIX: &str = "ml-dsa-65/";

/// Secrets derived for one account index. The ring key reuses the EC scalar
/// (the ring scheme is secp256k1-based); it is carried separately so the
/// scheme can be swapped later without reshaping stored key sets.
pub struct DerivedMaterial {
    pub ec_scalar: Zeroizing<[u8; 32]>,
    pub bls_seed: Zeroizing<[u8; 32]>,
    pub mldsa_seed: Zeroizing<[u8; 32]>,
}

/// Validate a phrase against the English wordlist, allowed lengths and
/// checksum.
pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic> {
    let normalized = phrase.trim().to_lowercase();
    Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|_| KeyError::InvalidMnemonic)
}

/// Fresh mnemonic of 12 or 24 words.
pub fn generate_mnemonic(word_count: usize) -> Result<Mnemonic> {
    if !matches!(word_count, 12 | 15 | 18 | 21 | 24) {
        return Err(KeyError::BadUsage(format!(
            "mnemonic word count must be one of 12/15/18/21/24, got {word_count}"
        )));
    }
    Mnemonic::generate_in(Language::English, word_count).map_err(|_| KeyError::InvalidMnemonic)
}

/// BIP-44 path for the EC key at `index`.
pub fn account_path(index: u32) -> DerivationPath {
    format!("m/44'/{COIN_TYPE}'/0'/0/{index}")
        .parse()
        .expect("path literal is well-formed")
}

/// Derive the full per-account bundle. Byte-identical across runs and
/// machines for the same `(mnemonic, index)`.
pub fn derive_account(mnemonic: &Mnemonic, passphrase: &str, index: u32) -> Result<DerivedMaterial> {
    let seed = Zeroizing::new(mnemonic.to_seed(passphrase));

    // A derived child key can fall outside the curve order with negligible
    // probability; the contract is to move to the next index.
    let mut attempt = index;
    let xprv = loop {
        match XPrv::derive_from_path(&seed[..], &account_path(attempt)) {
            Ok(xprv) => break xprv,
            Err(_) if attempt < index.saturating_add(4) => attempt += 1,
            Err(_) => {
                return Err(KeyError::InternalInvariant(
                    "no valid child key within retry window".to_string(),
                ))
            }
        }
    };

    let mut ec_scalar = Zeroizing::new([0u8; 32]);
    ec_scalar.copy_from_slice(&xprv.private_key().to_bytes());

    // IKM for the HKDF branches is the extended key at the path: private
    // scalar followed by the chain code.
    let mut ikm = Zeroizing::new([0u8; 64]);
    ikm[..32].copy_from_slice(ec_scalar.as_ref());
    ikm[32..].copy_from_slice(&xprv.attrs().chain_code);

    let bls_seed = expand(ikm.as_ref(), BLS_SALT, &format!("{BLS_INFO_PREFIX}{index}"))?;
    let mldsa_seed = expand(
        ikm.as_ref(),
        MLDSA_SALT,
        &format!("{MLDSA_INFO_PREFIX}{index}"),
    )?;

    Ok(DerivedMaterial {
        ec_scalar,
        bls_seed,
        mldsa_seed,
    })
}

/// Branches filled in deterministically when raw legacy material is
/// imported and no mnemonic exists to derive from.
#[derive(Clone, Copy)]
pub enum ImportBranch {
    Bls,
    MlDsa,
}

/// Deterministic seed for a missing branch of an imported set, keyed off
/// the EC scalar. Same import, same bundle, on every machine.
pub fn import_branch_seed(ec_scalar: &[u8; 32], branch: ImportBranch) -> Zeroizing<[u8; 32]> {
    let (salt, info) = match branch {
        ImportBranch::Bls => (BLS_SALT, format!("{BLS_INFO_PREFIX}import")),
        ImportBranch::MlDsa => (MLDSA_SALT, format!("{MLDSA_INFO_PREFIX}import")),
    };
    expand(ec_scalar, salt, &info).expect("hkdf expand of fixed-size input")
}

fn expand(ikm: &[u8], salt: &[u8], info: &str) -> Result<Zeroizing<[u8; 32]>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut out = Zeroizing::new([0u8; 32]);
    hk.expand(info.as_bytes(), out.as_mut())
        .map_err(|_| KeyError::InternalInvariant("hkdf expand".to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VECTOR: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn rejects_bad_phrases() {
        assert!(matches!(
            parse_mnemonic("abandon abandon abandon"),
            Err(KeyError::InvalidMnemonic)
        ));
        // Last word breaks the checksum.
        assert!(matches!(
            parse_mnemonic(
                "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon"
            ),
            Err(KeyError::InvalidMnemonic)
        ));
        assert!(matches!(
            parse_mnemonic("definitely not wordlist words at all xyzzy"),
            Err(KeyError::InvalidMnemonic)
        ));
    }

    #[test]
    fn accepts_vector_and_normalizes() {
        let a = parse_mnemonic(VECTOR).unwrap();
        let b = parse_mnemonic(&format!("  {}  ", VECTOR.to_uppercase())).unwrap();
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn derivation_is_deterministic() {
        let m = parse_mnemonic(VECTOR).unwrap();
        let a = derive_account(&m, "", 0).unwrap();
        let b = derive_account(&m, "", 0).unwrap();
        assert_eq!(*a.ec_scalar, *b.ec_scalar);
        assert_eq!(*a.bls_seed, *b.bls_seed);
        assert_eq!(*a.mldsa_seed, *b.mldsa_seed);
    }

    #[test]
    fn indexes_and_branches_are_separated() {
        let m = parse_mnemonic(VECTOR).unwrap();
        let i0 = derive_account(&m, "", 0).unwrap();
        let i1 = derive_account(&m, "", 1).unwrap();
        assert_ne!(*i0.ec_scalar, *i1.ec_scalar);
        assert_ne!(*i0.bls_seed, *i1.bls_seed);
        assert_ne!(*i0.mldsa_seed, *i1.mldsa_seed);
        // Domain separation between the two HKDF branches.
        assert_ne!(*i0.bls_seed, *i0.mldsa_seed);
    }

    #[test]
    fn passphrase_changes_everything() {
        let m = parse_mnemonic(VECTOR).unwrap();
        let plain = derive_account(&m, "", 0).unwrap();
        let salted = derive_account(&m, "TREZOR", 0).unwrap();
        assert_ne!(*plain.ec_scalar, *salted.ec_scalar);
    }

    #[test]
    fn generated_mnemonics_parse_back() {
        for words in [12, 24] {
            let m = generate_mnemonic(words).unwrap();
            let reparsed = parse_mnemonic(&m.to_string()).unwrap();
            assert_eq!(m.to_string(), reparsed.to_string());
        }
        assert!(generate_mnemonic(13).is_err());
    }
}
