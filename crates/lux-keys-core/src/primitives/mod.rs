//! Byte-in/byte-out adapters over the signature and KEM primitives.
//!
//! Callers never touch scheme-specific types; each adapter speaks `&[u8]`
//! and enforces the fixed size table below. Verification failure is a
//! `false` return, not an error, so call sites stay branch-uniform.

pub mod bls;
pub mod mldsa;
#[cfg(feature = "pq")]
pub mod mlkem;
pub mod secp256k1;
pub mod slhdsa;

use serde::{Deserialize, Serialize};

use crate::error::{KeyError, Result};

/// Every algorithm the core can hold or speak about, replacing the string
/// case-ladders of older tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    Secp256k1,
    Bls12381,
    MlDsa44,
    MlDsa65,
    MlDsa87,
    SlhDsa128f,
    MlKem768,
    MlKem1024,
}

/// Fixed byte lengths for a signature scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigSizes {
    pub private_key: usize,
    pub public_key: usize,
    pub signature: usize,
}

/// Fixed byte lengths for a KEM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KemSizes {
    pub secret_key: usize,
    pub public_key: usize,
    pub ciphertext: usize,
    pub shared_secret: usize,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Secp256k1 => "secp256k1",
            Algorithm::Bls12381 => "bls12-381",
            Algorithm::MlDsa44 => "ml-dsa-44",
            Algorithm::MlDsa65 => "ml-dsa-65",
            Algorithm::MlDsa87 => "ml-dsa-87",
            Algorithm::SlhDsa128f => "slh-dsa-128f",
            Algorithm::MlKem768 => "ml-kem-768",
            Algorithm::MlKem1024 => "ml-kem-1024",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "secp256k1" => Some(Algorithm::Secp256k1),
            "bls12-381" | "bls" => Some(Algorithm::Bls12381),
            "ml-dsa-44" => Some(Algorithm::MlDsa44),
            "ml-dsa-65" => Some(Algorithm::MlDsa65),
            "ml-dsa-87" => Some(Algorithm::MlDsa87),
            "slh-dsa-128f" => Some(Algorithm::SlhDsa128f),
            "ml-kem-768" => Some(Algorithm::MlKem768),
            "ml-kem-1024" => Some(Algorithm::MlKem1024),
            _ => None,
        }
    }

    /// Size table for signature schemes; `None` for KEMs.
    pub fn sig_sizes(self) -> Option<SigSizes> {
        match self {
            Algorithm::Secp256k1 => Some(SigSizes {
                private_key: 32,
                public_key: 33,
                signature: 64,
            }),
            Algorithm::Bls12381 => Some(SigSizes {
                private_key: 32,
                public_key: 48,
                signature: 96,
            }),
            Algorithm::MlDsa44 => Some(SigSizes {
                private_key: 2560,
                public_key: 1312,
                signature: 2420,
            }),
            Algorithm::MlDsa65 => Some(SigSizes {
                private_key: 4032,
                public_key: 1952,
                signature: 3309,
            }),
            Algorithm::MlDsa87 => Some(SigSizes {
                private_key: 4864,
                public_key: 2592,
                signature: 4627,
            }),
            Algorithm::SlhDsa128f => Some(SigSizes {
                private_key: 64,
                public_key: 32,
                signature: 17088,
            }),
            Algorithm::MlKem768 | Algorithm::MlKem1024 => None,
        }
    }

    /// Size table for KEMs; `None` for signature schemes.
    pub fn kem_sizes(self) -> Option<KemSizes> {
        match self {
            Algorithm::MlKem768 => Some(KemSizes {
                secret_key: 2400,
                public_key: 1184,
                ciphertext: 1088,
                shared_secret: 32,
            }),
            Algorithm::MlKem1024 => Some(KemSizes {
                secret_key: 3168,
                public_key: 1568,
                ciphertext: 1568,
                shared_secret: 32,
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Signing side of a held key.
pub trait Signer {
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>>;
}

/// Verification side; `false` means the signature does not check out.
pub trait Verifier {
    fn verify(&self, msg: &[u8], sig: &[u8]) -> bool;
}

/// Key-encapsulation mechanism over raw bytes.
pub trait Kem {
    fn encapsulate(&self, pk: &[u8]) -> Result<(Vec<u8>, Vec<u8>)>;
    fn decapsulate(&self, sk: &[u8], ct: &[u8]) -> Result<Vec<u8>>;
}

/// Reject inputs that violate the scheme's size table.
pub(crate) fn check_len(algorithm: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(KeyError::BadKeyLength {
            algorithm,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for alg in [
            Algorithm::Secp256k1,
            Algorithm::Bls12381,
            Algorithm::MlDsa44,
            Algorithm::MlDsa65,
            Algorithm::MlDsa87,
            Algorithm::SlhDsa128f,
            Algorithm::MlKem768,
            Algorithm::MlKem1024,
        ] {
            assert_eq!(Algorithm::from_name(alg.name()), Some(alg));
        }
        assert_eq!(Algorithm::from_name("ed25519"), None);
    }

    #[test]
    fn size_table_is_exclusive() {
        for alg in [Algorithm::MlKem768, Algorithm::MlKem1024] {
            assert!(alg.sig_sizes().is_none());
            assert!(alg.kem_sizes().is_some());
        }
        for alg in [Algorithm::Secp256k1, Algorithm::MlDsa65] {
            assert!(alg.sig_sizes().is_some());
            assert!(alg.kem_sizes().is_none());
        }
    }

    #[test]
    fn mldsa_sizes_match_fips_204() {
        let s = Algorithm::MlDsa65.sig_sizes().unwrap();
        assert_eq!(
            (s.private_key, s.public_key, s.signature),
            (4032, 1952, 3309)
        );
    }
}
