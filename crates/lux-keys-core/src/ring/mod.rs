//! Linkable spontaneous anonymous group signatures.
//!
//! Two schemes share one wire shape: the elliptic-curve LSAG over secp256k1
//! ring keys and the hash-chain lattice variant over ML-DSA keys. A key
//! image is deterministic per secret, so two signatures by the same signer
//! link; nothing in a signature or an error identifies which ring slot
//! signed.

mod lattice;
mod lsag;

use serde::{Deserialize, Serialize};

use crate::error::{KeyError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RingScheme {
    Lsag,
    LatticeLsag,
}

impl RingScheme {
    pub fn name(self) -> &'static str {
        match self {
            RingScheme::Lsag => "lsag",
            RingScheme::LatticeLsag => "lattice-lsag",
        }
    }

    pub fn key_image_len(self) -> usize {
        match self {
            RingScheme::Lsag => lsag::KEY_IMAGE_LEN,
            RingScheme::LatticeLsag => lattice::KEY_IMAGE_LEN,
        }
    }
}

impl std::fmt::Display for RingScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Wire form of a ring signature: scheme tag, key image, the challenge seed
/// `c_0` and one response per ring member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingSignature {
    pub scheme: RingScheme,
    #[serde(with = "serde_bytes")]
    pub key_image: Vec<u8>,
    pub challenge: [u8; 32],
    pub responses: Vec<[u8; 32]>,
}

/// Sign `msg` with the secret sitting at `signer_idx` of `ring`.
///
/// Ring members are scheme-native public keys: 33-byte compressed SEC1
/// points for LSAG, ML-DSA-65 verifying keys for the lattice scheme.
pub fn sign(
    scheme: RingScheme,
    msg: &[u8],
    ring: &[Vec<u8>],
    signer_idx: usize,
    secret: &[u8],
) -> Result<RingSignature> {
    if ring.len() < 2 {
        return Err(KeyError::RingTooSmall);
    }
    if signer_idx >= ring.len() {
        return Err(KeyError::SignerNotInRing);
    }
    match scheme {
        RingScheme::Lsag => lsag::sign(msg, ring, signer_idx, secret),
        RingScheme::LatticeLsag => lattice::sign(msg, ring, signer_idx, secret),
    }
}

/// Verification never errors on malformed input; it just fails.
pub fn verify(msg: &[u8], ring: &[Vec<u8>], sig: &RingSignature) -> bool {
    if ring.len() < 2 || sig.responses.len() != ring.len() {
        return false;
    }
    if sig.key_image.len() != sig.scheme.key_image_len() {
        return false;
    }
    match sig.scheme {
        RingScheme::Lsag => lsag::verify(msg, ring, sig),
        RingScheme::LatticeLsag => lattice::verify(msg, ring, sig),
    }
}

/// Deterministic key image for linkability checks outside a signature.
pub fn key_image(scheme: RingScheme, secret: &[u8]) -> Result<Vec<u8>> {
    match scheme {
        RingScheme::Lsag => lsag::key_image(secret),
        RingScheme::LatticeLsag => Ok(lattice::key_image(secret)),
    }
}
