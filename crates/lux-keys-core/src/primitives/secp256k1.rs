//! secp256k1 adapter: ECDSA signing plus the Keccak-256 account address.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use zeroize::Zeroizing;

use super::{check_len, Algorithm};
use crate::error::{KeyError, Result};

pub const PRIVATE_KEY_LEN: usize = 32;
pub const PUBLIC_KEY_COMPRESSED_LEN: usize = 33;
pub const PUBLIC_KEY_UNCOMPRESSED_LEN: usize = 65;
pub const ADDRESS_LEN: usize = 20;

/// A secp256k1 key pair held as the raw scalar.
#[derive(Clone)]
pub struct EcKeyPair {
    signing: SigningKey,
}

impl EcKeyPair {
    /// Accepts a 32-byte scalar in curve order. The zero scalar and values
    /// past the order are rejected by `k256` itself.
    pub fn from_scalar_bytes(bytes: &[u8]) -> Result<Self> {
        check_len(Algorithm::Secp256k1.name(), PRIVATE_KEY_LEN, bytes.len())?;
        let signing = SigningKey::from_slice(bytes).map_err(|_| KeyError::BadKeyLength {
            algorithm: Algorithm::Secp256k1.name(),
            expected: PRIVATE_KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(EcKeyPair { signing })
    }

    pub fn scalar_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LEN]> {
        let mut out = [0u8; PRIVATE_KEY_LEN];
        out.copy_from_slice(&self.signing.to_bytes());
        Zeroizing::new(out)
    }

    pub fn public_compressed(&self) -> [u8; PUBLIC_KEY_COMPRESSED_LEN] {
        let point = self.signing.verifying_key().to_encoded_point(true);
        let mut out = [0u8; PUBLIC_KEY_COMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    pub fn public_uncompressed(&self) -> [u8; PUBLIC_KEY_UNCOMPRESSED_LEN] {
        let point = self.signing.verifying_key().to_encoded_point(false);
        let mut out = [0u8; PUBLIC_KEY_UNCOMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Last 20 bytes of Keccak-256 over the uncompressed public key without
    /// its 0x04 tag.
    pub fn address(&self) -> [u8; ADDRESS_LEN] {
        address_of_uncompressed(&self.public_uncompressed())
    }

    pub fn address_hex(&self) -> String {
        format!("0x{}", hex::encode(self.address()))
    }

    /// ECDSA over SHA-256 of the message; 64-byte fixed encoding.
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let digest = Sha256::digest(msg);
        let sig: Signature = self
            .signing
            .sign_prehash(&digest)
            .map_err(|e| KeyError::InternalInvariant(format!("ecdsa sign: {e}")))?;
        Ok(sig.to_bytes().to_vec())
    }
}

impl super::Signer for EcKeyPair {
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        EcKeyPair::sign(self, msg)
    }
}

impl super::Verifier for EcKeyPair {
    fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
        verify(&self.public_compressed(), msg, sig)
    }
}

/// Stateless verification against a SEC1-encoded public key.
pub fn verify(public: &[u8], msg: &[u8], sig: &[u8]) -> bool {
    let Ok(vk) = VerifyingKey::from_sec1_bytes(public) else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(sig) else {
        return false;
    };
    let digest = Sha256::digest(msg);
    vk.verify_prehash(&digest, &sig).is_ok()
}

pub fn address_of_uncompressed(uncompressed: &[u8; PUBLIC_KEY_UNCOMPRESSED_LEN]) -> [u8; ADDRESS_LEN] {
    let hash = Keccak256::digest(&uncompressed[1..]);
    let mut out = [0u8; ADDRESS_LEN];
    out.copy_from_slice(&hash[12..32]);
    out
}
