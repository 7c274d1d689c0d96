//! BLS12-381 adapter over `blst` in the minimal-pubkey-size configuration:
//! public keys on G1 (48 B compressed), signatures on G2 (96 B).
//!
//! Key generation is the ciphersuite KeyGen (HKDF mod r) so any external
//! tool fed the same 32-byte IKM reproduces the identical secret scalar.

use blst::min_pk::{PublicKey, SecretKey, Signature};
use blst::BLST_ERROR;
use zeroize::Zeroizing;

use super::{check_len, Algorithm};
use crate::error::{KeyError, Result};

pub const SEED_LEN: usize = 32;
pub const PRIVATE_KEY_LEN: usize = 32;
pub const PUBLIC_KEY_LEN: usize = 48;
pub const SIGNATURE_LEN: usize = 96;

const DST_SIG: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";
const DST_POP: &[u8] = b"BLS_POP_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

pub struct BlsKeyPair {
    sk: SecretKey,
}

impl BlsKeyPair {
    /// Canonical KeyGen from a 32-byte IKM seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        check_len(Algorithm::Bls12381.name(), SEED_LEN, seed.len())?;
        let sk = SecretKey::key_gen(seed, &[])
            .map_err(|_| KeyError::InternalInvariant("bls keygen".to_string()))?;
        Ok(BlsKeyPair { sk })
    }

    /// Rehydrate from the derived 32-byte scalar.
    pub fn from_scalar_bytes(bytes: &[u8]) -> Result<Self> {
        check_len(Algorithm::Bls12381.name(), PRIVATE_KEY_LEN, bytes.len())?;
        let sk = SecretKey::from_bytes(bytes).map_err(|_| KeyError::BadKeyLength {
            algorithm: Algorithm::Bls12381.name(),
            expected: PRIVATE_KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(BlsKeyPair { sk })
    }

    pub fn scalar_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LEN]> {
        Zeroizing::new(self.sk.to_bytes())
    }

    pub fn public(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.sk.sk_to_pk().to_bytes()
    }

    pub fn sign(&self, msg: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.sk.sign(msg, DST_SIG, &[]).to_bytes()
    }

    /// Proof of possession: the secret signing its own public key under the
    /// POP ciphersuite tag.
    pub fn proof_of_possession(&self) -> [u8; SIGNATURE_LEN] {
        let pk = self.public();
        self.sk.sign(&pk, DST_POP, &[]).to_bytes()
    }
}

impl super::Signer for BlsKeyPair {
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        Ok(BlsKeyPair::sign(self, msg).to_vec())
    }
}

impl super::Verifier for BlsKeyPair {
    fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
        verify(&self.public(), msg, sig)
    }
}

pub fn verify(public: &[u8], msg: &[u8], sig: &[u8]) -> bool {
    verify_with_dst(public, msg, sig, DST_SIG)
}

/// Checks a proof of possession produced by [`BlsKeyPair::proof_of_possession`].
pub fn verify_proof_of_possession(public: &[u8], pop: &[u8]) -> bool {
    verify_with_dst(public, public, pop, DST_POP)
}

fn verify_with_dst(public: &[u8], msg: &[u8], sig: &[u8], dst: &[u8]) -> bool {
    let Ok(pk) = PublicKey::from_bytes(public) else {
        return false;
    };
    let Ok(sig) = Signature::from_bytes(sig) else {
        return false;
    };
    sig.verify(true, msg, dst, &[], &pk, true) == BLST_ERROR::BLST_SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keygen_is_deterministic() {
        let a = BlsKeyPair::from_seed(&[0x42u8; 32]).unwrap();
        let b = BlsKeyPair::from_seed(&[0x42u8; 32]).unwrap();
        assert_eq!(*a.scalar_bytes(), *b.scalar_bytes());
        assert_eq!(a.public(), b.public());

        let c = BlsKeyPair::from_seed(&[0x43u8; 32]).unwrap();
        assert_ne!(a.public(), c.public());
    }

    #[test]
    fn scalar_round_trip() {
        let kp = BlsKeyPair::from_seed(&[7u8; 32]).unwrap();
        let back = BlsKeyPair::from_scalar_bytes(kp.scalar_bytes().as_slice()).unwrap();
        assert_eq!(kp.public(), back.public());
    }

    #[test]
    fn sign_verify_and_pop() {
        let kp = BlsKeyPair::from_seed(&[9u8; 32]).unwrap();
        let sig = kp.sign(b"checkpoint");
        assert!(verify(&kp.public(), b"checkpoint", &sig));
        assert!(!verify(&kp.public(), b"checkpoin7", &sig));

        let pop = kp.proof_of_possession();
        assert!(verify_proof_of_possession(&kp.public(), &pop));
        // A plain signature over the pubkey is not a PoP: different DST.
        let not_pop = kp.sign(&kp.public());
        assert!(!verify_proof_of_possession(&kp.public(), &not_pop));
    }
}
