//! ML-DSA-65 adapter (FIPS 204). Key generation is seeded with the 32-byte
//! `xi` so the pair is reproducible from HD-derived material; signing uses
//! the deterministic variant with an empty context string.

use ml_dsa::{
    B32, EncodedSignature, EncodedSigningKey, EncodedVerifyingKey, KeyGen, MlDsa65, Signature,
    SigningKey, VerifyingKey,
};
use zeroize::Zeroizing;

use super::{check_len, Algorithm};
use crate::error::{KeyError, Result};

pub const SEED_LEN: usize = 32;
pub const PRIVATE_KEY_LEN: usize = 4032;
pub const PUBLIC_KEY_LEN: usize = 1952;
pub const SIGNATURE_LEN: usize = 3309;

pub struct MlDsaKeyPair {
    signing: SigningKey<MlDsa65>,
    verifying: VerifyingKey<MlDsa65>,
}

impl MlDsaKeyPair {
    /// Deterministic KeyGen from the 32-byte `xi` seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        check_len(Algorithm::MlDsa65.name(), SEED_LEN, seed.len())?;
        let mut xi = B32::default();
        xi.copy_from_slice(seed);
        let pair = MlDsa65::key_gen_internal(&xi);
        let verifying: &VerifyingKey<MlDsa65> = pair.as_ref();
        Ok(MlDsaKeyPair {
            signing: pair.signing_key().clone(),
            verifying: verifying.clone(),
        })
    }

    /// Rehydrate from the expanded 4032-byte signing key. The verifying key
    /// is recomputed, not trusted from the caller.
    pub fn from_private_bytes(private: &[u8], public: &[u8]) -> Result<Self> {
        check_len(Algorithm::MlDsa65.name(), PRIVATE_KEY_LEN, private.len())?;
        check_len(Algorithm::MlDsa65.name(), PUBLIC_KEY_LEN, public.len())?;
        let sk_enc = EncodedSigningKey::<MlDsa65>::try_from(private)
            .map_err(|_| KeyError::CorruptKeystore)?;
        let pk_enc = EncodedVerifyingKey::<MlDsa65>::try_from(public)
            .map_err(|_| KeyError::CorruptKeystore)?;
        Ok(MlDsaKeyPair {
            signing: SigningKey::decode(&sk_enc),
            verifying: VerifyingKey::decode(&pk_enc),
        })
    }

    pub fn private_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.signing.encode().to_vec())
    }

    pub fn public_bytes(&self) -> Vec<u8> {
        self.verifying.encode().to_vec()
    }

    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let sig = self
            .signing
            .sign_deterministic(msg, &[])
            .map_err(|e| KeyError::InternalInvariant(format!("ml-dsa sign: {e}")))?;
        Ok(sig.encode().to_vec())
    }
}

impl super::Signer for MlDsaKeyPair {
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        MlDsaKeyPair::sign(self, msg)
    }
}

impl super::Verifier for MlDsaKeyPair {
    fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
        verify(&self.public_bytes(), msg, sig)
    }
}

pub fn verify(public: &[u8], msg: &[u8], sig: &[u8]) -> bool {
    let Ok(pk_enc) = EncodedVerifyingKey::<MlDsa65>::try_from(public) else {
        return false;
    };
    let Ok(sig_enc) = EncodedSignature::<MlDsa65>::try_from(sig) else {
        return false;
    };
    let Some(sig) = Signature::<MlDsa65>::decode(&sig_enc) else {
        return false;
    };
    VerifyingKey::<MlDsa65>::decode(&pk_enc).verify_with_context(msg, &[], &sig)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_keygen_is_deterministic() {
        let a = MlDsaKeyPair::from_seed(&[5u8; 32]).unwrap();
        let b = MlDsaKeyPair::from_seed(&[5u8; 32]).unwrap();
        assert_eq!(*a.private_bytes(), *b.private_bytes());
        assert_eq!(a.public_bytes(), b.public_bytes());
    }

    #[test]
    fn fixed_sizes() {
        let kp = MlDsaKeyPair::from_seed(&[1u8; 32]).unwrap();
        assert_eq!(kp.private_bytes().len(), PRIVATE_KEY_LEN);
        assert_eq!(kp.public_bytes().len(), PUBLIC_KEY_LEN);
        let sig = kp.sign(b"m").unwrap();
        assert_eq!(sig.len(), SIGNATURE_LEN);
    }

    #[test]
    fn sign_verify_round_trip() {
        let kp = MlDsaKeyPair::from_seed(&[2u8; 32]).unwrap();
        let sig = kp.sign(b"block-hash").unwrap();
        assert!(verify(&kp.public_bytes(), b"block-hash", &sig));
        assert!(!verify(&kp.public_bytes(), b"other", &sig));
    }

    #[test]
    fn private_bytes_round_trip() {
        let kp = MlDsaKeyPair::from_seed(&[3u8; 32]).unwrap();
        let back =
            MlDsaKeyPair::from_private_bytes(&kp.private_bytes(), &kp.public_bytes()).unwrap();
        let sig = back.sign(b"resume").unwrap();
        assert!(verify(&kp.public_bytes(), b"resume", &sig));
    }
}
