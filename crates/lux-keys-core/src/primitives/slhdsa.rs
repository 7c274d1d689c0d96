//! SLH-DSA-SHA2-128f adapter (FIPS 205). Stateless hash-based signatures;
//! used for long-horizon attestations where lattice assumptions are not
//! wanted. Keys are not part of the HD bundle.

use rand::rngs::OsRng;
use slh_dsa::{Sha2_128f, Signature, SigningKey, VerifyingKey};
use zeroize::Zeroizing;

use super::{check_len, Algorithm};
use crate::error::{KeyError, Result};

pub const PRIVATE_KEY_LEN: usize = 64;
pub const PUBLIC_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 17088;

pub struct SlhDsaKeyPair {
    signing: SigningKey<Sha2_128f>,
}

impl SlhDsaKeyPair {
    pub fn generate() -> Self {
        SlhDsaKeyPair {
            signing: SigningKey::new(&mut OsRng),
        }
    }

    pub fn from_private_bytes(private: &[u8]) -> Result<Self> {
        check_len(Algorithm::SlhDsa128f.name(), PRIVATE_KEY_LEN, private.len())?;
        let signing = SigningKey::try_from(private).map_err(|_| KeyError::BadKeyLength {
            algorithm: Algorithm::SlhDsa128f.name(),
            expected: PRIVATE_KEY_LEN,
            actual: private.len(),
        })?;
        Ok(SlhDsaKeyPair { signing })
    }

    pub fn private_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.signing.to_bytes().to_vec())
    }

    /// The FIPS 205 encoding puts `pk_seed || pk_root` in the tail of the
    /// secret key, so the public half is the last 32 bytes.
    pub fn public_bytes(&self) -> Vec<u8> {
        self.signing.to_bytes()[PRIVATE_KEY_LEN - PUBLIC_KEY_LEN..].to_vec()
    }

    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let sig = self
            .signing
            .try_sign_with_context(msg, &[], None)
            .map_err(|e| KeyError::InternalInvariant(format!("slh-dsa sign: {e}")))?;
        Ok(sig.to_bytes().to_vec())
    }
}

impl super::Signer for SlhDsaKeyPair {
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        SlhDsaKeyPair::sign(self, msg)
    }
}

impl super::Verifier for SlhDsaKeyPair {
    fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
        verify(&self.public_bytes(), msg, sig)
    }
}

pub fn verify(public: &[u8], msg: &[u8], sig: &[u8]) -> bool {
    let Ok(vk) = VerifyingKey::<Sha2_128f>::try_from(public) else {
        return false;
    };
    let Ok(sig) = Signature::<Sha2_128f>::try_from(sig) else {
        return false;
    };
    vk.try_verify_with_context(msg, &[], &sig).is_ok()
}
