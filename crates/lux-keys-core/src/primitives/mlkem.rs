//! ML-KEM adapter (FIPS 203) over the pqcrypto implementation. The
//! threshold service owns the long-lived KEM keys; locally this adapter is
//! used for envelope-style wrapping and for exercising the KEM contract.

use pqcrypto_traits::kem::{Ciphertext, PublicKey, SecretKey, SharedSecret};

use super::{Algorithm, Kem, KemSizes};
use crate::error::{KeyError, Result};

/// ML-KEM at a fixed parameter set, chosen by `Algorithm` variant.
pub struct MlKem {
    level: Algorithm,
}

impl MlKem {
    pub fn new(level: Algorithm) -> Result<Self> {
        if level.kem_sizes().is_none() {
            return Err(KeyError::BadUsage(format!("{level} is not a KEM")));
        }
        Ok(MlKem { level })
    }

    pub fn sizes(&self) -> KemSizes {
        self.level.kem_sizes().expect("constructor checked")
    }

    pub fn keypair(&self) -> (Vec<u8>, Vec<u8>) {
        match self.level {
            Algorithm::MlKem768 => {
                let (pk, sk) = pqcrypto_mlkem::mlkem768::keypair();
                (pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
            }
            _ => {
                let (pk, sk) = pqcrypto_mlkem::mlkem1024::keypair();
                (pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
            }
        }
    }
}

impl Kem for MlKem {
    fn encapsulate(&self, pk: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        let sizes = self.sizes();
        super::check_len(self.level.name(), sizes.public_key, pk.len())?;
        match self.level {
            Algorithm::MlKem768 => {
                let pk = pqcrypto_mlkem::mlkem768::PublicKey::from_bytes(pk)
                    .map_err(|_| bad_len(self.level, sizes.public_key, pk.len()))?;
                let (ss, ct) = pqcrypto_mlkem::mlkem768::encapsulate(&pk);
                Ok((ct.as_bytes().to_vec(), ss.as_bytes().to_vec()))
            }
            _ => {
                let pk = pqcrypto_mlkem::mlkem1024::PublicKey::from_bytes(pk)
                    .map_err(|_| bad_len(self.level, sizes.public_key, pk.len()))?;
                let (ss, ct) = pqcrypto_mlkem::mlkem1024::encapsulate(&pk);
                Ok((ct.as_bytes().to_vec(), ss.as_bytes().to_vec()))
            }
        }
    }

    fn decapsulate(&self, sk: &[u8], ct: &[u8]) -> Result<Vec<u8>> {
        let sizes = self.sizes();
        super::check_len(self.level.name(), sizes.secret_key, sk.len())?;
        super::check_len(self.level.name(), sizes.ciphertext, ct.len())?;
        match self.level {
            Algorithm::MlKem768 => {
                let sk = pqcrypto_mlkem::mlkem768::SecretKey::from_bytes(sk)
                    .map_err(|_| bad_len(self.level, sizes.secret_key, sk.len()))?;
                let ct = pqcrypto_mlkem::mlkem768::Ciphertext::from_bytes(ct)
                    .map_err(|_| bad_len(self.level, sizes.ciphertext, ct.len()))?;
                Ok(pqcrypto_mlkem::mlkem768::decapsulate(&ct, &sk)
                    .as_bytes()
                    .to_vec())
            }
            _ => {
                let sk = pqcrypto_mlkem::mlkem1024::SecretKey::from_bytes(sk)
                    .map_err(|_| bad_len(self.level, sizes.secret_key, sk.len()))?;
                let ct = pqcrypto_mlkem::mlkem1024::Ciphertext::from_bytes(ct)
                    .map_err(|_| bad_len(self.level, sizes.ciphertext, ct.len()))?;
                Ok(pqcrypto_mlkem::mlkem1024::decapsulate(&ct, &sk)
                    .as_bytes()
                    .to_vec())
            }
        }
    }
}

fn bad_len(level: Algorithm, expected: usize, actual: usize) -> KeyError {
    KeyError::BadKeyLength {
        algorithm: level.name(),
        expected,
        actual,
    }
}
