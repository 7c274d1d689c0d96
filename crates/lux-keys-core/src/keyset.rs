//! The key-set bundle: four deterministically-derived key pairs under one
//! name, plus the serialization payload that goes inside the encrypted
//! envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::derive::{self, DerivedMaterial};
use crate::error::{KeyError, Result};
use crate::primitives::{bls::BlsKeyPair, mldsa::MlDsaKeyPair, secp256k1::EcKeyPair};

pub const MAX_NAME_LEN: usize = 64;

/// `[A-Za-z0-9_-]{1,64}`; names become directory names, so nothing else.
pub fn validate_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(KeyError::BadUsage(format!(
            "key set name must match [A-Za-z0-9_-]{{1,{MAX_NAME_LEN}}}"
        )))
    }
}

/// Public halves of the bundle, recomputed from secrets on load.
#[derive(Clone)]
pub struct KeySetPublics {
    pub ec_compressed: [u8; 33],
    pub ec_uncompressed: [u8; 65],
    pub ec_address: String,
    pub bls_public: [u8; 48],
    pub bls_pop: [u8; 96],
    /// Ring key public; currently the EC point under the ring scheme.
    pub ringtail_public: [u8; 33],
    pub mldsa_public: Vec<u8>,
}

/// How the stored 32-byte BLS secret is to be interpreted. Derived sets
/// keep the HKDF seed (so external tools running the canonical KeyGen
/// reproduce the scalar); sets imported from legacy files only ever had the
/// scalar itself.
#[derive(Clone, Copy, PartialEq, Eq)]
enum BlsOrigin {
    Seed,
    Scalar,
}

/// Secret halves. Only present while the set is unlocked.
pub struct KeySetSecrets {
    mnemonic: String,
    ec: EcKeyPair,
    bls_secret: Zeroizing<[u8; 32]>,
    bls_origin: BlsOrigin,
    bls: BlsKeyPair,
    ringtail_scalar: Zeroizing<[u8; 32]>,
    mldsa_seed: Zeroizing<[u8; 32]>,
    mldsa: MlDsaKeyPair,
}

impl Drop for KeySetSecrets {
    fn drop(&mut self) {
        self.mnemonic.zeroize();
    }
}

/// A named key set. Either fully unlocked (secrets plus consistent publics)
/// or locked (metadata only).
pub struct KeySet {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub node_id: Option<String>,
    publics: Option<KeySetPublics>,
    secrets: Option<KeySetSecrets>,
}

impl KeySet {
    /// Build a set from an existing mnemonic at `account_index`.
    pub fn derive(name: &str, mnemonic_phrase: &str, account_index: u32) -> Result<Self> {
        validate_name(name)?;
        let mnemonic = derive::parse_mnemonic(mnemonic_phrase)?;
        let material = derive::derive_account(&mnemonic, "", account_index)?;
        Self::assemble(name, mnemonic.to_string(), material)
    }

    /// Generate a fresh 24-word mnemonic and build the set at index 0.
    pub fn generate(name: &str) -> Result<Self> {
        validate_name(name)?;
        let mnemonic = derive::generate_mnemonic(24)?;
        let material = derive::derive_account(&mnemonic, "", 0)?;
        Self::assemble(name, mnemonic.to_string(), material)
    }

    fn assemble(name: &str, mnemonic: String, material: DerivedMaterial) -> Result<Self> {
        let ec = EcKeyPair::from_scalar_bytes(material.ec_scalar.as_ref())?;
        let bls = BlsKeyPair::from_seed(material.bls_seed.as_ref())?;
        let mldsa = MlDsaKeyPair::from_seed(material.mldsa_seed.as_ref())?;

        let secrets = KeySetSecrets {
            mnemonic,
            ec,
            bls_secret: material.bls_seed.clone(),
            bls_origin: BlsOrigin::Seed,
            bls,
            ringtail_scalar: material.ec_scalar.clone(),
            mldsa_seed: material.mldsa_seed.clone(),
            mldsa,
        };
        let publics = Self::publics_of(&secrets);
        Ok(KeySet {
            name: name.to_string(),
            created_at: Utc::now(),
            node_id: None,
            publics: Some(publics),
            secrets: Some(secrets),
        })
    }

    /// Assemble a set from raw imported material (the legacy-migration
    /// path). There is no mnemonic; the EC scalar and, when present, the
    /// BLS scalar are preserved bit-for-bit. A missing BLS key and the
    /// ML-DSA key are filled in deterministically from the EC scalar so the
    /// set still carries the full bundle.
    pub fn from_imported_parts(
        name: &str,
        ec_scalar: &[u8; 32],
        bls_scalar: Option<&[u8; 32]>,
        node_id: Option<String>,
    ) -> Result<Self> {
        validate_name(name)?;
        let ec = EcKeyPair::from_scalar_bytes(ec_scalar)?;

        let mldsa_seed = derive::import_branch_seed(ec_scalar, derive::ImportBranch::MlDsa);
        let mldsa = MlDsaKeyPair::from_seed(mldsa_seed.as_ref())?;

        let (bls, bls_secret, bls_origin) = match bls_scalar {
            Some(scalar) => (
                BlsKeyPair::from_scalar_bytes(scalar)?,
                Zeroizing::new(*scalar),
                BlsOrigin::Scalar,
            ),
            None => {
                let seed = derive::import_branch_seed(ec_scalar, derive::ImportBranch::Bls);
                let bls = BlsKeyPair::from_seed(seed.as_ref())?;
                let scalar = Zeroizing::new(*bls.scalar_bytes());
                (bls, scalar, BlsOrigin::Scalar)
            }
        };

        let secrets = KeySetSecrets {
            mnemonic: String::new(),
            ec,
            bls_secret,
            bls_origin,
            bls,
            ringtail_scalar: Zeroizing::new(*ec_scalar),
            mldsa_seed,
            mldsa,
        };
        let publics = Self::publics_of(&secrets);
        Ok(KeySet {
            name: name.to_string(),
            created_at: Utc::now(),
            node_id,
            publics: Some(publics),
            secrets: Some(secrets),
        })
    }

    /// Metadata-only view of a set whose envelope has not been opened.
    pub fn locked(name: &str, created_at: DateTime<Utc>, node_id: Option<String>) -> Self {
        KeySet {
            name: name.to_string(),
            created_at,
            node_id,
            publics: None,
            secrets: None,
        }
    }

    fn publics_of(secrets: &KeySetSecrets) -> KeySetPublics {
        KeySetPublics {
            ec_compressed: secrets.ec.public_compressed(),
            ec_uncompressed: secrets.ec.public_uncompressed(),
            ec_address: secrets.ec.address_hex(),
            bls_public: secrets.bls.public(),
            bls_pop: secrets.bls.proof_of_possession(),
            ringtail_public: secrets.ec.public_compressed(),
            mldsa_public: secrets.mldsa.public_bytes(),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.secrets.is_none()
    }

    pub fn publics(&self) -> Result<&KeySetPublics> {
        self.publics
            .as_ref()
            .ok_or_else(|| KeyError::Locked(self.name.clone()))
    }

    pub fn mnemonic(&self) -> Result<&str> {
        Ok(self.secrets()?.mnemonic.as_str())
    }

    pub fn ec(&self) -> Result<&EcKeyPair> {
        Ok(&self.secrets()?.ec)
    }

    pub fn bls(&self) -> Result<&BlsKeyPair> {
        Ok(&self.secrets()?.bls)
    }

    pub fn mldsa(&self) -> Result<&MlDsaKeyPair> {
        Ok(&self.secrets()?.mldsa)
    }

    pub fn ringtail_scalar(&self) -> Result<&[u8; 32]> {
        Ok(&self.secrets()?.ringtail_scalar)
    }

    pub fn mldsa_seed(&self) -> Result<&[u8; 32]> {
        Ok(&self.secrets()?.mldsa_seed)
    }

    /// The 32-byte derived BLS scalar (not the HKDF seed); this is what the
    /// signer-file export writes.
    pub fn bls_scalar(&self) -> Result<Zeroizing<[u8; 32]>> {
        Ok(self.secrets()?.bls.scalar_bytes())
    }

    fn secrets(&self) -> Result<&KeySetSecrets> {
        self.secrets
            .as_ref()
            .ok_or_else(|| KeyError::Locked(self.name.clone()))
    }

    /// Envelope plaintext. Public components are recomputed on load and are
    /// deliberately not stored. The ML-DSA private travels as its 32-byte
    /// keygen seed, the storage form FIPS 204 specifies; the expanded key is
    /// regenerated on load.
    pub(crate) fn to_payload(&self) -> Result<EnvelopePayload> {
        let secrets = self.secrets()?;
        // Imported sets have no mnemonic; for them the BLS bytes are the
        // scalar itself rather than the KeyGen seed, and the empty mnemonic
        // is the discriminator `from_payload` reads back.
        debug_assert_eq!(
            secrets.mnemonic.is_empty(),
            secrets.bls_origin == BlsOrigin::Scalar
        );
        Ok(EnvelopePayload {
            version: ENVELOPE_PAYLOAD_VERSION,
            name: self.name.clone(),
            mnemonic: secrets.mnemonic.clone(),
            ec_priv: secrets.ec.scalar_bytes().to_vec(),
            bls_priv_seed: secrets.bls_secret.to_vec(),
            ringtail_priv: secrets.ringtail_scalar.to_vec(),
            mldsa_priv: secrets.mldsa_seed.to_vec(),
            node_id: self.node_id.clone(),
        })
    }

    pub(crate) fn from_payload(
        payload: EnvelopePayload,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        if payload.version != ENVELOPE_PAYLOAD_VERSION {
            return Err(KeyError::CorruptKeystore);
        }
        if payload.ec_priv.len() != 32
            || payload.bls_priv_seed.len() != 32
            || payload.ringtail_priv.len() != 32
            || payload.mldsa_priv.len() != 32
        {
            return Err(KeyError::CorruptKeystore);
        }

        let ec = EcKeyPair::from_scalar_bytes(&payload.ec_priv)?;
        let bls_origin = if payload.mnemonic.is_empty() {
            BlsOrigin::Scalar
        } else {
            BlsOrigin::Seed
        };
        let bls = match bls_origin {
            BlsOrigin::Seed => BlsKeyPair::from_seed(&payload.bls_priv_seed)?,
            BlsOrigin::Scalar => BlsKeyPair::from_scalar_bytes(&payload.bls_priv_seed)?,
        };
        let mldsa = MlDsaKeyPair::from_seed(&payload.mldsa_priv)?;

        let mut bls_secret = Zeroizing::new([0u8; 32]);
        bls_secret.copy_from_slice(&payload.bls_priv_seed);
        let mut ringtail_scalar = Zeroizing::new([0u8; 32]);
        ringtail_scalar.copy_from_slice(&payload.ringtail_priv);
        let mut mldsa_seed = Zeroizing::new([0u8; 32]);
        mldsa_seed.copy_from_slice(&payload.mldsa_priv);

        let secrets = KeySetSecrets {
            mnemonic: payload.mnemonic.clone(),
            ec,
            bls_secret,
            bls_origin,
            bls,
            ringtail_scalar,
            mldsa_seed,
            mldsa,
        };
        let publics = Self::publics_of(&secrets);
        Ok(KeySet {
            name: payload.name.clone(),
            created_at,
            node_id: payload.node_id.clone(),
            publics: Some(publics),
            secrets: Some(secrets),
        })
    }
}

pub(crate) const ENVELOPE_PAYLOAD_VERSION: u8 = 1;

/// Deterministic binary payload inside the software envelope.
#[derive(Serialize, Deserialize)]
pub(crate) struct EnvelopePayload {
    pub version: u8,
    pub name: String,
    pub mnemonic: String,
    #[serde(with = "serde_bytes")]
    pub ec_priv: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub bls_priv_seed: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub ringtail_priv: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub mldsa_priv: Vec<u8>,
    pub node_id: Option<String>,
}

impl Drop for EnvelopePayload {
    fn drop(&mut self) {
        self.mnemonic.zeroize();
        self.ec_priv.zeroize();
        self.bls_priv_seed.zeroize();
        self.ringtail_priv.zeroize();
        self.mldsa_priv.zeroize();
    }
}
