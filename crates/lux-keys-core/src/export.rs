//! Wire-format exports: public JSON envelopes, the PEM staking certificate
//! with its derived node ID, the raw BLS signer file and the aggregated
//! validator list.

use std::fs;
use std::path::Path;

use rand::RngCore;
use rcgen::{
    Certificate, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, KeyPair,
    KeyUsagePurpose, SerialNumber, PKCS_ECDSA_P256_SHA256,
};
use serde::{Deserialize, Serialize};

use crate::error::{KeyError, Result};
use crate::keyset::KeySet;
use crate::security;

pub const STAKER_CERT_FILE: &str = "staker.crt";
pub const STAKER_KEY_FILE: &str = "staker.key";
pub const INFO_FILE: &str = "info.json";
pub const SIGNER_FILE: &str = "signer.key";

const CERT_SUBJECT_CN: &str = "lux.network";
const NODE_ID_PREFIX: &str = "NodeID-";

/// Public-only export shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicExport {
    pub name: String,
    pub ec: EcExport,
    pub bls: BlsExport,
    pub ringtail: RingtailExport,
    pub mldsa: MlDsaExport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EcExport {
    pub address: String,
    pub public_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlsExport {
    pub public_key: String,
    pub proof_of_possession: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RingtailExport {
    pub public_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MlDsaExport {
    pub public_key: String,
}

/// Same shape plus the mnemonic. Callers that print this are expected to
/// warn loudly; the format itself is policy-free.
#[derive(Debug, Serialize)]
pub struct SecretExport {
    #[serde(flatten)]
    pub public: PublicExport,
    pub mnemonic: String,
    pub ec_address: String,
}

pub fn public_export(keyset: &KeySet) -> Result<PublicExport> {
    let p = keyset.publics()?;
    Ok(PublicExport {
        name: keyset.name.clone(),
        ec: EcExport {
            address: p.ec_address.clone(),
            public_key: hex::encode(p.ec_compressed),
        },
        bls: BlsExport {
            public_key: hex::encode(p.bls_public),
            proof_of_possession: hex::encode(p.bls_pop),
        },
        ringtail: RingtailExport {
            public_key: hex::encode(p.ringtail_public),
        },
        mldsa: MlDsaExport {
            public_key: hex::encode(&p.mldsa_public),
        },
        node_id: keyset.node_id.clone(),
    })
}

pub fn secret_export(keyset: &KeySet) -> Result<SecretExport> {
    let public = public_export(keyset)?;
    let ec_address = public.ec.address.clone();
    Ok(SecretExport {
        public,
        mnemonic: keyset.mnemonic()?.to_string(),
        ec_address,
    })
}

/// Raw 32-byte BLS signer file: the derived scalar, not the HKDF seed.
pub fn write_signer_file(keyset: &KeySet, path: &Path) -> Result<()> {
    let scalar = keyset.bls_scalar()?;
    security::atomic_write(path, scalar.as_ref())?;
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct NodeInfo {
    #[serde(rename = "nodeID")]
    node_id: String,
}

/// Node ID, if a staking certificate was generated for this set.
pub fn read_node_id(keyset_dir: &Path) -> Option<String> {
    let data = fs::read_to_string(keyset_dir.join(INFO_FILE)).ok()?;
    serde_json::from_str::<NodeInfo>(&data)
        .ok()
        .map(|info| info.node_id)
}

/// Generate the P-256 self-signed staking certificate, write
/// `staker.crt` / `staker.key` / `info.json` into `keyset_dir`, and return
/// the node ID.
///
/// Certificate profile: random 128-bit serial, NotAfter one century out,
/// KeyUsage digitalSignature, EKU serverAuth, CN `lux.network`. The node ID
/// is the hex of the first 20 bytes of the SubjectPublicKeyInfo DER.
pub fn generate_staker_cert(keyset_dir: &Path) -> Result<String> {
    let keypair = KeyPair::generate(&PKCS_ECDSA_P256_SHA256)
        .map_err(|e| KeyError::InternalInvariant(format!("staker keygen: {e}")))?;
    let node_id = node_id_of_spki(&keypair.public_key_der());

    let mut serial = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut serial);

    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, CERT_SUBJECT_CN);

    let mut params = CertificateParams::new(Vec::new());
    params.alg = &PKCS_ECDSA_P256_SHA256;
    params.key_pair = Some(keypair);
    params.distinguished_name = dn;
    params.serial_number = Some(SerialNumber::from(serial.to_vec()));
    params.not_before = time::OffsetDateTime::now_utc();
    params.not_after = params.not_before + time::Duration::days(365 * 100);
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    let cert = Certificate::from_params(params)
        .map_err(|e| KeyError::InternalInvariant(format!("staker cert: {e}")))?;
    let cert_pem = cert
        .serialize_pem()
        .map_err(|e| KeyError::InternalInvariant(format!("staker cert pem: {e}")))?;
    let key_pem = cert.serialize_private_key_pem();

    security::create_private_dir(keyset_dir)?;
    security::atomic_write(&keyset_dir.join(STAKER_CERT_FILE), cert_pem.as_bytes())?;
    security::atomic_write(&keyset_dir.join(STAKER_KEY_FILE), key_pem.as_bytes())?;
    let info = serde_json::to_string_pretty(&NodeInfo {
        node_id: node_id.clone(),
    })?;
    security::atomic_write(&keyset_dir.join(INFO_FILE), info.as_bytes())?;
    tracing::info!(%node_id, "staking certificate generated");
    Ok(node_id)
}

pub fn node_id_of_spki(spki_der: &[u8]) -> String {
    let take = spki_der.len().min(20);
    format!("{NODE_ID_PREFIX}{}", hex::encode(&spki_der[..take]))
}

/// One row of `mainnet_validators.json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidatorEntry {
    pub name: String,
    pub ec_address: String,
    pub bls_public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

/// Rewrite the aggregated validator list with `entry` upserted (or removed
/// when `entry` is `None` and `remove_name` names a row).
pub fn update_validators_file(
    path: &Path,
    entry: Option<ValidatorEntry>,
    remove_name: Option<&str>,
) -> Result<()> {
    let mut rows: Vec<ValidatorEntry> = if path.exists() {
        serde_json::from_str(&fs::read_to_string(path)?)?
    } else {
        Vec::new()
    };
    if let Some(name) = remove_name {
        rows.retain(|row| row.name != name);
    }
    if let Some(entry) = entry {
        rows.retain(|row| row.name != entry.name);
        rows.push(entry);
    }
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    let data = serde_json::to_string_pretty(&rows)?;
    security::atomic_write(path, data.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VECTOR: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn public_export_shape() {
        let ks = KeySet::derive("v1", VECTOR, 0).unwrap();
        let json = serde_json::to_value(public_export(&ks).unwrap()).unwrap();
        assert_eq!(json["name"], "v1");
        assert!(json["ec"]["address"].as_str().unwrap().starts_with("0x"));
        assert_eq!(json["bls"]["public_key"].as_str().unwrap().len(), 96);
        assert_eq!(
            json["bls"]["proof_of_possession"].as_str().unwrap().len(),
            192
        );
        assert_eq!(json["mldsa"]["public_key"].as_str().unwrap().len(), 1952 * 2);
        assert!(json.get("mnemonic").is_none());
    }

    #[test]
    fn secret_export_includes_mnemonic() {
        let ks = KeySet::derive("v1", VECTOR, 0).unwrap();
        let json = serde_json::to_value(secret_export(&ks).unwrap()).unwrap();
        assert_eq!(json["mnemonic"], VECTOR);
        assert_eq!(json["ec_address"], json["ec"]["address"]);
    }

    #[test]
    fn staker_cert_and_node_id() {
        let dir = tempfile::tempdir().unwrap();
        let node_id = generate_staker_cert(dir.path()).unwrap();
        assert!(node_id.starts_with(NODE_ID_PREFIX));
        assert_eq!(node_id.len(), NODE_ID_PREFIX.len() + 40);

        let pem = fs::read_to_string(dir.path().join(STAKER_CERT_FILE)).unwrap();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----"));
        let key_pem = fs::read_to_string(dir.path().join(STAKER_KEY_FILE)).unwrap();
        assert!(key_pem.contains("PRIVATE KEY"));

        assert_eq!(read_node_id(dir.path()), Some(node_id));
    }

    #[test]
    fn signer_file_is_raw_scalar() {
        let dir = tempfile::tempdir().unwrap();
        let ks = KeySet::derive("v1", VECTOR, 0).unwrap();
        let path = dir.path().join(SIGNER_FILE);
        write_signer_file(&ks, &path).unwrap();
        let raw = fs::read(&path).unwrap();
        assert_eq!(raw.len(), 32);
        assert_eq!(&raw[..], &ks.bls_scalar().unwrap()[..]);
    }

    #[test]
    fn validators_file_upsert_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mainnet_validators.json");
        for name in ["bravo", "alpha"] {
            update_validators_file(
                &path,
                Some(ValidatorEntry {
                    name: name.to_string(),
                    ec_address: "0x00".to_string(),
                    bls_public_key: "aa".to_string(),
                    node_id: None,
                }),
                None,
            )
            .unwrap();
        }
        let rows: Vec<ValidatorEntry> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "alpha");

        update_validators_file(&path, None, Some("alpha")).unwrap();
        let rows: Vec<ValidatorEntry> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "bravo");
    }
}
