//! Staking-certificate flow through `Core`: generate, persist the node ID,
//! export the signer file.

use lux_keys_core::backend::software::KdfCost;
use lux_keys_core::{export, Core, Paths};

const VECTOR: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn open_core() -> (tempfile::TempDir, Core) {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::with_roots(dir.path().to_path_buf(), dir.path().join("keys"));
    let core = Core::with_paths_and_cost(paths, KdfCost::FAST_INSECURE).unwrap();
    (dir, core)
}

#[test]
fn staker_generation_persists_node_id() {
    let (_dir, core) = open_core();
    core.create("v1", Some(VECTOR), 0, Some("pw")).unwrap();

    let node_id = core.generate_staker("v1", Some("pw")).unwrap();
    assert!(node_id.starts_with("NodeID-"));

    let keyset_dir = core.paths().keyset_dir("v1");
    assert!(keyset_dir.join("staker.crt").exists());
    assert!(keyset_dir.join("staker.key").exists());
    assert_eq!(export::read_node_id(&keyset_dir), Some(node_id.clone()));

    // Node ID survives the envelope round trip.
    let loaded = core.load("v1", Some("pw")).unwrap();
    assert_eq!(loaded.node_id, Some(node_id.clone()));

    // And shows up in the aggregated validator list.
    let raw = std::fs::read_to_string(core.paths().validators_file()).unwrap();
    let rows: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(rows[0]["node_id"], serde_json::json!(node_id));
}

#[test]
fn signer_file_round_trips_through_bls_scalar() {
    let (_dir, core) = open_core();
    let ks = core.create("v1", Some(VECTOR), 0, Some("pw")).unwrap();

    let path = core.paths().keyset_dir("v1").join("signer.key");
    export::write_signer_file(&ks, &path).unwrap();

    let raw = std::fs::read(&path).unwrap();
    let rebuilt = lux_keys_core::primitives::bls::BlsKeyPair::from_scalar_bytes(&raw).unwrap();
    assert_eq!(rebuilt.public(), ks.publics().unwrap().bls_public);
}
