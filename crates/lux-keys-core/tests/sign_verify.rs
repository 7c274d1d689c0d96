//! Sign/verify across every signature scheme the adapters expose.

use lux_keys_core::primitives::{bls, mldsa, secp256k1, slhdsa};
use lux_keys_core::KeySet;

const VECTOR: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

#[test]
fn every_scheme_signs_and_rejects_mutation() {
    let ks = KeySet::derive("v1", VECTOR, 0).unwrap();
    let msg = b"validator heartbeat 42";
    let wrong = b"validator heartbeat 43";

    // secp256k1
    let ec = ks.ec().unwrap();
    let sig = ec.sign(msg).unwrap();
    assert!(secp256k1::verify(&ec.public_compressed(), msg, &sig));
    assert!(!secp256k1::verify(&ec.public_compressed(), wrong, &sig));

    // BLS12-381
    let bls_pair = ks.bls().unwrap();
    let sig = bls_pair.sign(msg);
    assert!(bls::verify(&bls_pair.public(), msg, &sig));
    assert!(!bls::verify(&bls_pair.public(), wrong, &sig));

    // ML-DSA-65
    let mldsa_pair = ks.mldsa().unwrap();
    let sig = mldsa_pair.sign(msg).unwrap();
    assert!(mldsa::verify(&mldsa_pair.public_bytes(), msg, &sig));
    assert!(!mldsa::verify(&mldsa_pair.public_bytes(), wrong, &sig));

    // SLH-DSA-128f (not part of the HD bundle; generated standalone)
    let slh = slhdsa::SlhDsaKeyPair::generate();
    let sig = slh.sign(msg).unwrap();
    assert!(slhdsa::verify(&slh.public_bytes(), msg, &sig));
    assert!(!slhdsa::verify(&slh.public_bytes(), wrong, &sig));
}

#[test]
fn signatures_do_not_verify_under_foreign_keys() {
    let ks_a = KeySet::derive("a", VECTOR, 0).unwrap();
    let ks_b = KeySet::derive("b", VECTOR, 1).unwrap();
    let msg = b"cross-key check";

    let sig = ks_a.ec().unwrap().sign(msg).unwrap();
    assert!(!secp256k1::verify(
        &ks_b.ec().unwrap().public_compressed(),
        msg,
        &sig
    ));

    let sig = ks_a.bls().unwrap().sign(msg);
    assert!(!bls::verify(&ks_b.bls().unwrap().public(), msg, &sig));

    let sig = ks_a.mldsa().unwrap().sign(msg).unwrap();
    assert!(!mldsa::verify(
        &ks_b.mldsa().unwrap().public_bytes(),
        msg,
        &sig
    ));
}

#[test]
fn truncated_signatures_fail_closed() {
    let ks = KeySet::derive("v1", VECTOR, 0).unwrap();
    let msg = b"m";

    let sig = ks.ec().unwrap().sign(msg).unwrap();
    assert!(!secp256k1::verify(
        &ks.ec().unwrap().public_compressed(),
        msg,
        &sig[..sig.len() - 1]
    ));

    let sig = ks.mldsa().unwrap().sign(msg).unwrap();
    assert!(!mldsa::verify(
        &ks.mldsa().unwrap().public_bytes(),
        msg,
        &sig[..100]
    ));
}
