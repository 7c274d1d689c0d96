//! Ring signing end-to-end over key-set material: sign with one member,
//! verify against the ring, link by key image (the "hello"/"world"
//! scenario), for both schemes.

use lux_keys_core::ring::{self, RingScheme};
use lux_keys_core::KeySet;

const VECTOR: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn ec_ring() -> (Vec<Vec<u8>>, Vec<[u8; 32]>) {
    let mut ring = Vec::new();
    let mut secrets = Vec::new();
    for index in 0..3 {
        let ks = KeySet::derive(&format!("member-{index}"), VECTOR, index).unwrap();
        ring.push(ks.publics().unwrap().ringtail_public.to_vec());
        secrets.push(*ks.ringtail_scalar().unwrap());
    }
    (ring, secrets)
}

#[test]
fn lsag_hello_world_linkability() {
    let (ring, secrets) = ec_ring();

    let sig_a = ring::sign(RingScheme::Lsag, b"hello", &ring, 1, &secrets[1]).unwrap();
    let sig_b = ring::sign(RingScheme::Lsag, b"world", &ring, 1, &secrets[1]).unwrap();

    assert!(ring::verify(b"hello", &ring, &sig_a));
    assert!(!ring::verify(b"hello", &ring, &sig_b));
    assert!(ring::verify(b"world", &ring, &sig_b));

    // Same signer, different messages: identical key image.
    assert_eq!(sig_a.key_image, sig_b.key_image);
    assert_eq!(sig_a.key_image.len(), 32);

    // Different signer: different key image.
    let sig_c = ring::sign(RingScheme::Lsag, b"hello", &ring, 0, &secrets[0]).unwrap();
    assert_ne!(sig_c.key_image, sig_a.key_image);
}

#[test]
fn lsag_signature_serializes_and_survives_json() {
    let (ring, secrets) = ec_ring();
    let sig = ring::sign(RingScheme::Lsag, b"payload", &ring, 2, &secrets[2]).unwrap();
    let json = serde_json::to_string(&sig).unwrap();
    let back: ring::RingSignature = serde_json::from_str(&json).unwrap();
    assert!(ring::verify(b"payload", &ring, &back));
}

#[test]
fn lattice_ring_over_mldsa_keys() {
    let mut ring = Vec::new();
    let mut seeds = Vec::new();
    for index in 0..3 {
        let ks = KeySet::derive(&format!("member-{index}"), VECTOR, index).unwrap();
        ring.push(ks.publics().unwrap().mldsa_public.clone());
        seeds.push(*ks.mldsa_seed().unwrap());
    }

    let sig_a = ring::sign(RingScheme::LatticeLsag, b"hello", &ring, 1, &seeds[1]).unwrap();
    assert!(ring::verify(b"hello", &ring, &sig_a));
    assert!(!ring::verify(b"world", &ring, &sig_a));
    assert_eq!(sig_a.key_image.len(), 48);

    let sig_b = ring::sign(RingScheme::LatticeLsag, b"world", &ring, 1, &seeds[1]).unwrap();
    assert_eq!(sig_a.key_image, sig_b.key_image);

    let helper = ring::key_image(RingScheme::LatticeLsag, &seeds[1]).unwrap();
    assert_eq!(helper, sig_a.key_image);
}

#[test]
fn cross_scheme_signatures_do_not_verify() {
    let (ec_ring, ec_secrets) = ec_ring();
    let sig = ring::sign(RingScheme::Lsag, b"m", &ec_ring, 0, &ec_secrets[0]).unwrap();

    let mut forged = sig.clone();
    forged.scheme = RingScheme::LatticeLsag;
    assert!(!ring::verify(b"m", &ec_ring, &forged));
}

#[test]
fn verification_tolerates_garbage_without_panicking() {
    let (ring, secrets) = ec_ring();
    let mut sig = ring::sign(RingScheme::Lsag, b"m", &ring, 0, &secrets[0]).unwrap();

    sig.key_image = vec![0xee; 32];
    assert!(!ring::verify(b"m", &ring, &sig));

    sig.key_image = vec![0xee; 5];
    assert!(!ring::verify(b"m", &ring, &sig));

    let bad_ring: Vec<Vec<u8>> = vec![vec![1, 2, 3], vec![4, 5, 6]];
    let sig2 = ring::sign(RingScheme::Lsag, b"m", &ring, 0, &secrets[0]).unwrap();
    assert!(!ring::verify(b"m", &bad_ring, &sig2));
}
