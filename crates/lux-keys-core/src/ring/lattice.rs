//! Hash-chain LSAG over ML-DSA-65 key material.
//!
//! The ring structure mirrors the elliptic-curve scheme, but commitments
//! are SHAKE-256 bindings over the members' polynomial-coefficient
//! encodings instead of curve points: each slot's commitment opens under
//! `z_i XOR mask(c_i, I)`, and only the holder of the secret can pick the
//! signer-slot opening before the challenge chain closes around the ring.
//! The 48-byte key image is a pure function of the private key, which is
//! what gives linkability.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

use super::{RingScheme, RingSignature};
use crate::error::{KeyError, Result};
use crate::primitives::mldsa;

pub const KEY_IMAGE_LEN: usize = 48;
pub const RESPONSE_LEN: usize = 32;

const KI_TAG: &[u8] = b"LSAG-KI";
const DOM_RING: &[u8] = b"LUX:LLSAG:ring:v1";
const DOM_MASK: &[u8] = b"LUX:LLSAG:mask:v1";
const DOM_COMMIT: &[u8] = b"LUX:LLSAG:commit:v1";
const DOM_CHALLENGE: &[u8] = b"LUX:LLSAG:challenge:v1";

fn shake(parts: &[&[u8]], out: &mut [u8]) {
    let mut h = Shake256::default();
    for part in parts {
        h.update(part);
    }
    h.finalize_xof().read(out);
}

/// `SHAKE-256(mldsa_priv || "LSAG-KI")`, 48 bytes.
pub fn key_image(secret: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; KEY_IMAGE_LEN];
    shake(&[secret, KI_TAG], &mut out);
    out
}

fn ring_digest(ring: &[Vec<u8>]) -> [u8; 32] {
    let mut h = Shake256::default();
    h.update(DOM_RING);
    h.update(&(ring.len() as u64).to_le_bytes());
    for pk in ring {
        h.update(pk);
    }
    let mut out = [0u8; 32];
    h.finalize_xof().read(&mut out);
    out
}

fn mask(challenge: &[u8; 32], image: &[u8]) -> [u8; RESPONSE_LEN] {
    let mut out = [0u8; RESPONSE_LEN];
    shake(&[DOM_MASK, challenge, image], &mut out);
    out
}

fn commit(pk: &[u8], opening: &[u8; RESPONSE_LEN]) -> [u8; 32] {
    let mut out = [0u8; 32];
    shake(&[DOM_COMMIT, pk, opening], &mut out);
    out
}

fn next_challenge(msg: &[u8], image: &[u8], rd: &[u8; 32], l: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    shake(&[DOM_CHALLENGE, msg, image, rd, l], &mut out);
    out
}

fn xor(a: &[u8; RESPONSE_LEN], b: &[u8; RESPONSE_LEN]) -> [u8; RESPONSE_LEN] {
    let mut out = [0u8; RESPONSE_LEN];
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *o = x ^ y;
    }
    out
}

pub fn sign(msg: &[u8], ring: &[Vec<u8>], signer_idx: usize, secret: &[u8]) -> Result<RingSignature> {
    let n = ring.len();
    for pk in ring {
        if pk.len() != mldsa::PUBLIC_KEY_LEN {
            return Err(KeyError::BadRingMember);
        }
    }
    // The secret must correspond to the claimed slot: regenerate the pair
    // from its seed and compare publics.
    if secret.len() != mldsa::SEED_LEN {
        return Err(KeyError::BadKeyLength {
            algorithm: "ml-dsa-65",
            expected: mldsa::SEED_LEN,
            actual: secret.len(),
        });
    }
    let pair = mldsa::MlDsaKeyPair::from_seed(secret)?;
    if pair.public_bytes() != ring[signer_idx] {
        return Err(KeyError::SignerNotInRing);
    }

    let image = key_image(secret);
    let rd = ring_digest(ring);

    let mut alpha = [0u8; RESPONSE_LEN];
    getrandom::getrandom(&mut alpha)
        .map_err(|_| KeyError::InternalInvariant("os entropy".to_string()))?;

    let mut challenges = vec![[0u8; 32]; n];
    let mut responses = vec![[0u8; RESPONSE_LEN]; n];

    let l_signer = commit(&ring[signer_idx], &alpha);
    challenges[(signer_idx + 1) % n] = next_challenge(msg, &image, &rd, &l_signer);

    for step in 1..n {
        let i = (signer_idx + step) % n;
        getrandom::getrandom(&mut responses[i])
            .map_err(|_| KeyError::InternalInvariant("os entropy".to_string()))?;
        let opening = xor(&responses[i], &mask(&challenges[i], &image));
        let l = commit(&ring[i], &opening);
        challenges[(i + 1) % n] = next_challenge(msg, &image, &rd, &l);
    }

    responses[signer_idx] = xor(&alpha, &mask(&challenges[signer_idx], &image));

    Ok(RingSignature {
        scheme: RingScheme::LatticeLsag,
        key_image: image,
        challenge: challenges[0],
        responses,
    })
}

pub fn verify(msg: &[u8], ring: &[Vec<u8>], sig: &RingSignature) -> bool {
    for pk in ring {
        if pk.len() != mldsa::PUBLIC_KEY_LEN {
            return false;
        }
    }
    let rd = ring_digest(ring);
    let mut c = sig.challenge;
    for (pk, z) in ring.iter().zip(sig.responses.iter()) {
        let opening = xor(z, &mask(&c, &sig.key_image));
        let l = commit(pk, &opening);
        c = next_challenge(msg, &sig.key_image, &rd, &l);
    }
    c == sig.challenge
}
