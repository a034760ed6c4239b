//! Cryptographic hash functions
//!
//! SHA-256 derives the AES key and the ClientHello random "goal".
//! HMAC-SHA1 is the PRF of the HMAC-DRBG in [`super::drbg`]; the peer
//! regenerates seeded fields with the same construction, so it cannot be
//! swapped for a stronger hash without breaking interoperability.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};

type HmacSha1 = Hmac<Sha1>;

/// SHA-1 output length, also the DRBG key/state length.
pub const SHA1_LEN: usize = 20;

/// SHA-256
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 over several parts without concatenating them first
pub fn sha256_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// HMAC-SHA1 over several parts
pub fn sha1_hmac_parts(key: &[u8], parts: &[&[u8]]) -> [u8; SHA1_LEN] {
    let mut mac = HmacSha1::new_from_slice(key)
        .expect("HMAC accepts any key length");
    for part in parts {
        mac.update(part);
    }
    mac.finalize().into_bytes().into()
}
