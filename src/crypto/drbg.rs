//! HMAC-DRBG (NIST SP 800-90A, HMAC-SHA1 instantiation)
//!
//! The same construction backs both the secure generator (seeded from OS
//! entropy) and the seeded generator whose output the peer must be able to
//! recompute from an 8-byte seed.

use zeroize::Zeroize;

use super::hash::{sha1_hmac_parts, SHA1_LEN};

/// Largest single generate request, in bytes.
pub const MAX_REQUEST: usize = 1024;

/// Generate requests allowed before a reseed is required.
pub const RESEED_INTERVAL: u64 = 10_000;

/// Generator refused to produce output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrbgError {
    /// Reseed counter exhausted; caller must reseed with fresh entropy
    ReseedRequired,
}

impl std::fmt::Display for DrbgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReseedRequired => write!(f, "HMAC-DRBG reseed required"),
        }
    }
}

impl std::error::Error for DrbgError {}

pub struct HmacDrbg {
    key: [u8; SHA1_LEN],
    v: [u8; SHA1_LEN],
    reseed_counter: u64,
}

impl Drop for HmacDrbg {
    fn drop(&mut self) {
        self.key.zeroize();
        self.v.zeroize();
    }
}

impl HmacDrbg {
    /// Instantiate from raw seed material (entropy || nonce || personalization).
    pub fn new(seed_material: &[u8]) -> Self {
        let mut drbg = Self {
            key: [0x00; SHA1_LEN],
            v: [0x01; SHA1_LEN],
            reseed_counter: 1,
        };
        drbg.update(seed_material);
        drbg
    }

    /// Mix fresh entropy into the state and reset the reseed counter.
    pub fn reseed(&mut self, entropy: &[u8]) {
        self.update(entropy);
        self.reseed_counter = 1;
    }

    /// Whether the next request would exceed the reseed interval.
    pub fn needs_reseed(&self) -> bool {
        self.reseed_counter > RESEED_INTERVAL
    }

    /// Fill `out`, splitting into `MAX_REQUEST`-sized generate calls.
    pub fn fill(&mut self, out: &mut [u8]) -> Result<(), DrbgError> {
        for chunk in out.chunks_mut(MAX_REQUEST) {
            self.generate(chunk)?;
        }
        Ok(())
    }

    fn generate(&mut self, out: &mut [u8]) -> Result<(), DrbgError> {
        if self.needs_reseed() {
            return Err(DrbgError::ReseedRequired);
        }

        for block in out.chunks_mut(SHA1_LEN) {
            self.v = sha1_hmac_parts(&self.key, &[&self.v]);
            block.copy_from_slice(&self.v[..block.len()]);
        }

        self.update(&[]);
        self.reseed_counter += 1;
        Ok(())
    }

    /// HMAC_DRBG_Update: one round without provided data, two with.
    fn update(&mut self, provided: &[u8]) {
        let rounds: u8 = if provided.is_empty() { 1 } else { 2 };
        for sep in 0..rounds {
            self.key = sha1_hmac_parts(&self.key, &[&self.v, &[sep], provided]);
            self.v = sha1_hmac_parts(&self.key, &[&self.v]);
        }
    }
}
