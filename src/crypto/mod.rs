//! Crypto

pub mod aes;
pub mod drbg;
pub mod hash;
pub mod random;

pub use aes::AesCfb;
pub use hash::{sha256, sha256_parts};
pub use random::{EntropySource, FastRandom, OsEntropy, SecureRandom, seeded_random};
