//! AES-256-CFB128
//!
//! Only used to disguise the ClientHello random field: the 16-byte "goal"
//! is encrypted under the session AES key so the peer can recognise it.
//! This is not a confidentiality layer for the tunnel.
//!
//! ## Zeroize policy
//!
//! `AesCfb` stores raw key/IV bytes and zeroizes them on drop.

use aes::Aes256;
use aes::cipher::{BlockEncrypt, KeyInit};
use zeroize::Zeroize;

/// AES-256 in CFB mode with a full 128-bit feedback segment
pub struct AesCfb {
    key: [u8; 32],
    iv: [u8; 16],
}

impl Drop for AesCfb {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

impl AesCfb {
    /// AES block size
    const BLOCK_SIZE: usize = 16;

    /// Create new AES-CFB cipher with key and IV
    pub fn new(key: [u8; 32], iv: [u8; 16]) -> Self {
        Self { key, iv }
    }

    /// Encrypt data of any length
    ///
    /// C[i] = P[i] XOR AES(C[i-1]), where C[-1] = IV. A trailing partial
    /// block uses the leading bytes of its keystream block.
    pub fn encrypt(&self, data: &[u8]) -> Vec<u8> {
        let cipher = Aes256::new((&self.key).into());
        let mut result = Vec::with_capacity(data.len());
        let mut feedback = self.iv;

        for chunk in data.chunks(Self::BLOCK_SIZE) {
            let mut keystream = feedback;
            cipher.encrypt_block((&mut keystream).into());

            let start = result.len();
            result.extend(chunk.iter().zip(keystream.iter()).map(|(p, k)| p ^ k));
            if chunk.len() == Self::BLOCK_SIZE {
                feedback.copy_from_slice(&result[start..]);
            }
        }

        result
    }

    /// Decrypt data of any length
    pub fn decrypt(&self, data: &[u8]) -> Vec<u8> {
        let cipher = Aes256::new((&self.key).into());
        let mut result = Vec::with_capacity(data.len());
        let mut feedback = self.iv;

        for chunk in data.chunks(Self::BLOCK_SIZE) {
            let mut keystream = feedback;
            cipher.encrypt_block((&mut keystream).into());

            result.extend(chunk.iter().zip(keystream.iter()).map(|(c, k)| c ^ k));
            if chunk.len() == Self::BLOCK_SIZE {
                feedback.copy_from_slice(chunk);
            }
        }

        result
    }
}
