//! Per-obfuscator session material

use zeroize::Zeroize;

use crate::config::{Browser, ObfsOptions};
use crate::crypto::{SecureRandom, sha256};
use crate::util::endian::be_int;

/// Immutable material shared by every connection of one obfuscator.
pub struct SessionState {
    shared_key: Vec<u8>,
    aes_key: [u8; 32],
    server_name: String,
    browser: Browser,
    ticket_time_hint: u64,
    opaque: u32,
}

impl Drop for SessionState {
    fn drop(&mut self) {
        self.shared_key.zeroize();
        self.aes_key.zeroize();
    }
}

impl SessionState {
    /// Derive session material from validated options.
    pub fn new(options: &ObfsOptions, rng: &SecureRandom) -> Self {
        Self::with_opaque(options, rng.u32())
    }

    pub(crate) fn with_opaque(options: &ObfsOptions, opaque: u32) -> Self {
        let shared_key = options.key.as_bytes().to_vec();
        let aes_key = sha256(&shared_key);
        Self {
            shared_key,
            aes_key,
            server_name: options.server_name.clone(),
            browser: options.browser,
            ticket_time_hint: options.ticket_time_hint.clamp(1, i64::MAX as u64),
            opaque,
        }
    }

    pub fn shared_key(&self) -> &[u8] {
        &self.shared_key
    }

    pub fn aes_key(&self) -> &[u8; 32] {
        &self.aes_key
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn browser(&self) -> Browser {
        self.browser
    }

    pub fn ticket_time_hint(&self) -> u64 {
        self.ticket_time_hint
    }

    pub fn opaque(&self) -> u32 {
        self.opaque
    }

    /// Seed of the session ticket for the bucket containing `unix_secs`.
    ///
    /// `opaque + be_int(aes_key) + unix_secs / ticket_time_hint`, wrapping.
    pub fn ticket_seed(&self, unix_secs: i64) -> i64 {
        let bucket = unix_secs.div_euclid(self.ticket_time_hint as i64);
        (self.opaque as i64)
            .wrapping_add(be_int(&self.aes_key) as i64)
            .wrapping_add(bucket)
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("server_name", &self.server_name)
            .field("browser", &self.browser)
            .field("ticket_time_hint", &self.ticket_time_hint)
            .finish_non_exhaustive()
    }
}
