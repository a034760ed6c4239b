//! Pseudorandom

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rand::TryRngCore;
use rand::rngs::OsRng;
use tracing::{debug, warn};
use zeroize::Zeroize;

use super::drbg::HmacDrbg;

/// Entropy bytes drawn for instantiation and every reseed.
const ENTROPY_LEN: usize = 48;

// ============= Entropy Sources =============

/// Source of seed entropy for [`SecureRandom`]
pub trait EntropySource: Send {
    fn fill_entropy(&mut self, out: &mut [u8]) -> Result<(), String>;
}

/// Operating system entropy
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill_entropy(&mut self, out: &mut [u8]) -> Result<(), String> {
        OsRng.try_fill_bytes(out).map_err(|e| e.to_string())
    }
}

// ============= RC4 Fallback =============

/// RC4 keystream used only when the DRBG cannot be seeded or fails.
struct Rc4Fallback {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4Fallback {
    fn new(key: &[u8]) -> Self {
        let mut s = [0u8; 256];
        for (i, b) in s.iter_mut().enumerate() {
            *b = i as u8;
        }
        if !key.is_empty() {
            let mut j: u8 = 0;
            for i in 0..256 {
                j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
                s.swap(i, j as usize);
            }
        }
        Self { s, i: 0, j: 0 }
    }

    /// Keyed from coarse process time.
    fn from_time() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::new(&secs.to_le_bytes())
    }

    fn fill(&mut self, out: &mut [u8]) {
        for byte in out.iter_mut() {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.s[self.i as usize]);
            self.s.swap(self.i as usize, self.j as usize);
            let k = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
            *byte = self.s[k as usize];
        }
    }
}

impl Drop for Rc4Fallback {
    fn drop(&mut self) {
        self.s.zeroize();
    }
}

// ============= Secure Generator =============

enum Generator {
    Drbg(HmacDrbg),
    Degraded(Rc4Fallback),
}

struct SecureRandomInner {
    generator: Generator,
    entropy: Box<dyn EntropySource>,
}

impl SecureRandomInner {
    fn degrade(&mut self, reason: &str) {
        warn!(reason, "Secure RNG degraded to time-seeded fallback generator");
        self.generator = Generator::Degraded(Rc4Fallback::from_time());
    }
}

/// Cryptographically secure PRNG (HMAC-DRBG seeded from an entropy source)
///
/// If seeding or reseeding fails the generator falls back to a time-keyed
/// RC4 stream for the rest of its life. The fallback is never promoted back;
/// check [`SecureRandom::is_degraded`] to observe it.
pub struct SecureRandom {
    inner: Mutex<SecureRandomInner>,
}

impl SecureRandom {
    pub fn new() -> Self {
        Self::with_entropy(Box::new(OsEntropy))
    }

    pub fn with_entropy(mut entropy: Box<dyn EntropySource>) -> Self {
        let mut seed = [0u8; ENTROPY_LEN + 16];
        let seeded = entropy.fill_entropy(&mut seed[..ENTROPY_LEN]);

        // Personalization: wall-clock nanos and the address of the seed buffer
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        seed[ENTROPY_LEN..ENTROPY_LEN + 8].copy_from_slice(&nanos.to_le_bytes());
        let addr = seed.as_ptr() as usize as u64;
        seed[ENTROPY_LEN + 8..].copy_from_slice(&addr.to_le_bytes());

        let inner = match seeded {
            Ok(()) => {
                debug!("Secure RNG seeded from entropy source");
                SecureRandomInner {
                    generator: Generator::Drbg(HmacDrbg::new(&seed)),
                    entropy,
                }
            }
            Err(reason) => {
                let mut inner = SecureRandomInner {
                    generator: Generator::Degraded(Rc4Fallback::from_time()),
                    entropy,
                };
                inner.degrade(&reason);
                inner
            }
        };
        seed.zeroize();

        Self { inner: Mutex::new(inner) }
    }

    /// Whether the generator has fallen back to the weak stream.
    pub fn is_degraded(&self) -> bool {
        matches!(self.inner.lock().generator, Generator::Degraded(_))
    }

    /// Fill a caller-provided buffer with random bytes.
    pub fn fill(&self, out: &mut [u8]) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let needs_reseed = matches!(&inner.generator, Generator::Drbg(drbg) if drbg.needs_reseed());
        if needs_reseed {
            let mut entropy = [0u8; ENTROPY_LEN];
            match inner.entropy.fill_entropy(&mut entropy) {
                Ok(()) => {
                    if let Generator::Drbg(drbg) = &mut inner.generator {
                        drbg.reseed(&entropy);
                    }
                }
                Err(reason) => inner.degrade(&reason),
            }
            entropy.zeroize();
        }

        let failed = match &mut inner.generator {
            Generator::Drbg(drbg) => drbg.fill(out).is_err(),
            Generator::Degraded(rc4) => {
                rc4.fill(out);
                false
            }
        };

        if failed {
            inner.degrade("HMAC-DRBG generate failed");
            if let Generator::Degraded(rc4) = &mut inner.generator {
                rc4.fill(out);
            }
        }
    }

    /// Generate random bytes
    pub fn bytes(&self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.fill(&mut out);
        out
    }

    /// Generate random number in range [0, max)
    pub fn range(&self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.u32() as usize) % max
    }

    /// Generate random u32
    pub fn u32(&self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill(&mut buf);
        u32::from_le_bytes(buf)
    }
}

impl Default for SecureRandom {
    fn default() -> Self {
        Self::new()
    }
}

// ============= Seeded Generator =============

/// Reproducible bytes derived only from `seed`.
///
/// The seed is fed to a fresh HMAC-DRBG as its 8-byte little-endian
/// encoding, so both ends of the tunnel derive identical output.
pub fn seeded_random(len: usize, seed: i64) -> Vec<u8> {
    let seed_bytes = seed.to_le_bytes();
    let mut out = vec![0u8; len];
    let mut drbg = HmacDrbg::new(&seed_bytes);
    if drbg.fill(&mut out).is_err() {
        warn!("Seeded HMAC-DRBG failed, using seeded fallback stream");
        Rc4Fallback::new(&seed_bytes).fill(&mut out);
    }
    out
}

// ============= Fast Generator =============

/// xorshift128+ for record fragment sizes only
///
/// Not cryptographically secure. One instance is shared by every
/// connection of an obfuscator and is never reseeded.
pub struct FastRandom {
    state: Mutex<[u64; 2]>,
}

impl FastRandom {
    /// Seed with wall-clock seconds at construction.
    pub fn from_seed(seed: u32) -> Self {
        let seed = seed as u64;
        Self {
            state: Mutex::new([seed | 0x1_0000_0000, (seed << 32) | 0x1]),
        }
    }

    pub fn next_u64(&self) -> u64 {
        let mut s = self.state.lock();
        let mut x = s[0];
        let y = s[1];
        s[0] = y;
        x ^= x << 23;
        x ^= x >> 17;
        x ^= y ^ (y >> 26);
        s[1] = x;
        x.wrapping_add(y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct FailingEntropy;

    impl EntropySource for FailingEntropy {
        fn fill_entropy(&mut self, _out: &mut [u8]) -> Result<(), String> {
            Err("entropy pool unavailable".into())
        }
    }

    /// Succeeds once, then fails
    struct OneShotEntropy(bool);

    impl EntropySource for OneShotEntropy {
        fn fill_entropy(&mut self, out: &mut [u8]) -> Result<(), String> {
            if self.0 {
                return Err("exhausted".into());
            }
            self.0 = true;
            out.fill(0x5a);
            Ok(())
        }
    }

    #[test]
    fn test_bytes_uniqueness() {
        let rng = SecureRandom::new();
        let a = rng.bytes(32);
        let b = rng.bytes(32);
        assert_ne!(a, b);
        assert!(!rng.is_degraded());
    }

    #[test]
    fn test_bytes_length() {
        let rng = SecureRandom::new();
        assert_eq!(rng.bytes(0).len(), 0);
        assert_eq!(rng.bytes(1).len(), 1);
        assert_eq!(rng.bytes(100).len(), 100);
        assert_eq!(rng.bytes(5000).len(), 5000);
    }

    #[test]
    fn test_range() {
        let rng = SecureRandom::new();

        let mut seen = HashSet::new();
        for _ in 0..2000 {
            let n = rng.range(16);
            assert!(n < 16);
            seen.insert(n);
        }
        assert_eq!(seen.len(), 16);

        assert_eq!(rng.range(1), 0);
        assert_eq!(rng.range(0), 0);
    }

    #[test]
    fn test_degraded_when_entropy_unavailable() {
        let rng = SecureRandom::with_entropy(Box::new(FailingEntropy));
        assert!(rng.is_degraded());

        let a = rng.bytes(64);
        let b = rng.bytes(64);
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(rng.is_degraded());
    }

    #[test]
    fn test_degrades_when_reseed_fails() {
        let rng = SecureRandom::with_entropy(Box::new(OneShotEntropy(false)));
        assert!(!rng.is_degraded());

        {
            let mut inner = rng.inner.lock();
            if let Generator::Drbg(drbg) = &mut inner.generator {
                // force the next request to hit the reseed path
                for _ in 0..=crate::crypto::drbg::RESEED_INTERVAL {
                    let mut b = [0u8; 1];
                    if drbg.fill(&mut b).is_err() {
                        break;
                    }
                }
            }
        }

        assert_eq!(rng.bytes(16).len(), 16);
        assert!(rng.is_degraded());
    }

    #[test]
    fn test_seeded_random_reproducible() {
        let a = seeded_random(192, 1_234_567);
        let b = seeded_random(192, 1_234_567);
        let c = seeded_random(192, 1_234_568);
        assert_eq!(a.len(), 192);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_seeded_random_negative_seed() {
        let a = seeded_random(32, -1);
        assert_eq!(a, seeded_random(32, -1));
        assert_ne!(a, seeded_random(32, 1));
    }

    #[test]
    fn test_rc4_fallback_keyed() {
        let mut a = Rc4Fallback::new(b"Key");
        let mut out = [0u8; 10];
        a.fill(&mut out);
        // RC4 keystream for key "Key"
        assert_eq!(hex::encode(out), "eb9f7781b734ca72a719");
    }

    #[test]
    fn test_fast_random_sequence() {
        let rng = FastRandom::from_seed(1);
        // s0 = 0x1_0000_0001, s1 = 0x1_0000_0001
        let first = rng.next_u64();
        let mut x: u64 = 0x1_0000_0001;
        let y: u64 = 0x1_0000_0001;
        x ^= x << 23;
        x ^= x >> 17;
        x ^= y ^ (y >> 26);
        assert_eq!(first, x.wrapping_add(y));

        let second = rng.next_u64();
        assert_ne!(first, second);
    }

    #[test]
    fn test_fast_random_same_seed_same_sequence() {
        let a = FastRandom::from_seed(1_700_000_000);
        let b = FastRandom::from_seed(1_700_000_000);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }
}
