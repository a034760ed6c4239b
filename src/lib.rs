//! quiet-tls: makes a proxy tunnel look like a browser's TLS session
//!
//! An [`Obfuscator`] holds the configured session material. Each TCP flow
//! gets an [`ObfsConnection`] whose `encode`/`decode` turn payload into
//! TLS-shaped records and back. No I/O happens here; the host moves bytes.

pub mod config;
pub mod crypto;
pub mod error;
pub mod obfs;
pub mod protocol;
pub mod stream;
pub mod util;

pub use config::{Browser, ObfsConfig, ObfsOptions};
pub use error::{ObfsError, Recoverable, Result, StreamError};
pub use obfs::{Decoded, ObfsConnection, Obfuscator, Phase};
