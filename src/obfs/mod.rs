//! Obfuscator instances and their connections

pub mod connection;
pub mod framing;
pub mod session;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ObfsConfig;
use crate::crypto::{FastRandom, SecureRandom};
use crate::error::Result;
use crate::protocol::client_hello::{compose_client_hello, compose_server_reply};
use crate::protocol::constants::TLS_HEADER_SIZE;
use crate::util::{Clock, SystemClock};

pub use connection::{Decoded, ObfsConnection, Phase};
pub use session::SessionState;

/// State shared by every connection of one obfuscator
pub(crate) struct ObfsContext {
    pub(crate) session: SessionState,
    pub(crate) rng: SecureRandom,
    pub(crate) fast: FastRandom,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) max_buffer: usize,
}

/// A configured GoQuiet-style obfuscator.
///
/// Cheap to share: connections hold an `Arc` to the same context, so
/// dropping the obfuscator does not invalidate live connections.
pub struct Obfuscator {
    ctx: Arc<ObfsContext>,
}

impl Obfuscator {
    /// Parse a `ServerName=..;Key=..;TicketTimeHint=..;Browser=..` string.
    pub fn configure(options: &str) -> Result<Self> {
        let config = ObfsConfig::from_options(options)?;
        Ok(Self::from_config(&config))
    }

    pub fn from_config(config: &ObfsConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &ObfsConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_parts(config, SecureRandom::new(), clock)
    }

    /// Build from explicit randomness and time sources.
    pub fn with_parts(config: &ObfsConfig, rng: SecureRandom, clock: Arc<dyn Clock>) -> Self {
        let session = SessionState::new(&config.obfs, &rng);
        let fast = FastRandom::from_seed(clock.unix_secs() as u32);

        info!(
            server_name = %session.server_name(),
            browser = %session.browser(),
            ticket_time_hint = session.ticket_time_hint(),
            max_buffer = config.general.max_buffer,
            "Obfuscator configured"
        );

        Self {
            ctx: Arc::new(ObfsContext {
                session,
                rng,
                fast,
                clock,
                max_buffer: config.general.max_buffer,
            }),
        }
    }

    pub fn new_connection(&self) -> ObfsConnection {
        debug!("New obfuscated connection");
        ObfsConnection::new(Arc::clone(&self.ctx))
    }

    /// Per-record framing overhead in bytes.
    pub fn overhead(&self) -> usize {
        TLS_HEADER_SIZE
    }

    pub fn session(&self) -> &SessionState {
        &self.ctx.session
    }

    /// Whether the secure generator has fallen back to its weak source.
    pub fn prng_degraded(&self) -> bool {
        self.ctx.rng.is_degraded()
    }

    /// Compose a ClientHello without touching any connection.
    pub fn client_hello(&self) -> Vec<u8> {
        compose_client_hello(&self.ctx.session, &self.ctx.rng, self.ctx.clock.as_ref())
    }

    /// Compose the three records a cooperating server would answer with.
    pub fn server_reply(&self) -> Vec<u8> {
        compose_server_reply(&self.ctx.rng, self.ctx.clock.as_ref())
    }

    /// Release the obfuscator. Key material is zeroized once the last
    /// connection is gone as well.
    pub fn teardown(self) {
        info!(
            live_connections = Arc::strong_count(&self.ctx) - 1,
            "Obfuscator torn down"
        );
    }
}

impl std::fmt::Debug for Obfuscator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Obfuscator")
            .field("session", &self.ctx.session)
            .field("max_buffer", &self.ctx.max_buffer)
            .finish()
    }
}
