//! Per-connection handshake and framing state machine
//!
//! ```text
//!   Init ──encode──▶ WaitingForServerReply ──encode after 3 reply records──▶ Established
//! ```
//!
//! The phase only moves forward. Any protocol violation poisons the
//! connection and every later call fails.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::{ObfsError, Result};
use crate::protocol::client_hello::{compose_client_hello, compose_reply};
use crate::protocol::constants::SERVER_REPLY_RECORDS;
use crate::stream::ByteBuffer;

use super::ObfsContext;
use super::framing::{BadRecordType, consume_reply_records, frame_app_data, unwrap_app_data};

// ============= Phase =============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing sent yet
    Init,
    /// ClientHello sent, counting the server's reply records
    WaitingForServerReply,
    /// Tunnelling application data
    Established,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => write!(f, "init"),
            Phase::WaitingForServerReply => write!(f, "waiting for server reply"),
            Phase::Established => write!(f, "established"),
        }
    }
}

/// Result of [`ObfsConnection::decode`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Unwrapped payload, possibly empty
    pub payload: Vec<u8>,
    /// The host must call [`ObfsConnection::encode`] now (an empty payload
    /// is fine) so the handshake completion reaches the server.
    pub send_back: bool,
}

impl Decoded {
    fn data(payload: Vec<u8>) -> Self {
        Self { payload, send_back: false }
    }

    fn send_back() -> Self {
        Self { payload: Vec::new(), send_back: true }
    }
}

// ============= Connection =============

/// Obfuscation state of one TCP connection.
///
/// Owned by a single flow; the host serializes `encode` and `decode`.
pub struct ObfsConnection {
    ctx: Arc<ObfsContext>,
    phase: Phase,
    reply_records_seen: u8,
    send_back_signalled: bool,
    /// Application-data records framed before the handshake completed
    pending_outbound: ByteBuffer,
    /// Partially received wire bytes
    reassembly: ByteBuffer,
    poisoned: Option<String>,
}

impl ObfsConnection {
    pub(crate) fn new(ctx: Arc<ObfsContext>) -> Self {
        let limit = ctx.max_buffer;
        Self {
            ctx,
            phase: Phase::Init,
            reply_records_seen: 0,
            send_back_signalled: false,
            pending_outbound: ByteBuffer::new(limit),
            reassembly: ByteBuffer::new(limit),
            poisoned: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Reply records counted so far while waiting for the server.
    pub fn reply_records_seen(&self) -> u8 {
        self.reply_records_seen
    }

    /// Wire bytes received but not yet returned by `decode`.
    pub fn buffered_input(&self) -> usize {
        self.reassembly.len()
    }

    /// Turn outbound payload into wire bytes.
    ///
    /// The first call sends the ClientHello. Until the server reply has been
    /// seen, payload is queued and nothing is emitted. The first call after
    /// that emits the handshake completion followed by everything queued.
    pub fn encode(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        self.check_poisoned()?;
        let result = self.encode_inner(payload);
        self.poison_on_fatal(result)
    }

    /// Feed wire bytes received from the network.
    ///
    /// While waiting for the server reply this fails with
    /// [`ObfsError::ReplyIncomplete`] until three reply records have arrived;
    /// that error is recoverable and the state is kept. Records that arrive
    /// along with the reply are returned by the first `decode` after the
    /// handshake completes, which may be called with an empty slice.
    /// Until then they are held whole, bounded by `general.max_buffer`.
    pub fn decode(&mut self, wire: &[u8]) -> Result<Decoded> {
        self.check_poisoned()?;
        let result = self.decode_inner(wire);
        self.poison_on_fatal(result)
    }

    fn encode_inner(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        match self.phase {
            Phase::Init => {
                self.queue(payload)?;
                let hello = compose_client_hello(
                    &self.ctx.session,
                    &self.ctx.rng,
                    self.ctx.clock.as_ref(),
                );
                self.reply_records_seen = 0;
                self.phase = Phase::WaitingForServerReply;
                debug!(
                    hello_len = hello.len(),
                    browser = %self.ctx.session.browser(),
                    queued = self.pending_outbound.len(),
                    "Sending ClientHello"
                );
                Ok(hello)
            }
            Phase::WaitingForServerReply => {
                self.queue(payload)?;
                if self.reply_records_seen < SERVER_REPLY_RECORDS {
                    return Ok(Vec::new());
                }

                let mut out = compose_reply(self.ctx.clock.as_ref());
                out.extend_from_slice(&self.pending_outbound.take_all());
                self.pending_outbound.compact();
                self.phase = Phase::Established;
                debug!(flushed = out.len(), "Obfuscation established");
                Ok(out)
            }
            Phase::Established => {
                let mut out = Vec::new();
                frame_app_data(payload, &self.ctx.fast, &mut out);
                trace!(payload = payload.len(), wire = out.len(), "Encoded application data");
                Ok(out)
            }
        }
    }

    fn decode_inner(&mut self, wire: &[u8]) -> Result<Decoded> {
        match self.phase {
            Phase::Init => Err(ObfsError::DataBeforeHello { len: wire.len() }),
            Phase::WaitingForServerReply => {
                self.reassembly.append(wire)?;

                if self.send_back_signalled {
                    // Reply already complete; hold data for the established phase.
                    return Ok(Decoded::default());
                }

                if let Err(BadRecordType(record_type)) =
                    consume_reply_records(&mut self.reassembly, &mut self.reply_records_seen)?
                {
                    return Err(ObfsError::UnexpectedRecord {
                        record_type,
                        phase: self.phase,
                    });
                }

                if self.reply_records_seen < SERVER_REPLY_RECORDS {
                    trace!(seen = self.reply_records_seen, "Server reply incomplete");
                    return Err(ObfsError::ReplyIncomplete {
                        seen: self.reply_records_seen,
                        expected: SERVER_REPLY_RECORDS,
                    });
                }

                self.send_back_signalled = true;
                debug!(
                    buffered = self.reassembly.len(),
                    "Server reply complete, send-back required"
                );
                Ok(Decoded::send_back())
            }
            Phase::Established => {
                self.reassembly.append(wire)?;

                let mut payload = Vec::new();
                if let Err(BadRecordType(record_type)) =
                    unwrap_app_data(&mut self.reassembly, &mut payload)?
                {
                    return Err(ObfsError::UnexpectedRecord {
                        record_type,
                        phase: self.phase,
                    });
                }
                self.reassembly.compact();
                Ok(Decoded::data(payload))
            }
        }
    }

    /// Frame payload that arrives before establishment into the send queue.
    fn queue(&mut self, payload: &[u8]) -> Result<()> {
        if payload.is_empty() {
            return Ok(());
        }
        let mut framed = Vec::new();
        frame_app_data(payload, &self.ctx.fast, &mut framed);
        self.pending_outbound.append(&framed)?;
        trace!(queued = self.pending_outbound.len(), "Queued payload until handshake completes");
        Ok(())
    }

    fn check_poisoned(&self) -> Result<()> {
        match &self.poisoned {
            Some(reason) => Err(ObfsError::Poisoned { reason: reason.clone() }),
            None => Ok(()),
        }
    }

    fn poison_on_fatal<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result
            && !matches!(e, ObfsError::ReplyIncomplete { .. })
        {
            warn!(phase = %self.phase, error = %e, "Obfuscated connection failed");
            self.poisoned = Some(e.to_string());
            self.pending_outbound.clear();
            self.reassembly.clear();
        }
        result
    }
}

impl fmt::Debug for ObfsConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObfsConnection")
            .field("phase", &self.phase)
            .field("reply_records_seen", &self.reply_records_seen)
            .field("pending_outbound", &self.pending_outbound.len())
            .field("reassembly", &self.reassembly.len())
            .field("poisoned", &self.poisoned)
            .finish()
    }
}
