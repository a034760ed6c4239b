//! Error Types

use std::fmt;
use thiserror::Error;

use crate::obfs::Phase;

// ============= Stream Errors =============

/// Errors raised by the byte buffers backing a connection
#[derive(Debug)]
pub enum StreamError {
    /// Buffer overflow: attempted to buffer more than allowed
    BufferOverflow {
        limit: usize,
        attempted: usize,
    },
    /// Invalid frame format
    InvalidFrame {
        details: String,
    },
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferOverflow { limit, attempted } => {
                write!(f, "buffer overflow: limit {}, attempted {}", limit, attempted)
            }
            Self::InvalidFrame { details } => {
                write!(f, "invalid frame: {}", details)
            }
        }
    }
}

impl std::error::Error for StreamError {}

impl From<StreamError> for std::io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::BufferOverflow { .. } => {
                std::io::Error::new(std::io::ErrorKind::OutOfMemory, err)
            }
            StreamError::InvalidFrame { .. } => {
                std::io::Error::new(std::io::ErrorKind::InvalidData, err)
            }
        }
    }
}

// ============= Recoverable Trait =============

/// Trait for errors that may be recoverable
pub trait Recoverable {
    /// Check if error is recoverable (can retry operation)
    fn is_recoverable(&self) -> bool;

    /// Check if connection can continue after this error
    fn can_continue(&self) -> bool;
}

impl Recoverable for StreamError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn can_continue(&self) -> bool {
        false
    }
}

// ============= Main Obfuscator Errors =============

#[derive(Error, Debug)]
pub enum ObfsError {
    // ============= Config Errors =============

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required option: {0}")]
    MissingOption(&'static str),

    #[error("Invalid option {name}: {reason}")]
    InvalidOption { name: &'static str, reason: String },

    // ============= Stream Errors =============

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    // ============= Protocol Errors =============

    #[error("Unexpected TLS record type 0x{record_type:02x} while {phase}")]
    UnexpectedRecord { record_type: u8, phase: Phase },

    #[error("Received {len} bytes before ClientHello was sent")]
    DataBeforeHello { len: usize },

    #[error("Server reply incomplete: {seen} of {expected} records")]
    ReplyIncomplete { seen: u8, expected: u8 },

    #[error("Connection poisoned: {reason}")]
    Poisoned { reason: String },
}

impl ObfsError {
    /// Whether the error belongs to the protocol-violation class.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedRecord { .. }
                | Self::DataBeforeHello { .. }
                | Self::ReplyIncomplete { .. }
                | Self::Poisoned { .. }
        )
    }

    /// Whether the error belongs to the configuration class.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::MissingOption(_) | Self::InvalidOption { .. }
        )
    }
}

impl Recoverable for ObfsError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::ReplyIncomplete { .. })
    }

    fn can_continue(&self) -> bool {
        match self {
            Self::ReplyIncomplete { .. } => true,
            Self::Stream(e) => e.can_continue(),
            _ => false,
        }
    }
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, ObfsError>;

/// Result type for buffer operations
pub type StreamResult<T> = std::result::Result<T, StreamError>;
