//! TLS wire format

pub mod client_hello;
pub mod constants;
pub mod tls;

pub use client_hello::{compose_client_hello, compose_reply};
pub use tls::TlsRecordHeader;
