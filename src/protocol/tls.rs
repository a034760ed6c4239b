//! TLS record layer
//!
//! Only the framing is real. Payloads are never encrypted or authenticated
//! by this layer; record bodies are opaque bytes supplied by the caller.

use crate::util::endian::{read_u16_be, read_u24_be};

use super::constants::*;

// ============= Record Header =============

/// Parsed TLS record header (5 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsRecordHeader {
    /// Record type (0x17 = Application Data, 0x14 = Change Cipher, etc.)
    pub record_type: u8,
    /// TLS version bytes
    pub version: [u8; 2],
    /// Payload length
    pub length: u16,
}

impl TlsRecordHeader {
    pub fn new(record_type: u8, version: [u8; 2], length: u16) -> Self {
        Self { record_type, version, length }
    }

    /// Parse the header at the start of `bytes`.
    ///
    /// Returns `None` until at least [`TLS_HEADER_SIZE`] bytes are present.
    /// Version bytes are not validated.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..TLS_HEADER_SIZE)?;
        Some(Self {
            record_type: header[0],
            version: [header[1], header[2]],
            length: u16::from_be_bytes([header[3], header[4]]),
        })
    }

    /// Header plus payload size on the wire
    pub fn record_len(&self) -> usize {
        TLS_HEADER_SIZE + self.length as usize
    }

    /// Build header bytes
    pub fn to_bytes(self) -> [u8; 5] {
        [
            self.record_type,
            self.version[0],
            self.version[1],
            (self.length >> 8) as u8,
            self.length as u8,
        ]
    }
}

/// Append one record carrying `payload` to `out`.
///
/// `payload` must fit a 16-bit length; callers fragment before this point.
pub fn append_record(out: &mut Vec<u8>, record_type: u8, version: [u8; 2], payload: &[u8]) {
    debug_assert!(payload.len() <= u16::MAX as usize);
    let header = TlsRecordHeader::new(record_type, version, payload.len() as u16);
    out.reserve(TLS_HEADER_SIZE + payload.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(payload);
}

/// Wrap `payload` into a single record.
pub fn wrap_record(record_type: u8, version: [u8; 2], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(TLS_HEADER_SIZE + payload.len());
    append_record(&mut out, record_type, version, payload);
    out
}

/// Check if bytes look like a TLS ClientHello record
pub fn is_client_hello_record(first_bytes: &[u8]) -> bool {
    first_bytes.len() >= 6
        && first_bytes[0] == TLS_RECORD_HANDSHAKE
        && first_bytes[1..3] == TLS_VERSION_HELLO
        && first_bytes[5] == HANDSHAKE_CLIENT_HELLO
}

// ============= ClientHello Inspection =============

/// Layout of a ClientHello record, as read back from its bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHelloLayout {
    /// Length field of the record header
    pub record_len: usize,
    /// 24-bit length field of the handshake header
    pub body_len: usize,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suites: Vec<u8>,
    /// Declared length of the extensions block
    pub extensions_len: usize,
    /// `(type, data)` pairs in wire order
    pub extensions: Vec<(u16, Vec<u8>)>,
}

impl ClientHelloLayout {
    /// Data of the first extension of type `ext_type`
    pub fn extension(&self, ext_type: u16) -> Option<&[u8]> {
        self.extensions
            .iter()
            .find(|(t, _)| *t == ext_type)
            .map(|(_, data)| data.as_slice())
    }

    /// Host name carried by the server_name extension
    pub fn server_name(&self) -> Option<String> {
        let data = self.extension(0x0000)?;
        let list_len = read_u16_be(data, 0)? as usize;
        let list = data.get(2..2 + list_len)?;
        if *list.first()? != 0 {
            return None;
        }
        let name_len = read_u16_be(list, 1)? as usize;
        let name = list.get(3..3 + name_len)?;
        std::str::from_utf8(name).ok().map(str::to_string)
    }
}

/// Walk a ClientHello record and report its layout.
///
/// Every declared length must match the bytes actually present; any
/// inconsistency yields `None`.
pub fn parse_client_hello(record: &[u8]) -> Option<ClientHelloLayout> {
    if !is_client_hello_record(record) {
        return None;
    }
    let header = TlsRecordHeader::parse(record)?;
    if header.record_len() != record.len() {
        return None;
    }

    let body_len = read_u24_be(record, 6)? as usize;
    let mut pos = TLS_HEADER_SIZE + 4;
    if pos + body_len != record.len() {
        return None;
    }

    // legacy version (2)
    pos += 2;
    let random: [u8; 32] = record.get(pos..pos + 32)?.try_into().ok()?;
    pos += 32;

    let session_id_len = *record.get(pos)? as usize;
    pos += 1;
    let session_id = record.get(pos..pos + session_id_len)?.to_vec();
    pos += session_id_len;

    let cipher_suites_len = read_u16_be(record, pos)? as usize;
    pos += 2;
    let cipher_suites = record.get(pos..pos + cipher_suites_len)?.to_vec();
    pos += cipher_suites_len;

    let comp_len = *record.get(pos)? as usize;
    pos += 1 + comp_len;

    let extensions_len = read_u16_be(record, pos)? as usize;
    pos += 2;
    let ext_end = pos + extensions_len;
    if ext_end != record.len() {
        return None;
    }

    let mut extensions = Vec::new();
    while pos < ext_end {
        let ext_type = read_u16_be(record, pos)?;
        let ext_len = read_u16_be(record, pos + 2)? as usize;
        pos += 4;
        if pos + ext_len > ext_end {
            return None;
        }
        extensions.push((ext_type, record[pos..pos + ext_len].to_vec()));
        pos += ext_len;
    }

    Some(ClientHelloLayout {
        record_len: header.length as usize,
        body_len,
        random,
        session_id,
        cipher_suites,
        extensions_len,
        extensions,
    })
}
