//! Application-data framing and record extraction

use crate::crypto::FastRandom;
use crate::error::StreamResult;
use crate::protocol::constants::*;
use crate::protocol::tls::{TlsRecordHeader, append_record};
use crate::stream::ByteBuffer;

/// Append `payload` to `out` as application-data records.
///
/// Short payloads become one record. Longer ones are cut into fragments of
/// `fast % 4096 + 100` bytes while more than 2048 bytes remain, and the rest
/// goes into a final record. An empty payload appends nothing.
pub fn frame_app_data(payload: &[u8], fast: &FastRandom, out: &mut Vec<u8>) {
    if payload.is_empty() {
        return;
    }

    if payload.len() < SMALL_PAYLOAD {
        append_record(out, TLS_RECORD_APPLICATION, TLS_VERSION, payload);
        return;
    }

    let mut rest = payload;
    while rest.len() > FRAGMENT_THRESHOLD {
        let size = (fast.next_u64() % FRAGMENT_SPREAD) as usize + FRAGMENT_MIN;
        let (chunk, tail) = rest.split_at(size.min(rest.len()));
        append_record(out, TLS_RECORD_APPLICATION, TLS_VERSION, chunk);
        rest = tail;
    }
    if !rest.is_empty() {
        append_record(out, TLS_RECORD_APPLICATION, TLS_VERSION, rest);
    }
}

/// Outcome of looking at the front of a reassembly buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextRecord {
    /// Fewer than 5 bytes buffered
    NeedHeader,
    /// Header is known but the body has not fully arrived
    Partial(TlsRecordHeader),
    /// A whole record is buffered
    Complete(TlsRecordHeader),
}

pub fn next_record(buffered: &[u8]) -> NextRecord {
    match TlsRecordHeader::parse(buffered) {
        None => NextRecord::NeedHeader,
        Some(header) if buffered.len() < header.record_len() => NextRecord::Partial(header),
        Some(header) => NextRecord::Complete(header),
    }
}

/// Error from extraction: a record of a type the phase does not allow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadRecordType(pub u8);

/// Move the payloads of every complete application-data record from
/// `reassembly` into `out`. A trailing partial record stays buffered.
pub fn unwrap_app_data(
    reassembly: &mut ByteBuffer,
    out: &mut Vec<u8>,
) -> StreamResult<Result<(), BadRecordType>> {
    loop {
        match next_record(reassembly.peek()) {
            NextRecord::NeedHeader => return Ok(Ok(())),
            NextRecord::Partial(header) | NextRecord::Complete(header)
                if header.record_type != TLS_RECORD_APPLICATION =>
            {
                return Ok(Err(BadRecordType(header.record_type)));
            }
            NextRecord::Partial(_) => return Ok(Ok(())),
            NextRecord::Complete(header) => {
                out.extend_from_slice(&reassembly.peek()[TLS_HEADER_SIZE..header.record_len()]);
                reassembly.consume(header.record_len())?;
            }
        }
    }
}

/// Consume complete ChangeCipherSpec/Handshake records until `seen`
/// reaches [`SERVER_REPLY_RECORDS`]. Bytes after that stay buffered.
pub fn consume_reply_records(
    reassembly: &mut ByteBuffer,
    seen: &mut u8,
) -> StreamResult<Result<(), BadRecordType>> {
    while *seen < SERVER_REPLY_RECORDS {
        match next_record(reassembly.peek()) {
            NextRecord::NeedHeader => break,
            NextRecord::Partial(header) | NextRecord::Complete(header)
                if !matches!(
                    header.record_type,
                    TLS_RECORD_CHANGE_CIPHER | TLS_RECORD_HANDSHAKE
                ) =>
            {
                return Ok(Err(BadRecordType(header.record_type)));
            }
            NextRecord::Partial(_) => break,
            NextRecord::Complete(header) => {
                reassembly.consume(header.record_len())?;
                *seen += 1;
            }
        }
    }
    Ok(Ok(()))
}
