//! Protocol constants

// ============= TLS Record Layer =============

/// TLS record header size (type + version + length)
pub const TLS_HEADER_SIZE: usize = 5;
/// Largest record on the wire: header plus a 16-bit length payload
pub const MAX_RECORD_LEN: usize = TLS_HEADER_SIZE + u16::MAX as usize;

/// TLS 1.2 version bytes, used for every record except the ClientHello
pub const TLS_VERSION: [u8; 2] = [0x03, 0x03];
/// TLS 1.0 version bytes carried by the ClientHello record
pub const TLS_VERSION_HELLO: [u8; 2] = [0x03, 0x01];

/// TLS record type: Change Cipher Spec
pub const TLS_RECORD_CHANGE_CIPHER: u8 = 0x14;
/// TLS record type: Handshake
pub const TLS_RECORD_HANDSHAKE: u8 = 0x16;
/// TLS record type: Application Data
pub const TLS_RECORD_APPLICATION: u8 = 0x17;

// ============= Handshake =============

/// Handshake message type: ClientHello
pub const HANDSHAKE_CLIENT_HELLO: u8 = 0x01;
/// Handshake message type: ServerHello
pub const HANDSHAKE_SERVER_HELLO: u8 = 0x02;
/// ClientHello body length, excluding the 4-byte handshake header
pub const CLIENT_HELLO_BODY_LEN: usize = 508;
/// Handshake and ChangeCipherSpec records expected in the server reply
pub const SERVER_REPLY_RECORDS: u8 = 3;

/// Width of the window the ClientHello random field is stable for (12 h)
pub const RANDOM_FIELD_WINDOW_SECS: i64 = 12 * 60 * 60;

pub const SESSION_ID_LEN: usize = 32;
pub const SESSION_TICKET_LEN: usize = 192;
/// Length of the fake encrypted Finished payload
pub const FINISHED_LEN: usize = 40;

// ============= Application Data Fragmentation =============

/// Payloads shorter than this go out as one record
pub const SMALL_PAYLOAD: usize = 1024;
/// Random-sized fragments are cut while more than this remains
pub const FRAGMENT_THRESHOLD: usize = 2048;
/// Fragment size is `fast % FRAGMENT_SPREAD + FRAGMENT_MIN`
pub const FRAGMENT_SPREAD: u64 = 4096;
pub const FRAGMENT_MIN: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_fit_in_a_record() {
        let largest = (FRAGMENT_SPREAD - 1) as usize + FRAGMENT_MIN;
        assert!(largest <= u16::MAX as usize);
        assert!(FRAGMENT_THRESHOLD <= u16::MAX as usize);
    }
}
