//! Browser-fingerprint ClientHello and synthetic server reply
//!
//! Both profiles produce a 508-byte ClientHello body (517 bytes with the
//! record and handshake headers) for server names up to the padding budget.
//! Longer names shrink the padding to zero and the message grows; every
//! length field is computed from the actual content.

use crate::config::Browser;
use crate::crypto::{AesCfb, SecureRandom, seeded_random, sha256_parts};
use crate::obfs::session::SessionState;
use crate::util::Clock;
use crate::util::endian::put_u24_be;

use super::constants::*;
use super::tls::{append_record, wrap_record};

// ============= Extension Types =============

pub mod extension_type {
    pub const SERVER_NAME: u16 = 0x0000;
    pub const STATUS_REQUEST: u16 = 0x0005;
    pub const SUPPORTED_GROUPS: u16 = 0x000a;
    pub const EC_POINT_FORMATS: u16 = 0x000b;
    pub const SIGNATURE_ALGORITHMS: u16 = 0x000d;
    pub const ALPN: u16 = 0x0010;
    pub const SIGNED_CERT_TIMESTAMP: u16 = 0x0012;
    pub const PADDING: u16 = 0x0015;
    pub const EXTENDED_MASTER_SECRET: u16 = 0x0017;
    pub const SESSION_TICKET: u16 = 0x0023;
    pub const CHANNEL_ID: u16 = 0x7550;
    pub const RENEGOTIATION_INFO: u16 = 0xff01;
}

use extension_type as ext;

// ============= Profiles =============

/// Fixed content of one browser fingerprint
struct Profile {
    cipher_suites: &'static [u8],
    signature_algorithms: &'static [u8],
    /// Extensions block length the padding extension fills up to
    extensions_target: usize,
}

const CHROME: Profile = Profile {
    cipher_suites: &[
        0x2a, 0x2a, 0xc0, 0x2b, 0xc0, 0x2f, 0xc0, 0x2c, 0xc0, 0x30, 0xcc, 0xa9, 0xcc, 0xa8,
        0xc0, 0x13, 0xc0, 0x14, 0x00, 0x9c, 0x00, 0x9d, 0x00, 0x2f, 0x00, 0x35, 0x00, 0x0a,
    ],
    signature_algorithms: &[
        0x00, 0x12, 0x04, 0x03, 0x08, 0x04, 0x04, 0x01, 0x05, 0x03, 0x08, 0x05, 0x05, 0x01,
        0x08, 0x06, 0x06, 0x01, 0x02, 0x01,
    ],
    extensions_target: 407,
};

const FIREFOX: Profile = Profile {
    cipher_suites: &[
        0xc0, 0x2b, 0xc0, 0x2f, 0xcc, 0xa9, 0xcc, 0xa8, 0xc0, 0x2c, 0xc0, 0x30, 0xc0, 0x0a,
        0xc0, 0x09, 0xc0, 0x13, 0xc0, 0x14, 0x00, 0x33, 0x00, 0x39, 0x00, 0x2f, 0x00, 0x35,
        0x00, 0x0a,
    ],
    signature_algorithms: &[
        0x00, 0x16, 0x04, 0x03, 0x05, 0x03, 0x06, 0x03, 0x08, 0x04, 0x08, 0x05, 0x08, 0x06,
        0x04, 0x01, 0x05, 0x01, 0x06, 0x01, 0x02, 0x03, 0x02, 0x01,
    ],
    extensions_target: 405,
};

/// ALPN list: "h2", "http/1.1"
const ALPN_PROTOCOLS: &[u8] = &[
    0x00, 0x0c, 0x02, b'h', b'2', 0x08, b'h', b't', b't', b'p', b'/', b'1', b'.', b'1',
];
/// status_request: OCSP, no responder ids, no extensions
const STATUS_REQUEST_OCSP: &[u8] = &[0x01, 0x00, 0x00, 0x00, 0x00];
/// ec_point_formats: uncompressed only
const EC_POINT_FORMATS_UNCOMPRESSED: &[u8] = &[0x01, 0x00];
/// Firefox supported_groups: x25519, secp256r1, secp384r1, secp521r1
const FIREFOX_GROUPS: &[u8] = &[0x00, 0x08, 0x00, 0x1d, 0x00, 0x17, 0x00, 0x18, 0x00, 0x19];
/// Chrome supported_groups after its GREASE entry
const CHROME_GROUPS: &[u8] = &[0x00, 0x1d, 0x00, 0x17, 0x00, 0x18];

fn profile(browser: Browser) -> &'static Profile {
    match browser {
        Browser::Chrome => &CHROME,
        Browser::Firefox => &FIREFOX,
    }
}

// ============= Extension Builder =============

/// Builder for TLS extensions with correct length calculation
struct ExtensionBuilder {
    extensions: Vec<u8>,
}

impl ExtensionBuilder {
    fn new() -> Self {
        Self {
            extensions: Vec::with_capacity(512),
        }
    }

    /// Add one extension: type (2) + length (2) + data
    fn add(&mut self, ext_type: u16, data: &[u8]) -> &mut Self {
        self.extensions.extend_from_slice(&ext_type.to_be_bytes());
        self.extensions.extend_from_slice(&(data.len() as u16).to_be_bytes());
        self.extensions.extend_from_slice(data);
        self
    }

    fn add_empty(&mut self, ext_type: u16) -> &mut Self {
        self.add(ext_type, &[])
    }

    fn add_server_name(&mut self, host: &str) -> &mut Self {
        self.add(ext::SERVER_NAME, &server_name_data(host))
    }

    /// Zero-filled padding up to `target` bytes of extensions.
    fn add_padding_to(&mut self, target: usize) -> &mut Self {
        let len = padding_len(target, self.extensions.len());
        self.add(ext::PADDING, &vec![0u8; len])
    }

    fn build(self) -> Vec<u8> {
        self.extensions
    }
}

/// server_name extension data: list length, host_name type, name length, name.
pub fn server_name_data(host: &str) -> Vec<u8> {
    let name = host.as_bytes();
    let mut data = Vec::with_capacity(5 + name.len());
    data.extend_from_slice(&((name.len() + 3) as u16).to_be_bytes());
    data.push(0x00);
    data.extend_from_slice(&(name.len() as u16).to_be_bytes());
    data.extend_from_slice(name);
    data
}

/// Padding data length that brings `current` extension bytes to `target`,
/// accounting for the padding extension's own 4-byte header. Never negative.
pub fn padding_len(target: usize, current: usize) -> usize {
    target.saturating_sub(current + 4)
}

/// A GREASE value (RFC 8701): `0x?A?A` with the same random nibble twice.
pub fn grease(rng: &SecureRandom) -> [u8; 2] {
    let value = (rng.range(16) * 16 + 0x0a) as u8;
    [value, value]
}

// ============= Fields =============

/// ClientHello random: `IV || AES-256-CFB(aes_key, IV, goal[..16])`.
///
/// `goal = SHA-256(decimal(unix_secs / 43200) || key)`, so a peer holding
/// the key can recognise the field for the current 12-hour window.
pub fn make_random_field(session: &SessionState, rng: &SecureRandom, unix_secs: i64) -> [u8; 32] {
    let mut iv = [0u8; 16];
    rng.fill(&mut iv);

    let goal = random_field_goal(session, unix_secs);
    let cipher = AesCfb::new(*session.aes_key(), iv);
    let encrypted = cipher.encrypt(&goal[..16]);

    let mut field = [0u8; 32];
    field[..16].copy_from_slice(&iv);
    field[16..].copy_from_slice(&encrypted);
    field
}

fn random_field_goal(session: &SessionState, unix_secs: i64) -> [u8; 32] {
    let window = unix_secs.div_euclid(RANDOM_FIELD_WINDOW_SECS).to_string();
    sha256_parts(&[window.as_bytes(), session.shared_key()])
}

/// Whether `field` was produced by [`make_random_field`] for the window
/// containing `unix_secs`.
pub fn verify_random_field(session: &SessionState, field: &[u8; 32], unix_secs: i64) -> bool {
    let mut iv = [0u8; 16];
    iv.copy_from_slice(&field[..16]);
    let cipher = AesCfb::new(*session.aes_key(), iv);
    let decrypted = cipher.decrypt(&field[16..]);
    let goal = random_field_goal(session, unix_secs);
    decrypted[..] == goal[..16]
}

/// Session ticket body, identical for every hello inside one
/// `ticket_time_hint` bucket.
pub fn session_ticket(session: &SessionState, unix_secs: i64) -> Vec<u8> {
    seeded_random(SESSION_TICKET_LEN, session.ticket_seed(unix_secs))
}

// ============= Extension Sets =============

fn chrome_extensions(session: &SessionState, rng: &SecureRandom, unix_secs: i64) -> Vec<u8> {
    let profile = profile(Browser::Chrome);

    let mut groups = Vec::with_capacity(2 + 2 + CHROME_GROUPS.len());
    groups.extend_from_slice(&((2 + CHROME_GROUPS.len()) as u16).to_be_bytes());
    groups.extend_from_slice(&grease(rng));
    groups.extend_from_slice(CHROME_GROUPS);

    let mut builder = ExtensionBuilder::new();
    builder
        .add_empty(u16::from_be_bytes(grease(rng)))
        .add(ext::RENEGOTIATION_INFO, &[0x00])
        .add_server_name(session.server_name())
        .add_empty(ext::EXTENDED_MASTER_SECRET)
        .add(ext::SESSION_TICKET, &session_ticket(session, unix_secs))
        .add(ext::SIGNATURE_ALGORITHMS, profile.signature_algorithms)
        .add(ext::STATUS_REQUEST, STATUS_REQUEST_OCSP)
        .add_empty(ext::SIGNED_CERT_TIMESTAMP)
        .add(ext::ALPN, ALPN_PROTOCOLS)
        .add_empty(ext::CHANNEL_ID)
        .add(ext::EC_POINT_FORMATS, EC_POINT_FORMATS_UNCOMPRESSED)
        .add(ext::SUPPORTED_GROUPS, &groups)
        .add(u16::from_be_bytes(grease(rng)), &[0x00])
        .add_padding_to(profile.extensions_target);
    builder.build()
}

fn firefox_extensions(session: &SessionState, unix_secs: i64) -> Vec<u8> {
    let profile = profile(Browser::Firefox);

    let mut builder = ExtensionBuilder::new();
    builder
        .add_server_name(session.server_name())
        .add_empty(ext::EXTENDED_MASTER_SECRET)
        .add(ext::RENEGOTIATION_INFO, &[0x00])
        .add(ext::SUPPORTED_GROUPS, FIREFOX_GROUPS)
        .add(ext::EC_POINT_FORMATS, EC_POINT_FORMATS_UNCOMPRESSED)
        .add(ext::SESSION_TICKET, &session_ticket(session, unix_secs))
        .add(ext::ALPN, ALPN_PROTOCOLS)
        .add(ext::STATUS_REQUEST, STATUS_REQUEST_OCSP)
        .add(ext::SIGNATURE_ALGORITHMS, profile.signature_algorithms)
        .add_padding_to(profile.extensions_target);
    builder.build()
}

// ============= Public Functions =============

/// Build the ClientHello handshake message (without record header).
pub fn build_client_hello_message(
    session: &SessionState,
    rng: &SecureRandom,
    clock: &dyn Clock,
) -> Vec<u8> {
    let unix_secs = clock.unix_secs();
    let profile = profile(session.browser());

    let random = make_random_field(session, rng, unix_secs);
    let session_id = seeded_random(SESSION_ID_LEN, clock.unix_nanos());
    let extensions = match session.browser() {
        Browser::Chrome => chrome_extensions(session, rng, unix_secs),
        Browser::Firefox => firefox_extensions(session, unix_secs),
    };

    let body_len = 2 // version
        + 32 // random
        + 1 + session_id.len()
        + 2 + profile.cipher_suites.len()
        + 2 // compression methods
        + 2 + extensions.len();

    let mut message = Vec::with_capacity(4 + body_len);

    // Handshake header
    message.push(HANDSHAKE_CLIENT_HELLO);
    put_u24_be(&mut message, body_len);

    message.extend_from_slice(&TLS_VERSION);
    message.extend_from_slice(&random);

    message.push(session_id.len() as u8);
    message.extend_from_slice(&session_id);

    message.extend_from_slice(&(profile.cipher_suites.len() as u16).to_be_bytes());
    message.extend_from_slice(profile.cipher_suites);

    // One compression method: null
    message.extend_from_slice(&[0x01, 0x00]);

    message.extend_from_slice(&(extensions.len() as u16).to_be_bytes());
    message.extend_from_slice(&extensions);

    message
}

/// Build the complete ClientHello TLS record.
pub fn compose_client_hello(
    session: &SessionState,
    rng: &SecureRandom,
    clock: &dyn Clock,
) -> Vec<u8> {
    let message = build_client_hello_message(session, rng, clock);
    wrap_record(TLS_RECORD_HANDSHAKE, TLS_VERSION_HELLO, &message)
}

/// ChangeCipherSpec record followed by a fake encrypted Finished record.
pub fn compose_reply(clock: &dyn Clock) -> Vec<u8> {
    let finished = seeded_random(FINISHED_LEN, clock.unix_nanos());

    let mut reply = Vec::with_capacity(2 * TLS_HEADER_SIZE + 1 + FINISHED_LEN);
    append_record(&mut reply, TLS_RECORD_CHANGE_CIPHER, TLS_VERSION, &[0x01]);
    append_record(&mut reply, TLS_RECORD_HANDSHAKE, TLS_VERSION, &finished);
    reply
}

/// ServerHello-shaped record followed by [`compose_reply`], the three
/// records a cooperating server answers a ClientHello with.
pub fn compose_server_reply(rng: &SecureRandom, clock: &dyn Clock) -> Vec<u8> {
    let mut body = Vec::with_capacity(70);
    body.extend_from_slice(&TLS_VERSION);
    body.extend_from_slice(&rng.bytes(32));
    body.push(SESSION_ID_LEN as u8);
    body.extend_from_slice(&rng.bytes(SESSION_ID_LEN));
    // ECDHE-RSA-AES128-GCM-SHA256, null compression
    body.extend_from_slice(&[0xc0, 0x2f, 0x00]);

    let mut message = Vec::with_capacity(4 + body.len());
    message.push(HANDSHAKE_SERVER_HELLO);
    put_u24_be(&mut message, body.len());
    message.extend_from_slice(&body);

    let mut reply = wrap_record(TLS_RECORD_HANDSHAKE, TLS_VERSION, &message);
    reply.extend_from_slice(&compose_reply(clock));
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObfsOptions;
    use crate::protocol::tls::{ClientHelloLayout, parse_client_hello};
    use crate::util::FixedClock;

    const NOW: i64 = 1_700_000_000;

    fn session(browser: Browser, host: &str) -> SessionState {
        let options = ObfsOptions {
            server_name: host.to_string(),
            key: "example key".to_string(),
            ticket_time_hint: 3600,
            browser,
        };
        SessionState::with_opaque(&options, 0x1234_5678)
    }

    fn hello(browser: Browser, host: &str, clock: &FixedClock) -> (Vec<u8>, ClientHelloLayout) {
        let rng = SecureRandom::new();
        let record = compose_client_hello(&session(browser, host), &rng, clock);
        let layout = parse_client_hello(&record).expect("well-formed ClientHello");
        (record, layout)
    }

    fn is_grease(v: u16) -> bool {
        let [hi, lo] = v.to_be_bytes();
        hi == lo && hi & 0x0f == 0x0a
    }

    #[test]
    fn test_chrome_byte_counts() {
        let (record, layout) = hello(Browser::Chrome, "www.example.com", &FixedClock::at(NOW, 0));
        assert_eq!(record.len(), 517);
        assert_eq!(layout.record_len, 512);
        assert_eq!(layout.body_len, CLIENT_HELLO_BODY_LEN);
        assert_eq!(layout.extensions_len, 407);
        assert_eq!(layout.cipher_suites.len(), 28);
        assert_eq!(layout.session_id.len(), 32);
        assert_eq!(&record[..5], &[0x16, 0x03, 0x01, 0x02, 0x00]);
        assert_eq!(&record[5..11], &[0x01, 0x00, 0x01, 0xfc, 0x03, 0x03]);
    }

    #[test]
    fn test_firefox_byte_counts() {
        let (record, layout) = hello(Browser::Firefox, "www.example.com", &FixedClock::at(NOW, 0));
        assert_eq!(record.len(), 517);
        assert_eq!(layout.record_len, record.len() - 5);
        assert_eq!(layout.body_len, record.len() - 9);
        assert_eq!(layout.extensions_len, 405);
        assert_eq!(layout.cipher_suites.len(), 30);
    }

    #[test]
    fn test_byte_counts_hold_for_short_and_long_names() {
        let long = format!("{}.com", "s".repeat(90));
        for host in ["", "a.io", "x.example", long.as_str()] {
            for browser in [Browser::Chrome, Browser::Firefox] {
                let (record, layout) = hello(browser, host, &FixedClock::at(NOW, 0));
                assert_eq!(record.len(), 517, "{browser} {host}");
                assert_eq!(layout.server_name().as_deref(), Some(host));
            }
        }
    }

    #[test]
    fn test_chrome_extension_order() {
        let (_, layout) = hello(Browser::Chrome, "www.example.com", &FixedClock::at(NOW, 0));
        let types: Vec<u16> = layout.extensions.iter().map(|(t, _)| *t).collect();

        assert_eq!(types.len(), 14);
        assert!(is_grease(types[0]));
        assert!(is_grease(types[12]));
        assert_eq!(
            &types[1..12],
            &[
                ext::RENEGOTIATION_INFO,
                ext::SERVER_NAME,
                ext::EXTENDED_MASTER_SECRET,
                ext::SESSION_TICKET,
                ext::SIGNATURE_ALGORITHMS,
                ext::STATUS_REQUEST,
                ext::SIGNED_CERT_TIMESTAMP,
                ext::ALPN,
                ext::CHANNEL_ID,
                ext::EC_POINT_FORMATS,
                ext::SUPPORTED_GROUPS,
            ]
        );
        assert_eq!(types[13], ext::PADDING);

        assert!(layout.extensions[0].1.is_empty());
        assert_eq!(layout.extensions[12].1, [0x00]);

        let groups = layout.extension(ext::SUPPORTED_GROUPS).unwrap();
        assert_eq!(&groups[..2], &[0x00, 0x08]);
        assert!(is_grease(u16::from_be_bytes([groups[2], groups[3]])));
        assert_eq!(&groups[4..], CHROME_GROUPS);

        assert_eq!(&layout.cipher_suites[..2], &[0x2a, 0x2a]);
    }

    #[test]
    fn test_firefox_extension_order() {
        let (_, layout) = hello(Browser::Firefox, "www.example.com", &FixedClock::at(NOW, 0));
        let types: Vec<u16> = layout.extensions.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            types,
            [
                ext::SERVER_NAME,
                ext::EXTENDED_MASTER_SECRET,
                ext::RENEGOTIATION_INFO,
                ext::SUPPORTED_GROUPS,
                ext::EC_POINT_FORMATS,
                ext::SESSION_TICKET,
                ext::ALPN,
                ext::STATUS_REQUEST,
                ext::SIGNATURE_ALGORITHMS,
                ext::PADDING,
            ]
        );
        assert_eq!(layout.extension(ext::SUPPORTED_GROUPS), Some(FIREFOX_GROUPS));
        assert!(!types.iter().any(|t| is_grease(*t)));
    }

    #[test]
    fn test_fixed_extension_payloads() {
        let (_, layout) = hello(Browser::Chrome, "www.example.com", &FixedClock::at(NOW, 0));
        assert_eq!(
            hex::encode(layout.extension(ext::SIGNATURE_ALGORITHMS).unwrap()),
            "0012040308040401050308050501080606010201"
        );
        assert_eq!(
            hex::encode(layout.extension(ext::ALPN).unwrap()),
            "000c02683208687474702f312e31"
        );
        assert_eq!(
            hex::encode(layout.extension(ext::STATUS_REQUEST).unwrap()),
            "0100000000"
        );
        assert_eq!(layout.extension(ext::SESSION_TICKET).unwrap().len(), 192);
        assert!(layout.extension(ext::PADDING).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_session_ticket_stable_within_bucket() {
        let base = NOW - NOW % 3600;
        let (_, a) = hello(Browser::Chrome, "www.example.com", &FixedClock::at(base + 10, 1));
        let (_, b) = hello(Browser::Chrome, "www.example.com", &FixedClock::at(base + 3500, 2));
        let (_, c) = hello(Browser::Chrome, "www.example.com", &FixedClock::at(base + 3600, 3));

        let ticket = |l: &ClientHelloLayout| l.extension(ext::SESSION_TICKET).unwrap().to_vec();
        assert_eq!(ticket(&a), ticket(&b));
        assert_ne!(ticket(&a), ticket(&c));
    }

    #[test]
    fn test_session_id_varies_with_time() {
        let (_, a) = hello(Browser::Firefox, "www.example.com", &FixedClock::at(NOW, 1));
        let (_, b) = hello(Browser::Firefox, "www.example.com", &FixedClock::at(NOW, 2));
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_random_field_verifies_in_window() {
        let session = session(Browser::Chrome, "www.example.com");
        let rng = SecureRandom::new();

        let a = make_random_field(&session, &rng, NOW);
        let b = make_random_field(&session, &rng, NOW);
        // fresh IV each time
        assert_ne!(a, b);

        assert!(verify_random_field(&session, &a, NOW));
        assert!(verify_random_field(&session, &b, NOW + 1));
        assert!(!verify_random_field(&session, &a, NOW + RANDOM_FIELD_WINDOW_SECS));

        let (_, layout) = hello(Browser::Chrome, "www.example.com", &FixedClock::at(NOW, 0));
        assert!(verify_random_field(&session, &layout.random, NOW));
    }

    #[test]
    fn test_padding_never_underflows() {
        assert_eq!(padding_len(407, 300), 103);
        assert_eq!(padding_len(407, 403), 0);
        assert_eq!(padding_len(407, 500), 0);

        // 255-byte name leaves no room for padding in either profile
        let host = format!("{}.example.com", "h".repeat(243));
        assert_eq!(host.len(), 255);
        for browser in [Browser::Chrome, Browser::Firefox] {
            let (record, layout) = hello(browser, &host, &FixedClock::at(NOW, 0));
            assert!(record.len() > 517);
            assert_eq!(layout.record_len, record.len() - 5);
            assert_eq!(layout.body_len, record.len() - 9);
            assert_eq!(layout.extension(ext::PADDING), Some(&[][..]));
            assert_eq!(layout.server_name().as_deref(), Some(host.as_str()));
        }
    }

    #[test]
    fn test_grease_values() {
        let rng = SecureRandom::new();
        for _ in 0..64 {
            let g = grease(&rng);
            assert!(is_grease(u16::from_be_bytes(g)));
        }
    }

    #[test]
    fn test_compose_reply() {
        let clock = FixedClock::at(NOW, 42);
        let reply = compose_reply(&clock);
        assert_eq!(reply.len(), 6 + 5 + 40);
        assert_eq!(&reply[..6], &[0x14, 0x03, 0x03, 0x00, 0x01, 0x01]);
        assert_eq!(&reply[6..11], &[0x16, 0x03, 0x03, 0x00, 0x28]);
        assert_eq!(&reply[11..], &seeded_random(40, clock.unix_nanos())[..]);
    }

    #[test]
    fn test_compose_server_reply_has_three_records() {
        let clock = FixedClock::at(NOW, 0);
        let reply = compose_server_reply(&SecureRandom::new(), &clock);

        let first = crate::protocol::tls::TlsRecordHeader::parse(&reply).unwrap();
        assert_eq!(first.record_type, TLS_RECORD_HANDSHAKE);
        assert_eq!(first.length, 74);
        assert_eq!(reply[5], HANDSHAKE_SERVER_HELLO);
        assert_eq!(&reply[first.record_len()..], &compose_reply(&clock)[..]);
    }
}
