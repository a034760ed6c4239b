use super::types::Browser;

// Helper defaults kept private to the config module.
pub(crate) fn default_ticket_time_hint() -> u64 {
    3600
}

pub(crate) fn default_browser() -> Browser {
    Browser::Chrome
}

pub(crate) fn default_max_buffer() -> usize {
    16 * 1024 * 1024
}

/// Longest SNI host name accepted (one-byte DNS length limit).
pub(crate) fn max_server_name_len() -> usize {
    255
}
