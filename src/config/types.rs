use serde::{Deserialize, Serialize};
use tracing::warn;

use super::defaults::*;

// ============= Log Level =============

/// Logging verbosity level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// All messages including trace.
    Debug,
    /// Detailed operational logs (debug + info + warn + error).
    Verbose,
    /// Standard operational logs (info + warn + error).
    #[default]
    Normal,
    /// Only warnings and errors.
    Silent,
}

impl LogLevel {
    /// Convert to tracing EnvFilter directive string.
    pub fn to_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "trace",
            LogLevel::Verbose => "debug",
            LogLevel::Normal => "info",
            LogLevel::Silent => "warn",
        }
    }

    /// Parse from a loose string (CLI argument).
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "debug" | "trace" => LogLevel::Debug,
            "verbose" => LogLevel::Verbose,
            "normal" | "info" => LogLevel::Normal,
            "silent" | "quiet" | "error" | "warn" => LogLevel::Silent,
            _ => LogLevel::Normal,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Verbose => write!(f, "verbose"),
            LogLevel::Normal => write!(f, "normal"),
            LogLevel::Silent => write!(f, "silent"),
        }
    }
}

// ============= Browser Profile =============

/// Browser whose ClientHello fingerprint is imitated.
///
/// Only the literal `chrome` selects Chrome. Every other value, known or
/// not, selects Firefox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Browser {
    Chrome,
    Firefox,
}

impl Browser {
    pub fn from_option(value: &str) -> Self {
        match value {
            "chrome" => Browser::Chrome,
            "firefox" => Browser::Firefox,
            other => {
                warn!(browser = other, "Unknown browser profile, using firefox");
                Browser::Firefox
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
        }
    }
}

impl From<String> for Browser {
    fn from(value: String) -> Self {
        Browser::from_option(&value)
    }
}

impl From<Browser> for String {
    fn from(value: Browser) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============= Sub-Configs =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub log_level: LogLevel,

    /// Per-connection cap on buffered bytes (pending output and reassembly).
    #[serde(default = "default_max_buffer")]
    pub max_buffer: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Normal,
            max_buffer: default_max_buffer(),
        }
    }
}

/// Obfuscator options. Field names follow the TOML table; the option
/// string spells them `ServerName`, `Key`, `TicketTimeHint` and `Browser`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ObfsOptions {
    pub server_name: String,

    pub key: String,

    /// Session ticket bucket width in seconds. Zero means the default.
    #[serde(default = "default_ticket_time_hint")]
    pub ticket_time_hint: u64,

    #[serde(default = "default_browser")]
    pub browser: Browser,
}

// Key is never printed.
impl std::fmt::Debug for ObfsOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObfsOptions")
            .field("server_name", &self.server_name)
            .field("key", &"<redacted>")
            .field("ticket_time_hint", &self.ticket_time_hint)
            .field("browser", &self.browser)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_from_option() {
        assert_eq!(Browser::from_option("chrome"), Browser::Chrome);
        assert_eq!(Browser::from_option("firefox"), Browser::Firefox);
        assert_eq!(Browser::from_option("safari"), Browser::Firefox);
        // case-sensitive, as the option string always was
        assert_eq!(Browser::from_option("Chrome"), Browser::Firefox);
    }

    #[test]
    fn test_log_level_loose() {
        assert_eq!(LogLevel::from_str_loose("TRACE"), LogLevel::Debug);
        assert_eq!(LogLevel::from_str_loose("quiet"), LogLevel::Silent);
        assert_eq!(LogLevel::from_str_loose("nonsense"), LogLevel::Normal);
        assert_eq!(LogLevel::Verbose.to_filter_str(), "debug");
    }

    #[test]
    fn test_options_debug_hides_key() {
        let opts = ObfsOptions {
            server_name: "example.com".into(),
            key: "hunter2".into(),
            ticket_time_hint: 3600,
            browser: Browser::Chrome,
        };
        let dbg = format!("{:?}", opts);
        assert!(dbg.contains("example.com"));
        assert!(!dbg.contains("hunter2"));
    }
}
