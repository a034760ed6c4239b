use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ObfsError, Result};

use super::defaults::*;
use super::options::{parse_options, plugin_option_string};
use super::types::*;

// ============= Main Config =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObfsConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    pub obfs: ObfsOptions,
}

impl ObfsConfig {
    /// Build from a host option string with default `[general]` settings.
    pub fn from_options(options: &str) -> Result<Self> {
        let config = Self {
            general: GeneralConfig::default(),
            obfs: parse_options(options)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build from the host's plugin triple.
    ///
    /// `Ok(None)` means the host selected some other obfuscator.
    pub fn from_plugin(plugin: &str, param: &str, password: &str) -> Result<Option<Self>> {
        match plugin_option_string(plugin, param, password) {
            Some(options) => Self::from_options(&options).map(Some),
            None => Ok(None),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: ObfsConfig =
            toml::from_str(content).map_err(|e| ObfsError::Config(e.to_string()))?;

        if config.obfs.ticket_time_hint == 0 {
            warn!("obfs.ticket_time_hint = 0, using default");
            config.obfs.ticket_time_hint = default_ticket_time_hint();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ObfsError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        // An empty name is allowed and yields an empty SNI entry.
        let name = &self.obfs.server_name;
        if name.len() > max_server_name_len() {
            return Err(ObfsError::InvalidOption {
                name: "ServerName",
                reason: format!(
                    "{} bytes exceeds the {} byte limit",
                    name.len(),
                    max_server_name_len()
                ),
            });
        }
        if self.obfs.ticket_time_hint == 0 {
            return Err(ObfsError::InvalidOption {
                name: "TicketTimeHint",
                reason: "must be > 0".to_string(),
            });
        }

        if self.general.max_buffer < 2 * crate::protocol::constants::MAX_RECORD_LEN {
            return Err(ObfsError::Config(format!(
                "general.max_buffer must be at least {} bytes",
                2 * crate::protocol::constants::MAX_RECORD_LEN
            )));
        }

        if self.obfs.key.is_empty() {
            warn!("obfs key is empty; traffic is distinguishable by anyone");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_options_builds_default_general() {
        let cfg = ObfsConfig::from_options(
            "ServerName=www.example.com;Key=k;TicketTimeHint=0;Browser=chrome",
        )
        .unwrap();
        assert_eq!(cfg.obfs.ticket_time_hint, 3600);
        assert_eq!(cfg.general.max_buffer, default_max_buffer());
        assert_eq!(cfg.general.log_level, LogLevel::Normal);
    }

    #[test]
    fn from_plugin_selects_by_name() {
        assert!(ObfsConfig::from_plugin("tls1.2_ticket_auth", "a.com", "pw")
            .unwrap()
            .is_none());

        let cfg = ObfsConfig::from_plugin("go_quiet", "a.com", "pw")
            .unwrap()
            .unwrap();
        assert_eq!(cfg.obfs.server_name, "a.com");
        assert_eq!(cfg.obfs.browser, Browser::Chrome);
    }

    #[test]
    fn from_plugin_empty_param_activates() {
        let cfg = ObfsConfig::from_plugin("go_quiet", "", "pw")
            .unwrap()
            .unwrap();
        assert_eq!(cfg.obfs.server_name, "");
        assert_eq!(cfg.obfs.key, "pw");
    }

    #[test]
    fn long_server_name_is_rejected() {
        let opts = format!(
            "ServerName={};Key=k;TicketTimeHint=1;Browser=chrome",
            "a".repeat(256)
        );
        let err = ObfsConfig::from_options(&opts).unwrap_err().to_string();
        assert!(err.contains("ServerName"));

        let opts = format!(
            "ServerName={};Key=k;TicketTimeHint=1;Browser=chrome",
            "a".repeat(255)
        );
        assert!(ObfsConfig::from_options(&opts).is_ok());
    }

    #[test]
    fn toml_full_config() {
        let toml = r#"
            [general]
            log_level = "verbose"
            max_buffer = 1048576

            [obfs]
            server_name = "www.bing.com"
            key = "secret"
            ticket_time_hint = 7200
            browser = "firefox"
        "#;
        let cfg = ObfsConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.general.log_level, LogLevel::Verbose);
        assert_eq!(cfg.general.max_buffer, 1_048_576);
        assert_eq!(cfg.obfs.server_name, "www.bing.com");
        assert_eq!(cfg.obfs.ticket_time_hint, 7200);
        assert_eq!(cfg.obfs.browser, Browser::Firefox);
    }

    #[test]
    fn toml_defaults_are_applied() {
        let toml = r#"
            [obfs]
            server_name = "www.bing.com"
            key = "secret"
            ticket_time_hint = 0
        "#;
        let cfg = ObfsConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.obfs.ticket_time_hint, default_ticket_time_hint());
        assert_eq!(cfg.obfs.browser, default_browser());
        assert_eq!(cfg.general.max_buffer, default_max_buffer());
    }

    #[test]
    fn toml_missing_obfs_table_is_rejected() {
        let err = ObfsConfig::from_toml_str("[general]\nlog_level = \"debug\"\n").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn toml_tiny_max_buffer_is_rejected() {
        let toml = r#"
            [general]
            max_buffer = 1024

            [obfs]
            server_name = "www.bing.com"
            key = "secret"
        "#;
        let err = ObfsConfig::from_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("general.max_buffer"));
    }

    #[test]
    fn load_reads_file() {
        let toml = r#"
            [obfs]
            server_name = "cdn.example.org"
            key = "k"
            browser = "safari"
        "#;
        let dir = std::env::temp_dir();
        let path = dir.join("quiet_tls_load_reads_file_test.toml");
        std::fs::write(&path, toml).unwrap();
        let cfg = ObfsConfig::load(&path).unwrap();
        assert_eq!(cfg.obfs.server_name, "cdn.example.org");
        assert_eq!(cfg.obfs.browser, Browser::Firefox);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let path = std::env::temp_dir().join("quiet_tls_definitely_missing.toml");
        let err = ObfsConfig::load(&path).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn toml_roundtrip_keeps_browser() {
        let cfg = ObfsConfig::from_options(
            "ServerName=a.com;Key=k;TicketTimeHint=60;Browser=firefox",
        )
        .unwrap();
        let text = toml::to_string(&cfg).unwrap();
        assert!(text.contains("browser = \"firefox\""));
        let back = ObfsConfig::from_toml_str(&text).unwrap();
        assert_eq!(back.obfs.browser, Browser::Firefox);
        assert_eq!(back.obfs.ticket_time_hint, 60);
    }
}
