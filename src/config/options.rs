//! `Name=value;Name=value` option strings handed over by the host proxy.

use tracing::debug;

use crate::error::{ObfsError, Result};

use super::defaults::default_ticket_time_hint;
use super::types::{Browser, ObfsOptions};

/// Plugin name the host uses to select this obfuscator.
pub const PLUGIN_NAME: &str = "go_quiet";

const KEYS: [&str; 4] = ["ServerName", "Key", "TicketTimeHint", "Browser"];

#[derive(Default)]
struct RawOptions<'a> {
    server_name: Option<&'a str>,
    key: Option<&'a str>,
    ticket_time_hint: Option<&'a str>,
    browser: Option<&'a str>,
}

impl<'a> RawOptions<'a> {
    fn slot(&mut self, name: &str) -> Option<&mut Option<&'a str>> {
        match name {
            "ServerName" => Some(&mut self.server_name),
            "Key" => Some(&mut self.key),
            "TicketTimeHint" => Some(&mut self.ticket_time_hint),
            "Browser" => Some(&mut self.browser),
            _ => None,
        }
    }
}

/// Parse a `;`-separated option string.
///
/// The first occurrence of a name wins and unknown names are skipped.
/// All four names in [`KEYS`] must be present.
pub fn parse_options(input: &str) -> Result<ObfsOptions> {
    let mut raw = RawOptions::default();

    for segment in input.split(';') {
        if segment.trim().is_empty() {
            continue;
        }
        let Some((name, value)) = segment.split_once('=') else {
            debug!(segment, "Ignoring option without '='");
            continue;
        };
        // Values are taken verbatim: Key feeds the AES key derivation.
        let name = name.trim();
        match raw.slot(name) {
            Some(slot) if slot.is_none() => *slot = Some(value),
            Some(_) => debug!(name, "Ignoring repeated option"),
            None => debug!(name, "Ignoring unknown option"),
        }
    }

    let server_name = raw.server_name.ok_or(ObfsError::MissingOption(KEYS[0]))?;
    let key = raw.key.ok_or(ObfsError::MissingOption(KEYS[1]))?;
    let hint = raw.ticket_time_hint.ok_or(ObfsError::MissingOption(KEYS[2]))?;
    let browser = raw.browser.ok_or(ObfsError::MissingOption(KEYS[3]))?;

    Ok(ObfsOptions {
        server_name: server_name.to_string(),
        key: key.to_string(),
        ticket_time_hint: parse_time_hint(hint),
        browser: Browser::from_option(browser),
    })
}

/// Hints that are zero, negative, unparsable or wider than `i64` fall back
/// to the default bucket width.
pub(crate) fn parse_time_hint(value: &str) -> u64 {
    match value.trim().parse::<i64>() {
        Ok(hint) if hint > 0 => hint as u64,
        _ => {
            debug!(value, "Using default ticket time hint");
            default_ticket_time_hint()
        }
    }
}

/// Option string the host builds from its `obfs_param` and password.
///
/// Returns `None` when `plugin` names a different obfuscator.
pub fn plugin_option_string(plugin: &str, param: &str, password: &str) -> Option<String> {
    if plugin != PLUGIN_NAME {
        return None;
    }
    Some(format!(
        "ServerName={};Key={};TicketTimeHint={};Browser={}",
        param,
        password,
        default_ticket_time_hint(),
        Browser::Chrome,
    ))
}
