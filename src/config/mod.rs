//! Configuration.

pub(crate) mod defaults;
mod load;
pub mod options;
pub mod types;

pub use load::ObfsConfig;
pub use options::{PLUGIN_NAME, parse_options, plugin_option_string};
pub use types::{Browser, GeneralConfig, LogLevel, ObfsOptions};
