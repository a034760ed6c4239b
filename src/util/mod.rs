//! Utilities

pub mod endian;
pub mod time;

pub use time::{Clock, FixedClock, SystemClock};
