//! Wall-clock time source

use chrono::{DateTime, TimeZone, Utc};

/// Source of wall-clock time for everything that depends on "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Whole seconds since the Unix epoch.
    fn unix_secs(&self) -> i64 {
        self.now().timestamp()
    }

    /// Nanoseconds since the Unix epoch, saturating outside the i64 range.
    fn unix_nanos(&self) -> i64 {
        let now = self.now();
        now.timestamp_nanos_opt().unwrap_or(if now.timestamp() < 0 {
            i64::MIN
        } else {
            i64::MAX
        })
    }
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Frozen at `secs` seconds plus `nanos` nanoseconds past the epoch.
    pub fn at(secs: i64, nanos: u32) -> Self {
        Self(
            Utc.timestamp_opt(secs, nanos)
                .single()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
