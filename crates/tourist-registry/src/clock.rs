//! Wall-clock source
//!
//! Identifiers, fingerprints and the night-travel flag all derive from "now".
//! Handlers read it through [`Clock`] so tests can pin the hour.

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    /// Current instant in the host's local offset
    fn now(&self) -> DateTime<FixedOffset>;

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }

    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock pinned to a settable instant
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<DateTime<FixedOffset>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<FixedOffset>) -> Self {
        Self {
            instant: Mutex::new(instant),
        }
    }

    /// 2024-03-01 at `hour`:00:00 UTC
    pub fn at_hour(hour: u32) -> Self {
        let utc = FixedOffset::east_opt(0).expect("zero offset is valid");
        let instant = utc
            .with_ymd_and_hms(2024, 3, 1, hour.min(23), 0, 0)
            .single()
            .expect("fixed offsets have no ambiguous instants");
        Self::new(instant)
    }

    pub fn set(&self, instant: DateTime<FixedOffset>) {
        *self.instant.lock().unwrap_or_else(|e| e.into_inner()) = instant;
    }

    pub fn advance_millis(&self, millis: i64) {
        let mut guard = self.instant.lock().unwrap_or_else(|e| e.into_inner());
        *guard += chrono::Duration::milliseconds(millis);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.instant.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::at_hour(23);
        assert_eq!(clock.now().hour(), 23);

        let before = clock.now_millis();
        clock.advance_millis(1500);
        assert_eq!(clock.now_millis() - before, 1500);
        assert_eq!(clock.now_utc().second(), 1);
    }
}
