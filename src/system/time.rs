//! Time keeping
//!
//! The nRF52 has no battery-backed RTC. Wall-clock time is a reference
//! point written by the phone (or the build time after boot) plus the
//! monotonic time elapsed since.

use chrono::{Duration as ChronoDuration, NaiveDateTime};
use embassy_time::Instant;

pub struct TimeReference {
    /// Clock time, UTC
    time: NaiveDateTime,
    /// System time when `time` was taken
    instant: Instant,
}

impl TimeReference {
    /// Pin `time` to the current instant
    pub fn from_datetime(time: NaiveDateTime) -> Self {
        Self {
            time,
            instant: Instant::now(),
        }
    }
}

pub struct TimeManager {
    reference: TimeReference,
}

impl TimeManager {
    /// Start counting from `epoch` seconds since 1970
    pub fn init(epoch: i64) -> Self {
        let time = NaiveDateTime::from_timestamp_opt(epoch, 0).unwrap_or(NaiveDateTime::UNIX_EPOCH);
        Self {
            reference: TimeReference::from_datetime(time),
        }
    }

    /// Current UTC time
    pub fn get_time(&self) -> NaiveDateTime {
        let elapsed = Instant::now().duration_since(self.reference.instant);
        self.reference
            .time
            .checked_add_signed(ChronoDuration::microseconds(elapsed.as_micros() as i64))
            .unwrap_or(self.reference.time)
    }

    /// Milliseconds since the Unix epoch, for aligning redraws to the clock
    pub fn now_millis(&self) -> u64 {
        self.get_time().timestamp_millis().max(0) as u64
    }

    /// Replace the time reference
    pub fn set_time(&mut self, reference: TimeReference) {
        self.reference = reference;
    }
}
