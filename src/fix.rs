use chrono::{NaiveTime, Timelike};
use defmt::Format;

use crate::clock::{Duration, Instant};

/// A decoded position reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Format)]
pub struct Fix {
    pub valid: bool,
    /// Decimal degrees, south negative
    pub latitude: f64,
    /// Decimal degrees, west negative
    pub longitude: f64,
    /// Meters above mean sea level
    pub altitude: f32,
    /// UTC time of the fix, when the receiver reported one
    #[defmt(Debug2Format)]
    pub time: Option<NaiveTime>,
}

impl Fix {
    /// Fix time as `(hour, minute, second)`, loggable on every target.
    pub fn utc_hms(&self) -> Option<(u32, u32, u32)> {
        self.time
            .map(|time| (time.hour(), time.minute(), time.second()))
    }
}

/// Latest fix only; no history.
#[derive(Debug, Default)]
pub struct FixStore {
    fix: Fix,
    updated_at: Option<Instant>,
}

impl FixStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored fix unconditionally.
    pub fn update(&mut self, fix: Fix, now: Instant) {
        self.fix = fix;
        self.updated_at = Some(now);
    }

    pub fn snapshot(&self) -> Fix {
        self.fix
    }

    /// Time since the last update, `None` before the first one or if the clock wrapped.
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.updated_at
            .and_then(|updated_at| now.checked_duration_since(updated_at))
    }
}
