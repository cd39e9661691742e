use core::fmt;

use defmt::Format;

/// Milliseconds since boot, truncated to 32 bits. Wraps roughly every 49.7 days.
#[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Debug, Default, Hash, Format)]
pub struct Instant(u32);

impl Instant {
    pub const fn from_millis(millis: u32) -> Self {
        Self(millis)
    }

    pub const fn as_millis(&self) -> u32 {
        self.0
    }

    /// Time elapsed since `earlier`, or `None` if the clock wrapped in between.
    pub fn checked_duration_since(&self, earlier: Instant) -> Option<Duration> {
        self.0.checked_sub(earlier.0).map(Duration)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}ms", self.0)
    }
}

#[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Debug, Default, Hash, Format)]
pub struct Duration(u32);

impl Duration {
    pub const fn from_millis(millis: u32) -> Self {
        Self(millis)
    }

    pub const fn from_secs(secs: u32) -> Self {
        Self(secs * 1_000)
    }

    pub const fn as_millis(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of monotonic time for the control loop.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// A named recurring deadline.
#[derive(Debug, Clone, PartialEq, Format)]
pub struct IntervalTimer {
    name: &'static str,
    last_fired: Instant,
    period: Duration,
}

impl IntervalTimer {
    /// Starts counting the first period from `now`.
    pub fn new(name: &'static str, period: Duration, now: Instant) -> Self {
        Self {
            name,
            last_fired: now,
            period,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn last_fired(&self) -> Instant {
        self.last_fired
    }

    /// Returns true at most once per period, re-arming the timer when it does.
    ///
    /// A clock that went backwards (32-bit wraparound) re-arms the timer from `now` and
    /// reports not due, so the wrap never fires early and delays the next fire by at most
    /// one period.
    pub fn due_and_reset(&mut self, now: Instant) -> bool {
        let Some(elapsed) = now.checked_duration_since(self.last_fired) else {
            crate::log_debug!(
                "{} timer: clock wrapped ({} -> {}), re-arming",
                self.name,
                self.last_fired.as_millis(),
                now.as_millis()
            );
            self.last_fired = now;
            return false;
        };

        if elapsed < self.period {
            return false;
        }

        self.last_fired = now;
        true
    }
}
