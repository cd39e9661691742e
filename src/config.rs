use crate::clock::Duration;
use crate::ring::SENSOR_RING_CAPACITY;
use crate::sms::PhoneNumber;

pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(300_000);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2_000);

/// Periodic reports go here. Set `LOCATOR_DESTINATION` at build time to override.
pub const DEFAULT_DESTINATION: &str = match option_env!("LOCATOR_DESTINATION") {
    Some(destination) => destination,
    None => "+15555550100",
};

/// Last known fix older than this is logged as stale
pub const STALE_AFTER: Duration = Duration::from_secs(30);

pub struct Config {
    pub report_interval: Duration,
    pub poll_interval: Duration,
    pub destination: PhoneNumber,
    /// Upper bound on sensor bytes drained per tick, so a chatty receiver cannot starve
    /// the modem path
    pub max_sensor_bytes_per_tick: usize,
}

impl Config {
    /// Replaces the report destination; numbers that do not fit are ignored.
    pub fn with_destination(mut self, destination: &str) -> Self {
        let mut number = PhoneNumber::new();
        if number.push_str(destination).is_ok() {
            self.destination = number;
        } else {
            crate::log_warn!("destination {} too long, keeping default", destination);
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut destination = PhoneNumber::new();
        let _ = destination.push_str(DEFAULT_DESTINATION);

        Self {
            report_interval: DEFAULT_REPORT_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            destination,
            max_sensor_bytes_per_tick: SENSOR_RING_CAPACITY,
        }
    }
}
