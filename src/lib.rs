#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[macro_use]
pub mod logging;

pub mod alarm;
pub mod channel;
pub mod clock;
pub mod command;
pub mod config;
pub mod fix;
pub mod gnss;
pub mod ring;
pub mod sms;
pub mod tracker;

#[cfg(feature = "esp32")]
pub mod board;

#[cfg(test)]
mod mock;

pub use config::Config;
pub use tracker::{TickSummary, Tracker, TrackerError};
