//! Measurement and safety core for a motor/propeller thrust test stand.
//!
//! The stand drives an ESC through a throttle sweep, samples rotational speed, current, thrust
//! and battery voltage at every step, and reports the results to a host as one JSON object per
//! line. A latched safety switch can stop a running sweep at any time.
//!
//! Everything in this crate is written against `embedded-hal` traits and a handful of small
//! capability traits ([`measurement::AnalogInput`], [`measurement::LoadCell`],
//! [`esc::Throttle`], [`clock::Clock`]), so the same code runs on the ESP32 board crate and in
//! host unit tests.
#![cfg_attr(not(test), no_std)]

pub mod clock;
pub mod config;
pub mod drivers;
pub mod error;
pub mod esc;
pub mod interpreter;
pub mod measurement;
pub mod protocol;
pub mod safety;
pub mod status;
pub mod sweep;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, MAX_MEASURE_STEPS};
pub use error::Error;
pub use interpreter::{Status, TestStand};
pub use measurement::PulseCounter;
pub use safety::{SafetyMonitor, SafetyState};
