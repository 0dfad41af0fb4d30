//! Drivers for the stand's external sensor chips.

pub mod hx711;
