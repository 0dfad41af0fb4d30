//! Two status lights: a primary "alive" light and a secondary light for pulse codes.
//!
//! On the teststand2 board the primary light is green and the secondary one yellow.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::IndicatorConfig;
use crate::error::Error;

/// Pulse code for a sweep step that finished measuring.
pub const STEP_DONE_PULSES: u8 = 1;
/// Pulse code for a finished command (sweep completed, or `sys_init` answered).
pub const COMMAND_DONE_PULSES: u8 = 2;

pub struct StatusIndicator<P, S> {
    primary: P,
    secondary: S,
    config: IndicatorConfig,
    last_toggle_ms: u64,
    light_is_on: bool,
}

impl<P, S> StatusIndicator<P, S>
where
    P: OutputPin,
    S: OutputPin,
{
    pub fn new(primary: P, secondary: S, config: IndicatorConfig) -> Self {
        Self {
            primary,
            secondary,
            config,
            last_toggle_ms: 0,
            light_is_on: false,
        }
    }

    /// Primary light on, secondary off: ready for a command.
    pub fn set_idle(&mut self, now_ms: u64) -> Result<(), Error> {
        self.set_primary(true)?;
        self.set_secondary(false)?;
        self.last_toggle_ms = now_ms;
        Ok(())
    }

    /// Blink the primary light while waiting for commands.
    pub fn heartbeat(&mut self, now_ms: u64) -> Result<(), Error> {
        if now_ms.saturating_sub(self.last_toggle_ms) > self.config.heartbeat_ms {
            self.set_primary(!self.light_is_on)?;
            self.last_toggle_ms = now_ms;
        }
        Ok(())
    }

    /// Flash the secondary light `count` times with the primary light held off, then return to
    /// the idle state.
    ///
    /// This blocks for `gap + count * (on + gap)` and is meant to: the operator watches the
    /// code before touching the stand again.
    pub fn pulse_code(&mut self, count: u8, delay: &mut impl DelayNs) -> Result<(), Error> {
        self.set_primary(false)?;
        delay.delay_ms(self.config.pulse_gap_ms);
        for _ in 0..count {
            self.set_secondary(true)?;
            delay.delay_ms(self.config.pulse_on_ms);
            self.set_secondary(false)?;
            delay.delay_ms(self.config.pulse_gap_ms);
        }
        self.set_primary(true)
    }

    /// Primary off, secondary solid on. Shown from a safety trip until power-cycle.
    pub fn halt(&mut self) -> Result<(), Error> {
        self.set_primary(false)?;
        self.set_secondary(true)
    }

    pub fn primary_is_on(&self) -> bool {
        self.light_is_on
    }

    fn set_primary(&mut self, on: bool) -> Result<(), Error> {
        if on {
            self.primary.set_high()
        } else {
            self.primary.set_low()
        }
        .map_err(|e| {
            log::error!("primary status light: {:?}", e);
            Error::StatusLight
        })?;
        self.light_is_on = on;
        Ok(())
    }

    fn set_secondary(&mut self, on: bool) -> Result<(), Error> {
        if on {
            self.secondary.set_high()
        } else {
            self.secondary.set_low()
        }
        .map_err(|e| {
            log::error!("secondary status light: {:?}", e);
            Error::StatusLight
        })
    }
}
