//! Throttle sweep.
//!
//! Steps the ESC from 0% to the scaled 100% in `steps` even increments, measuring at every
//! level. The safety monitor is polled before every step, before the ramp-down and once more
//! at the end; a trip cuts the throttle and stops the sweep where it is.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use num_traits::float::FloatCore;
use serde::Serialize;

use crate::config::SweepConfig;
use crate::error::Error;
use crate::esc::{self, Throttle};
use crate::measurement::{AnalogInput, LoadCell, MeasurementEngine};
use crate::safety::SafetyMonitor;
use crate::status::{StatusIndicator, STEP_DONE_PULSES};

/// Result of one sweep step, serialized in the `data` array of a `measure` response.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasurementRecord {
    /// Commanded throttle in whole percent.
    pub throttle: f32,
    #[serde(rename = "rpm")]
    pub rotational_speed: u32,
    /// Amperes, zero-offset corrected.
    pub current: f32,
    /// Kilograms relative to the last tare.
    pub thrust: f32,
    /// Battery volts.
    pub voltage: f32,
}

/// Parameters of a `measure` command.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SweepRequest {
    pub steps: u32,
    /// Multiplier applied to every commanded throttle, in (0, 1].
    pub throttle_scale: f32,
}

impl SweepRequest {
    pub fn validate(&self, max_steps: usize) -> Result<(), Error> {
        if self.steps == 0 {
            return Err(Error::NoSteps);
        }
        if self.steps as usize > max_steps {
            return Err(Error::TooManySteps {
                requested: self.steps,
                max: max_steps as u32,
            });
        }
        // also rejects NaN
        if !(self.throttle_scale > 0.0 && self.throttle_scale <= 1.0) {
            return Err(Error::InvalidThrottleScale);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SweepOutcome {
    /// Every step from 0% to 100% was measured.
    Completed,
    /// The safety switch was hit; the buffer holds the steps measured before it.
    Tripped,
}

/// Runs sweeps into a buffer of `N` records, which allows up to `N - 1` steps.
pub struct SweepController<const N: usize> {
    buffer: heapless::Vec<MeasurementRecord, N>,
    config: SweepConfig,
}

impl<const N: usize> SweepController<N> {
    pub fn new(config: SweepConfig) -> Self {
        Self {
            buffer: heapless::Vec::new(),
            config,
        }
    }

    /// Largest step count this controller accepts.
    pub const fn max_steps() -> usize {
        N.saturating_sub(1)
    }

    /// Records written by the last sweep, in step order.
    pub fn records(&self) -> &[MeasurementRecord] {
        &self.buffer
    }

    /// Run a complete sweep.
    ///
    /// The request is validated before the ESC is touched. On return the ESC is always at
    /// zero throttle, unless a peripheral error cut the sweep short.
    #[allow(clippy::too_many_arguments)]
    pub fn run<C, V, L, T, P, S>(
        &mut self,
        request: SweepRequest,
        engine: &mut MeasurementEngine<'_, C, V, L>,
        esc: &mut T,
        indicator: &mut StatusIndicator<P, S>,
        safety: &SafetyMonitor,
        current_zero_offset: f32,
        delay: &mut impl DelayNs,
    ) -> Result<SweepOutcome, Error>
    where
        C: AnalogInput,
        V: AnalogInput,
        L: LoadCell,
        T: Throttle,
        P: OutputPin,
        S: OutputPin,
    {
        self.buffer.clear();
        request.validate(Self::max_steps())?;
        log::info!(
            "sweep: {} steps, throttle scale {}",
            request.steps,
            request.throttle_scale
        );

        for step in 0..=request.steps {
            if safety.is_tripped() {
                return self.abort(esc, indicator, delay);
            }

            let fraction = step as f32 / request.steps as f32;
            let commanded = fraction * request.throttle_scale;
            esc::drive(esc, commanded)?;
            delay.delay_ms(self.config.settle_ms);

            let record = MeasurementRecord {
                throttle: (commanded * 100.0).round(),
                rotational_speed: engine.measure_rotational_speed(delay),
                current: engine.measure_current(current_zero_offset, delay)?,
                thrust: engine.measure_thrust(delay)?,
                voltage: engine.measure_voltage(delay)?,
            };
            log::debug!("step {}: {:?}", step, record);
            self.buffer.push(record).map_err(|_| Error::TooManySteps {
                requested: request.steps,
                max: Self::max_steps() as u32,
            })?;

            // no abrupt load release after the full-throttle step
            if step == request.steps && !safety.is_tripped() {
                for stage in self.config.ramp_down {
                    esc::drive(esc, stage * request.throttle_scale)?;
                    delay.delay_ms(self.config.ramp_hold_ms);
                }
            }

            indicator.pulse_code(STEP_DONE_PULSES, delay)?;
            esc::drive(esc, 0.0)?;
        }

        if safety.is_tripped() {
            return self.abort(esc, indicator, delay);
        }

        log::info!("sweep completed, {} records", self.buffer.len());
        Ok(SweepOutcome::Completed)
    }

    fn abort<T, P, S>(
        &mut self,
        esc: &mut T,
        indicator: &mut StatusIndicator<P, S>,
        delay: &mut impl DelayNs,
    ) -> Result<SweepOutcome, Error>
    where
        T: Throttle,
        P: OutputPin,
        S: OutputPin,
    {
        esc::drive(esc, 0.0)?;
        delay.delay_ms(self.config.trip_cutoff_ms);
        indicator.halt()?;
        log::warn!(
            "sweep stopped by safety switch after {} records",
            self.buffer.len()
        );
        Ok(SweepOutcome::Tripped)
    }
}
