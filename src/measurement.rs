//! Averaged sensor readings.
//!
//! Every measurement blocks for a fixed, known time: the rpm window, or `n` samples spaced by
//! the sample delay. There is no range checking here; deciding whether a value is acceptable
//! is left to the self-test and the sweep.

use core::fmt::Debug;
use core::sync::atomic::{AtomicU32, Ordering};

use embedded_hal::delay::DelayNs;

use crate::config::MeasurementConfig;
use crate::error::Error;

/// A single-ended analog input returning raw ADC counts
pub trait AnalogInput {
    type Error: Debug;

    fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

/// A force sensor that already applies its own tare and scale
pub trait LoadCell {
    type Error: Debug;

    /// One tare-relative reading in kilograms.
    fn read_kg(&mut self) -> Result<f32, Self::Error>;

    /// Take the current load as the new zero.
    fn tare(&mut self) -> Result<(), Self::Error>;
}

/// Edge counter fed by the rpm sensor interrupt.
pub struct PulseCounter {
    edges: AtomicU32,
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            edges: AtomicU32::new(0),
        }
    }

    /// Count one edge. Only the rpm interrupt handler calls this.
    #[inline]
    pub fn record_edge(&self) {
        self.edges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.edges.store(0, Ordering::Relaxed);
    }

    /// Read and clear the count.
    pub fn take(&self) -> u32 {
        self.edges.swap(0, Ordering::Relaxed)
    }
}

impl Default for PulseCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Zero-offsets that live for one power-on session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    /// Added to every current reading; the negated reading taken with the motor at rest.
    pub current_zero_offset: f32,
}

pub struct MeasurementEngine<'a, C, V, L> {
    current: C,
    voltage: V,
    load_cell: L,
    pulses: &'a PulseCounter,
    config: MeasurementConfig,
}

impl<'a, C, V, L> MeasurementEngine<'a, C, V, L>
where
    C: AnalogInput,
    V: AnalogInput,
    L: LoadCell,
{
    pub fn new(
        current: C,
        voltage: V,
        load_cell: L,
        pulses: &'a PulseCounter,
        config: MeasurementConfig,
    ) -> Self {
        Self {
            current,
            voltage,
            load_cell,
            pulses,
            config,
        }
    }

    /// Count rpm pulses over one window and scale to revolutions per minute.
    pub fn measure_rotational_speed(&mut self, delay: &mut impl DelayNs) -> u32 {
        let window_ms = self.config.rpm_window_ms.max(1);
        self.pulses.reset();
        delay.delay_ms(window_ms);
        let edges = self.pulses.take();

        (edges as u64 * 60 * 1000 / window_ms as u64) as u32
    }

    /// Mean current in amperes, shifted by `offset`.
    ///
    /// Takes five times as many samples as the other channels since the shunt signal is the
    /// noisiest of the lot.
    pub fn measure_current(&mut self, offset: f32, delay: &mut impl DelayNs) -> Result<f32, Error> {
        let samples = self.config.average_n * 5;
        let per_count = self.config.volts_per_count() * self.config.current_scale;

        let mut sum = 0.0;
        for _ in 0..samples {
            let raw = self.current.read_raw().map_err(|e| {
                log::error!("current ADC read failed: {:?}", e);
                Error::Adc
            })?;
            sum += raw as f32 * per_count + offset;
            delay.delay_ms(self.config.sample_delay_ms);
        }

        Ok(sum / samples.max(1) as f32)
    }

    /// Mean thrust in kilograms.
    pub fn measure_thrust(&mut self, delay: &mut impl DelayNs) -> Result<f32, Error> {
        let samples = self.config.average_n;

        let mut sum = 0.0;
        for _ in 0..samples {
            sum += self.load_cell.read_kg().map_err(|e| {
                log::error!("load cell read failed: {:?}", e);
                Error::LoadCell
            })?;
            delay.delay_ms(self.config.sample_delay_ms);
        }

        Ok(sum / samples.max(1) as f32)
    }

    /// Mean battery voltage in volts.
    pub fn measure_voltage(&mut self, delay: &mut impl DelayNs) -> Result<f32, Error> {
        let samples = self.config.average_n;
        let per_count = self.config.volts_per_count() * self.config.voltage_scale;

        let mut sum = 0.0;
        for _ in 0..samples {
            let raw = self.voltage.read_raw().map_err(|e| {
                log::error!("battery ADC read failed: {:?}", e);
                Error::Adc
            })?;
            sum += raw as f32 * per_count;
            delay.delay_ms(self.config.sample_delay_ms);
        }

        Ok(sum / samples.max(1) as f32)
    }

    /// Re-zero the thrust baseline.
    pub fn tare_thrust(&mut self) -> Result<(), Error> {
        self.load_cell.tare().map_err(|e| {
            log::error!("load cell tare failed: {:?}", e);
            Error::LoadCell
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockAdc, MockDelay, MockLoadCell};

    fn engine<'a>(
        pulses: &'a PulseCounter,
        current: MockAdc,
        voltage: MockAdc,
        thrust: MockLoadCell,
    ) -> MeasurementEngine<'a, MockAdc, MockAdc, MockLoadCell> {
        MeasurementEngine::new(current, voltage, thrust, pulses, MeasurementConfig::default())
    }

    #[test]
    fn rpm_scales_edges_to_a_minute() {
        let pulses = PulseCounter::new();
        let mut engine = engine(
            &pulses,
            MockAdc::constant(0),
            MockAdc::constant(0),
            MockLoadCell::constant(0.0),
        );
        // 25 edges land while the window is open
        let mut delay = MockDelay::new().with_edges_during_wait(&pulses, 25);

        assert_eq!(engine.measure_rotational_speed(&mut delay), 1500);
        assert_eq!(delay.elapsed_ms(), 1000);
    }

    #[test]
    fn rpm_ignores_edges_before_the_window() {
        let pulses = PulseCounter::new();
        for _ in 0..40 {
            pulses.record_edge();
        }
        let mut engine = engine(
            &pulses,
            MockAdc::constant(0),
            MockAdc::constant(0),
            MockLoadCell::constant(0.0),
        );
        let mut delay = MockDelay::new();

        assert_eq!(engine.measure_rotational_speed(&mut delay), 0);
    }

    #[test]
    fn current_is_averaged_and_offset() {
        let pulses = PulseCounter::new();
        let current = MockAdc::constant(100);
        let mut engine = engine(
            &pulses,
            current.clone(),
            MockAdc::constant(0),
            MockLoadCell::constant(0.0),
        );
        let mut delay = MockDelay::new();

        let expected = 100.0 * (3.3 / 4095.0) * 63.573 - 1.0;
        let amps = engine.measure_current(-1.0, &mut delay).unwrap();
        assert!((amps - expected).abs() < 1e-3, "{amps} != {expected}");
        assert_eq!(current.reads(), 50);
        assert_eq!(delay.elapsed_ms(), 500);
    }

    #[test]
    fn voltage_is_averaged() {
        let pulses = PulseCounter::new();
        let mut engine = engine(
            &pulses,
            MockAdc::constant(0),
            MockAdc::sequence(&[1000, 2000]),
            MockLoadCell::constant(0.0),
        );
        let mut delay = MockDelay::new();

        let expected = 1500.0 * (3.3 / 4095.0) * 8.7355;
        let volts = engine.measure_voltage(&mut delay).unwrap();
        assert!((volts - expected).abs() < 1e-3, "{volts} != {expected}");
        assert_eq!(delay.elapsed_ms(), 100);
    }

    #[test]
    fn thrust_is_averaged() {
        let pulses = PulseCounter::new();
        let mut engine = engine(
            &pulses,
            MockAdc::constant(0),
            MockAdc::constant(0),
            MockLoadCell::constant(0.42),
        );
        let mut delay = MockDelay::new();

        let kg = engine.measure_thrust(&mut delay).unwrap();
        assert!((kg - 0.42).abs() < 1e-5);
    }

    #[test]
    fn adc_fault_is_reported() {
        let pulses = PulseCounter::new();
        let mut engine = engine(
            &pulses,
            MockAdc::failing(),
            MockAdc::constant(0),
            MockLoadCell::constant(0.0),
        );
        let mut delay = MockDelay::new();

        assert_eq!(engine.measure_current(0.0, &mut delay), Err(Error::Adc));
    }
}
