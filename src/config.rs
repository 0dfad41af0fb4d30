//! Tuning constants for the stand.
//!
//! The defaults match the NYCU teststand2 hardware: a 25.1 mΩ shunt behind a 10x amplifier
//! for current, a resistor divider for the battery, an HX711 bridge for thrust, and an ESC
//! calibrated for 1100..1940 µs pulses.

/// Largest sweep the stand accepts. The sweep buffer holds one more record than this, since
/// both the 0% and 100% endpoints are measured.
pub const MAX_MEASURE_STEPS: usize = 20;

/// Capacity of the sweep buffer.
pub const SWEEP_CAPACITY: usize = MAX_MEASURE_STEPS + 1;

/// Analog sampling and unit conversion
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasurementConfig {
    /// Readings averaged per voltage/thrust measurement; current takes five times as many.
    pub average_n: u32,
    /// Delay between two consecutive raw readings, default 10 ms.
    pub sample_delay_ms: u32,
    /// Length of the rpm pulse counting window, default 1 s.
    pub rpm_window_ms: u32,
    /// ADC full-scale reading.
    pub adc_max: f32,
    /// ADC reference voltage.
    pub adc_reference_v: f32,
    /// Amperes per volt at the current sense output.
    pub current_scale: f32,
    /// Battery volts per volt at the divider output.
    pub voltage_scale: f32,
}

impl MeasurementConfig {
    /// Multiplier turning a raw ADC count into volts at the pin.
    pub fn volts_per_count(&self) -> f32 {
        self.adc_reference_v / self.adc_max
    }
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            average_n: 10,
            sample_delay_ms: 10,
            rpm_window_ms: 1000,
            adc_max: 4095.0,
            adc_reference_v: 3.3,
            current_scale: 63.573,
            voltage_scale: 8.7355,
        }
    }
}

/// Thresholds checked by `sys_init`, all against a motor at rest.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SelfTestLimits {
    pub max_idle_rpm: u32,
    pub max_idle_current: f32,
    pub min_supply_voltage: f32,
    pub max_idle_thrust: f32,
}

impl Default for SelfTestLimits {
    fn default() -> Self {
        Self {
            max_idle_rpm: 60,
            max_idle_current: 5.0,
            min_supply_voltage: 3.0,
            max_idle_thrust: 1.0,
        }
    }
}

/// Sweep pacing
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SweepConfig {
    /// Hold after every throttle change before sampling.
    pub settle_ms: u32,
    /// Fractions of the full (scaled) throttle stepped through after the 100% step.
    pub ramp_down: [f32; 3],
    /// Hold at each ramp-down stage.
    pub ramp_hold_ms: u32,
    /// Wait between cutting the throttle and showing the halt pattern after a trip.
    pub trip_cutoff_ms: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            settle_ms: 1000,
            ramp_down: [0.75, 0.5, 0.25],
            ramp_hold_ms: 300,
            trip_cutoff_ms: 100,
        }
    }
}

/// Status light timing
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IndicatorConfig {
    pub heartbeat_ms: u64,
    pub pulse_gap_ms: u32,
    pub pulse_on_ms: u32,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            heartbeat_ms: 1000,
            pulse_gap_ms: 100,
            pulse_on_ms: 250,
        }
    }
}

/// Servo-style ESC signal
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EscCalibration {
    /// Pulse width at zero throttle (µs).
    pub min_pulse_us: u32,
    /// Pulse width at full throttle (µs).
    pub max_pulse_us: u32,
    /// PWM frame period (µs), 20 ms for a 50 Hz servo signal.
    pub period_us: u32,
}

impl Default for EscCalibration {
    fn default() -> Self {
        Self {
            min_pulse_us: 1100,
            max_pulse_us: 1940,
            period_us: 20_000,
        }
    }
}

/// HX711 thrust bridge
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoadCellConfig {
    /// Raw counts per kilogram.
    pub scale: f32,
    /// Raw readings averaged when taring.
    pub tare_samples: u32,
}

impl Default for LoadCellConfig {
    fn default() -> Self {
        Self {
            scale: 117_105.75,
            tare_samples: 10,
        }
    }
}

/// Complete stand configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub measurement: MeasurementConfig,
    pub limits: SelfTestLimits,
    pub sweep: SweepConfig,
    pub indicator: IndicatorConfig,
    pub esc: EscCalibration,
    pub load_cell: LoadCellConfig,
}
