//! ESC throttle output.
//!
//! The ESC on the stand takes a classic 50 Hz servo signal. The hobby servo convention is kept
//! end to end: a throttle fraction becomes a whole percent, the percent becomes a 0..180
//! "angle", and the angle is spread over the calibrated pulse range.

use core::fmt::Debug;

use embedded_hal::pwm::SetDutyCycle;

use crate::config::EscCalibration;
use crate::error::Error;

/// Anything that can command the motor.
pub trait Throttle {
    type Error: Debug;

    /// Command `fraction` of full throttle, `0.0..=1.0`.
    fn set_throttle(&mut self, fraction: f32) -> Result<(), Self::Error>;
}

/// Command `fraction` of full throttle, turning a driver failure into [`Error::Esc`].
pub fn drive<T: Throttle>(esc: &mut T, fraction: f32) -> Result<(), Error> {
    esc.set_throttle(fraction).map_err(|e| {
        log::error!("ESC update to {} failed: {:?}", fraction, e);
        Error::Esc
    })
}

/// Servo angle for a throttle fraction.
///
/// Fractions are truncated to a whole percent first, so `0.999` still reads as 99%.
pub fn throttle_to_angle(fraction: f32) -> u32 {
    let percent = ((fraction * 100.0) as i32).clamp(0, 100) as u32;
    percent * 180 / 100
}

impl EscCalibration {
    /// Pulse width in µs for a servo angle, `0..=180`.
    pub fn angle_to_pulse_us(&self, angle: u32) -> u32 {
        let angle = angle.min(180);
        self.min_pulse_us + angle * (self.max_pulse_us - self.min_pulse_us) / 180
    }

    /// Pulse width in µs for a throttle fraction.
    pub fn throttle_to_pulse_us(&self, fraction: f32) -> u32 {
        self.angle_to_pulse_us(throttle_to_angle(fraction))
    }
}

/// A servo-signal ESC on any PWM channel running at the calibration's frame period.
pub struct ServoEsc<PWM> {
    pwm: PWM,
    calibration: EscCalibration,
    pulse_us: u32,
}

impl<PWM> ServoEsc<PWM>
where
    PWM: SetDutyCycle,
{
    pub fn new(pwm: PWM, calibration: EscCalibration) -> Self {
        Self {
            pwm,
            calibration,
            pulse_us: 0,
        }
    }

    /// Last pulse width written, 0 before the first write.
    pub fn pulse_us(&self) -> u32 {
        self.pulse_us
    }

    pub fn write_pulse_us(&mut self, pulse_us: u32) -> Result<(), PWM::Error> {
        let period = self.calibration.period_us.clamp(1, u16::MAX as u32);
        let pulse = pulse_us.min(period);
        self.pwm
            .set_duty_cycle_fraction(pulse as u16, period as u16)?;
        self.pulse_us = pulse;
        Ok(())
    }
}

impl<PWM> Throttle for ServoEsc<PWM>
where
    PWM: SetDutyCycle,
{
    type Error = PWM::Error;

    fn set_throttle(&mut self, fraction: f32) -> Result<(), Self::Error> {
        let pulse_us = self.calibration.throttle_to_pulse_us(fraction);
        log::debug!("ESC throttle {} -> {} us", fraction, pulse_us);
        self.write_pulse_us(pulse_us)
    }
}
