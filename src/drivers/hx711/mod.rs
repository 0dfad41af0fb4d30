//! A bit-banged driver for the Avia HX711 24-bit bridge ADC
//!
//! Datasheet: https://cdn.sparkfun.com/datasheets/Sensors/ForceFlex/hx711_english.pdf
//!
//! The chip talks over two wires: `DOUT` goes low when a conversion is ready, and the host
//! clocks the result out MSB first on `PD_SCK`. One to three extra clock pulses after the data
//! pick the channel and gain of the next conversion, and holding `PD_SCK` high for more than
//! 60 µs powers the chip down.
//!
//! This driver is based on the `embedded-hal` traits and should work with any
//! microcontroller that has an `embedded-hal` implementation.
//!
//! A conversion is clocked out inside a critical section: an interrupt that stretched a clock
//! high phase past 60 µs would reset the chip.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::config::LoadCellConfig;
use crate::measurement::LoadCell;

pub mod gain;

pub use gain::{sign_extend, Gain, DATA_BITS};

/// How long to wait for `DOUT` to signal a conversion. The chip converts at 10 or 80 Hz.
pub const READY_TIMEOUT_MS: u32 = 500;

/// Load cell errors, generic over the data and clock pin errors.
#[derive(Debug)]
pub enum Error<DataError, ClockError> {
    /// Reading `DOUT` failed
    Data(DataError),
    /// Driving `PD_SCK` failed
    Clock(ClockError),
    /// No conversion became ready in time; the bridge is unplugged or powered down
    Timeout,
}

pub struct Hx711<DOUT, SCK, D> {
    dout: DOUT,
    sck: SCK,
    delay: D,
    gain: Gain,
    /// Raw reading taken as zero.
    offset: i32,
    /// Raw counts per unit.
    scale: f32,
    tare_samples: u32,
}

impl<DOUT, SCK, D> Hx711<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    pub fn new(dout: DOUT, sck: SCK, delay: D, config: LoadCellConfig) -> Self {
        Self {
            dout,
            sck,
            delay,
            gain: Gain::default(),
            offset: 0,
            scale: config.scale,
            tare_samples: config.tare_samples,
        }
    }

    /// Wake the chip and select channel A at gain 128.
    pub fn init(&mut self) -> Result<(), Error<DOUT::Error, SCK::Error>> {
        self.power_up()?;
        self.set_gain(Gain::A128)
    }

    /// Select the channel and gain for subsequent readings.
    ///
    /// One conversion is clocked out and discarded, so the next reading already uses `gain`.
    pub fn set_gain(&mut self, gain: Gain) -> Result<(), Error<DOUT::Error, SCK::Error>> {
        self.gain = gain;
        self.read_raw().map(|_| ())
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// Is a conversion waiting to be read?
    pub fn is_ready(&mut self) -> Result<bool, Error<DOUT::Error, SCK::Error>> {
        self.dout.is_low().map_err(Error::Data)
    }

    fn wait_ready(&mut self) -> Result<(), Error<DOUT::Error, SCK::Error>> {
        for _ in 0..READY_TIMEOUT_MS {
            if self.is_ready()? {
                return Ok(());
            }
            self.delay.delay_ms(1);
        }
        Err(Error::Timeout)
    }

    /// Read one signed conversion result.
    pub fn read_raw(&mut self) -> Result<i32, Error<DOUT::Error, SCK::Error>> {
        self.wait_ready()?;
        critical_section::with(|_| self.shift_in())
    }

    fn shift_in(&mut self) -> Result<i32, Error<DOUT::Error, SCK::Error>> {
        let mut value: u32 = 0;
        for _ in 0..DATA_BITS {
            self.sck.set_high().map_err(Error::Clock)?;
            self.delay.delay_us(1);
            let bit = self.dout.is_high().map_err(Error::Data)?;
            self.sck.set_low().map_err(Error::Clock)?;
            self.delay.delay_us(1);
            value = (value << 1) | bit as u32;
        }

        for _ in 0..self.gain.pulses() {
            self.sck.set_high().map_err(Error::Clock)?;
            self.delay.delay_us(1);
            self.sck.set_low().map_err(Error::Clock)?;
            self.delay.delay_us(1);
        }

        Ok(sign_extend(value))
    }

    /// Mean of `times` raw readings.
    pub fn read_average(&mut self, times: u32) -> Result<i32, Error<DOUT::Error, SCK::Error>> {
        let times = times.max(1);
        let mut sum: i64 = 0;
        for _ in 0..times {
            sum += self.read_raw()? as i64;
        }
        Ok((sum / times as i64) as i32)
    }

    /// Mean reading relative to the tare offset, in raw counts.
    pub fn get_value(&mut self, times: u32) -> Result<i32, Error<DOUT::Error, SCK::Error>> {
        Ok(self.read_average(times)? - self.offset)
    }

    /// Mean reading relative to the tare offset, in units of the scale.
    pub fn get_units(&mut self, times: u32) -> Result<f32, Error<DOUT::Error, SCK::Error>> {
        Ok(self.get_value(times)? as f32 / self.scale)
    }

    /// Take the mean of `times` readings as the new zero.
    pub fn tare(&mut self, times: u32) -> Result<(), Error<DOUT::Error, SCK::Error>> {
        self.offset = self.read_average(times)?;
        log::debug!("load cell tared at {} counts", self.offset);
        Ok(())
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: i32) {
        self.offset = offset;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Set raw counts per unit. A zero scale is ignored.
    pub fn set_scale(&mut self, scale: f32) {
        if scale != 0.0 {
            self.scale = scale;
        }
    }

    /// Put the chip into its low-power state.
    pub fn power_down(&mut self) -> Result<(), Error<DOUT::Error, SCK::Error>> {
        self.sck.set_low().map_err(Error::Clock)?;
        self.sck.set_high().map_err(Error::Clock)?;
        self.delay.delay_us(60);
        Ok(())
    }

    /// Wake the chip. It resets to channel A, gain 128.
    pub fn power_up(&mut self) -> Result<(), Error<DOUT::Error, SCK::Error>> {
        self.sck.set_low().map_err(Error::Clock)?;
        self.gain = Gain::A128;
        Ok(())
    }
}

impl<DOUT, SCK, D> LoadCell for Hx711<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    type Error = Error<DOUT::Error, SCK::Error>;

    fn read_kg(&mut self) -> Result<f32, Self::Error> {
        self.get_units(1)
    }

    fn tare(&mut self) -> Result<(), Self::Error> {
        let samples = self.tare_samples;
        Hx711::tare(self, samples)
    }
}
