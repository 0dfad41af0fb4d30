//! One-shot ADC channels for the current and battery voltage sense lines.

use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::peripherals::{ADC1, ADC2, GPIO25, GPIO32};
use esp_hal::Blocking;
use teststand_firmware::measurement::AnalogInput;

macro_rules! oneshot_input {
    ($(#[$meta:meta])* $name:ident, $adc:ident, $pin:ident) => {
        $(#[$meta])*
        pub struct $name<'d> {
            adc: Adc<'d, $adc<'d>, Blocking>,
            pin: AdcPin<$pin<'d>, $adc<'d>>,
        }

        impl<'d> $name<'d> {
            /// Full 0..3.1 V input range (11 dB attenuation).
            pub fn new(adc: $adc<'d>, pin: $pin<'d>) -> Self {
                let mut config = AdcConfig::new();
                let pin = config.enable_pin(pin, Attenuation::_11dB);
                Self {
                    adc: Adc::new(adc, config),
                    pin,
                }
            }
        }

        impl AnalogInput for $name<'_> {
            type Error = ();

            fn read_raw(&mut self) -> Result<u16, Self::Error> {
                nb::block!(self.adc.read_oneshot(&mut self.pin))
            }
        }
    };
}

oneshot_input!(
    /// Current sense amplifier output, 25.1 mΩ shunt behind a 10x amplifier.
    CurrentSense,
    ADC2,
    GPIO25
);

oneshot_input!(
    /// Battery voltage divider output.
    BatterySense,
    ADC1,
    GPIO32
);
