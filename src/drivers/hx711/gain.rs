/// Input channel and gain used for the *next* conversion.
///
/// The HX711 has no registers; the selection is made by the number of extra clock pulses sent
/// after the 24 data bits of the current conversion.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Gain {
    /// Channel A, gain 128 (±20 mV full scale at 5 V)
    #[default]
    A128 = 1,
    /// Channel B, gain 32
    B32 = 2,
    /// Channel A, gain 64
    A64 = 3,
}

impl Gain {
    /// Clock pulses sent after the data bits.
    pub const fn pulses(self) -> u8 {
        self as u8
    }
}

/// Bits in one conversion result.
pub const DATA_BITS: u8 = 24;

/// Sign-extend a 24-bit two's-complement conversion result.
pub const fn sign_extend(raw: u32) -> i32 {
    ((raw << 8) as i32) >> 8
}
