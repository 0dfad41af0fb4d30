/// Errors raised by the test stand core.
///
/// Peripheral faults carry no payload: the underlying driver error is logged where it is
/// converted, since the concrete error types differ per board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// An analog read (current or battery voltage) failed
    Adc,
    /// The thrust bridge did not answer
    LoadCell,
    /// The ESC signal could not be updated
    Esc,
    /// A status light could not be driven
    StatusLight,
    /// Writing a response to the host failed
    Link,
    /// A response did not fit in the transmit buffer
    ResponseTooLarge,
    /// More sweep steps were requested than the buffer can hold
    TooManySteps { requested: u32, max: u32 },
    /// A sweep needs at least one step
    NoSteps,
    /// The throttle scale must lie in (0, 1]
    InvalidThrottleScale,
    /// A sweep was requested without a passing self-test
    NotInitialized,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Adc => write!(f, "ADC read failed"),
            Error::LoadCell => write!(f, "load cell read failed"),
            Error::Esc => write!(f, "ESC update failed"),
            Error::StatusLight => write!(f, "status light update failed"),
            Error::Link => write!(f, "host link write failed"),
            Error::ResponseTooLarge => write!(f, "response does not fit the transmit buffer"),
            Error::TooManySteps { requested, max } => {
                write!(f, "{requested} steps requested, at most {max} supported")
            }
            Error::NoSteps => write!(f, "a sweep needs at least one step"),
            Error::InvalidThrottleScale => write!(f, "throttle scale must lie in (0, 1]"),
            Error::NotInitialized => write!(f, "sys_init must pass before a sweep"),
        }
    }
}
