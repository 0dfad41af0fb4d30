//! Monotonic time source used for the idle heartbeat.

/// Milliseconds since boot.
///
/// Only the heartbeat needs wall time; everything else in the stand is paced by blocking
/// [`DelayNs`](embedded_hal::delay::DelayNs) waits.
pub trait Clock {
    fn now_ms(&self) -> u64;

    /// Milliseconds elapsed since `reference_ms`, saturating at zero.
    fn elapsed_since(&self, reference_ms: u64) -> u64 {
        self.now_ms().saturating_sub(reference_ms)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
