use esp_hal::time::Instant;
use teststand_firmware::clock::Clock;

/// Milliseconds since the clock was created, read from the system timer.
pub struct BootClock {
    boot: Instant,
}

impl BootClock {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl Default for BootClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for BootClock {
    fn now_ms(&self) -> u64 {
        self.boot.elapsed().as_millis()
    }
}
