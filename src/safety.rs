//! Latched emergency stop.
//!
//! The safety switch pulls its input low when pressed. The board wires the falling edge to
//! [`SafetyMonitor::trip`]; everything else only ever reads the state. There is no way back to
//! [`SafetyState::Armed`] short of a power cycle.

use core::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyState {
    Armed,
    Tripped,
}

pub struct SafetyMonitor {
    tripped: AtomicBool,
}

impl SafetyMonitor {
    pub const fn new() -> Self {
        Self {
            tripped: AtomicBool::new(false),
        }
    }

    /// Latch the monitor. Only the safety switch interrupt handler calls this.
    ///
    /// Runs in interrupt context: a single store, no I/O.
    #[inline]
    pub fn trip(&self) {
        self.tripped.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SafetyState {
        if self.is_tripped() {
            SafetyState::Tripped
        } else {
            SafetyState::Armed
        }
    }
}

impl Default for SafetyMonitor {
    fn default() -> Self {
        Self::new()
    }
}
