//! Host-side stand-ins for the board peripherals.
//!
//! Time is virtual: [`MockDelay`] only advances a counter, so a full sweep runs instantly.
//! Every mock is a cheap handle around shared state, so a test can keep a clone to inspect
//! after moving the original into the code under test.

use core::convert::Infallible;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};

use crate::clock::Clock;
use crate::esc::Throttle;
use crate::measurement::{AnalogInput, LoadCell, PulseCounter};
use crate::safety::SafetyMonitor;

/// Virtual-time delay. Can inject rpm edges into every wait, and trip a safety monitor once
/// a given instant has passed.
pub struct MockDelay<'a> {
    now_ns: Rc<Cell<u64>>,
    edges: Option<(&'a PulseCounter, u32)>,
    trip: Option<(&'a SafetyMonitor, u64)>,
}

impl<'a> MockDelay<'a> {
    pub fn new() -> Self {
        Self {
            now_ns: Rc::new(Cell::new(0)),
            edges: None,
            trip: None,
        }
    }

    /// Record `count` edges on `pulses` during every wait.
    pub fn with_edges_during_wait(mut self, pulses: &'a PulseCounter, count: u32) -> Self {
        self.edges = Some((pulses, count));
        self
    }

    /// Trip `monitor` as soon as virtual time reaches `at_ms`.
    pub fn trip_at(mut self, monitor: &'a SafetyMonitor, at_ms: u64) -> Self {
        self.trip = Some((monitor, at_ms));
        self
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.now_ns.get() / 1_000_000
    }

    pub fn clock(&self) -> MockClock {
        MockClock {
            now_ns: self.now_ns.clone(),
        }
    }

    fn advance(&mut self, ns: u64) {
        self.now_ns.set(self.now_ns.get() + ns);
        if let Some((pulses, count)) = self.edges {
            for _ in 0..count {
                pulses.record_edge();
            }
        }
        if let Some((monitor, at_ms)) = self.trip {
            if self.elapsed_ms() >= at_ms {
                monitor.trip();
            }
        }
    }
}

impl DelayNs for MockDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.advance(ns as u64);
    }

    fn delay_us(&mut self, us: u32) {
        self.advance(us as u64 * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(ms as u64 * 1_000_000);
    }
}

/// Reads the virtual time of the [`MockDelay`] it came from.
#[derive(Clone)]
pub struct MockClock {
    now_ns: Rc<Cell<u64>>,
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now_ns.get() / 1_000_000
    }
}

#[derive(Debug)]
pub struct MockFault;

/// ADC channel replaying a fixed pattern of raw counts.
#[derive(Clone)]
pub struct MockAdc {
    pattern: Rc<Vec<u16>>,
    reads: Rc<Cell<u32>>,
    failing: bool,
}

impl MockAdc {
    pub fn constant(raw: u16) -> Self {
        Self::sequence(&[raw])
    }

    /// Cycles through `raw` forever.
    pub fn sequence(raw: &[u16]) -> Self {
        Self {
            pattern: Rc::new(raw.to_vec()),
            reads: Rc::new(Cell::new(0)),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::constant(0)
        }
    }

    pub fn reads(&self) -> u32 {
        self.reads.get()
    }
}

impl AnalogInput for MockAdc {
    type Error = MockFault;

    fn read_raw(&mut self) -> Result<u16, Self::Error> {
        if self.failing {
            return Err(MockFault);
        }
        let n = self.reads.get();
        self.reads.set(n + 1);
        Ok(self.pattern[n as usize % self.pattern.len()])
    }
}

/// Load cell returning a fixed reading.
#[derive(Clone)]
pub struct MockLoadCell {
    kg: Rc<Cell<f32>>,
    reads: Rc<Cell<u32>>,
    tares: Rc<Cell<u32>>,
}

impl MockLoadCell {
    pub fn constant(kg: f32) -> Self {
        Self {
            kg: Rc::new(Cell::new(kg)),
            reads: Rc::new(Cell::new(0)),
            tares: Rc::new(Cell::new(0)),
        }
    }

    pub fn reads(&self) -> u32 {
        self.reads.get()
    }

    pub fn tares(&self) -> u32 {
        self.tares.get()
    }
}

impl LoadCell for MockLoadCell {
    type Error = MockFault;

    fn read_kg(&mut self) -> Result<f32, Self::Error> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.kg.get())
    }

    fn tare(&mut self) -> Result<(), Self::Error> {
        self.tares.set(self.tares.get() + 1);
        Ok(())
    }
}

/// ESC recording every commanded throttle.
#[derive(Clone, Default)]
pub struct MockThrottle {
    history: Rc<RefCell<Vec<f32>>>,
}

impl MockThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<f32> {
        self.history.borrow().clone()
    }

    pub fn last(&self) -> Option<f32> {
        self.history.borrow().last().copied()
    }
}

impl Throttle for MockThrottle {
    type Error = Infallible;

    fn set_throttle(&mut self, fraction: f32) -> Result<(), Self::Error> {
        self.history.borrow_mut().push(fraction);
        Ok(())
    }
}

/// Output pin recording every level written to it.
#[derive(Clone, Default)]
pub struct MockPin {
    history: Rc<RefCell<Vec<bool>>>,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.history.borrow().last().copied().unwrap_or(false)
    }

    pub fn history(&self) -> Vec<bool> {
        self.history.borrow().clone()
    }

    /// Low-to-high transitions, starting from a low pin.
    pub fn rising_edges(&self) -> usize {
        let mut level = false;
        let mut edges = 0;
        for &next in self.history.borrow().iter() {
            if next && !level {
                edges += 1;
            }
            level = next;
        }
        edges
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.history.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.history.borrow_mut().push(true);
        Ok(())
    }
}

/// PWM channel exposing the last duty written.
pub struct MockPwm {
    max_duty: u16,
    duty: Rc<Cell<u16>>,
}

impl MockPwm {
    pub fn new(max_duty: u16) -> Self {
        Self {
            max_duty,
            duty: Rc::new(Cell::new(0)),
        }
    }

    pub fn duty(&self) -> Rc<Cell<u16>> {
        self.duty.clone()
    }
}

impl pwm::ErrorType for MockPwm {
    type Error = Infallible;
}

impl SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.max_duty
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty.set(duty);
        Ok(())
    }
}

/// Host link capturing everything written.
#[derive(Default)]
pub struct MockLink {
    sent: Vec<u8>,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_str(&self) -> &str {
        core::str::from_utf8(&self.sent).unwrap()
    }

    pub fn lines(&self) -> Vec<&str> {
        self.sent_str().lines().collect()
    }
}

impl embedded_io::ErrorType for MockLink {
    type Error = Infallible;
}

impl embedded_io::Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.sent.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
