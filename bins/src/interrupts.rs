//! GPIO edge interrupts for the safety switch and the rpm sensor.
//!
//! Both pins share the single GPIO interrupt. The handler only touches the two atomic cells
//! below; the pins themselves are parked in critical-section mutexes so the handler can clear
//! their interrupt status.

use core::cell::RefCell;

use critical_section::Mutex;
use esp_hal::gpio::{Event, Input, Io};
use esp_hal::{handler, ram};
use teststand_firmware::{PulseCounter, SafetyMonitor};

/// Latched by a falling edge on the safety switch.
pub static SAFETY: SafetyMonitor = SafetyMonitor::new();

/// Rising edges from the rpm sensor.
pub static RPM_PULSES: PulseCounter = PulseCounter::new();

static SAFETY_SWITCH: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));
static RPM_SENSOR: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));

/// Start listening on both inputs.
pub fn attach(io: &mut Io<'_>, mut safety_switch: Input<'static>, mut rpm_sensor: Input<'static>) {
    io.set_interrupt_handler(gpio_handler);

    critical_section::with(|cs| {
        safety_switch.listen(Event::FallingEdge);
        rpm_sensor.listen(Event::RisingEdge);
        SAFETY_SWITCH.borrow_ref_mut(cs).replace(safety_switch);
        RPM_SENSOR.borrow_ref_mut(cs).replace(rpm_sensor);
    });
}

#[handler]
#[ram]
fn gpio_handler() {
    critical_section::with(|cs| {
        if let Some(pin) = SAFETY_SWITCH.borrow_ref_mut(cs).as_mut() {
            if pin.is_interrupt_set() {
                SAFETY.trip();
                pin.clear_interrupt();
            }
        }

        if let Some(pin) = RPM_SENSOR.borrow_ref_mut(cs).as_mut() {
            if pin.is_interrupt_set() {
                RPM_PULSES.record_edge();
                pin.clear_interrupt();
            }
        }
    });
}
