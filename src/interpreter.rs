//! Command interpreter: one framed command in, one response out.
//!
//! [`TestStand`] owns every peripheral of the stand and is driven by the board's main loop:
//! feed it frames with [`TestStand::process`], call [`TestStand::idle`] while nothing arrives,
//! and stop forwarding commands once it reports [`Status::Halted`].

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::{Config, SWEEP_CAPACITY};
use crate::error::Error;
use crate::esc::{self, Throttle};
use crate::measurement::{AnalogInput, Calibration, LoadCell, MeasurementEngine};
use crate::protocol::{self, Command, Response, TX_BUFFER_LEN};
use crate::safety::{SafetyMonitor, SafetyState};
use crate::self_test::{SelfTest, SelfTestError};
use crate::status::{StatusIndicator, COMMAND_DONE_PULSES};
use crate::sweep::{SweepController, SweepOutcome, SweepRequest};

/// Session state after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// Waiting for the next command.
    Ready,
    /// The safety switch was hit. Nothing but a power cycle leaves this state.
    Halted,
}

pub struct TestStand<'a, C, V, L, T, P, S, D> {
    engine: MeasurementEngine<'a, C, V, L>,
    esc: T,
    indicator: StatusIndicator<P, S>,
    safety: &'a SafetyMonitor,
    delay: D,
    self_test: SelfTest,
    sweep: SweepController<SWEEP_CAPACITY>,
    calibration: Calibration,
    /// Set by a passing `sys_init`, consumed by the next `measure`.
    sweep_armed: bool,
    halted: bool,
    tx: [u8; TX_BUFFER_LEN],
}

impl<'a, C, V, L, T, P, S, D> TestStand<'a, C, V, L, T, P, S, D>
where
    C: AnalogInput,
    V: AnalogInput,
    L: LoadCell,
    T: Throttle,
    P: OutputPin,
    S: OutputPin,
    D: DelayNs,
{
    /// Bring the stand up: throttle to zero, tare the load cell, measure the boot current
    /// offset and show the idle lights.
    ///
    /// The motor must be at rest; boot counts as time zero for the heartbeat.
    pub fn new(
        engine: MeasurementEngine<'a, C, V, L>,
        esc: T,
        indicator: StatusIndicator<P, S>,
        safety: &'a SafetyMonitor,
        delay: D,
        config: &Config,
    ) -> Result<Self, Error> {
        let mut stand = Self {
            engine,
            esc,
            indicator,
            safety,
            delay,
            self_test: SelfTest::new(config.limits),
            sweep: SweepController::new(config.sweep),
            calibration: Calibration::default(),
            sweep_armed: false,
            halted: false,
            tx: [0; TX_BUFFER_LEN],
        };

        esc::drive(&mut stand.esc, 0.0)?;
        stand.engine.tare_thrust()?;
        stand.calibration.current_zero_offset =
            -stand.engine.measure_current(0.0, &mut stand.delay)?;
        stand.indicator.set_idle(0)?;
        log::info!(
            "test stand ready, boot current offset {} A",
            stand.calibration.current_zero_offset
        );

        Ok(stand)
    }

    /// Handle one framed command and write its response to `link`.
    ///
    /// Frames that do not decode to a known command are dropped without a reply. On a
    /// peripheral error the throttle is cut before the error is returned.
    pub fn process<W>(&mut self, frame: &[u8], link: &mut W) -> Result<Status, Error>
    where
        W: embedded_io::Write,
    {
        if self.halted {
            return Ok(Status::Halted);
        }

        let Some(command) = protocol::decode_command(frame) else {
            log::debug!("ignoring unrecognized frame of {} bytes", frame.len());
            return Ok(Status::Ready);
        };

        let result = match command {
            Command::SysInit => self.sys_init(link),
            Command::Measure(request) => self.measure(request, link),
        };

        if let Err(err) = result {
            log::error!("{} while handling {:?}", err, command);
            if let Err(cut) = self.force_safe() {
                log::error!("could not cut throttle: {}", cut);
            }
        }
        result
    }

    /// Blink the heartbeat while waiting for commands.
    pub fn idle(&mut self, now_ms: u64) -> Result<(), Error> {
        if self.halted {
            return Ok(());
        }
        self.indicator.heartbeat(now_ms)
    }

    /// Command zero throttle.
    pub fn force_safe(&mut self) -> Result<(), Error> {
        esc::drive(&mut self.esc, 0.0)
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn safety_state(&self) -> SafetyState {
        self.safety.state()
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    fn sys_init<W>(&mut self, link: &mut W) -> Result<Status, Error>
    where
        W: embedded_io::Write,
    {
        self.sweep_armed = false;

        let passed = match self.self_test.run(
            &mut self.engine,
            &mut self.indicator,
            self.safety,
            &mut self.calibration,
            &mut self.delay,
        ) {
            Ok(()) => true,
            Err(SelfTestError::Check(_)) => false,
            Err(SelfTestError::Hardware(err)) => return Err(err),
        };
        // the switch can still be hit after check 5, while recalibrating
        let tripped = self.safety.is_tripped();
        let ok = passed && !tripped;

        Response::SysInit { ok }.send(link, &mut self.tx)?;

        if tripped {
            return self.halt();
        }

        self.sweep_armed = ok;
        self.indicator
            .pulse_code(COMMAND_DONE_PULSES, &mut self.delay)?;
        Ok(Status::Ready)
    }

    fn measure<W>(&mut self, request: SweepRequest, link: &mut W) -> Result<Status, Error>
    where
        W: embedded_io::Write,
    {
        let armed = core::mem::take(&mut self.sweep_armed);
        let accepted = if armed {
            request.validate(SweepController::<SWEEP_CAPACITY>::max_steps())
        } else {
            Err(Error::NotInitialized)
        };
        if let Err(err) = accepted {
            log::warn!("measure rejected: {}", err);
            Response::Measure {
                ok: false,
                data: &[],
            }
            .send(link, &mut self.tx)?;
            return Ok(Status::Ready);
        }

        let outcome = self.sweep.run(
            request,
            &mut self.engine,
            &mut self.esc,
            &mut self.indicator,
            self.safety,
            self.calibration.current_zero_offset,
            &mut self.delay,
        )?;

        let ok = outcome == SweepOutcome::Completed;
        Response::Measure {
            ok,
            data: self.sweep.records(),
        }
        .send(link, &mut self.tx)?;

        if !ok {
            return self.halt();
        }

        self.indicator
            .pulse_code(COMMAND_DONE_PULSES, &mut self.delay)?;
        Ok(Status::Ready)
    }

    fn halt(&mut self) -> Result<Status, Error> {
        self.halted = true;
        self.sweep_armed = false;
        self.force_safe()?;
        self.indicator.halt()?;
        log::warn!("safety switch tripped, halted until power cycle");
        Ok(Status::Halted)
    }
}
