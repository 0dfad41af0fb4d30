//! Test stand firmware
//!
//! Brings up the sensors, the ESC and the status lights, then serves `sys_init` and `measure`
//! commands from the host over UART0 until the safety switch is hit. After that the throttle
//! is held at zero until the board is power-cycled.

#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use embedded_io::{Read, ReadReady};
use esp_hal::{
    clock::CpuClock,
    delay::Delay,
    gpio::{DriveMode, Input, InputConfig, Io, Level, Output, OutputConfig, Pull},
    ledc::{
        channel::{self, ChannelIFace as _},
        timer::{self, TimerIFace as _},
        LSGlobalClkSource, Ledc, LowSpeed,
    },
    main,
    time::Rate,
    uart::{Config as UartConfig, Uart},
};
use teststand_bins::{
    analog::{BatterySense, CurrentSense},
    clock::BootClock,
    interrupts::{self, RPM_PULSES, SAFETY},
};
use teststand_firmware::{
    clock::Clock,
    drivers::hx711::Hx711,
    esc::ServoEsc,
    measurement::MeasurementEngine,
    protocol::{Framer, FRAME_TIMEOUT_MS, RX_BUFFER_LEN},
    status::StatusIndicator,
    Config, Status, TestStand,
};
use esp_backtrace as _;

const HOST_BAUD: u32 = 115_200;
const ESC_FRAME_HZ: u32 = 50;
/// Throttle refresh period once halted.
const HALT_REFRESH_MS: u32 = 100;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[main]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();

    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));
    let config = Config::default();
    let clock = BootClock::new();
    let mut delay = Delay::new();

    // safety switch and rpm sensor
    let mut io = Io::new(peripherals.IO_MUX);
    interrupts::attach(
        &mut io,
        Input::new(
            peripherals.GPIO15,
            InputConfig::default().with_pull(Pull::Up),
        ),
        Input::new(peripherals.GPIO33, InputConfig::default()),
    );

    // thrust
    let mut load_cell = Hx711::new(
        Input::new(peripherals.GPIO27, InputConfig::default()),
        Output::new(peripherals.GPIO26, Level::Low, OutputConfig::default()),
        Delay::new(),
        config.load_cell,
    );
    load_cell.init().unwrap();

    // ESC on a 50 Hz, 14-bit LEDC channel
    let mut ledc = Ledc::new(peripherals.LEDC);
    ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);
    let mut esc_timer = ledc.timer::<LowSpeed>(timer::Number::Timer0);
    esc_timer
        .configure(timer::config::Config {
            duty: timer::config::Duty::Duty14Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_hz(ESC_FRAME_HZ),
        })
        .unwrap();
    let mut esc_channel = ledc.channel(channel::Number::Channel0, peripherals.GPIO13);
    esc_channel
        .configure(channel::config::Config {
            timer: &esc_timer,
            duty_pct: 0,
            drive_mode: DriveMode::PushPull,
        })
        .unwrap();

    let engine = MeasurementEngine::new(
        CurrentSense::new(peripherals.ADC2, peripherals.GPIO25),
        BatterySense::new(peripherals.ADC1, peripherals.GPIO32),
        load_cell,
        &RPM_PULSES,
        config.measurement,
    );
    let indicator = StatusIndicator::new(
        Output::new(peripherals.GPIO12, Level::High, OutputConfig::default()),
        Output::new(peripherals.GPIO14, Level::Low, OutputConfig::default()),
        config.indicator,
    );
    let mut stand = TestStand::new(
        engine,
        ServoEsc::new(esc_channel, config.esc),
        indicator,
        &SAFETY,
        Delay::new(),
        &config,
    )
    .unwrap();

    let uart = Uart::new(
        peripherals.UART0,
        UartConfig::default().with_baudrate(HOST_BAUD),
    )
    .unwrap()
    .with_tx(peripherals.GPIO1)
    .with_rx(peripherals.GPIO3);
    let (mut rx, mut tx) = uart.split();

    let mut framer = Framer::<RX_BUFFER_LEN>::new();
    let mut byte = [0u8; 1];
    let mut last_byte_ms = clock.now_ms();

    'commands: loop {
        if !rx.read_ready().unwrap_or(false) {
            if framer.is_receiving() && clock.elapsed_since(last_byte_ms) > FRAME_TIMEOUT_MS {
                log::warn!("dropped a partial command after {} ms of silence", FRAME_TIMEOUT_MS);
                framer.reset();
            }
            if let Err(err) = stand.idle(clock.now_ms()) {
                log::warn!("heartbeat: {}", err);
            }
            continue;
        }

        match rx.read(&mut byte) {
            Ok(1) => last_byte_ms = clock.now_ms(),
            Ok(_) => continue,
            Err(err) => {
                log::warn!("host link read failed: {:?}", err);
                continue;
            }
        }

        if let Some(frame) = framer.push(byte[0]) {
            match stand.process(frame, &mut tx) {
                Ok(Status::Ready) => {}
                Ok(Status::Halted) => break 'commands,
                Err(err) => {
                    log::error!("stopping after a peripheral fault: {}", err);
                    break 'commands;
                }
            }
        }
    }

    // only a power cycle gets out of here
    loop {
        if let Err(err) = stand.force_safe() {
            log::error!("could not hold the throttle at zero: {}", err);
        }
        delay.delay_millis(HALT_REFRESH_MS);
    }
}
