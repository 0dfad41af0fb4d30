//! ESP32 DevKitC board support for the thrust test stand.
//!
//! Pin map (teststand2 board):
//!
//! | signal          | pin    | peripheral          |
//! |-----------------|--------|---------------------|
//! | safety switch   | GPIO15 | input, falling edge |
//! | rpm sensor      | GPIO33 | input, rising edge  |
//! | current sense   | GPIO25 | ADC2                |
//! | battery divider | GPIO32 | ADC1                |
//! | HX711 DT        | GPIO27 | input               |
//! | HX711 SCK       | GPIO26 | output              |
//! | ESC signal      | GPIO13 | LEDC, 50 Hz         |
//! | green light     | GPIO12 | output              |
//! | yellow light    | GPIO14 | output              |
//! | host link       | UART0  | 115200 baud         |
#![no_std]

pub mod analog;
pub mod clock;
pub mod interrupts;
