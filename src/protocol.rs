//! Host wire protocol: one JSON object per command, one JSON object plus `\n` per response.
//!
//! The host writes commands without any terminator, so inbound framing is done by balancing
//! braces; responses are newline terminated so the host can read them line by line.
//!
//! ```text
//! -> {"command_type": "sys_init"}
//! <- {"response_type":"sys_init","ok":true}
//! -> {"command_type": "measure", "steps": 4, "throttle_scale": 1.0}
//! <- {"response_type":"measure","ok":true,"data":[{"throttle":0.0,"rpm":0,...},...]}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::sweep::{MeasurementRecord, SweepRequest};

/// Largest inbound command the framer keeps.
pub const RX_BUFFER_LEN: usize = 512;

/// Transmit buffer size; fits a full 21-record `measure` response.
pub const TX_BUFFER_LEN: usize = 3072;

/// Line silence after which a partial command is given up.
pub const FRAME_TIMEOUT_MS: u64 = 1000;

/// Splits a byte stream into complete top-level JSON objects.
///
/// Bytes outside an object (whitespace, line endings, noise) are dropped. Braces inside string
/// literals are not counted. An object longer than `N` bytes is dropped as soon as it
/// overflows, and framing restarts at the next `{`. A partial object left behind by a stray
/// brace or a dropped connection is cleared with [`Framer::reset`].
pub struct Framer<const N: usize> {
    buffer: heapless::Vec<u8, N>,
    depth: u32,
    in_string: bool,
    escaped: bool,
}

impl<const N: usize> Framer<N> {
    pub const fn new() -> Self {
        Self {
            buffer: heapless::Vec::new(),
            depth: 0,
            in_string: false,
            escaped: false,
        }
    }

    /// Feed one byte; returns the complete frame once its closing brace arrives.
    ///
    /// The returned frame stays valid until the next call.
    pub fn push(&mut self, byte: u8) -> Option<&[u8]> {
        if self.depth == 0 {
            if byte != b'{' {
                return None;
            }
            self.reset();
        }

        if self.buffer.push(byte).is_err() {
            log::warn!("dropped a command longer than {} bytes", N);
            self.reset();
            return None;
        }

        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
            }
            return None;
        }

        match byte {
            b'"' => self.in_string = true,
            b'{' => self.depth += 1,
            b'}' => {
                self.depth -= 1;
                if self.depth == 0 {
                    return Some(self.buffer.as_slice());
                }
            }
            _ => {}
        }
        None
    }

    /// Is an object partially received?
    pub fn is_receiving(&self) -> bool {
        self.depth > 0
    }

    /// Drop any partial object.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
    }
}

impl<const N: usize> Default for Framer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A recognized host command.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    SysInit,
    Measure(SweepRequest),
}

#[derive(Deserialize)]
struct RawCommand<'a> {
    #[serde(borrow)]
    command_type: Option<&'a str>,
    /// Any JSON number; a fractional count is truncated.
    steps: Option<f64>,
    throttle_scale: Option<f32>,
}

/// Decode one framed command.
///
/// Anything that is not valid JSON, lacks `command_type`, names an unknown command, or omits
/// the `measure` parameters yields `None` and must be ignored without a reply.
pub fn decode_command(frame: &[u8]) -> Option<Command> {
    let (raw, _) = serde_json_core::from_slice::<RawCommand<'_>>(frame).ok()?;
    match raw.command_type? {
        "sys_init" => Some(Command::SysInit),
        "measure" => Some(Command::Measure(SweepRequest {
            // saturating cast; out-of-range counts are rejected by validation, not dropped here
            steps: raw.steps? as u32,
            throttle_scale: raw.throttle_scale?,
        })),
        _ => None,
    }
}

/// A reply to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Response<'a> {
    SysInit { ok: bool },
    Measure {
        ok: bool,
        data: &'a [MeasurementRecord],
    },
}

#[derive(Serialize)]
struct SysInitBody {
    response_type: &'static str,
    ok: bool,
}

#[derive(Serialize)]
struct MeasureBody<'a> {
    response_type: &'static str,
    ok: bool,
    data: &'a [MeasurementRecord],
}

impl Response<'_> {
    /// Serialize into `buffer` without the line terminator, returning the length used.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, Error> {
        let written = match *self {
            Response::SysInit { ok } => serde_json_core::to_slice(
                &SysInitBody {
                    response_type: "sys_init",
                    ok,
                },
                buffer,
            ),
            Response::Measure { ok, data } => serde_json_core::to_slice(
                &MeasureBody {
                    response_type: "measure",
                    ok,
                    data,
                },
                buffer,
            ),
        };
        written.map_err(|_| Error::ResponseTooLarge)
    }

    /// Encode, write and flush the response followed by `\n`.
    pub fn send<W>(&self, link: &mut W, buffer: &mut [u8]) -> Result<(), Error>
    where
        W: embedded_io::Write,
    {
        let len = self.encode(buffer)?;
        link.write_all(&buffer[..len])
            .and_then(|()| link.write_all(b"\n"))
            .and_then(|()| link.flush())
            .map_err(|e| {
                log::error!("host link: {:?}", e);
                Error::Link
            })
    }
}
