//! Protocol session with the power supply.
//!
//! [`Psu`] layers the SCPI command set over any [`Transport`]: the one-time
//! bring-up sequence, float reply parsing, remote/local control bracketing,
//! and the four one-shot operations (configure, power on/off, status). Each
//! operation is a fixed sequence of command/reply exchanges — no loops, no
//! retries, no state beyond the identity captured at bring-up.

use std::time::Duration;

use crate::error::{PsuError, Result};
use crate::scpi;
use crate::transport::Transport;

/// Pause after `OUTP ON` so the output stage can come up before the
/// status readback.
pub const ON_DELAY: Duration = Duration::from_millis(500);

/// Placeholder for identity fields the instrument did not report.
const UNKNOWN: &str = "Unknown";

/// Instrument identity parsed from the `*IDN?` reply.
///
/// Captured once at bring-up and used to name the telemetry log file and
/// fill its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub firmware: String,
}

impl Identity {
    /// Verify and parse an `*IDN?` reply.
    ///
    /// A reply that is empty, echoes the query, or has fewer than two
    /// comma-separated fields means the instrument did not understand the
    /// command — a protocol error, not an I/O failure. Fields beyond the
    /// second may be absent and default to "Unknown".
    pub fn verify(reply: &str) -> Result<Self> {
        if reply.is_empty() || reply.starts_with(scpi::IDENTIFY) {
            return Err(PsuError::Protocol(format!(
                "invalid identification reply: '{reply}'"
            )));
        }
        let fields: Vec<&str> = reply.split(',').collect();
        if fields.len() < 2 {
            return Err(PsuError::Protocol(format!(
                "invalid identification reply: '{reply}'"
            )));
        }
        let field = |i: usize| fields.get(i).copied().unwrap_or(UNKNOWN).to_string();
        Ok(Self {
            manufacturer: field(0),
            model: field(1),
            serial: field(2),
            firmware: field(3),
        })
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.manufacturer, self.model, self.serial, self.firmware
        )
    }
}

/// One live reading of the output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
}

/// Everything the `status` operation reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub output_on: bool,
    pub set_voltage: f64,
    pub set_current: f64,
    pub measurement: Measurement,
}

/// Parse a reply as a 64-bit float, keeping the offending text on failure.
fn parse_reply(reply: String) -> Result<f64> {
    reply
        .trim()
        .parse::<f64>()
        .map_err(|source| PsuError::Parse { reply, source })
}

/// A protocol session over some transport.
pub struct Psu<T: Transport> {
    transport: T,
    identity: Option<Identity>,
    on_delay: Duration,
}

impl<T: Transport> Psu<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            identity: None,
            on_delay: ON_DELAY,
        }
    }

    /// Override the post-enable delay. Tests use this to avoid real pauses.
    pub fn with_on_delay(transport: T, on_delay: Duration) -> Self {
        Self {
            transport,
            identity: None,
            on_delay,
        }
    }

    /// Identity captured at bring-up, if bring-up has run.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// One-time bring-up: silence the beeper, select the USB interconnect,
    /// then identify the instrument. Must run before any other operation.
    pub fn bring_up(&mut self) -> Result<Identity> {
        self.transport.send(scpi::BEEP_OFF)?;
        self.transport.send(scpi::INTERFACE_USB)?;
        let reply = self.transport.query(scpi::IDENTIFY)?;
        let identity = Identity::verify(&reply)?;
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Courtesy command restoring the audible beep on exit paths.
    pub fn enable_beeper(&mut self) -> Result<()> {
        self.transport.send(scpi::BEEP_ON)
    }

    /// Programmed voltage setpoint and current limit.
    pub fn read_settings(&mut self) -> Result<(f64, f64)> {
        let voltage = parse_reply(self.transport.query(scpi::VOLTAGE_SET_QUERY)?)?;
        let current = parse_reply(self.transport.query(scpi::CURRENT_SET_QUERY)?)?;
        Ok((voltage, current))
    }

    /// Live output measurements, queried in the fixed order
    /// voltage → current → power.
    pub fn read_measurements(&mut self) -> Result<Measurement> {
        let voltage = parse_reply(self.transport.query(scpi::MEASURE_VOLTAGE)?)?;
        let current = parse_reply(self.transport.query(scpi::MEASURE_CURRENT)?)?;
        let power = parse_reply(self.transport.query(scpi::MEASURE_POWER)?)?;
        Ok(Measurement {
            voltage,
            current,
            power,
        })
    }

    /// Run `f` bracketed between remote and local control.
    ///
    /// If `f` fails, local control is still attempted, but its own failure
    /// must not mask the original error. If entering remote control fails,
    /// local mode is never restored and that error surfaces directly.
    fn with_remote<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.transport.send(scpi::REMOTE)?;
        match f(self) {
            Ok(value) => {
                self.transport.send(scpi::LOCAL)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(local_err) = self.transport.send(scpi::LOCAL) {
                    log::warn!("could not return instrument to local control: {local_err}");
                }
                Err(err)
            }
        }
    }

    /// Program a voltage setpoint and current limit, returning the values
    /// the instrument reads back. The readbacks are reported as-is and
    /// never compared against the requested values.
    pub fn configure(&mut self, voltage: f64, current: f64) -> Result<(f64, f64)> {
        self.with_remote(|psu| {
            psu.transport.send(&scpi::set_voltage(voltage))?;
            psu.transport.send(&scpi::set_current(current))?;
            let voltage_set = parse_reply(psu.transport.query(scpi::VOLTAGE_SET_QUERY)?)?;
            let current_set = parse_reply(psu.transport.query(scpi::CURRENT_SET_QUERY)?)?;
            Ok((voltage_set, current_set))
        })
    }

    /// Enable the output and return live measurements once it is up.
    pub fn power_on(&mut self) -> Result<Measurement> {
        let on_delay = self.on_delay;
        self.with_remote(|psu| {
            psu.transport.send(scpi::OUTPUT_ON)?;
            std::thread::sleep(on_delay);
            let status = psu.transport.query(scpi::OUTPUT_QUERY)?;
            if status == "0" {
                return Err(PsuError::Protocol(
                    "instrument did not accept output enable".to_string(),
                ));
            }
            psu.read_measurements()
        })
    }

    /// Disable the output.
    pub fn power_off(&mut self) -> Result<()> {
        self.with_remote(|psu| {
            psu.transport.send(scpi::OUTPUT_OFF)?;
            let status = psu.transport.query(scpi::OUTPUT_QUERY)?;
            if status == "1" {
                return Err(PsuError::Protocol(
                    "instrument did not accept output disable".to_string(),
                ));
            }
            Ok(())
        })
    }

    /// Read output state, settings, and live measurements. Pure read-only,
    /// so no remote/local bracketing.
    pub fn status(&mut self) -> Result<StatusReport> {
        let output_on = self.transport.query(scpi::OUTPUT_QUERY)? == "1";
        let (set_voltage, set_current) = self.read_settings()?;
        let measurement = self.read_measurements()?;
        Ok(StatusReport {
            output_on,
            set_voltage,
            set_current,
            measurement,
        })
    }
}
