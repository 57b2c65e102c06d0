//! # psuctl-core
//!
//! Control library for a bench power supply reachable through a usbtmc
//! character device, speaking a line-oriented SCPI-style protocol.
//!
//! ## Architecture
//!
//! Transport (per-call open/close on the device) → Psu session (bring-up,
//! float parsing, remote/local bracketing, one-shot operations) →
//! acquisition loop (wall-clock-anchored sampling into a CSV telemetry log).
//!
//! ## Quick start
//!
//! ```no_run
//! use psuctl_core::{Psu, UsbTmcDevice};
//!
//! let mut psu = Psu::new(UsbTmcDevice::new("/dev/usbtmc0"));
//! let identity = psu.bring_up()?;
//! println!("PSU detected: {identity}");
//!
//! let status = psu.status()?;
//! println!("Output: {}", if status.output_on { "ON" } else { "OFF" });
//! # Ok::<(), psuctl_core::PsuError>(())
//! ```

pub mod acquisition;
pub mod error;
pub mod logfile;
pub mod psu;
pub mod scpi;
pub mod transport;

pub use acquisition::{AcquisitionConfig, AcquisitionSummary, Schedule};
pub use error::{PsuError, Result};
pub use logfile::{Sample, TelemetryLog};
pub use psu::{Identity, Measurement, Psu, StatusReport};
pub use transport::{Transport, UsbTmcDevice};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
