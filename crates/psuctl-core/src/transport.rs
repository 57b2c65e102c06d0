//! Byte transport to the instrument.
//!
//! The PSU is reachable through a usbtmc character device. Each open/close
//! cycle on that device is one protocol transaction, so the transport never
//! holds the file open between calls: `send` opens for writing, writes one
//! CRLF-terminated command, and closes; `receive` opens for reading, reads
//! one bounded chunk, and closes. The instrument firmware has no flow
//! control, so every send is followed by a fixed settle delay before the
//! next transaction.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use crate::error::Result;

/// Line terminator the instrument expects on every command.
pub const TERMINATOR: &[u8] = b"\r\n";

/// Pause after each command so the firmware can process it.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Largest reply the instrument produces.
const REPLY_CHUNK: usize = 1024;

/// One command/reply channel to the instrument.
///
/// `send` and `receive` are the only primitives; `query` is always
/// send-then-receive. Implementations propagate any I/O failure as a fatal
/// transport error — there is no retry at this layer.
pub trait Transport {
    /// Write one command line to the instrument.
    fn send(&mut self, command: &str) -> Result<()>;

    /// Read one reply line from the instrument.
    fn receive(&mut self) -> Result<String>;

    /// Send a query command and return its reply.
    fn query(&mut self, command: &str) -> Result<String> {
        self.send(command)?;
        self.receive()
    }
}

/// Transport over a usbtmc character device file.
pub struct UsbTmcDevice {
    path: PathBuf,
    settle: Duration,
}

impl UsbTmcDevice {
    /// Create a transport for the given device path with the default
    /// settle delay.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settle: SETTLE_DELAY,
        }
    }

    /// Override the settle delay. Tests use this to avoid real pauses.
    pub fn with_settle(path: impl Into<PathBuf>, settle: Duration) -> Self {
        Self {
            path: path.into(),
            settle,
        }
    }

    /// The device path this transport talks to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the device node is present. Checked before any traffic so a
    /// disconnected PSU is reported without protocol noise.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl Transport for UsbTmcDevice {
    fn send(&mut self, command: &str) -> Result<()> {
        debug!("[{}] send: {}", self.path.display(), command);
        {
            // Scoped so the handle is closed before the settle delay,
            // whatever happens during the write.
            let mut device = OpenOptions::new().write(true).open(&self.path)?;
            device.write_all(command.as_bytes())?;
            device.write_all(TERMINATOR)?;
        }
        std::thread::sleep(self.settle);
        Ok(())
    }

    fn receive(&mut self) -> Result<String> {
        let mut device = File::open(&self.path)?;
        let mut buf = [0u8; REPLY_CHUNK];
        let n = device.read(&mut buf)?;
        let reply = String::from_utf8_lossy(&buf[..n]).trim().to_string();
        debug!("[{}] recv: {}", self.path.display(), reply);
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_settle(path: &Path) -> UsbTmcDevice {
        UsbTmcDevice::with_settle(path, Duration::ZERO)
    }

    #[test]
    fn test_send_appends_crlf() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut transport = zero_settle(file.path());

        transport.send("*IDN?").unwrap();

        let written = std::fs::read(file.path()).unwrap();
        assert_eq!(written, b"*IDN?\r\n");
    }

    #[test]
    fn test_receive_trims_whitespace() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "  12.000000\r\n").unwrap();

        let mut transport = zero_settle(file.path());
        assert_eq!(transport.receive().unwrap(), "12.000000");
    }

    #[test]
    fn test_receive_replaces_undecodable_bytes() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), [0xff, 0xfe, b'1', b'.', b'5']).unwrap();

        let mut transport = zero_settle(file.path());
        let reply = transport.receive().unwrap();
        assert!(reply.ends_with("1.5"));
    }

    #[test]
    fn test_exists_reflects_device_node_presence() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(UsbTmcDevice::new(file.path()).exists());
        assert!(!UsbTmcDevice::new("/nonexistent/usbtmc9").exists());
    }

    #[test]
    fn test_missing_device_is_transport_error() {
        let mut transport = zero_settle(Path::new("/nonexistent/usbtmc9"));
        assert!(matches!(
            transport.send("OUTP ON"),
            Err(crate::error::PsuError::Transport(_))
        ));
        assert!(matches!(
            transport.receive(),
            Err(crate::error::PsuError::Transport(_))
        ));
    }
}
