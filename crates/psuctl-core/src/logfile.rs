//! Telemetry log file.
//!
//! One CSV file per telemetry run, named from the instrument serial number
//! and the start timestamp. A fixed six-row header block (identity, sampling
//! rate, start time, column names) is written once at creation; after that
//! the file only ever grows by one sample row at a time, flushed per sample
//! so an interrupted run keeps everything collected up to that point.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{PsuError, Result};
use crate::psu::{Identity, Measurement};

/// One telemetry sample: wall-clock timestamp plus the three live readings.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub measurement: Measurement,
}

/// Append-only sink for one telemetry run.
///
/// Exclusively owned by the acquisition loop for its lifetime; `finish`
/// consumes the log so it is closed exactly once.
pub struct TelemetryLog {
    path: PathBuf,
    writer: BufWriter<File>,
    samples_written: u64,
}

impl TelemetryLog {
    /// Create the log file and write its header block.
    ///
    /// The output directory is created if missing. Any filesystem failure
    /// here is fatal to the telemetry run.
    pub fn create(dir: &Path, identity: &Identity, rate_secs: f64) -> Result<Self> {
        fs::create_dir_all(dir).map_err(PsuError::Sink)?;

        let started = Local::now();
        let name = format!(
            "telem_psu_sn{}_{}.csv",
            identity.serial,
            started.format("%Y_%m_%d_%H%M%S")
        );
        let path = dir.join(name);

        let file = File::create(&path).map_err(PsuError::Sink)?;
        let mut writer = BufWriter::new(file);

        // {:?} keeps the decimal point on whole-second rates ("1.0s", not "1s").
        let header = format!(
            "Instrument ID:,{},{},{},{},\n\
             ,,,,,\n\
             ,,,,Sampling Rate:,{:?}s\n\
             ,,,,Start Time:,{}\n\
             ,,,,,\n\
             Time,Voltage,Current,Power,,",
            identity.manufacturer,
            identity.model,
            identity.serial,
            identity.firmware,
            rate_secs,
            started.format("%m/%d/%Y %I:%M:%S %p"),
        );
        writeln!(writer, "{header}").map_err(PsuError::Sink)?;
        writer.flush().map_err(PsuError::Sink)?;

        Ok(Self {
            path,
            writer,
            samples_written: 0,
        })
    }

    /// Append one sample row and flush it to disk.
    pub fn append(&mut self, sample: &Sample) -> Result<()> {
        let m = sample.measurement;
        writeln!(
            self.writer,
            "{},{:.6},{:.6},{:.6}",
            sample.timestamp.format("%H:%M:%S%.3f"),
            m.voltage,
            m.current,
            m.power
        )
        .map_err(PsuError::Sink)?;
        self.writer.flush().map_err(PsuError::Sink)?;
        self.samples_written += 1;
        Ok(())
    }

    /// Final flush. Consumes the log so the file is closed exactly once.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush().map_err(PsuError::Sink)
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of sample rows written so far.
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }
}
