//! Telemetry acquisition loop.
//!
//! The only long-running, stateful part of the tool. Sampling is anchored to
//! wall-clock second boundaries: the first deadline is the next whole second
//! plus one period, and every later deadline is exactly one period after the
//! previous one — never recomputed from "now", so a slow cycle cannot shift
//! the rest of the schedule. A cycle that misses its deadline only earns a
//! warning; a cycle that fails to query, parse, or persist ends the run.
//!
//! Shutdown is cooperative: a one-way run flag, flipped by the Ctrl+C
//! handler, is observed at the top of each cycle. Whatever ends the run —
//! signal, data error, sink error — the log file is closed exactly once and
//! a summary is reported.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::Local;
use log::warn;

use crate::error::{PsuError, Result};
use crate::logfile::{Sample, TelemetryLog};
use crate::psu::Psu;
use crate::transport::Transport;

/// Parameters for one telemetry run.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Sampling period in seconds (> 0).
    pub rate_secs: f64,
    /// Directory the log file is created in (created if missing).
    pub output_dir: PathBuf,
}

/// What a finished (or aborted) run collected.
#[derive(Debug, Clone)]
pub struct AcquisitionSummary {
    pub samples: u64,
    pub path: PathBuf,
}

/// Absolute-deadline sampling schedule.
///
/// The deadline accumulator advances by exactly one period per cycle, so
/// deadline k is always `origin + k * period` regardless of how long any
/// individual cycle took.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    period: Duration,
    next_deadline: Instant,
}

impl Schedule {
    /// Schedule anchored at `origin`; the first deadline is one period in.
    pub fn starting_at(origin: Instant, period: Duration) -> Self {
        Self {
            period,
            next_deadline: origin + period,
        }
    }

    pub fn next_deadline(&self) -> Instant {
        self.next_deadline
    }

    /// Advance to the next deadline. Unconditional — overrunning a cycle
    /// must not stretch the schedule.
    pub fn advance(&mut self) {
        self.next_deadline += self.period;
    }
}

/// Time left until the next whole wall-clock second.
///
/// An exact second boundary waits a full second, matching "the next integer
/// second after now".
fn until_next_second(now: SystemTime) -> Duration {
    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    Duration::from_secs(1) - Duration::from_nanos(u64::from(since_epoch.subsec_nanos()))
}

/// Run telemetry acquisition until the run flag clears or a cycle fails.
///
/// `running` starts true and is flipped to false by the stop signal; it is
/// only observed at the top of each cycle, so an in-flight query always
/// completes. Requires bring-up to have run (the identity names the log
/// file).
pub fn run<T: Transport>(
    psu: &mut Psu<T>,
    config: &AcquisitionConfig,
    running: &AtomicBool,
) -> Result<AcquisitionSummary> {
    // Reject rates the clock cannot represent before touching the
    // instrument or the filesystem.
    let period = match Duration::try_from_secs_f64(config.rate_secs) {
        Ok(p) if !p.is_zero() => p,
        _ => {
            return Err(PsuError::Config(format!(
                "sampling rate must be a positive number of seconds (got {})",
                config.rate_secs
            )));
        }
    };

    // Initializing: settings are read purely for the operator's benefit.
    let (set_voltage, set_current) = psu.read_settings()?;
    let identity = psu
        .identity()
        .cloned()
        .ok_or_else(|| PsuError::Protocol("bring-up has not run".to_string()))?;

    let mut log = TelemetryLog::create(&config.output_dir, &identity, config.rate_secs)?;
    println!("Saving data to: {}", log.path().display());
    println!(
        "Starting telemetry monitoring at {set_voltage}V, {set_current}A. Press Ctrl+C to stop."
    );
    println!();
    println!("VOUT (V)  | IOUT (A)  | POUT (W)");
    println!("{}", "-".repeat(30));

    // Align the first sample to the next whole second.
    std::thread::sleep(until_next_second(SystemTime::now()));
    let mut schedule = Schedule::starting_at(Instant::now(), period);

    // Sampling. Any per-cycle error lands here and still flows through the
    // cleanup below.
    let mut outcome = sample_loop(psu, &mut log, running, &mut schedule);
    println!();

    // Stopping: courtesy beep restore. Its failure must not replace
    // whatever ended the run.
    if let Err(e) = psu.enable_beeper() {
        warn!("could not re-enable instrument beeper: {e}");
    }

    // Closed: the log is consumed here and nowhere else.
    let samples = log.samples_written();
    let path = log.path().to_path_buf();
    if let Err(close_err) = log.finish() {
        if outcome.is_ok() {
            outcome = Err(close_err);
        } else {
            warn!("telemetry log close failed: {close_err}");
        }
    }
    println!("Telemetry monitoring stopped. {samples} measurements collected.");
    println!("Data saved to {}", path.display());

    outcome.map(|()| AcquisitionSummary { samples, path })
}

fn sample_loop<T: Transport>(
    psu: &mut Psu<T>,
    log: &mut TelemetryLog,
    running: &AtomicBool,
    schedule: &mut Schedule,
) -> Result<()> {
    while running.load(Ordering::SeqCst) {
        let timestamp = Local::now();
        let measurement = psu.read_measurements()?;
        log.append(&Sample {
            timestamp,
            measurement,
        })?;

        print!(
            "\r{:8.3}  | {:8.3}  | {:8.3}",
            measurement.voltage, measurement.current, measurement.power
        );
        let _ = std::io::stdout().flush();

        let now = Instant::now();
        match schedule.next_deadline().checked_duration_since(now) {
            Some(left) => std::thread::sleep(left),
            None => {
                let behind = now.duration_since(schedule.next_deadline());
                eprintln!(
                    "\nWarning: running {:.3}s behind schedule",
                    behind.as_secs_f64()
                );
            }
        }
        schedule.advance();
    }
    Ok(())
}
