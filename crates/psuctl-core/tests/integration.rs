//! Integration tests for psuctl-core.
//!
//! These drive the full acquisition pipeline — bring-up → telemetry loop →
//! log file — against a simulated instrument that answers every query the
//! way a real PSU would.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveTime;

use psuctl_core::{AcquisitionConfig, Psu, PsuError, Result, Transport, acquisition};

/// Simulated instrument: answers by last command received, returns fixed
/// readings, and can flip the run flag or corrupt a reply at a chosen
/// measurement cycle.
struct SimulatedInstrument {
    last_command: String,
    power_queries: usize,
    /// Clear this flag once the given number of power queries has answered.
    stop_after: Option<(usize, Arc<AtomicBool>)>,
    /// Return a non-numeric power reply on this (1-based) cycle.
    corrupt_power_cycle: Option<usize>,
}

impl SimulatedInstrument {
    fn new() -> Self {
        Self {
            last_command: String::new(),
            power_queries: 0,
            stop_after: None,
            corrupt_power_cycle: None,
        }
    }
}

impl Transport for SimulatedInstrument {
    fn send(&mut self, command: &str) -> Result<()> {
        self.last_command = command.to_string();
        Ok(())
    }

    fn receive(&mut self) -> Result<String> {
        let reply = match self.last_command.as_str() {
            "*IDN?" => "ACME,PS-3005,SN998,1.07",
            "VOLT?" => "12.000000",
            "CURR?" => "1.500000",
            "OUTP?" => "1",
            "MEAS:VOLT?" => "12.000000",
            "MEAS:CURR?" => "1.500000",
            "MEAS:POW?" => {
                self.power_queries += 1;
                if self.corrupt_power_cycle == Some(self.power_queries) {
                    return Ok("+OVERLOAD".to_string());
                }
                if let Some((after, running)) = &self.stop_after {
                    if self.power_queries >= *after {
                        running.store(false, Ordering::SeqCst);
                    }
                }
                "18.000000"
            }
            other => {
                return Err(PsuError::Protocol(format!(
                    "simulated instrument got unexpected query after '{other}'"
                )));
            }
        };
        Ok(reply.to_string())
    }
}

fn data_rows(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(6) // header block
        .map(str::to_string)
        .collect()
}

#[test]
fn acquisition_round_trip_three_cycles() {
    let tmp = tempfile::tempdir().unwrap();
    let running = Arc::new(AtomicBool::new(true));

    let mut instrument = SimulatedInstrument::new();
    instrument.stop_after = Some((3, running.clone()));

    let mut psu = Psu::new(instrument);
    psu.bring_up().unwrap();

    let config = AcquisitionConfig {
        rate_secs: 0.5,
        output_dir: tmp.path().to_path_buf(),
    };
    let summary = acquisition::run(&mut psu, &config, &running).unwrap();
    assert_eq!(summary.samples, 3);

    let rows = data_rows(&summary.path);
    assert_eq!(rows.len(), 3);

    let mut previous: Option<NaiveTime> = None;
    for row in &rows {
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[1], "12.000000");
        assert_eq!(fields[2], "1.500000");
        assert_eq!(fields[3], "18.000000");

        let t = NaiveTime::parse_from_str(fields[0], "%H:%M:%S%.3f").unwrap();
        if let Some(prev) = previous {
            let gap = (t - prev).num_milliseconds();
            assert!(gap >= 0, "timestamps went backwards: {prev} -> {t}");
            assert!(
                (350..=750).contains(&gap),
                "expected ~500ms between samples, got {gap}ms"
            );
        }
        previous = Some(t);
    }
}

#[test]
fn acquisition_parse_error_stops_after_written_samples() {
    let tmp = tempfile::tempdir().unwrap();
    let running = Arc::new(AtomicBool::new(true));

    let mut instrument = SimulatedInstrument::new();
    instrument.corrupt_power_cycle = Some(2);

    let mut psu = Psu::new(instrument);
    psu.bring_up().unwrap();

    let config = AcquisitionConfig {
        rate_secs: 0.05,
        output_dir: tmp.path().to_path_buf(),
    };
    let err = acquisition::run(&mut psu, &config, &running).unwrap_err();
    assert!(matches!(err, PsuError::Parse { .. }));

    // Exactly the one good sample made it to disk, and the log is intact
    // (readable, header present) after the abort.
    let logs: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(logs.len(), 1);
    assert_eq!(data_rows(&logs[0]).len(), 1);
}

#[test]
fn acquisition_requires_bring_up() {
    let tmp = tempfile::tempdir().unwrap();
    let running = Arc::new(AtomicBool::new(true));
    let mut psu = Psu::new(SimulatedInstrument::new());

    let config = AcquisitionConfig {
        rate_secs: 1.0,
        output_dir: tmp.path().to_path_buf(),
    };
    let err = acquisition::run(&mut psu, &config, &running).unwrap_err();
    assert!(matches!(err, PsuError::Protocol(_)));
    // No log file is created when initialization fails.
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn acquisition_rejects_unrepresentable_rates_without_side_effects() {
    let tmp = tempfile::tempdir().unwrap();
    let running = Arc::new(AtomicBool::new(true));
    let mut psu = Psu::new(SimulatedInstrument::new());
    psu.bring_up().unwrap();

    // Rates Duration cannot hold must fail as errors, not panics, before
    // any log file exists.
    for rate_secs in [f64::INFINITY, 1e300, f64::NAN, -1.0, 0.0] {
        let config = AcquisitionConfig {
            rate_secs,
            output_dir: tmp.path().join("logs"),
        };
        let err = acquisition::run(&mut psu, &config, &running).unwrap_err();
        assert!(matches!(err, PsuError::Config(_)), "rate {rate_secs}: {err}");
    }
    assert!(!tmp.path().join("logs").exists());
}

#[test]
fn one_shot_flow_against_simulated_instrument() {
    let mut psu = Psu::new(SimulatedInstrument::new());
    let identity = psu.bring_up().unwrap();
    assert_eq!(identity.serial, "SN998");

    let status = psu.status().unwrap();
    assert!(status.output_on);
    assert_eq!(status.set_voltage, 12.0);
    assert_eq!(status.measurement.power, 18.0);
}
