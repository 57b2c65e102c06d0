//! `psuctl status` — read-only report of output state and measurements.

use psuctl_core::{Psu, Transport};

/// Run the status command. Returns true on success.
pub fn run<T: Transport>(psu: &mut Psu<T>) -> bool {
    println!("Checking PSU status...");

    match psu.status() {
        Ok(report) => {
            println!("Output: {}", if report.output_on { "ON" } else { "OFF" });
            println!(
                "Settings: {:.2}V, {:.2}A",
                report.set_voltage, report.set_current
            );
            let m = report.measurement;
            println!(
                "Measurements: {:.3}V, {:.3}A, {:.3}W",
                m.voltage, m.current, m.power
            );
            true
        }
        Err(e) => {
            eprintln!("Error getting status: {e}");
            false
        }
    }
}
