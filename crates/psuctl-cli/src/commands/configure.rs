//! `psuctl configure` — program the voltage setpoint and current limit.

use psuctl_core::{Psu, Transport};

/// Run the configure command. Returns true on success.
pub fn run<T: Transport>(psu: &mut Psu<T>, voltage: f64, current: f64) -> bool {
    println!("Configuring PSU: {voltage}V, {current}A limit");

    match psu.configure(voltage, current) {
        Ok((voltage_set, current_set)) => {
            println!("PSU configured successfully");
            // Readbacks are reported as the instrument returned them, not
            // checked against the requested values.
            println!("Verified settings: {voltage_set:.2}V, {current_set:.2}A");
            true
        }
        Err(e) => {
            eprintln!("Error during configuration: {e}");
            false
        }
    }
}
