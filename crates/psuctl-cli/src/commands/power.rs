//! `psuctl power-on` / `psuctl power-off` — toggle the output.

use psuctl_core::{Psu, Result, Transport};

/// Run the power-on command. Returns true on success.
pub fn run_on<T: Transport>(psu: &mut Psu<T>) -> bool {
    let result: Result<_> = (|| {
        let (voltage, current) = psu.read_settings()?;
        println!("Powering on PSU: {voltage}V, {current}A limit");
        psu.power_on()
    })();

    match result {
        Ok(m) => {
            println!("PSU powered on successfully");
            println!(
                "Measurements: {:.3}V, {:.3}A, {:.3}W",
                m.voltage, m.current, m.power
            );
            true
        }
        Err(e) => {
            eprintln!("Error during power on: {e}");
            false
        }
    }
}

/// Run the power-off command. Returns true on success.
pub fn run_off<T: Transport>(psu: &mut Psu<T>) -> bool {
    println!("Powering off PSU...");

    match psu.power_off() {
        Ok(()) => {
            println!("PSU powered off successfully");
            true
        }
        Err(e) => {
            eprintln!("Error during power off: {e}");
            false
        }
    }
}
