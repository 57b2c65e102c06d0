//! `psuctl telemetry` — continuously log measurements to a CSV file.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use psuctl_core::{AcquisitionConfig, Psu, Transport, acquisition};

/// Run the telemetry command. Returns true on success.
pub fn run<T: Transport>(psu: &mut Psu<T>, rate: f64, output: &str) -> bool {
    if !rate.is_finite() || rate <= 0.0 {
        eprintln!("Error: sampling rate must be a positive number (got {rate})");
        return false;
    }

    // Ctrl+C only clears the run flag; the loop notices at the next cycle
    // boundary and runs its own cleanup.
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Error installing Ctrl+C handler: {e}");
        return false;
    }

    let config = AcquisitionConfig {
        rate_secs: rate,
        output_dir: PathBuf::from(output),
    };

    match acquisition::run(psu, &config, &running) {
        Ok(_) => true,
        Err(e) => {
            eprintln!("Error during measurement: {e}");
            false
        }
    }
}
