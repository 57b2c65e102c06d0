//! CLI for psuctl — bench power supply control and telemetry logging.

mod commands;

use clap::{Parser, Subcommand};
use log::warn;
use psuctl_core::{Psu, UsbTmcDevice};

#[derive(Parser)]
#[command(name = "psuctl")]
#[command(about = "Control a bench PSU over a usbtmc character device")]
#[command(version = psuctl_core::VERSION)]
struct Cli {
    /// PSU device path
    #[arg(short, long, default_value = "/dev/usbtmc0")]
    device: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Program the voltage setpoint and current limit
    Configure {
        /// Output voltage in volts
        #[arg(short, long)]
        voltage: f64,

        /// Current limit in amps
        #[arg(short = 'i', long)]
        current: f64,
    },

    /// Turn the output on
    #[command(name = "power_on")]
    PowerOn,

    /// Turn the output off
    #[command(name = "power_off")]
    PowerOff,

    /// Report output state, settings, and live measurements
    Status,

    /// Continuously log voltage/current/power to a timestamped CSV file
    Telemetry {
        /// Sampling rate in seconds
        #[arg(short, long, default_value = "1.0")]
        rate: f64,

        /// Directory for telemetry log files
        #[arg(short, long, default_value = "logs")]
        output: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    // Fail fast on a missing device: no protocol traffic is attempted.
    let device = UsbTmcDevice::new(&cli.device);
    if !device.exists() {
        eprintln!("Error: device {} not found", cli.device);
        eprintln!("Check that the PSU is connected and the device is accessible.");
        std::process::exit(1);
    }

    let mut psu = Psu::new(device);
    match psu.bring_up() {
        Ok(identity) => println!("PSU detected: {identity}"),
        Err(e) => {
            eprintln!("Error: PSU communication failed - {e}");
            eprintln!("Check that:");
            eprintln!("  - the PSU is powered on");
            eprintln!("  - you have permission to open the device (root may be required)");
            eprintln!("  - the USB cable is connected properly");
            eprintln!("  - no other software is using the PSU");
            eprintln!("  - {} exists and is accessible", cli.device);
            std::process::exit(1);
        }
    }

    let success = match cli.command {
        // The acquisition loop restores the beeper on its own exit path.
        Commands::Telemetry { rate, output } => commands::telemetry::run(&mut psu, rate, &output),
        other => {
            let ok = match other {
                Commands::Configure { voltage, current } => {
                    commands::configure::run(&mut psu, voltage, current)
                }
                Commands::PowerOn => commands::power::run_on(&mut psu),
                Commands::PowerOff => commands::power::run_off(&mut psu),
                Commands::Status => commands::status::run(&mut psu),
                Commands::Telemetry { .. } => unreachable!(),
            };
            if let Err(e) = psu.enable_beeper() {
                warn!("could not re-enable instrument beeper: {e}");
            }
            ok
        }
    };

    std::process::exit(i32::from(!success));
}
