//! The fixed SCPI command set the instrument understands.
//!
//! Spelling and casing are exactly what the firmware expects; nothing here
//! is negotiated at runtime.

/// Identification query. Reply: `manufacturer,model,serial,firmware`.
pub const IDENTIFY: &str = "*IDN?";

/// Disable the audible keypress/command beep.
pub const BEEP_OFF: &str = "SYST:BEEP OFF";
/// Re-enable the audible beep (courtesy command on exit).
pub const BEEP_ON: &str = "SYST:BEEP ON";

/// Select the USB interconnect for remote commands.
pub const INTERFACE_USB: &str = "SYST:INT USB";

/// Enter remote control (front panel locked out).
pub const REMOTE: &str = "SYST:REM";
/// Return to local (front panel) control.
pub const LOCAL: &str = "SYST:LOC";

/// Query the programmed voltage setpoint.
pub const VOLTAGE_SET_QUERY: &str = "VOLT?";
/// Query the programmed current limit.
pub const CURRENT_SET_QUERY: &str = "CURR?";

/// Output enable/disable and status query.
pub const OUTPUT_ON: &str = "OUTP ON";
pub const OUTPUT_OFF: &str = "OUTP OFF";
pub const OUTPUT_QUERY: &str = "OUTP?";

/// Live measurement queries, issued in this order each telemetry cycle.
pub const MEASURE_VOLTAGE: &str = "MEAS:VOLT?";
pub const MEASURE_CURRENT: &str = "MEAS:CURR?";
pub const MEASURE_POWER: &str = "MEAS:POW?";

/// Format a voltage setpoint command.
pub fn set_voltage(volts: f64) -> String {
    format!("VOLT {volts}")
}

/// Format a current limit command.
pub fn set_current(amps: f64) -> String {
    format!("CURR {amps}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setter_formatting() {
        assert_eq!(set_voltage(12.5), "VOLT 12.5");
        assert_eq!(set_current(2.0), "CURR 2");
    }
}
