pub mod configure;
pub mod power;
pub mod status;
pub mod telemetry;
