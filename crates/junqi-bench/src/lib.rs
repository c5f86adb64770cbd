pub mod analytics;
pub mod config;
pub mod harness;
pub mod logging;
pub mod telemetry;
