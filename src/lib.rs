pub mod api;
pub mod cli;
pub mod config;
pub mod emv;
pub mod harness;
pub mod scenario;
pub mod telemetry;
