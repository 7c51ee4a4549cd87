//! # Tenancy Shared
//!
//! Configuration and telemetry shared across the tenancy crates.

pub mod config;
pub mod telemetry;

pub use config::AppConfig;
pub use telemetry::init_telemetry;
