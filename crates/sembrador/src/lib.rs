pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod registration;
pub mod telemetry;
