//! Configuration library for the EcoScan client.
//!
//! Centralizes config defaults, file/env loading, and validation so the CLI
//! and any embedding front end agree on how the backend is reached and how
//! scans are polled.

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigSource, error::ConfigLoadError};
pub use models::{ClientConfig, ScanConfig, ServerConfig};
pub use validation::{ConfigValidationError, ConfigWarning, ConfigWarnings};
