use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ConfigValidationError;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {origin}: {reason}")]
    Parse { origin: String, reason: String },
    #[error("invalid value for {key}: {reason}")]
    InvalidEnv { key: &'static str, reason: String },
    #[error(transparent)]
    Validation(#[from] ConfigValidationError),
}
