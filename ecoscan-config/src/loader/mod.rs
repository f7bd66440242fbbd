pub mod error;

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
    models::ClientConfig,
    util::{normalize_base_url, parse_bool},
    validation::{ConfigWarnings, validate},
};
use error::ConfigLoadError;

pub const CONFIG_PATH_VAR: &str = "ECOSCAN_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "ECOSCAN_CONFIG_JSON";
pub const BASE_URL_VAR: &str = "ECOSCAN_BASE_URL";
pub const POLL_INTERVAL_VAR: &str = "ECOSCAN_POLL_INTERVAL";
pub const POLL_TIMEOUT_VAR: &str = "ECOSCAN_POLL_TIMEOUT";
pub const ACCEPT_INVALID_CERTS_VAR: &str = "ECOSCAN_ACCEPT_INVALID_CERTS";

const CANDIDATES: &[&str] =
    &["ecoscan.toml", "ecoscan.json", "config/ecoscan.toml"];

/// Source that produced the base configuration before env overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// A validated configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: ClientConfig,
    pub source: ConfigSource,
    pub warnings: ConfigWarnings,
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// Evaluation order:
    /// 1) `$ECOSCAN_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$ECOSCAN_CONFIG_JSON` (inline JSON),
    /// 3) the first existing candidate file in the working directory,
    /// 4) defaults.
    ///
    /// Individual env overrides are applied on top, then the result is
    /// validated.
    pub fn load_from_env() -> Result<ConfigLoad, ConfigLoadError> {
        Self::load_with(|key| std::env::var(key).ok(), Path::new("."))
    }

    /// Same as [`ClientConfig::load_from_env`] with an injectable variable
    /// lookup and search root.
    pub fn load_with<F>(
        lookup: F,
        search_root: &Path,
    ) -> Result<ConfigLoad, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let (mut config, source) = if let Some(path) = var(CONFIG_PATH_VAR) {
            let path = PathBuf::from(path);
            (Self::load_from_file(&path)?, ConfigSource::EnvPath(path))
        } else if let Some(raw) = var(CONFIG_JSON_VAR) {
            (Self::parse_json(&raw, CONFIG_JSON_VAR)?, ConfigSource::EnvInline)
        } else if let Some(path) = find_default_file(search_root) {
            (Self::load_from_file(&path)?, ConfigSource::File(path))
        } else {
            (Self::default(), ConfigSource::Default)
        };
        debug!(?source, "loaded base client configuration");

        if let Some(url) = var(BASE_URL_VAR) {
            config.server.base_url = url;
        }
        if let Some(raw) = var(POLL_INTERVAL_VAR) {
            config.scan.poll_interval_ms =
                parse_duration_ms(POLL_INTERVAL_VAR, &raw)?;
        }
        if let Some(raw) = var(POLL_TIMEOUT_VAR) {
            config.scan.poll_timeout_ms =
                Some(parse_duration_ms(POLL_TIMEOUT_VAR, &raw)?);
        }
        if let Some(raw) = var(ACCEPT_INVALID_CERTS_VAR) {
            config.server.accept_invalid_certs =
                parse_bool(&raw).ok_or_else(|| ConfigLoadError::InvalidEnv {
                    key: ACCEPT_INVALID_CERTS_VAR,
                    reason: format!("expected a boolean, got '{raw}'"),
                })?;
        }

        let normalized = normalize_base_url(&config.server.base_url);
        if normalized != config.server.base_url {
            warn!(
                "Normalized base URL from '{}' to '{}'",
                config.server.base_url, normalized
            );
            config.server.base_url = normalized;
        }

        let warnings = validate(&config)?;
        for warning in &warnings.items {
            warn!(hint = ?warning.hint, "{}", warning.message);
        }

        Ok(ConfigLoad {
            config,
            source,
            warnings,
        })
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents = fs::read_to_string(path).map_err(|source| {
            ConfigLoadError::FileIo {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let origin = path.display().to_string();

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents, &origin),
            Some("toml") | Some("tml") => {
                toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                    origin,
                    reason: err.to_string(),
                })
            }
            _ => Self::parse_from_str(&contents, &origin),
        }
    }

    pub fn parse_from_str(
        contents: &str,
        origin: &str,
    ) -> Result<Self, ConfigLoadError> {
        // Try TOML first, then JSON for convenience.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                ConfigLoadError::Parse {
                    origin: origin.to_string(),
                    reason: format!(
                        "toml error: {toml_err}; json error: {json_err}"
                    ),
                }
            })
        })
    }

    pub fn parse_json(raw: &str, origin: &str) -> Result<Self, ConfigLoadError> {
        serde_json::from_str(raw).map_err(|err| ConfigLoadError::Parse {
            origin: origin.to_string(),
            reason: err.to_string(),
        })
    }
}

fn find_default_file(root: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|path| path.exists())
}

/// Accepts humantime strings (`1500ms`, `2s`) or a bare millisecond count.
fn parse_duration_ms(key: &'static str, raw: &str) -> Result<u64, ConfigLoadError> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<u64>() {
        return Ok(ms);
    }
    let duration = humantime::parse_duration(raw).map_err(|err| {
        ConfigLoadError::InvalidEnv {
            key,
            reason: err.to_string(),
        }
    })?;
    u64::try_from(duration.as_millis()).map_err(|_| ConfigLoadError::InvalidEnv {
        key,
        reason: format!("{raw} does not fit in milliseconds"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_accepts_humantime_and_plain_millis() {
        assert_eq!(parse_duration_ms(POLL_INTERVAL_VAR, "1500").unwrap(), 1500);
        assert_eq!(parse_duration_ms(POLL_INTERVAL_VAR, "3s").unwrap(), 3000);
        assert_eq!(
            parse_duration_ms(POLL_INTERVAL_VAR, "250ms").unwrap(),
            250
        );
        assert!(parse_duration_ms(POLL_INTERVAL_VAR, "soon").is_err());
        assert!(matches!(
            parse_duration_ms(POLL_TIMEOUT_VAR, "5000000000years"),
            Err(ConfigLoadError::InvalidEnv { key: POLL_TIMEOUT_VAR, .. })
        ));
    }
}
