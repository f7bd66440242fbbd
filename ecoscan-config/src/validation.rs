use thiserror::Error;
use url::Url;

use crate::models::ClientConfig;

/// Poll faster than this and a slow backend gets hammered with status queries.
const MIN_COMFORTABLE_POLL_INTERVAL_MS: u64 = 250;

#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("invalid base URL '{value}'")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("base URL '{value}' must use http or https")]
    UnsupportedScheme { value: String },
    #[error("scan.poll_interval_ms must be greater than zero")]
    ZeroPollInterval,
    #[error("scan.poll_timeout_ms must be greater than zero when set")]
    ZeroPollTimeout,
    #[error("scan.jpeg_quality must be between 1 and 100, got {0}")]
    JpegQuality(u8),
    #[error("scan.max_zoom must be a finite value >= 1, got {0}")]
    MaxZoom(f32),
    #[error("server.request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn validate(
    config: &ClientConfig,
) -> Result<ConfigWarnings, ConfigValidationError> {
    let mut warnings = ConfigWarnings::default();

    let base = &config.server.base_url;
    let parsed = Url::parse(base).map_err(|source| {
        ConfigValidationError::InvalidBaseUrl {
            value: base.clone(),
            source,
        }
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigValidationError::UnsupportedScheme {
            value: base.clone(),
        });
    }
    if parsed.scheme() == "http"
        && parsed
            .host_str()
            .is_some_and(|host| !matches!(host, "localhost" | "127.0.0.1"))
    {
        warnings.push_with_hint(
            format!("backend {base} is reached over plain http"),
            "session cookies travel unencrypted; prefer https outside local development",
        );
    }

    if config.server.request_timeout_secs == 0 {
        return Err(ConfigValidationError::ZeroRequestTimeout);
    }
    if config.server.accept_invalid_certs {
        warnings.push("TLS certificate validation is disabled");
    }

    let scan = &config.scan;
    if scan.poll_interval_ms == 0 {
        return Err(ConfigValidationError::ZeroPollInterval);
    }
    if scan.poll_interval_ms < MIN_COMFORTABLE_POLL_INTERVAL_MS {
        warnings.push_with_hint(
            format!("poll interval of {}ms is very short", scan.poll_interval_ms),
            "the backend default is 2000ms",
        );
    }
    if scan.poll_timeout_ms == Some(0) {
        return Err(ConfigValidationError::ZeroPollTimeout);
    }
    if !(1..=100).contains(&scan.jpeg_quality) {
        return Err(ConfigValidationError::JpegQuality(scan.jpeg_quality));
    }
    if !scan.max_zoom.is_finite() || scan.max_zoom < 1.0 {
        return Err(ConfigValidationError::MaxZoom(scan.max_zoom));
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_without_warnings() {
        let warnings = validate(&ClientConfig::default()).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn rejects_zero_interval_and_bad_quality() {
        let mut config = ClientConfig::default();
        config.scan.poll_interval_ms = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigValidationError::ZeroPollInterval)
        ));

        let mut config = ClientConfig::default();
        config.scan.jpeg_quality = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigValidationError::JpegQuality(0))
        ));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let mut config = ClientConfig::default();
        config.server.base_url = "ftp://files.example.com".into();
        assert!(matches!(
            validate(&config),
            Err(ConfigValidationError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn warns_on_remote_plain_http() {
        let mut config = ClientConfig::default();
        config.server.base_url = "http://scan.example.com".into();
        let warnings = validate(&config).unwrap();
        assert_eq!(warnings.items.len(), 1);
        assert!(warnings.items[0].hint.is_some());
    }
}
