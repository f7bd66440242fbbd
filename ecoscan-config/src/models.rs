use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_JPEG_QUALITY: u8 = 92;
pub const DEFAULT_MAX_ZOOM: f32 = 3.0;

/// Top-level client settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server: ServerConfig,
    pub scan: ScanConfig,
}

/// How the backend API is reached.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Origin of the backend, e.g. `http://localhost:5000`. A missing scheme
    /// is filled in with `http://` when the config is loaded.
    pub base_url: String,
    /// Per-request timeout applied by the HTTP client.
    pub request_timeout_secs: u64,
    /// Accept self-signed certificates. Only meant for local development.
    pub accept_invalid_certs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            accept_invalid_certs: false,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Scan submission, polling, and crop encoding settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Delay between the response to one status query and the next query.
    pub poll_interval_ms: u64,
    /// Give up waiting on a job after this long. Unset means wait until the
    /// job finishes or the caller cancels.
    pub poll_timeout_ms: Option<u64>,
    /// JPEG quality used when re-encoding a cropped image (1-100).
    pub jpeg_quality: u8,
    /// Upper bound for the crop zoom factor; the lower bound is always 1.
    pub max_zoom: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_timeout_ms: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }
}

impl ScanConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_ms.map(Duration::from_millis)
    }
}
