use std::time::Duration;

use ecoscan_config::{ServerConfig, util::normalize_base_url};
use ecoscan_model::ModelError;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use super::error::{ApiError, ErrorBody};

/// HTTP client for the EcoScan backend.
///
/// The session lives in the client's cookie jar, so clones share the login
/// established by any one of them.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiClient {
    /// Create a client with default timeouts.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ApiError> {
        Self::from_config(&ServerConfig {
            base_url: base_url.as_ref().to_string(),
            ..ServerConfig::default()
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&config.base_url);
        if base_url != config.base_url {
            warn!(
                from = %config.base_url,
                to = %base_url,
                "normalized backend base URL"
            );
        }
        if let Err(err) = reqwest::Url::parse(&base_url) {
            return Err(ApiError::InvalidUrl {
                url: base_url,
                reason: err.to_string(),
            });
        }

        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        info!(%base_url, "created API client");
        Ok(Self { client, base_url })
    }

    /// Join a route onto the base URL.
    pub fn build_url(&self, path: impl AsRef<str>) -> String {
        let p = path.as_ref();
        if p.starts_with("http://") || p.starts_with("https://") {
            return p.to_string();
        }
        format!("{}/{}", self.base_url, p.trim_start_matches('/'))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn get(&self, path: &str) -> (String, RequestBuilder) {
        let url = self.build_url(path);
        let request = self.client.get(&url);
        (url, request)
    }

    pub(crate) fn post(&self, path: &str) -> (String, RequestBuilder) {
        let url = self.build_url(path);
        let request = self.client.post(&url);
        (url, request)
    }

    /// Send a request, turning 401 and other non-2xx statuses into errors.
    pub(crate) async fn execute(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|source| {
            if source.is_connect() {
                ApiError::Connect {
                    url: url.to_string(),
                    source,
                }
            } else {
                ApiError::Http(source)
            }
        })?;

        let status = response.status();
        debug!(%url, status = status.as_u16(), "backend responded");
        if status.is_success() {
            return Ok(response);
        }

        let body = ErrorBody::parse(&response.bytes().await.unwrap_or_default());
        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized(body)),
            status => Err(ApiError::Status { status, body }),
        }
    }

    pub(crate) async fn execute_json<R: DeserializeOwned>(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> Result<R, ApiError> {
        let response = self.execute(url, request).await?;
        decode_json(response).await
    }

    pub(crate) async fn get_json<R: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<R, ApiError> {
        let (url, request) = self.get(path);
        self.execute_json(&url, request).await
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let (url, request) = self.post(path);
        self.execute_json(&url, request.json(body)).await
    }

    pub(crate) async fn post_empty<R: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<R, ApiError> {
        let (url, request) = self.post(path);
        self.execute_json(&url, request).await
    }
}

/// Decode a JSON body, reporting parse failures as malformed responses.
pub(crate) async fn decode_json<R: DeserializeOwned>(
    response: Response,
) -> Result<R, ApiError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|err| ApiError::Malformed(ModelError::from(err)))
}
