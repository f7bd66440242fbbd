use std::collections::BTreeMap;

use ecoscan_model::ModelError;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Transport-level failure of a backend call.
///
/// These never reach the presentation layer directly; the services fold
/// them into `{success: false, message}` outcomes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not authenticated")]
    Unauthorized(ErrorBody),

    #[error("request failed with status {status}")]
    Status { status: StatusCode, body: ErrorBody },

    #[error("unable to connect to {url}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("malformed response: {0}")]
    Malformed(#[from] ModelError),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(err) => err.status(),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            ApiError::Unauthorized(body) | ApiError::Status { body, .. } => {
                Some(body)
            }
            _ => None,
        }
    }

    /// Server supplied `message`, if the error response carried one.
    pub fn server_message(&self) -> Option<&str> {
        self.body().and_then(ErrorBody::message)
    }

    pub fn is_connect(&self) -> bool {
        match self {
            ApiError::Connect { .. } => true,
            ApiError::Http(err) => err.is_connect(),
            _ => false,
        }
    }
}

/// Parsed body of a non-2xx response.
///
/// The backend sends `{"success": false, "message": "..."}` and, for form
/// validation failures, `{"errors": {"field": ["msg", ...]}}`. Anything else
/// is kept as raw text for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBody {
    message: Option<String>,
    field_errors: BTreeMap<String, Vec<String>>,
    raw: String,
}

#[derive(Deserialize)]
struct ErrorBodyWire {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<BTreeMap<String, FieldMessages>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldMessages {
    Many(Vec<String>),
    One(String),
}

impl ErrorBody {
    pub fn parse(bytes: &[u8]) -> Self {
        let raw = String::from_utf8_lossy(bytes).into_owned();
        match serde_json::from_slice::<ErrorBodyWire>(bytes) {
            Ok(wire) => Self {
                message: wire.message.filter(|m| !m.trim().is_empty()),
                field_errors: wire
                    .errors
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(field, msgs)| {
                        let msgs = match msgs {
                            FieldMessages::Many(msgs) => msgs,
                            FieldMessages::One(msg) => vec![msg],
                        };
                        (field, msgs)
                    })
                    .collect(),
                raw,
            },
            Err(_) => Self {
                raw,
                ..Self::default()
            },
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn field_errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.field_errors
    }

    /// Validation errors flattened as `field: a, b | other: c`.
    pub fn field_summary(&self) -> Option<String> {
        if self.field_errors.is_empty() {
            return None;
        }
        Some(
            self.field_errors
                .iter()
                .map(|(field, msgs)| format!("{field}: {}", msgs.join(", ")))
                .collect::<Vec<_>>()
                .join(" | "),
        )
    }
}
