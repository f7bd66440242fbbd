//! User-facing failure messages for scan submission and polling.

use reqwest::StatusCode;

use crate::api::ApiError;

pub const LOGIN_REQUIRED: &str = "Please log in to scan products.";
pub const SERVER_ERROR: &str = "Server error. Please try again later.";
pub const NETWORK_ERROR: &str = "Network error: Unable to connect to server. Please check if the backend is running.";
pub const SCAN_PROCESSING_FAILED: &str = "Scan processing failed.";
pub const ANALYSIS_FAILED: &str = "Scan analysis failed";
pub const LOST_CONNECTION: &str = "Lost connection to scan task";
pub const TIMED_OUT: &str = "Scan is taking too long. Please try again.";
pub const CANCELLED: &str = "Scan cancelled.";

/// Map a failed upload to the message shown to the user.
pub fn submit_failure_message(err: &ApiError) -> String {
    match err.status() {
        Some(StatusCode::UNAUTHORIZED) => return LOGIN_REQUIRED.to_string(),
        Some(StatusCode::INTERNAL_SERVER_ERROR) => {
            return SERVER_ERROR.to_string();
        }
        _ => {}
    }
    if err.is_connect() {
        return NETWORK_ERROR.to_string();
    }
    err.server_message()
        .unwrap_or(SCAN_PROCESSING_FAILED)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorBody;
    use ecoscan_model::ModelError;

    fn status(code: u16, body: &str) -> ApiError {
        ApiError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            body: ErrorBody::parse(body.as_bytes()),
        }
    }

    #[test]
    fn maps_statuses_to_fixed_messages() {
        assert_eq!(
            submit_failure_message(&ApiError::Unauthorized(ErrorBody::parse(
                br#"{"message": "Authentication required"}"#
            ))),
            LOGIN_REQUIRED
        );
        assert_eq!(
            submit_failure_message(&status(500, r#"{"message": "boom"}"#)),
            SERVER_ERROR
        );
    }

    #[test]
    fn other_statuses_use_server_message_or_fallback() {
        assert_eq!(
            submit_failure_message(&status(400, r#"{"message": "No image provided"}"#)),
            "No image provided"
        );
        assert_eq!(
            submit_failure_message(&status(413, "Request Entity Too Large")),
            SCAN_PROCESSING_FAILED
        );
        assert_eq!(
            submit_failure_message(&ApiError::Malformed(ModelError::Malformed(
                "no task id".into()
            ))),
            SCAN_PROCESSING_FAILED
        );
    }
}
