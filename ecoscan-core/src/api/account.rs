//! Session, profile, history and chat calls.
//!
//! Each call resolves to a value the presentation layer can render without
//! error handling of its own; failures are logged and folded into a
//! `success: false` message or a neutral fallback.

use ecoscan_model::{
    ApiMessage, ApiOutcome, ChatReply, ChatRequest, Credentials, HistoryEntry,
    OutcomeWire, ProfileUpdate, SignupRequest, UserProfile,
};
use tracing::{info, warn};

use super::client::ApiClient;
use super::error::ApiError;
use super::routes;
use crate::scan::messages::NETWORK_ERROR;

pub const GENERIC_NETWORK_FAILURE: &str = "Network error occurred";
pub const PROFILE_UPDATE_FAILED: &str = "Update failed";
pub const HISTORY_LOAD_FAILED: &str = "Failed to load history";
pub const HISTORY_CLEAR_FAILED: &str = "Failed to clear history";
pub const CHAT_UNAVAILABLE: &str = "Sorry, I couldn't reach the AI.";

/// Message for a failed call: server text first, then connectivity, then
/// `fallback`.
fn failure_message(err: &ApiError, fallback: &str) -> String {
    if let Some(message) = err.server_message() {
        return message.to_string();
    }
    if err.is_connect() {
        return NETWORK_ERROR.to_string();
    }
    fallback.to_string()
}

/// Append `field: a, b | ...` validation details when the server sent any.
fn with_field_details(message: String, err: &ApiError) -> String {
    match err.body().and_then(|body| body.field_summary()) {
        Some(details) => format!("{message}: {details}"),
        None => message,
    }
}

impl ApiClient {
    /// Whether the cookie jar holds a live session.
    pub async fn check_auth_status(&self) -> bool {
        let (url, request) = self.get(routes::profile::ITEM);
        match self.execute(&url, request).await {
            Ok(_) => true,
            Err(err) => {
                info!(status = ?err.status(), "auth check failed");
                false
            }
        }
    }

    pub async fn login(&self, credentials: &Credentials) -> ApiMessage {
        match self
            .post_json::<_, ApiMessage>(routes::auth::LOGIN, credentials)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                warn!(username = %credentials.username, error = %err, "login failed");
                ApiMessage::failed(failure_message(&err, GENERIC_NETWORK_FAILURE))
            }
        }
    }

    pub async fn signup(&self, request: &SignupRequest) -> ApiMessage {
        match self
            .post_json::<_, ApiMessage>(routes::auth::SIGNUP, request)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                warn!(username = %request.username, error = %err, "signup failed");
                let message = failure_message(&err, GENERIC_NETWORK_FAILURE);
                ApiMessage::failed(with_field_details(message, &err))
            }
        }
    }

    /// Ends the server session. The local cookie is left to expire.
    pub async fn logout(&self) -> bool {
        let (url, request) = self.post(routes::auth::LOGOUT);
        match self.execute(&url, request).await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "logout failed");
                false
            }
        }
    }

    pub async fn get_profile(&self) -> Option<UserProfile> {
        match self.get_json::<UserProfile>(routes::profile::ITEM).await {
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!(error = %err, "profile fetch failed");
                None
            }
        }
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiMessage {
        match self
            .post_json::<_, ApiMessage>(routes::profile::ITEM, update)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "profile update failed");
                let message = if err.body().and_then(|b| b.field_summary()).is_some() {
                    with_field_details(PROFILE_UPDATE_FAILED.to_string(), &err)
                } else {
                    failure_message(&err, PROFILE_UPDATE_FAILED)
                };
                ApiMessage::failed(message)
            }
        }
    }

    /// Past scans, newest first as the server orders them.
    pub async fn get_history(&self) -> ApiOutcome<Vec<HistoryEntry>> {
        let result = self
            .get_json::<OutcomeWire<Vec<HistoryEntry>>>(routes::history::COLLECTION)
            .await
            .and_then(|wire| {
                ApiOutcome::from_wire(wire, HISTORY_LOAD_FAILED)
                    .map_err(ApiError::from)
            });
        match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "history fetch failed");
                ApiOutcome::failure(failure_message(&err, HISTORY_LOAD_FAILED))
            }
        }
    }

    pub async fn clear_history(&self) -> ApiMessage {
        match self
            .post_empty::<ApiMessage>(routes::history::CLEAR)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "history clear failed");
                ApiMessage::failed(HISTORY_CLEAR_FAILED)
            }
        }
    }

    /// Ask the assistant about a scan result. Never fails; on any error the
    /// reply is a fixed apology.
    pub async fn chat(&self, request: &ChatRequest) -> String {
        match self
            .post_json::<_, ChatReply>(routes::chat::ASK, request)
            .await
        {
            Ok(reply) => reply.response,
            Err(err) => {
                warn!(error = %err, "chat request failed");
                CHAT_UNAVAILABLE.to_string()
            }
        }
    }
}
