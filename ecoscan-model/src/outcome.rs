use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};

/// Uniform result shape handed to the presentation layer.
///
/// Serializes to `{"success": true, "data": ...}` or
/// `{"success": false, "message": "..."}` so consumers only branch on
/// `success` and never need error handling of their own.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Success(T),
    Failure(String),
}

/// Outcome of a scan submission; the payload is the backend's analysis.
pub type ScanOutcome = ApiOutcome<serde_json::Value>;

impl<T> ApiOutcome<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        ApiOutcome::Failure(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiOutcome::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiOutcome::Success(data) => Some(data),
            ApiOutcome::Failure(_) => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ApiOutcome::Success(_) => None,
            ApiOutcome::Failure(message) => Some(message),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            ApiOutcome::Success(data) => Ok(data),
            ApiOutcome::Failure(message) => Err(message),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiOutcome<U> {
        match self {
            ApiOutcome::Success(data) => ApiOutcome::Success(f(data)),
            ApiOutcome::Failure(message) => ApiOutcome::Failure(message),
        }
    }

    /// Build an outcome from the loosely-typed wire envelope.
    ///
    /// A failure without a message uses `fallback`. A success without data is
    /// rejected, since consumers would otherwise read an absent payload.
    pub fn from_wire(
        wire: OutcomeWire<T>,
        fallback: &str,
    ) -> crate::ModelResult<Self> {
        match (wire.success, wire.data) {
            (true, Some(data)) => Ok(ApiOutcome::Success(data)),
            (true, None) => Err(crate::ModelError::Malformed(
                "success response without data".into(),
            )),
            (false, _) => Ok(ApiOutcome::Failure(
                wire.message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| fallback.to_string()),
            )),
        }
    }
}

impl<T: Serialize> Serialize for ApiOutcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ApiOutcome", 2)?;
        match self {
            ApiOutcome::Success(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            ApiOutcome::Failure(message) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("message", message)?;
            }
        }
        state.end()
    }
}

/// `{success, data?, message?}` as the backend sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeWire<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_to_uniform_shape() {
        let ok: ScanOutcome = ApiOutcome::Success(json!({"score": 80}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"success": true, "data": {"score": 80}})
        );

        let err: ScanOutcome = ApiOutcome::failure("blurry image");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"success": false, "message": "blurry image"})
        );
    }

    #[test]
    fn wire_failure_without_message_uses_fallback() {
        let wire: OutcomeWire<serde_json::Value> =
            serde_json::from_value(json!({"success": false})).unwrap();
        let outcome = ApiOutcome::from_wire(wire, "Scan processing failed.")
            .unwrap();
        assert_eq!(outcome.message(), Some("Scan processing failed."));
    }

    #[test]
    fn wire_success_without_data_is_malformed() {
        let wire: OutcomeWire<serde_json::Value> =
            serde_json::from_value(json!({"success": true})).unwrap();
        assert!(ApiOutcome::from_wire(wire, "unused").is_err());
    }
}
