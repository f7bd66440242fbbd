use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ModelError, ModelResult};

/// Opaque job token assigned by the backend when a scan is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a `202 Accepted` scan submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanAccepted {
    pub task_id: TaskId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
}

/// Inner `data` object of a task status response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusBody {
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /api/tasks/{task_id}` response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub data: Option<TaskStatusBody>,
}

/// Lifecycle of a backend analysis job.
///
/// A pending job carries neither a result nor an error; each terminal state
/// carries exactly one.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Pending,
    Completed(Value),
    /// Error text reported by the backend, if any.
    Failed(Option<String>),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Pending)
    }
}

/// One backend analysis request as last observed by a status query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanJob {
    pub id: TaskId,
    pub state: JobState,
}

impl ScanJob {
    pub fn pending(id: TaskId) -> Self {
        Self {
            id,
            state: JobState::Pending,
        }
    }

    /// Strictly decode a status response body.
    ///
    /// Missing envelope data, an unknown status, or a completed job without
    /// a result are all rejected rather than surfaced as empty values.
    pub fn decode(id: TaskId, body: &[u8]) -> ModelResult<Self> {
        let envelope: TaskEnvelope = serde_json::from_slice(body)?;
        Self::from_envelope(id, envelope)
    }

    pub fn from_envelope(id: TaskId, envelope: TaskEnvelope) -> ModelResult<Self> {
        let body = envelope.data.ok_or_else(|| {
            ModelError::Malformed("task response missing `data`".into())
        })?;

        let state = match body.status {
            TaskStatus::Pending => JobState::Pending,
            TaskStatus::Completed => match body.result {
                Some(result) if !result.is_null() => JobState::Completed(result),
                _ => {
                    return Err(ModelError::Malformed(format!(
                        "task {id} completed without a result"
                    )));
                }
            },
            TaskStatus::Failed => JobState::Failed(
                body.error.filter(|error| !error.trim().is_empty()),
            ),
        };

        Ok(Self { id, state })
    }
}

/// Typed view over a completed analysis payload.
///
/// The backend forwards the AI output mostly untouched, so every field is
/// optional or defaulted; `structure_data` keeps the full raw document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanAnalysis {
    pub structure_data: Value,
    pub health_score: Option<f64>,
    pub eco_score: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub eco_score_reasoning: String,
    #[serde(deserialize_with = "null_as_default")]
    pub benefits: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub context: String,
    #[serde(deserialize_with = "null_as_default")]
    pub detected_allergens: Vec<String>,
    pub product_image: Option<String>,
}

/// The AI sometimes sends `null` where a field has nothing to say.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ScanAnalysis {
    pub fn from_value(value: &Value) -> ModelResult<Self> {
        if !value.is_object() {
            return Err(ModelError::Malformed(
                "scan analysis is not an object".into(),
            ));
        }
        Ok(Self::deserialize(value)?)
    }

    pub fn product_name(&self) -> &str {
        self.structure_data
            .get("product_name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown Product")
    }

    pub fn verdict(&self) -> Option<&str> {
        self.structure_data.get("verdict").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(body: Value) -> ModelResult<ScanJob> {
        ScanJob::decode(TaskId::new("abc"), body.to_string().as_bytes())
    }

    #[test]
    fn pending_has_no_payload() {
        let job = decode(json!({"data": {"status": "PENDING"}})).unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert!(!job.state.is_terminal());
    }

    #[test]
    fn completed_carries_result() {
        let job = decode(json!({
            "data": {"status": "COMPLETED", "result": {"score": 80}}
        }))
        .unwrap();
        assert_eq!(job.state, JobState::Completed(json!({"score": 80})));
    }

    #[test]
    fn failed_blank_error_is_dropped() {
        let job =
            decode(json!({"data": {"status": "FAILED", "error": "  "}})).unwrap();
        assert_eq!(job.state, JobState::Failed(None));

        let job = decode(json!({
            "data": {"status": "FAILED", "error": "blurry image"}
        }))
        .unwrap();
        assert_eq!(job.state, JobState::Failed(Some("blurry image".into())));
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        assert!(decode(json!({})).is_err());
        assert!(decode(json!({"data": {"status": "COMPLETED"}})).is_err());
        assert!(
            decode(json!({"data": {"status": "COMPLETED", "result": null}}))
                .is_err()
        );
        assert!(decode(json!({"data": {"status": "RUNNING"}})).is_err());
        assert!(
            ScanJob::decode(TaskId::new("abc"), b"<html>oops</html>").is_err()
        );
    }

    #[test]
    fn analysis_reads_camel_case_payload() {
        let analysis = ScanAnalysis::from_value(&json!({
            "structureData": {"product_name": "Oat Bar", "verdict": "good"},
            "healthScore": 72,
            "ecoScore": 55.5,
            "benefits": ["fiber"],
            "detectedAllergens": ["oats"],
            "productImage": "/uploads/x.jpg"
        }))
        .unwrap();
        assert_eq!(analysis.product_name(), "Oat Bar");
        assert_eq!(analysis.verdict(), Some("good"));
        assert_eq!(analysis.health_score, Some(72.0));
        assert_eq!(analysis.detected_allergens, vec!["oats".to_string()]);
        assert!(ScanAnalysis::from_value(&json!([1, 2])).is_err());
    }

    #[test]
    fn analysis_treats_null_fields_as_empty() {
        let analysis = ScanAnalysis::from_value(&json!({
            "structureData": {"product_name": "Soda"},
            "ecoScoreReasoning": null,
            "context": null,
            "benefits": null,
            "notes": null,
            "detectedAllergens": null,
            "healthScore": null
        }))
        .unwrap();
        assert_eq!(analysis.product_name(), "Soda");
        assert!(analysis.eco_score_reasoning.is_empty());
        assert!(analysis.context.is_empty());
        assert!(analysis.benefits.is_empty());
        assert!(analysis.detected_allergens.is_empty());
        assert_eq!(analysis.health_score, None);
    }
}
