use async_trait::async_trait;
use ecoscan_model::{ApiOutcome, OutcomeWire, ScanAccepted, ScanJob, ScanOutcome, TaskId};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use super::client::{ApiClient, decode_json};
use super::error::ApiError;
use super::routes;
use crate::capture::FinalImage;
use crate::scan::messages::SCAN_PROCESSING_FAILED;

/// Multipart field the backend reads the upload from.
pub const IMAGE_FIELD: &str = "product_image";

/// How the backend answered a scan upload.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResponse {
    /// `202 Accepted`: analysis runs in the background under this job.
    Accepted(TaskId),
    /// `200 OK`: the analysis finished inline.
    Immediate(ScanOutcome),
}

/// The two backend calls a scan needs. Kept behind a trait so the polling
/// logic can be driven by scripted responses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScanTransport: Send + Sync {
    async fn submit_scan(
        &self,
        image: &FinalImage,
    ) -> Result<SubmitResponse, ApiError>;

    async fn task_status(&self, task_id: &TaskId) -> Result<ScanJob, ApiError>;
}

#[async_trait]
impl ScanTransport for ApiClient {
    async fn submit_scan(
        &self,
        image: &FinalImage,
    ) -> Result<SubmitResponse, ApiError> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name())
            .mime_str(image.mime_type())?;
        let form = Form::new().part(IMAGE_FIELD, part);

        let (url, request) = self.post(routes::scan::SUBMIT);
        debug!(
            %url,
            bytes = image.bytes().len(),
            mime = image.mime_type(),
            "uploading scan image"
        );
        let response = self.execute(&url, request.multipart(form)).await?;

        if response.status() == StatusCode::ACCEPTED {
            let accepted: ScanAccepted = decode_json(response).await?;
            info!(task_id = %accepted.task_id, "scan accepted");
            return Ok(SubmitResponse::Accepted(accepted.task_id));
        }

        let wire: OutcomeWire<serde_json::Value> = decode_json(response).await?;
        let outcome = ApiOutcome::from_wire(wire, SCAN_PROCESSING_FAILED)?;
        info!(success = outcome.is_success(), "scan answered inline");
        Ok(SubmitResponse::Immediate(outcome))
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<ScanJob, ApiError> {
        let (url, request) = self.get(&routes::task_path(task_id));
        let response = self.execute(&url, request).await?;
        let body = response.bytes().await?;
        Ok(ScanJob::decode(task_id.clone(), &body)?)
    }
}
