use std::sync::Arc;

use ecoscan_config::ScanConfig;
use ecoscan_model::{ApiOutcome, ScanOutcome, TaskId};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::messages::{CANCELLED, submit_failure_message};
use super::poller::{JobPoller, PollSettings};
use crate::api::{ApiClient, ScanTransport, SubmitResponse};
use crate::capture::FinalImage;
use crate::time::{SystemTimeProvider, TimeProvider};

/// Uploads a finalized image and follows the resulting job to completion.
///
/// `submit_scan` always resolves to an outcome; transport failures become
/// `success: false` with a message meant for the user.
pub struct ScanService<T = ApiClient> {
    transport: T,
    clock: Arc<dyn TimeProvider>,
    settings: PollSettings,
}

impl<T> std::fmt::Debug for ScanService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ScanService<ApiClient> {
    pub fn from_config(client: ApiClient, config: &ScanConfig) -> Self {
        Self::new(client, PollSettings::from(config))
    }
}

impl<T: ScanTransport> ScanService<T> {
    pub fn new(transport: T, settings: PollSettings) -> Self {
        Self {
            transport,
            clock: Arc::new(SystemTimeProvider),
            settings,
        }
    }

    /// Replace the time source, e.g. with a virtual clock in tests.
    pub fn with_clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Upload `image` and wait for the analysis.
    ///
    /// A `200` answer is returned as-is; a `202` starts polling the job.
    /// Cancelling `cancel` abandons the upload or stops polling and resolves
    /// to a cancelled outcome.
    pub async fn submit_scan(
        &self,
        image: &FinalImage,
        cancel: &CancellationToken,
    ) -> ScanOutcome {
        if cancel.is_cancelled() {
            return ApiOutcome::failure(CANCELLED);
        }

        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("scan upload cancelled");
                return ApiOutcome::failure(CANCELLED);
            }
            result = self.transport.submit_scan(image) => result,
        };

        match submitted {
            Ok(SubmitResponse::Immediate(outcome)) => outcome,
            Ok(SubmitResponse::Accepted(task_id)) => {
                self.poll_task(task_id, cancel).await
            }
            Err(error) => {
                warn!(%error, status = ?error.status(), "scan submission failed");
                ApiOutcome::failure(submit_failure_message(&error))
            }
        }
    }

    /// Follow an already accepted job, e.g. one resumed by id.
    pub async fn poll_task(
        &self,
        task_id: TaskId,
        cancel: &CancellationToken,
    ) -> ScanOutcome {
        info!(%task_id, interval = ?self.settings.interval, "polling scan task");
        JobPoller::new(&self.transport, self.clock.as_ref(), task_id, self.settings)
            .run(cancel)
            .await
    }
}
