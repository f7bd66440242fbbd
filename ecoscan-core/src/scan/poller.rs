use std::time::{Duration, Instant};

use ecoscan_config::ScanConfig;
use ecoscan_config::models::DEFAULT_POLL_INTERVAL_MS;
use ecoscan_model::{ApiOutcome, JobState, ScanOutcome, TaskId};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::messages::{ANALYSIS_FAILED, CANCELLED, LOST_CONNECTION, TIMED_OUT};
use crate::api::ScanTransport;
use crate::time::TimeProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between observing one status response and sending the next query.
    pub interval: Duration,
    /// Give up once this much time has passed since polling began.
    pub timeout: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: None,
        }
    }
}

impl From<&ScanConfig> for PollSettings {
    fn from(config: &ScanConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            timeout: config.poll_timeout(),
        }
    }
}

/// Where a job poll currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Pending,
    Completed(Value),
    Failed(String),
    LostConnection,
    Cancelled,
    TimedOut,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Pending)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PollState::Pending => "pending",
            PollState::Completed(_) => "completed",
            PollState::Failed(_) => "failed",
            PollState::LostConnection => "lost_connection",
            PollState::Cancelled => "cancelled",
            PollState::TimedOut => "timed_out",
        }
    }

    /// The user-facing outcome of a terminal state.
    pub fn into_outcome(self) -> Option<ScanOutcome> {
        let outcome = match self {
            PollState::Pending => return None,
            PollState::Completed(result) => ApiOutcome::Success(result),
            PollState::Failed(message) => ApiOutcome::Failure(message),
            PollState::LostConnection => ApiOutcome::failure(LOST_CONNECTION),
            PollState::Cancelled => ApiOutcome::failure(CANCELLED),
            PollState::TimedOut => ApiOutcome::failure(TIMED_OUT),
        };
        Some(outcome)
    }
}

/// Drives one backend job to a terminal state.
///
/// Queries are strictly sequential: the next one is only sent after the
/// previous response was seen and the interval elapsed. Any failed query
/// ends polling at once.
pub struct JobPoller<'a, T: ScanTransport + ?Sized> {
    transport: &'a T,
    clock: &'a dyn TimeProvider,
    task_id: TaskId,
    settings: PollSettings,
    state: PollState,
    attempts: u32,
    started: Instant,
}

impl<T: ScanTransport + ?Sized> std::fmt::Debug for JobPoller<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPoller")
            .field("task_id", &self.task_id)
            .field("settings", &self.settings)
            .field("state", &self.state.name())
            .field("attempts", &self.attempts)
            .finish()
    }
}

impl<'a, T: ScanTransport + ?Sized> JobPoller<'a, T> {
    pub fn new(
        transport: &'a T,
        clock: &'a dyn TimeProvider,
        task_id: TaskId,
        settings: PollSettings,
    ) -> Self {
        Self {
            transport,
            clock,
            task_id,
            settings,
            state: PollState::Pending,
            attempts: 0,
            started: clock.now(),
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Number of status queries sent so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Send exactly one status query and fold the answer into the state.
    ///
    /// Does nothing once the state is terminal.
    pub async fn tick(&mut self) -> &PollState {
        if self.state.is_terminal() {
            return &self.state;
        }

        self.attempts += 1;
        let attempt = self.attempts;
        self.state = match self.transport.task_status(&self.task_id).await {
            Ok(job) => match job.state {
                JobState::Pending => {
                    debug!(task_id = %self.task_id, attempt, status = "PENDING", "scan still processing");
                    PollState::Pending
                }
                JobState::Completed(result) => {
                    info!(task_id = %self.task_id, attempt, status = "COMPLETED", "scan finished");
                    PollState::Completed(result)
                }
                JobState::Failed(error) => {
                    let message =
                        error.unwrap_or_else(|| ANALYSIS_FAILED.to_string());
                    warn!(task_id = %self.task_id, attempt, status = "FAILED", %message, "scan failed");
                    PollState::Failed(message)
                }
            },
            Err(error) => {
                warn!(task_id = %self.task_id, attempt, %error, "lost connection to scan task");
                PollState::LostConnection
            }
        };
        &self.state
    }

    fn timed_out(&self) -> bool {
        self.settings
            .timeout
            .is_some_and(|timeout| self.clock.now().duration_since(self.started) >= timeout)
    }

    /// Poll until the job settles, the token is cancelled, or the timeout
    /// passes.
    pub async fn run(mut self, cancel: &CancellationToken) -> ScanOutcome {
        loop {
            if cancel.is_cancelled() {
                self.state = PollState::Cancelled;
            } else if self.timed_out() {
                warn!(task_id = %self.task_id, attempts = self.attempts, "scan polling timed out");
                self.state = PollState::TimedOut;
            } else {
                let cancelled = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    _ = self.tick() => false,
                };
                if cancelled {
                    self.state = PollState::Cancelled;
                } else if !self.state.is_terminal() {
                    let delay = self.clock.sleep(self.settings.interval);
                    let cancelled = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => true,
                        _ = delay => false,
                    };
                    if cancelled {
                        self.state = PollState::Cancelled;
                    }
                }
            }

            if self.state.is_terminal() {
                break;
            }
        }

        if self.state == PollState::Cancelled {
            info!(task_id = %self.task_id, attempts = self.attempts, "scan polling cancelled");
        }

        self.state
            .into_outcome()
            .unwrap_or_else(|| ApiOutcome::failure(LOST_CONNECTION))
    }
}
